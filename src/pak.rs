use crate::{
    deflate,
    formatter::{self, Decoded, Formatter, Formatters},
    header::{scan_prefix, write_prefix, PakHeader},
    PakError, PakErrorKind,
};
use std::{any::Any, collections::HashMap, fmt, io::Write};
use tracing::{debug, trace};

/// An in-memory archive of named binary entries identified by a magic
/// header string.
///
/// Entries are kept in insertion order. Writing an existing name replaces
/// its payload in place, so the name keeps its original position.
pub struct Pak {
    magic: String,
    entries: Vec<(String, Vec<u8>)>,
    index: HashMap<String, usize>,
    formatters: Formatters,
}

impl Pak {
    /// Creates an empty pak that reads and writes the given magic header
    pub fn new(magic: impl Into<String>) -> Self {
        Pak::with_formatters(magic, Formatters::new())
    }

    /// Creates an empty pak with formatters already registered
    pub fn with_formatters(magic: impl Into<String>, formatters: Formatters) -> Self {
        Pak {
            magic: magic.into(),
            entries: Vec::new(),
            index: HashMap::new(),
            formatters,
        }
    }

    /// Creates a pak populated by importing previously exported data
    pub fn from_slice(magic: impl Into<String>, data: &[u8]) -> Result<Self, PakError> {
        let mut pak = Pak::new(magic);
        pak.import(data)?;
        Ok(pak)
    }

    /// The magic header string that identifies this pak's format
    pub fn magic(&self) -> &str {
        &self.magic
    }

    /// Registers a formatter under the type tag, replacing any formatter
    /// previously registered for that tag
    pub fn add_formatter<F: Formatter>(&mut self, kind: impl Into<String>, formatter: F) -> &mut Self {
        let kind = kind.into();
        trace!(kind = %kind, "registering formatter");
        self.formatters.insert(kind, formatter);
        self
    }

    /// The registered formatters
    pub fn formatters(&self) -> &Formatters {
        &self.formatters
    }

    /// Names of all stored entries in store order
    pub fn list_entries(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Iterate over the stored entries in store order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.entries
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if an entry is stored under the name
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Stores raw bytes under the name, replacing any previous entry
    pub fn write(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.insert(name.into(), data.into());
    }

    /// Stores a value under the name using the formatter registered for
    /// `kind`.
    ///
    /// If no formatter is registered for `kind` the tag is ignored and the
    /// value must be byte-like (`Vec<u8>`, `String`, `&'static str`,
    /// `&'static [u8]`, or `Box<[u8]>`).
    pub fn write_as<T: Any>(
        &mut self,
        name: impl Into<String>,
        value: &T,
        kind: &str,
    ) -> Result<(), PakError> {
        let data = match self.formatters.encode(kind, value) {
            Some(Some(Ok(data))) => data,
            Some(Some(Err(source))) => {
                return Err(PakErrorKind::Formatter {
                    kind: kind.to_string(),
                    source,
                }
                .into())
            }
            Some(None) => {
                return Err(PakErrorKind::FormatterValue {
                    kind: kind.to_string(),
                }
                .into())
            }
            None => formatter::as_bytes(value)
                .ok_or(PakErrorKind::NotBytes)?
                .to_vec(),
        };

        self.insert(name.into(), data);
        Ok(())
    }

    /// Returns the bytes stored under the name
    pub fn read(&self, name: &str) -> Result<&[u8], PakError> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].1.as_slice())
            .ok_or_else(|| {
                PakErrorKind::EntryNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Returns the entry decoded by the formatter registered for `kind`, or
    /// the raw bytes when no formatter is registered for `kind`
    pub fn read_as<T: Any>(&self, name: &str, kind: &str) -> Result<Decoded<'_, T>, PakError> {
        let data = self.read(name)?;
        match self.formatters.decode(kind, data) {
            None => Ok(Decoded::Raw(data)),
            Some(Err(source)) => Err(PakErrorKind::Formatter {
                kind: kind.to_string(),
                source,
            }
            .into()),
            Some(Ok(value)) => value.downcast::<T>().map(|x| Decoded::Value(*x)).map_err(|_| {
                PakErrorKind::FormatterValue {
                    kind: kind.to_string(),
                }
                .into()
            }),
        }
    }

    /// Serializes the pak into a single self-contained buffer
    pub fn export(&self) -> Result<Vec<u8>, PakError> {
        let mut out = Vec::new();
        self.export_to(&mut out)?;
        Ok(out)
    }

    /// Serializes the pak into the writer.
    ///
    /// The output is the magic header, the decimal length of the compressed
    /// header record, `:`, the compressed header record, and the compressed
    /// concatenation of every entry.
    pub fn export_to<W: Write>(&self, mut writer: W) -> Result<(), PakError> {
        let mut header = PakHeader::new(self.magic.as_str());
        let total: usize = self.entries.iter().map(|(_, data)| data.len()).sum();
        let mut payload = Vec::with_capacity(total);
        for (name, data) in &self.entries {
            let start = payload.len();
            payload.extend_from_slice(data);
            header.table.push(name.as_str(), start..payload.len());
        }

        let compressed_header = deflate::compress(&header.to_vec()?)?;
        let compressed_payload = deflate::compress(&payload)?;
        debug!(
            magic = %self.magic,
            entries = self.entries.len(),
            payload_len = payload.len(),
            header_len = compressed_header.len(),
            compressed_payload_len = compressed_payload.len(),
            "exporting pak"
        );

        write_prefix(&mut writer, &self.magic, compressed_header.len())?;
        writer.write_all(&compressed_header)?;
        writer.write_all(&compressed_payload)?;
        Ok(())
    }

    /// Installs every entry of an exported pak into this one.
    ///
    /// Entries with names in the imported table are added or replaced,
    /// other entries are left untouched. Nothing is installed unless the
    /// whole input is valid.
    pub fn import(&mut self, data: &[u8]) -> Result<(), PakError> {
        let sections = scan_prefix(data, &self.magic)?;
        let header = deflate::inflate(&data[sections.header.clone()])?;
        let payload = deflate::inflate(&data[sections.payload_start..])?;
        let header = PakHeader::from_slice(&header)?;

        if header.magic != self.magic {
            return Err(PakErrorKind::MagicMismatch {
                found: header.magic,
            }
            .into());
        }

        header.table.check_bounds(payload.len())?;
        debug!(
            magic = %self.magic,
            version = header.version,
            header_len = sections.header.len(),
            entries = header.table.len(),
            payload_len = payload.len(),
            "importing pak"
        );

        for (name, range) in header.table.iter() {
            self.insert(name.to_string(), payload[range.clone()].to_vec());
        }

        Ok(())
    }

    fn insert(&mut self, name: String, data: Vec<u8>) {
        trace!(name = %name, len = data.len(), "storing entry");
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = data,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, data));
            }
        }
    }
}

impl fmt::Debug for Pak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pak")
            .field("magic", &self.magic)
            .field("entries", &self.list_entries())
            .field("formatters", &self.formatters)
            .finish()
    }
}
