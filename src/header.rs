use crate::{PakError, PakErrorKind};
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, io::Write, ops::Range};

/// Version tag written into every exported header. It is never checked on
/// import.
pub const VERSION: u32 = 1;

/// Maximum number of bytes after the magic header that are scanned for the
/// `:` that terminates the header length field
pub const SCAN_LIMIT: usize = 1024;

/// The metadata record that precedes the payload of an exported pak.
///
/// Serialized as `{"v":1,"h":"<magic>","e":{"<name>":[start,end],...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PakHeader {
    #[serde(rename = "v", default = "default_version", deserialize_with = "lenient_version")]
    pub version: u32,

    #[serde(rename = "h")]
    pub magic: String,

    #[serde(rename = "e", default)]
    pub table: OffsetTable,
}

impl PakHeader {
    /// Creates a header for the given magic with an empty offset table
    pub fn new(magic: impl Into<String>) -> Self {
        PakHeader {
            version: VERSION,
            magic: magic.into(),
            table: OffsetTable::default(),
        }
    }

    /// Parses a header record from its decompressed bytes
    pub fn from_slice(data: &[u8]) -> Result<Self, PakError> {
        serde_json::from_slice(data).map_err(|e| PakErrorKind::InvalidHeader(e).into())
    }

    /// Encodes the header record
    pub fn to_vec(&self) -> Result<Vec<u8>, PakError> {
        serde_json::to_vec(self).map_err(|e| PakErrorKind::InvalidHeader(e).into())
    }
}

fn default_version() -> u32 {
    VERSION
}

/// The version tag is informational: any JSON value is accepted and values
/// that are not a `u32` read as [`VERSION`]
fn lenient_version<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|x| u32::try_from(x).ok())
        .unwrap_or(VERSION))
}

/// Entry name to `[start, end)` byte range within the decompressed payload,
/// kept in payload order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    entries: Vec<(String, Range<usize>)>,
}

impl OffsetTable {
    /// Records the next entry's range
    pub fn push(&mut self, name: impl Into<String>, range: Range<usize>) {
        self.entries.push((name.into(), range));
    }

    /// Number of entries in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the table in the order it was written
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Range<usize>)> + '_ {
        self.entries.iter().map(|(name, range)| (name.as_str(), range))
    }

    /// Verifies that every range can be sliced out of a payload of the
    /// given length
    pub fn check_bounds(&self, len: usize) -> Result<(), PakError> {
        for (name, range) in &self.entries {
            if range.start > range.end || range.end > len {
                return Err(PakErrorKind::EntryOutOfBounds {
                    name: name.clone(),
                    start: range.start,
                    end: range.end,
                    len,
                }
                .into());
            }
        }

        Ok(())
    }
}

impl Serialize for OffsetTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, range) in &self.entries {
            map.serialize_entry(name, &(range.start, range.end))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OffsetTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OffsetTableVisitor;

        impl<'de> Visitor<'de> for OffsetTableVisitor {
            type Value = OffsetTable;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of entry names to [start, end] offsets")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = OffsetTable::default();
                while let Some((name, (start, end))) = map.next_entry::<String, (usize, usize)>()? {
                    // Duplicate keys in the document: the later range wins
                    // while the earlier position is kept
                    match table.entries.iter_mut().find(|(n, _)| *n == name) {
                        Some(existing) => existing.1 = start..end,
                        None => table.entries.push((name, start..end)),
                    }
                }
                Ok(table)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(OffsetTable::default())
            }
        }

        deserializer.deserialize_any(OffsetTableVisitor)
    }
}

/// Writes the uncompressed prefix of an exported pak: the magic header, the
/// decimal length of the compressed header, and the `:` delimiter
pub(crate) fn write_prefix<W>(mut writer: W, magic: &str, header_len: usize) -> std::io::Result<()>
where
    W: Write,
{
    writer.write_all(magic.as_bytes())?;

    #[cfg(feature = "faster_writer")]
    {
        let mut buffer = itoa::Buffer::new();
        writer.write_all(buffer.format(header_len).as_bytes())?;
    }

    #[cfg(not(feature = "faster_writer"))]
    {
        write!(writer, "{}", header_len)?;
    }

    writer.write_all(b":")?;
    Ok(())
}

/// Location of the compressed header and payload within an exported pak
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sections {
    pub header: Range<usize>,
    pub payload_start: usize,
}

/// Validates the magic header and locates the compressed sections.
///
/// The length field must be one or more ASCII digits followed by `:`
/// within [`SCAN_LIMIT`] bytes of the magic header.
pub(crate) fn scan_prefix(data: &[u8], magic: &str) -> Result<Sections, PakError> {
    let magic = magic.as_bytes();
    if !data.starts_with(magic) {
        return Err(PakErrorKind::InvalidMagic.into());
    }

    let window_end = data.len().min(magic.len().saturating_add(SCAN_LIMIT));
    let mut header_len: usize = 0;
    let mut digits = 0;
    let mut delimiter = None;

    for (i, &byte) in data[magic.len()..window_end].iter().enumerate() {
        match byte {
            b':' => {
                delimiter = Some(magic.len() + i);
                break;
            }
            b'0'..=b'9' => {
                header_len = header_len
                    .checked_mul(10)
                    .and_then(|x| x.checked_add(usize::from(byte - b'0')))
                    .ok_or(PakErrorKind::InvalidHeaderLength)?;
                digits += 1;
            }
            _ => return Err(PakErrorKind::InvalidHeaderLength.into()),
        }
    }

    let delimiter = delimiter.ok_or(PakErrorKind::InvalidHeaderLength)?;
    if digits == 0 || header_len == 0 {
        return Err(PakErrorKind::InvalidHeaderLength.into());
    }

    let start = delimiter + 1;
    let end = start
        .checked_add(header_len)
        .filter(|&end| end <= data.len())
        .ok_or(PakErrorKind::InvalidHeaderLength)?;

    Ok(Sections {
        header: start..end,
        payload_start: end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[test]
    fn test_header_encoding() {
        let mut header = PakHeader::new("secret");
        header.table.push("foobar", 0..14);
        header.table.push("test", 14..31);

        let data = header.to_vec().unwrap();
        assert_eq!(
            std::str::from_utf8(&data).unwrap(),
            r#"{"v":1,"h":"secret","e":{"foobar":[0,14],"test":[14,31]}}"#
        );

        assert_eq!(PakHeader::from_slice(&data).unwrap(), header);
    }

    #[test]
    fn test_header_table_keeps_document_order() {
        let data = br#"{"v":1,"h":"x","e":{"zeta":[0,1],"alpha":[1,2],"mid":[2,3]}}"#;
        let header = PakHeader::from_slice(&data[..]).unwrap();
        let names: Vec<_> = header.table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[rstest]
    #[case(&br#"{"h":"x","e":{}}"#[..], VERSION)]
    #[case(&br#"{"v":"1","h":"x","e":{}}"#[..], VERSION)]
    #[case(&br#"{"v":1.5,"h":"x","e":{}}"#[..], VERSION)]
    #[case(&br#"{"v":-3,"h":"x","e":{}}"#[..], VERSION)]
    #[case(&br#"{"v":null,"h":"x","e":{}}"#[..], VERSION)]
    #[case(&br#"{"v":{"major":2},"h":"x","e":{}}"#[..], VERSION)]
    #[case(&br#"{"v":7,"h":"x","e":{}}"#[..], 7)]
    fn test_header_version_is_lenient(#[case] input: &[u8], #[case] expected: u32) {
        let header = PakHeader::from_slice(input).unwrap();
        assert_eq!(header.version, expected);
        assert_eq!(header.magic, "x");
    }

    #[test]
    fn test_header_missing_table() {
        let header = PakHeader::from_slice(br#"{"v":1,"h":"x"}"#).unwrap();
        assert!(header.table.is_empty());
        assert_eq!(header.magic, "x");
    }

    #[rstest]
    #[case(&b"not json"[..])]
    #[case(&br#"{"v":1}"#[..])]
    #[case(&br#"{"v":1,"h":"x","e":{"a":[1]}}"#[..])]
    #[case(&br#"{"v":1,"h":"x","e":{"a":[-1,2]}}"#[..])]
    #[case(&br#"{"v":1,"h":"x","e":[]}"#[..])]
    fn test_header_invalid(#[case] input: &[u8]) {
        let err = PakHeader::from_slice(input).unwrap_err();
        assert!(matches!(err.kind(), PakErrorKind::InvalidHeader(_)));
    }

    #[test]
    fn test_check_bounds() {
        let mut table = OffsetTable::default();
        table.push("a", 0..4);
        assert!(table.check_bounds(4).is_ok());
        assert!(table.check_bounds(3).is_err());

        let mut table = OffsetTable::default();
        table.push("b", 3..2);
        assert!(table.check_bounds(10).is_err());
    }

    #[test]
    fn test_write_prefix() {
        let mut out = Vec::new();
        write_prefix(&mut out, "secret", 123).unwrap();
        assert_eq!(&out, b"secret123:");
    }

    #[test]
    fn test_scan_prefix() {
        let data = b"secret3:abcrest";
        let sections = scan_prefix(&data[..], "secret").unwrap();
        assert_eq!(sections.header, 8..11);
        assert_eq!(sections.payload_start, 11);
        assert_eq!(&data[sections.header], b"abc");
    }

    #[rstest]
    #[case(&b"public3:abc"[..], "secret")]
    #[case(&b"sec"[..], "secret")]
    #[case(&b""[..], "secret")]
    fn test_scan_prefix_invalid_magic(#[case] input: &[u8], #[case] magic: &str) {
        let err = scan_prefix(input, magic).unwrap_err();
        assert!(matches!(err.kind(), PakErrorKind::InvalidMagic));
    }

    #[rstest]
    #[case(&b"secret"[..])]
    #[case(&b"secret:abc"[..])]
    #[case(&b"secret0:abc"[..])]
    #[case(&b"secret12"[..])]
    #[case(&b"secret1x:abc"[..])]
    #[case(&b"secret9:abc"[..])]
    #[case(&b"secret99999999999999999999999:abc"[..])]
    fn test_scan_prefix_invalid_length(#[case] input: &[u8]) {
        let err = scan_prefix(input, "secret").unwrap_err();
        assert!(matches!(err.kind(), PakErrorKind::InvalidHeaderLength));
    }

    #[test]
    fn test_scan_prefix_is_bounded() {
        let mut data = b"secret".to_vec();
        data.extend(std::iter::repeat(b'0').take(SCAN_LIMIT));
        data.extend_from_slice(b"1:x");
        let err = scan_prefix(&data, "secret").unwrap_err();
        assert!(matches!(err.kind(), PakErrorKind::InvalidHeaderLength));
    }
}
