use std::fmt;

/// An error that can occur when reading, writing, or importing a pak
#[derive(Debug)]
pub struct PakError(Box<PakErrorKind>);

impl PakError {
    pub(crate) fn new(kind: PakErrorKind) -> PakError {
        PakError(Box::new(kind))
    }

    /// Return the specific type of error
    pub fn kind(&self) -> &PakErrorKind {
        &self.0
    }

    /// Consume the error and return the specific type of error
    pub fn into_kind(self) -> PakErrorKind {
        *self.0
    }

    /// Returns true if the error describes input that is not a valid pak
    /// for the archive's magic header.
    ///
    /// These are all of the errors that `import` can raise.
    pub fn is_format_error(&self) -> bool {
        matches!(
            *self.0,
            PakErrorKind::InvalidMagic
                | PakErrorKind::InvalidHeaderLength
                | PakErrorKind::Inflate(_)
                | PakErrorKind::InvalidHeader(_)
                | PakErrorKind::MagicMismatch { .. }
                | PakErrorKind::EntryOutOfBounds { .. }
        )
    }

    /// Returns true if a read referenced an entry that is not stored
    pub fn is_entry_not_found(&self) -> bool {
        matches!(*self.0, PakErrorKind::EntryNotFound { .. })
    }
}

/// Specific type of error
#[derive(Debug)]
pub enum PakErrorKind {
    /// No entry is stored under the requested name
    EntryNotFound { name: String },

    /// The leading bytes do not match the archive's magic header
    InvalidMagic,

    /// The compressed header length field is absent, malformed, zero, not
    /// terminated within the scan window, or longer than the input
    InvalidHeaderLength,

    /// A compressed section could not be inflated
    Inflate(std::io::Error),

    /// The decompressed header is not a valid header record
    InvalidHeader(serde_json::Error),

    /// The header record names a different magic header
    MagicMismatch { found: String },

    /// An offset table entry points outside of the payload
    EntryOutOfBounds {
        name: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// A registered formatter failed to encode or decode a value
    Formatter {
        kind: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The value handed to a formatter is not the type the formatter accepts
    FormatterValue { kind: String },

    /// The value cannot be stored as raw bytes
    NotBytes,

    /// An IO error when writing an exported pak
    Io(std::io::Error),
}

impl std::error::Error for PakError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self.0 {
            PakErrorKind::Inflate(ref err) => Some(err),
            PakErrorKind::InvalidHeader(ref err) => Some(err),
            PakErrorKind::Formatter { ref source, .. } => Some(source.as_ref()),
            PakErrorKind::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for PakError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            PakErrorKind::EntryNotFound { ref name } => write!(f, "entry \"{}\" not found", name),
            PakErrorKind::InvalidMagic => write!(f, "invalid file format"),
            PakErrorKind::InvalidHeaderLength => write!(f, "invalid header or empty file"),
            PakErrorKind::Inflate(ref err) => write!(f, "unable to inflate section: {}", err),
            PakErrorKind::InvalidHeader(ref err) => write!(f, "invalid header: {}", err),
            PakErrorKind::MagicMismatch { ref found } => {
                write!(f, "invalid file format (header names magic \"{}\")", found)
            }
            PakErrorKind::EntryOutOfBounds {
                ref name,
                start,
                end,
                len,
            } => write!(
                f,
                "entry \"{}\" spans {}..{} outside of payload (length: {})",
                name, start, end, len
            ),
            PakErrorKind::Formatter {
                ref kind,
                ref source,
            } => write!(f, "formatter \"{}\" failed: {}", kind, source),
            PakErrorKind::FormatterValue { ref kind } => {
                write!(f, "value is not accepted by formatter \"{}\"", kind)
            }
            PakErrorKind::NotBytes => write!(f, "value cannot be converted into bytes"),
            PakErrorKind::Io(ref err) => write!(f, "io error: {}", err),
        }
    }
}

impl From<PakErrorKind> for PakError {
    fn from(kind: PakErrorKind) -> Self {
        PakError::new(kind)
    }
}

impl From<std::io::Error> for PakError {
    fn from(error: std::io::Error) -> Self {
        PakError::new(PakErrorKind::Io(error))
    }
}
