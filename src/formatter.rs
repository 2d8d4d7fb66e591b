//! Type-keyed encode/decode transforms applied to entries at write and read
//! time.
//!
//! A formatter is registered on a [`Pak`](crate::Pak) under a type tag.
//! Writing with that tag encodes the value into the bytes that are stored,
//! and reading with that tag decodes the stored bytes back into a value.
//! A tag without a registered formatter is ignored: values are stored as
//! raw bytes and reads return raw bytes.
//!
//! ```
//! use bpk::{Decoded, JsonFormatter, Pak};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! type Object = BTreeMap<String, i64>;
//!
//! let mut pak = Pak::new("my-header");
//! pak.add_formatter("json", JsonFormatter::<Object>::new());
//!
//! let mut value = Object::new();
//! value.insert(String::from("a"), 1);
//! pak.write_as("x", &value, "json")?;
//!
//! assert_eq!(pak.read("x")?, br#"{"a":1}"#);
//! assert_eq!(pak.read_as::<Object>("x", "json")?, Decoded::Value(value));
//! # Ok(())
//! # }
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::{any::Any, collections::HashMap, fmt, marker::PhantomData};

/// Error raised by a formatter's encode or decode function
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An encode/decode pair for one type of value
pub trait Formatter: Send + Sync + 'static {
    /// The structured value this formatter converts to and from bytes
    type Value: 'static;

    /// Converts a value into the bytes that are stored in the pak
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, BoxError>;

    /// Converts stored bytes back into a value
    fn decode(&self, data: &[u8]) -> Result<Self::Value, BoxError>;
}

/// Object safe view of a [`Formatter`] so that formatters of different value
/// types share one registry
trait ErasedFormatter: Send + Sync {
    /// Returns `None` when the value is not the formatter's value type
    fn encode_any(&self, value: &dyn Any) -> Option<Result<Vec<u8>, BoxError>>;

    fn decode_any(&self, data: &[u8]) -> Result<Box<dyn Any>, BoxError>;
}

impl<F: Formatter> ErasedFormatter for F {
    fn encode_any(&self, value: &dyn Any) -> Option<Result<Vec<u8>, BoxError>> {
        value.downcast_ref::<F::Value>().map(|x| self.encode(x))
    }

    fn decode_any(&self, data: &[u8]) -> Result<Box<dyn Any>, BoxError> {
        let value = self.decode(data)?;
        Ok(Box::new(value))
    }
}

/// Registry of formatters keyed by type tag
#[derive(Default)]
pub struct Formatters {
    registry: HashMap<String, Box<dyn ErasedFormatter>>,
}

impl Formatters {
    /// Creates an empty registry
    pub fn new() -> Self {
        Formatters::default()
    }

    /// Registers a formatter under the type tag, replacing any formatter
    /// previously registered for that tag
    pub fn insert<F: Formatter>(&mut self, kind: impl Into<String>, formatter: F) -> &mut Self {
        self.registry.insert(kind.into(), Box::new(formatter));
        self
    }

    /// Builder flavor of [`Formatters::insert`]
    pub fn with<F: Formatter>(mut self, kind: impl Into<String>, formatter: F) -> Self {
        self.insert(kind, formatter);
        self
    }

    /// Returns true if a formatter is registered for the type tag
    pub fn contains(&self, kind: &str) -> bool {
        self.registry.contains_key(kind)
    }

    /// Number of registered formatters
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if no formatters are registered
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Encodes the value with the formatter registered for `kind`.
    ///
    /// The outer `None` means no formatter is registered, the inner `None`
    /// that the formatter does not accept the value's type.
    pub(crate) fn encode(
        &self,
        kind: &str,
        value: &dyn Any,
    ) -> Option<Option<Result<Vec<u8>, BoxError>>> {
        self.registry.get(kind).map(|f| f.encode_any(value))
    }

    pub(crate) fn decode(&self, kind: &str, data: &[u8]) -> Option<Result<Box<dyn Any>, BoxError>> {
        self.registry.get(kind).map(|f| f.decode_any(data))
    }
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.registry.keys()).finish()
    }
}

/// The result of reading an entry with a type tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<'a, T> {
    /// The registered formatter decoded the entry
    Value(T),

    /// No formatter is registered for the tag, these are the stored bytes
    Raw(&'a [u8]),
}

impl<'a, T> Decoded<'a, T> {
    /// Returns the decoded value if a formatter was applied
    pub fn value(self) -> Option<T> {
        match self {
            Decoded::Value(x) => Some(x),
            Decoded::Raw(_) => None,
        }
    }

    /// Returns the stored bytes if no formatter was applied
    pub fn raw(&self) -> Option<&'a [u8]> {
        match *self {
            Decoded::Value(_) => None,
            Decoded::Raw(x) => Some(x),
        }
    }

    /// Returns true if no formatter was applied
    pub fn is_raw(&self) -> bool {
        matches!(self, Decoded::Raw(_))
    }
}

/// Stores values as `serde_json` text
pub struct JsonFormatter<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> JsonFormatter<T> {
    /// Creates a formatter for values of type `T`
    pub fn new() -> Self {
        JsonFormatter {
            marker: PhantomData,
        }
    }
}

impl<T> Default for JsonFormatter<T> {
    fn default() -> Self {
        JsonFormatter::new()
    }
}

impl<T> fmt::Debug for JsonFormatter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonFormatter")
    }
}

impl<T> Formatter for JsonFormatter<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, data: &[u8]) -> Result<T, BoxError> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Stores strings as UTF-8 and rejects non UTF-8 entries on read
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Formatter;

impl Formatter for Utf8Formatter {
    type Value = String;

    fn encode(&self, value: &String) -> Result<Vec<u8>, BoxError> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, data: &[u8]) -> Result<String, BoxError> {
        Ok(String::from_utf8(data.to_vec())?)
    }
}

/// Converts the byte-like values that can be stored without a formatter
pub(crate) fn as_bytes(value: &dyn Any) -> Option<&[u8]> {
    if let Some(x) = value.downcast_ref::<Vec<u8>>() {
        Some(x.as_slice())
    } else if let Some(x) = value.downcast_ref::<String>() {
        Some(x.as_bytes())
    } else if let Some(x) = value.downcast_ref::<&'static str>() {
        Some(x.as_bytes())
    } else if let Some(x) = value.downcast_ref::<&'static [u8]>() {
        Some(*x)
    } else if let Some(x) = value.downcast_ref::<Box<[u8]>>() {
        Some(&x[..])
    } else {
        None
    }
}
