/*!

A minimal archive format that packs named binary entries into a single
compressed buffer and unpacks them back.

## Features

- ✔ Small: one in-memory store, one export routine, one import routine
- ✔ Ordered: entries are exported and re-imported in the order they were written
- ✔ Typed: optional formatters encode structured values on write and decode them on read
- ✔ Strict: imports are validated against the archive's magic header twice and
  installed all-or-nothing

## Quick Start

```rust
use bpk::Pak;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut pak = Pak::new("secret");
pak.write("foobar", "This is a test");
pak.write("test", "This is number 42");

let data = pak.export()?;

let pak2 = Pak::from_slice("secret", &data)?;
assert_eq!(pak2.list_entries(), vec!["foobar", "test"]);
assert_eq!(pak2.read("foobar")?, b"This is a test");
assert_eq!(pak2.read("test")?, b"This is number 42");

// Data exported under another magic header is rejected
assert!(Pak::from_slice("other", &data).unwrap_err().is_format_error());
# Ok(())
# }
```

## Format

An exported pak is laid out as:

| Field | Encoding |
|---|---|
| magic | the archive's magic header, verbatim |
| header length | decimal ASCII length of the compressed header |
| delimiter | `:` |
| header | raw deflate of `{"v":1,"h":"<magic>","e":{"<name>":[start,end],...}}` |
| payload | raw deflate of every entry concatenated, running to the end of the buffer |

The offsets in the header index into the decompressed payload. The
whole archive is read and written as one buffer; persisting it is up to
the caller.

## Formatters

Formatters let callers store structured values instead of bytes. See the
[`formatter`] module.

```rust
use bpk::{Decoded, JsonFormatter, Pak};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Object {
    foo: u32,
    bar: String,
}

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut pak = Pak::new("my-header");
pak.add_formatter("json", JsonFormatter::<Object>::new());

let value = Object { foo: 42, bar: String::from("hello world") };
pak.write_as("some/object", &value, "json")?;

assert_eq!(pak.list_entries(), vec!["some/object"]);
assert_eq!(pak.read_as::<Object>("some/object", "json")?, Decoded::Value(value));
# Ok(())
# }
```

*/

mod deflate;
mod errors;
pub mod formatter;
mod header;
mod pak;

pub use self::deflate::COMPRESSION_LEVEL;
pub use self::errors::*;
pub use self::formatter::{BoxError, Decoded, Formatter, Formatters, JsonFormatter, Utf8Formatter};
pub use self::header::{OffsetTable, PakHeader, SCAN_LIMIT, VERSION};
pub use self::pak::Pak;
