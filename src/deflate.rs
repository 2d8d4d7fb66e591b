use crate::{PakError, PakErrorKind};
use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use std::io::{Read, Write};

/// Compression level used for both the header and the payload section
pub const COMPRESSION_LEVEL: u32 = 8;

/// Raw deflate (no zlib or gzip framing) the given data
pub(crate) fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let out = Vec::with_capacity(data.len() / 2 + 16);
    let mut encoder = DeflateEncoder::new(out, Compression::new(COMPRESSION_LEVEL));
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflate a raw deflate stream
pub(crate) fn inflate(data: &[u8]) -> Result<Vec<u8>, PakError> {
    let mut out = Vec::with_capacity(data.len().saturating_mul(2));
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(PakErrorKind::Inflate)?;
    Ok(out)
}
