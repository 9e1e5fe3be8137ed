//! gzip-aware response body decoding.

use std::io::{self, Read};

use flate2::read::GzDecoder;

/// Decode a raw response body as UTF-8 text, inflating it first when the
/// response declared `Content-Encoding: gzip`.
///
/// An empty body decodes to an empty string even when gzip was declared
/// (e.g. `204` or `304` responses). Invalid UTF-8 sequences are replaced.
pub fn decode_body(raw: &[u8], gzipped: bool) -> io::Result<String> {
    if !gzipped || raw.is_empty() {
        return Ok(String::from_utf8_lossy(raw).into_owned());
    }
    let mut inflated = Vec::with_capacity(raw.len() * 4);
    GzDecoder::new(raw).read_to_end(&mut inflated)?;
    Ok(String::from_utf8_lossy(&inflated).into_owned())
}
