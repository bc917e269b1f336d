//! FlateDecode stream codec.
//!
//! Decoding accepts both zlib-wrapped and raw deflate data; many writers
//! emit the former, some corrupt files carry the latter. Encoding always
//! produces zlib-wrapped output at best compression.

use std::io::{Read, Write};

use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// Decode a stream according to its dictionary.
///
/// If the dictionary declares `/FlateDecode`, the raw bytes are inflated;
/// otherwise they are returned unchanged.
pub fn decode_stream(dict: &[u8], raw: &[u8]) -> Result<Vec<u8>> {
    if contains(dict, b"/FlateDecode") {
        inflate(raw)
    } else {
        Ok(raw.to_vec())
    }
}

/// Inflate DEFLATE data, accepting zlib-wrapped then raw deflate.
pub fn inflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    match ZlibDecoder::new(raw).read_to_end(&mut output) {
        Ok(_) => Ok(output),
        Err(zlib_err) => {
            log::debug!("zlib decode failed ({}), trying raw deflate", zlib_err);
            output.clear();
            match DeflateDecoder::new(raw).read_to_end(&mut output) {
                Ok(_) => Ok(output),
                Err(deflate_err) => Err(Error::Decode(format!(
                    "flate decompression failed (zlib: {}, deflate: {})",
                    zlib_err, deflate_err
                ))),
            }
        }
    }
}

/// Deflate-encode bytes with a zlib wrapper at best compression.
pub fn encode_stream_flate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    // Writing to a Vec cannot fail
    encoder.write_all(data).expect("in-memory deflate");
    encoder.finish().expect("in-memory deflate")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}
