//! Lazy decompression readers.
//!
//! Each decoder pulls from its source on demand; the decompressed content
//! never needs to fit in memory at once. Codec-level framing errors
//! (truncation, bad internal checksums) surface as `io::Error` from `read`,
//! which callers map to [`Error::CorruptStream`] for the offending unit.

use std::io::Read;

use crate::detect::Codec;
use crate::error::{Error, Result};

/// Wrap `inner` in a streaming decoder for `codec`.
pub fn decoder(inner: Box<dyn Read>, codec: Codec) -> Result<Box<dyn Read>> {
    match codec {
        Codec::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(inner))),
        Codec::Bzip2 => Ok(Box::new(bzip2::read::BzDecoder::new(inner))),
        Codec::Xz => Ok(Box::new(xz2::read::XzDecoder::new(inner))),
        Codec::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(inner).map_err(|_| Error::CorruptStream)?;
            Ok(Box::new(decoder))
        }
    }
}
