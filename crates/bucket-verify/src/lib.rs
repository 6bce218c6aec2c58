//! Streaming checksum primitives for content-addressed storage.
//!
//! Provides incremental hashing behind a minimal [`Hasher`] trait and a
//! [`HashingReader`] tee adapter that digests bytes as they stream through.
//! A digest computed here is reproducible for identical bytes regardless of
//! how they were obtained (direct upload, decompression, or archive
//! extraction) because the adapter sits on the `Read` seam.
//!
//! # Example
//!
//! ```
//! use bucket_verify::{HashAlgorithm, HashingReader};
//!
//! let mut reader = HashingReader::new(&b"hello"[..], HashAlgorithm::Md5.hasher());
//! let mut sink = Vec::new();
//! std::io::copy(&mut reader, &mut sink).unwrap();
//!
//! assert_eq!(reader.finalize_hex(), "5d41402abc4b2a76b9719d911017c592");
//! ```

pub use self::error::{Error, Result};
pub use self::hasher::{Blake3Hasher, HashAlgorithm, Hasher, Md5Hasher, Sha256Hasher};
pub use self::reader::HashingReader;

mod error;
mod hasher;
mod reader;
