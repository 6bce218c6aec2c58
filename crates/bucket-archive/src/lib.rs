//! Signature-based classification, decompression, and bounded archive
//! extraction.
//!
//! # Architecture
//!
//! - `detect.rs` - Content classification from magic bytes (never filenames)
//! - `codec.rs` - Lazy decompression readers (gzip, bzip2, xz, zstd)
//! - `sanitize.rs` - Entry path normalization (zip-slip prevention)
//! - `limits.rs` - Recursion/entry/size budget shared across one upload
//! - `extract.rs` - Single-pass entry walk over tar and zip containers

pub use codec::decoder;
pub use detect::{
    ArchiveFormat, Codec, ContentKind, SIGNATURE_WINDOW, classify, classify_file,
    guess_content_type,
};
pub use error::{Error, LimitKind, Result};
pub use extract::{EntryMeta, WalkSummary, walk, walk_tar, walk_zip};
pub use limits::{Budget, ExtractLimits, LimitedReader};
pub use sanitize::sanitize_entry_path;

mod codec;
mod detect;
mod error;
mod extract;
mod limits;
mod sanitize;
