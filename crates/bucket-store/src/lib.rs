//! Content-addressed upload retention.
//!
//! Uploads are reduced to terminal units (decompressing and extracting
//! container formats along the way), each unit is checksummed and stored
//! once in a fan-out blob store, and directory trees plus tag-driven replica
//! trees are materialized as hardlinks into it.
//!
//! # Architecture
//!
//! - `config.rs` - Explicit pipeline configuration (the binary maps env vars onto it)
//! - `blob.rs` - Content-addressed blob persistence with atomic publication
//! - `replicate.rs` - `user/${User}/${Topic}` style replica path templates
//! - `materialize.rs` - Hardlink tree construction from manifest entries
//! - `pipeline.rs` - The ingest orchestrator tying it all together
//! - `manifest.rs` - The per-upload result reported back to clients

pub use blob::{BlobStore, LinkOutcome};
pub use config::{DEFAULT_FILENAME, DEFAULT_MAX_CONTENT_LENGTH, StoreConfig};
pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestEntry, ReplicaOutcome, ReplicaReport, UnitError};
pub use materialize::{LinkReport, Materializer};
pub use pipeline::Pipeline;
pub use replicate::{ReplicaTemplate, TemplateError, sanitize_segment};

mod blob;
mod config;
mod error;
mod manifest;
mod materialize;
mod pipeline;
mod replicate;
