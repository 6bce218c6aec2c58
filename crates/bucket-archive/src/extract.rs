//! Single-pass entry walk over tar and zip containers.
//!
//! Entries are visited in container order (manifests must be deterministic
//! for a given input) and each entry's reader is handed to the sink exactly
//! once; there is no way to revisit or reorder. Entries that fail path
//! sanitization, and entry kinds that cannot be represented as blobs
//! (symlinks, devices), are reported through the reject callback and never
//! materialized.

use std::io::{Read, Seek};
use std::path::PathBuf;

use crate::codec;
use crate::detect::{ArchiveFormat, Codec};
use crate::error::{Error, Result};
use crate::limits::{Budget, LimitedReader};
use crate::sanitize::sanitize_entry_path;

/// Metadata for one file entry, with its path already sanitized.
#[derive(Clone, Debug)]
pub struct EntryMeta {
    /// Normalized relative path, safe to join under any root.
    pub path: PathBuf,
    /// Path exactly as stored in the container.
    pub raw_path: PathBuf,
    /// Size the container header declares; the stream is authoritative.
    pub declared_size: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WalkSummary {
    pub files: u64,
    pub rejected: u64,
}

/// Walk a container, dispatching on format.
///
/// `codec` wraps tar input in a decompression reader first; zip carries its
/// own per-entry compression and accepts no outer codec.
pub fn walk<R, F, G>(
    format: ArchiveFormat,
    codec: Option<Codec>,
    reader: R,
    budget: &mut Budget,
    on_entry: F,
    on_rejected: G,
) -> Result<WalkSummary>
where
    R: Read + Seek + 'static,
    F: FnMut(EntryMeta, &mut dyn Read) -> Result<()>,
    G: FnMut(PathBuf, Error),
{
    match format {
        ArchiveFormat::Zip => {
            if codec.is_some() {
                return Err(Error::UnsupportedFormat);
            }
            walk_zip(reader, budget, on_entry, on_rejected)
        }
        ArchiveFormat::Tar => {
            let reader: Box<dyn Read> = match codec {
                None => Box::new(reader),
                Some(c) => codec::decoder(Box::new(reader), c)?,
            };
            walk_tar(reader, budget, on_entry, on_rejected)
        }
    }
}

pub fn walk_tar<R, F, G>(
    reader: R,
    budget: &mut Budget,
    mut on_entry: F,
    mut on_rejected: G,
) -> Result<WalkSummary>
where
    R: Read,
    F: FnMut(EntryMeta, &mut dyn Read) -> Result<()>,
    G: FnMut(PathBuf, Error),
{
    let mut archive = tar::Archive::new(reader);
    let mut summary = WalkSummary::default();

    for entry in archive.entries().map_err(|_| Error::CorruptStream)? {
        let mut entry = entry.map_err(|_| Error::CorruptStream)?;
        let raw_path = match entry.path() {
            Ok(p) => p.into_owned(),
            Err(_) => {
                summary.rejected += 1;
                on_rejected(
                    PathBuf::new(),
                    Error::InvalidPath {
                        entry: PathBuf::new(),
                    },
                );
                continue;
            }
        };

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            // Directories exist implicitly through materialized file paths.
            continue;
        }
        if !entry_type.is_file() {
            let kind = if entry_type.is_symlink() {
                "symlink"
            } else if entry_type.is_hard_link() {
                "hard link"
            } else {
                "special entry"
            };
            summary.rejected += 1;
            on_rejected(
                raw_path.clone(),
                Error::UnsupportedEntry {
                    entry: raw_path,
                    kind,
                },
            );
            continue;
        }

        let path = match sanitize_entry_path(&raw_path) {
            Ok(p) => p,
            Err(e) => {
                summary.rejected += 1;
                on_rejected(raw_path, e);
                continue;
            }
        };

        budget.charge_entry()?;
        let meta = EntryMeta {
            path,
            raw_path,
            declared_size: entry.header().size().unwrap_or(0),
        };
        let mut limited = LimitedReader::new(&mut entry, budget);
        let sink_result = on_entry(meta, &mut limited);
        if let Some(kind) = budget.exhausted() {
            return Err(Error::LimitExceeded(kind));
        }
        sink_result?;
        summary.files += 1;
    }

    Ok(summary)
}

pub fn walk_zip<R, F, G>(
    reader: R,
    budget: &mut Budget,
    mut on_entry: F,
    mut on_rejected: G,
) -> Result<WalkSummary>
where
    R: Read + Seek,
    F: FnMut(EntryMeta, &mut dyn Read) -> Result<()>,
    G: FnMut(PathBuf, Error),
{
    let mut archive = zip::ZipArchive::new(reader).map_err(|_| Error::CorruptStream)?;
    let mut summary = WalkSummary::default();

    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(|_| Error::CorruptStream)?;

        let raw_path = PathBuf::from(file.name());
        if file.is_dir() {
            continue;
        }
        if file.unix_mode().is_some_and(|m| m & 0o170000 == 0o120000) {
            summary.rejected += 1;
            on_rejected(
                raw_path.clone(),
                Error::UnsupportedEntry {
                    entry: raw_path,
                    kind: "symlink",
                },
            );
            continue;
        }

        // enclosed_name already refuses traversal; sanitize normalizes the
        // survivors and keeps the reject reporting uniform across formats.
        let path = match file.enclosed_name().map(sanitize_entry_path) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                summary.rejected += 1;
                on_rejected(raw_path, e);
                continue;
            }
            None => {
                summary.rejected += 1;
                on_rejected(
                    raw_path.clone(),
                    Error::PathTraversal { entry: raw_path },
                );
                continue;
            }
        };

        budget.charge_entry()?;
        let meta = EntryMeta {
            path,
            raw_path,
            declared_size: file.size(),
        };
        let mut limited = LimitedReader::new(&mut file, budget);
        let sink_result = on_entry(meta, &mut limited);
        if let Some(kind) = budget.exhausted() {
            return Err(Error::LimitExceeded(kind));
        }
        sink_result?;
        summary.files += 1;
    }

    Ok(summary)
}
