//! Directory tree materialization.
//!
//! Builds filesystem trees whose leaves are hardlinks into the blob store.
//! Trees reference blobs, they never own them: deleting a tree leaves every
//! blob intact. Directory creation is idempotent, so repeated uploads into
//! the same replica prefix reuse what a prior upload created.

use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::blob::{BlobStore, LinkOutcome};
use crate::error::Error;
use crate::manifest::ManifestEntry;

/// One link attempt while materializing a tree.
#[derive(Debug)]
pub struct LinkReport {
    pub relative_path: String,
    pub dest: PathBuf,
    pub result: Result<LinkOutcome, Error>,
}

impl LinkReport {
    pub fn ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Human-readable note for the manifest; `None` for a clean fresh link.
    pub fn detail(&self) -> Option<String> {
        match &self.result {
            Ok(LinkOutcome::Linked) | Ok(LinkOutcome::AlreadyLinked) => None,
            Ok(LinkOutcome::Replaced) => {
                Some("replaced conflicting link (last writer wins)".to_string())
            }
            Err(e) => Some(e.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Materializer<'a> {
    store: &'a BlobStore,
}

impl<'a> Materializer<'a> {
    pub fn new(store: &'a BlobStore) -> Self {
        Self { store }
    }

    /// Link every manifest entry at `prefix/<relative_path>`.
    ///
    /// Failures are collected per entry rather than short-circuiting, so one
    /// bad leaf (or one unwritable replica target) never blocks the rest.
    /// The one exception in severity is [`Error::NotFound`]: every entry was
    /// stored before any tree is built, so a missing blob here breaks that
    /// ordering and the caller is expected to propagate it.
    pub fn link_entries(&self, prefix: &Path, entries: &[ManifestEntry]) -> Vec<LinkReport> {
        entries
            .iter()
            .map(|entry| {
                let dest = prefix.join(&entry.relative_path);
                let result = self.store.link(&entry.checksum, &dest);
                match &result {
                    Err(e @ Error::NotFound(_)) => error!(
                        checksum = %entry.checksum,
                        dest = %dest.display(),
                        error = %e,
                        "blob missing during materialization"
                    ),
                    Err(e) => warn!(
                        checksum = %entry.checksum,
                        dest = %dest.display(),
                        error = %e,
                        "failed to materialize link"
                    ),
                    Ok(_) => {}
                }
                LinkReport {
                    relative_path: entry.relative_path.clone(),
                    dest,
                    result,
                }
            })
            .collect()
    }
}
