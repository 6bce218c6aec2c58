//! Content-addressed blob persistence.
//!
//! Blobs live at `blob/<cs[0..2]>/<cs[2..4]>/<cs>` - a two-level fan-out so
//! no single directory accumulates millions of entries. A blob is published
//! by atomic rename from staging on the same filesystem, so a concurrent
//! reader never observes a partial write and concurrent writers racing on
//! the same checksum both observe success. Existing blobs are trusted by
//! digest: `put` never re-compares bytes.

use std::fs::File;
use std::path::{Path, PathBuf};

use bucket_fs::LinkOptions;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct BlobStore {
    blob_dir: PathBuf,
    link_options: LinkOptions,
}

/// Result of a link attempt against an existing destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Fresh link created.
    Linked,
    /// Destination already pointed at this blob; nothing to do.
    AlreadyLinked,
    /// Destination held different content and was replaced
    /// (last-writer-wins); callers record the conflict.
    Replaced,
}

impl BlobStore {
    pub fn new(blob_dir: impl Into<PathBuf>, link_options: LinkOptions) -> Self {
        Self {
            blob_dir: blob_dir.into(),
            link_options,
        }
    }

    /// Final on-disk location for a checksum.
    pub fn blob_path(&self, checksum: &str) -> Result<PathBuf> {
        let checksum = validate_checksum(checksum)?;
        Ok(self
            .blob_dir
            .join(&checksum[0..2])
            .join(&checksum[2..4])
            .join(&checksum))
    }

    /// Existence probe. Malformed checksums are simply not stored.
    pub fn has(&self, checksum: &str) -> bool {
        self.blob_path(checksum)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    /// Publish the staged file as the blob for `checksum`.
    ///
    /// Returns `false` without touching the filesystem when the blob already
    /// exists (first-writer-wins); the caller keeps ownership of the staged
    /// file in that case. The staged file must live on the same filesystem
    /// as the store.
    pub fn put(&self, checksum: &str, staged: &Path) -> Result<bool> {
        let dest = self.blob_path(checksum)?;
        if dest.exists() {
            debug!(checksum, "blob already stored");
            return Ok(false);
        }
        bucket_fs::publish(staged, &dest)?;
        debug!(checksum, path = %dest.display(), "blob created");
        Ok(true)
    }

    /// Open a stored blob for reading.
    pub fn open(&self, checksum: &str) -> Result<File> {
        let path = self.blob_path(checksum)?;
        File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(checksum.to_string())
            } else {
                Error::Io(e)
            }
        })
    }

    /// Hardlink the blob at `dest`, creating missing parent directories.
    ///
    /// Relinking the same content is a no-op; a different file already at
    /// `dest` is replaced and reported as [`LinkOutcome::Replaced`].
    pub fn link(&self, checksum: &str, dest: &Path) -> Result<LinkOutcome> {
        let blob = self.blob_path(checksum)?;
        if !blob.exists() {
            return Err(Error::NotFound(checksum.to_string()));
        }

        if dest.exists() {
            if bucket_fs::same_inode(&blob, dest)? {
                return Ok(LinkOutcome::AlreadyLinked);
            }
            std::fs::remove_file(dest)?;
            bucket_fs::hardlink(&blob, dest, self.link_options)?;
            debug!(checksum, dest = %dest.display(), "conflicting link replaced");
            return Ok(LinkOutcome::Replaced);
        }

        bucket_fs::hardlink(&blob, dest, self.link_options)?;
        debug!(checksum, dest = %dest.display(), "blob linked");
        Ok(LinkOutcome::Linked)
    }
}

fn validate_checksum(checksum: &str) -> Result<String> {
    let normalized = checksum.to_ascii_lowercase();
    if normalized.len() >= 8 && normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(normalized)
    } else {
        Err(Error::InvalidChecksum(checksum.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> BlobStore {
        BlobStore::new(dir.join("blob"), LinkOptions::new())
    }

    fn stage(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn put_then_has_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let staged = stage(dir.path(), "staged", b"content");

        assert!(!store.has("0123456789abcdef"));
        assert!(store.put("0123456789abcdef", &staged).unwrap());
        assert!(store.has("0123456789abcdef"));

        let mut out = Vec::new();
        use std::io::Read;
        store.open("0123456789abcdef").unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"content");
    }

    #[test]
    fn duplicate_put_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let first = stage(dir.path(), "s1", b"same");
        assert!(store.put("0123456789abcdef", &first).unwrap());

        let second = stage(dir.path(), "s2", b"same");
        assert!(!store.put("0123456789abcdef", &second).unwrap());
        // Loser keeps its staged file
        assert!(second.exists());
    }

    #[test]
    fn fan_out_route() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let path = store.blob_path("abcdef1234").unwrap();
        assert!(path.ends_with("ab/cd/abcdef1234"));
    }

    #[test]
    fn checksum_normalized_to_lowercase() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert_eq!(
            store.blob_path("ABCDEF1234").unwrap(),
            store.blob_path("abcdef1234").unwrap()
        );
    }

    #[test]
    fn malformed_checksum_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.blob_path("short"),
            Err(Error::InvalidChecksum(_))
        ));
        assert!(matches!(
            store.blob_path("not-hex-at-all!"),
            Err(Error::InvalidChecksum(_))
        ));
        assert!(!store.has("zzzz"));
    }

    #[test]
    fn open_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.open("0123456789abcdef"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn link_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.link("0123456789abcdef", &dir.path().join("dest")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn link_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let staged = stage(dir.path(), "s1", b"one");
        store.put("1111111111", &staged).unwrap();
        let staged = stage(dir.path(), "s2", b"two");
        store.put("2222222222", &staged).unwrap();

        let dest = dir.path().join("tree/deep/leaf");
        assert_eq!(store.link("1111111111", &dest).unwrap(), LinkOutcome::Linked);
        assert_eq!(
            store.link("1111111111", &dest).unwrap(),
            LinkOutcome::AlreadyLinked
        );
        // Different checksum at the same destination: last writer wins
        assert_eq!(
            store.link("2222222222", &dest).unwrap(),
            LinkOutcome::Replaced
        );
        assert_eq!(std::fs::read(&dest).unwrap(), b"two");
    }

    #[test]
    fn deleting_link_keeps_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let staged = stage(dir.path(), "s1", b"durable");
        store.put("3333333333", &staged).unwrap();

        let dest = dir.path().join("leaf");
        store.link("3333333333", &dest).unwrap();
        std::fs::remove_file(&dest).unwrap();

        assert!(store.has("3333333333"));
        let mut out = Vec::new();
        use std::io::Read;
        store.open("3333333333").unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"durable");
    }
}
