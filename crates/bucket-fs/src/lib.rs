//! Atomic filesystem primitives for content-addressed storage.
//!
//! Everything here assumes source and destination live on the same
//! filesystem: blob publication is a plain `rename`, and directory trees are
//! built from hardlinks. Platforms (or filesystems) without hardlink support
//! opt into a copy fallback through [`FallbackStrategy`] - an explicit,
//! caller-visible strategy, never a silent behavior change.

mod error;

pub use error::{Error, Result};

use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FallbackStrategy {
    /// Surface the hardlink failure to the caller.
    #[default]
    Error,
    /// Degrade to a full copy when the link syscall is unsupported.
    Copy,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LinkOptions {
    fallback: FallbackStrategy,
}

impl LinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fallback(mut self, fallback: FallbackStrategy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn get_fallback(&self) -> FallbackStrategy {
        self.fallback
    }
}

/// Create a directory and all missing parents. Pre-existing directories are
/// reused, not an error.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).map_err(|source| Error::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically publish `src` at `dest` via rename, creating missing parent
/// directories. A concurrent publisher racing on the same destination is
/// safe: rename replaces atomically and readers never observe a partial
/// file.
pub fn publish(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    std::fs::rename(src, dest).map_err(|source| Error::PublishFailed {
        path: dest.to_path_buf(),
        source,
    })
}

/// Create a hardlink at `dest` pointing at `src`, creating missing parent
/// directories. Fails with [`Error::MissingSource`] if `src` does not exist
/// and [`Error::LinkFailed`] if `dest` already exists; conflict resolution
/// belongs to the caller.
pub fn hardlink(src: impl AsRef<Path>, dest: impl AsRef<Path>, options: LinkOptions) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    if !src.exists() {
        return Err(Error::MissingSource {
            path: src.to_path_buf(),
        });
    }
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    match std::fs::hard_link(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::Unsupported
            && options.get_fallback() == FallbackStrategy::Copy =>
        {
            std::fs::copy(src, dest)
                .map(|_| ())
                .map_err(|source| Error::LinkFailed {
                    dest: dest.to_path_buf(),
                    source,
                })
        }
        Err(source) => Err(Error::LinkFailed {
            dest: dest.to_path_buf(),
            source,
        }),
    }
}

/// Check whether two paths name the same underlying inode.
///
/// On platforms without inode metadata this compares file length only, which
/// is sufficient for the idempotent-relink check when content is
/// checksum-addressed.
#[cfg(unix)]
pub fn same_inode(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let ma = std::fs::metadata(a.as_ref())?;
    let mb = std::fs::metadata(b.as_ref())?;
    Ok(ma.dev() == mb.dev() && ma.ino() == mb.ino())
}

#[cfg(not(unix))]
pub fn same_inode(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Result<bool> {
    let ma = std::fs::metadata(a.as_ref())?;
    let mb = std::fs::metadata(b.as_ref())?;
    Ok(ma.len() == mb.len())
}

/// Number of directory entries referencing the file's inode.
#[cfg(unix)]
pub fn link_count(path: impl AsRef<Path>) -> Result<u64> {
    use std::os::unix::fs::MetadataExt;

    Ok(std::fs::metadata(path.as_ref())?.nlink())
}

#[cfg(not(unix))]
pub fn link_count(path: impl AsRef<Path>) -> Result<u64> {
    let _ = std::fs::metadata(path.as_ref())?;
    Ok(1)
}
