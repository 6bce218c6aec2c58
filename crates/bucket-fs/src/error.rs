use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    #[error("failed to publish '{path}': {source}")]
    PublishFailed { path: PathBuf, source: io::Error },

    #[error("failed to link '{dest}': {source}")]
    LinkFailed { dest: PathBuf, source: io::Error },

    #[error("link source does not exist: '{path}'")]
    MissingSource { path: PathBuf },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
