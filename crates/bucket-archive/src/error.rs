use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported container/codec combination")]
    UnsupportedFormat,

    #[error("stream is corrupted or truncated")]
    CorruptStream,

    #[error("entry '{entry}' escapes the extraction root")]
    PathTraversal { entry: PathBuf },

    #[error("entry has no usable path: '{entry}'")]
    InvalidPath { entry: PathBuf },

    #[error("entry '{entry}' is a {kind}, which cannot be represented as a blob")]
    UnsupportedEntry { entry: PathBuf, kind: &'static str },

    #[error("extraction budget exceeded: {0}")]
    LimitExceeded(LimitKind),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitKind {
    Depth { limit: usize },
    Entries { limit: u64 },
    Bytes { limit: u64 },
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Depth { limit } => write!(f, "nesting depth over {limit}"),
            Self::Entries { limit } => write!(f, "more than {limit} entries"),
            Self::Bytes { limit } => write!(f, "more than {limit} decompressed bytes"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
