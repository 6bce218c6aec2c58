use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported checksum algorithm '{0}' (expected one of: md5, sha256, blake3)")]
    UnknownAlgorithm(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
