use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no blob stored for checksum '{0}'")]
    NotFound(String),

    #[error("invalid checksum '{0}' (lowercase hex, at least 8 characters required)")]
    InvalidChecksum(String),

    #[error("upload exceeds the maximum content length of {limit} bytes")]
    ContentTooLarge { limit: u64 },

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error(transparent)]
    Archive(#[from] bucket_archive::Error),

    #[error(transparent)]
    Fs(#[from] bucket_fs::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Unit-level failures that degrade to a manifest error entry instead of
    /// failing the upload.
    pub fn is_unit_recoverable(&self) -> bool {
        !matches!(self, Self::NotFound(_) | Self::ContentTooLarge { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Fs(_) | Self::Archive(bucket_archive::Error::Io(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
