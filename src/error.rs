use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode source image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("source image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("invalid geometry: {0}")]
    Geometry(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("failed to encode output image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("invalid border configuration: {0}")]
    InvalidConfig(String),
    #[error("border generation did not finish within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    Geometry,
    Render,
    Config,
    Timeout,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Decode(_) | Error::EmptyImage { .. } => ErrorKind::Decode,
            Error::Geometry(_) => ErrorKind::Geometry,
            Error::Render(_) | Error::Encode(_) => ErrorKind::Render,
            Error::InvalidConfig(_) => ErrorKind::Config,
            Error::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Only a timed out call is worth trying again, the geometry is deterministic.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}
