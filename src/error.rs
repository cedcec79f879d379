//! Error types for GhostYUV

use thiserror::Error;

/// Result type alias for GhostYUV operations
pub type Result<T> = std::result::Result<T, Error>;

/// GhostYUV error type
#[derive(Error, Debug)]
pub enum Error {
    // Format errors
    #[error("Unknown pixel format: {0}")]
    UnknownFormat(String),

    #[error("Invalid frame geometry: {0}")]
    InvalidGeometry(String),

    #[error("Incompatible frame format: {0}")]
    IncompatibleFormat(String),

    // Stream errors
    #[error("Cannot open stream: {0}")]
    OpenFailure(String),

    #[error("Stream configuration error: {0}")]
    Configuration(String),

    #[error("Stream is not open")]
    NotOpen,

    #[error("Seek out of range: frame {requested} of {total}")]
    SeekOutOfRange { requested: u64, total: u64 },

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Short write: {0}")]
    ShortWrite(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    // Codec library errors
    #[error("Image codec error: {0}")]
    Image(String),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    // General errors
    #[error("Configuration file error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if the stream is still usable after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SeekOutOfRange { .. } | Error::ShortRead { .. } | Error::ShortWrite(_)
        )
    }

    /// Check if this error comes from a format or geometry mismatch
    pub fn is_format_issue(&self) -> bool {
        matches!(
            self,
            Error::UnknownFormat(_) | Error::InvalidGeometry(_) | Error::IncompatibleFormat(_)
        )
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let seek = Error::SeekOutOfRange {
            requested: 10,
            total: 10,
        };
        assert!(seek.is_recoverable());
        assert!(!seek.is_format_issue());
        assert_eq!(seek.to_string(), "Seek out of range: frame 10 of 10");

        let fmt = Error::UnknownFormat("NV21".into());
        assert!(fmt.is_format_issue());
        assert!(!fmt.is_recoverable());
    }
}
