/// Core error types for postgen.
use std::path::PathBuf;

/// A specialized Result type for postgen operations.
pub type PostResult<T> = Result<T, PostError>;

/// Top-level error type shared by the render and delivery crates.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("unknown format: '{0}'")]
    UnknownFormat(String),

    #[error("asset error: {message} ({reference})")]
    Asset { message: String, reference: String },

    #[error("font error: {0}")]
    Font(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("delivery error: {message} ({file})")]
    Delivery { message: String, file: String },

    #[error("a post is already being generated")]
    Busy,

    #[error("config error: {message} ({path:?})")]
    Config { message: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PostError {
    /// Create an asset error for the given reference string.
    pub fn asset(message: impl Into<String>, reference: impl Into<String>) -> Self {
        PostError::Asset {
            message: message.into(),
            reference: reference.into(),
        }
    }

    /// Create a delivery error for a single output file.
    pub fn delivery(message: impl Into<String>, file: impl Into<String>) -> Self {
        PostError::Delivery {
            message: message.into(),
            file: file.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        PostError::Config {
            message: message.into(),
            path: path.into(),
        }
    }
}
