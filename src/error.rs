//! Error types and the related `Result<T>`

use thiserror::Error;

pub type ZipFsResult<T> = Result<T, ZipFsError>;

#[derive(Debug, Error)]
pub enum ZipFsError {
    /// An error from underlying I/O, including host-filesystem fallbacks.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record signature didn't match, or a record was malformed.
    #[error("Invalid ZIP archive: {0}")]
    Format(&'static str),

    /// The entry uses a compression method other than stored or deflate.
    #[error("Unsupported compression method: {0}")]
    UnsupportedMethod(u16),

    /// A positioned read returned fewer bytes than requested.
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// No entry in the archive with this path
    #[error("No entry in the archive with the path {0}")]
    NotFound(String),

    /// The archive handle was closed.
    #[error("Archive is closed")]
    Closed,

    /// Requested text, but the entry isn't valid UTF-8.
    #[error("Invalid UTF-8 in entry contents")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// A `package.json` inside the archive failed to parse.
    #[error("Error parsing {path}: {source}")]
    InvalidPackage {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A blocking read worker didn't complete.
    #[error("Read task failed: {0}")]
    Task(String),
}

impl ZipFsError {
    /// True for a missing archive entry and for a host-filesystem NotFound.
    pub fn is_not_found(&self) -> bool {
        match self {
            ZipFsError::NotFound(_) => true,
            ZipFsError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for ZipFsError {
    fn from(e: tokio::task::JoinError) -> Self {
        ZipFsError::Task(e.to_string())
    }
}
