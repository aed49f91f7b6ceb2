//! Error types for pack reading and writing.

use std::path::PathBuf;

/// Result type alias for pack operations.
pub type Result<T> = std::result::Result<T, PackError>;

/// Errors raised while reading or writing test pack artifacts.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// The file does not begin with the pack magic bytes.
    #[error("{}: not a test pack (bad magic)", .path.display())]
    BadMagic { path: PathBuf },

    /// The container format is newer than this library understands.
    #[error("{}: unsupported pack format version {version}", .path.display())]
    UnsupportedFormat { path: PathBuf, version: u16 },

    /// The header frame is truncated, oversized, or not valid UTF-8.
    #[error("{}: malformed header: {reason}", .path.display())]
    MalformedHeader { path: PathBuf, reason: String },

    /// The header TOML failed to parse.
    #[error("{}: invalid header", .path.display())]
    InvalidHeader {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    /// The header parsed but breaks a structural rule.
    #[error("{}: invalid header: {reason}", .path.display())]
    HeaderRule { path: PathBuf, reason: String },

    /// A runtime target string could not be parsed.
    #[error("invalid runtime target '{value}'")]
    InvalidTarget { value: String },

    /// Header serialization failed while building a pack.
    #[error("failed to serialize pack header")]
    Serialize(#[from] toml::ser::Error),

    /// The payload is only available when the pack was opened from disk.
    #[error("{}: payload is not available for a pack read from a stream", .path.display())]
    PayloadUnavailable { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
