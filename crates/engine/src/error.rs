//! Error types for discovery and driver operations.

use std::path::PathBuf;

use quench_pack::PackError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while discovering extensions or driving tests.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A caller-supplied argument was missing or malformed.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// An addons manifest contains an entry that is not a usable path.
    #[error("invalid entry in {file} at line {line}: {text}")]
    ManifestEntry {
        file: String,
        line: usize,
        text: String,
    },

    /// Two hosts declared an extension point at the same path.
    #[error("extension point path '{0}' is already in use")]
    DuplicateExtensionPoint(String),

    /// An extension named a point path nothing has registered.
    #[error(
        "extension '{entry}' in {} names unknown extension point '{path}'",
        .pack.display()
    )]
    UnknownExtensionPath {
        pack: PathBuf,
        entry: String,
        path: String,
    },

    /// An extension declared no path and no capability any point accepts.
    #[error(
        "extension '{entry}' in {} matches no extension point; declare a path or a known capability",
        .pack.display()
    )]
    UnmatchedCapability { pack: PathBuf, entry: String },

    /// The runner itself executes on a target that cannot load extensions.
    #[error("a runner targeting '{runner}' cannot load extensions")]
    UnsupportedRunnerTarget { runner: String },

    /// An explicitly named candidate targets a runtime this runner rejects.
    #[error(
        "extension {} targets '{target}', which a '{runner}' runner cannot load",
        .path.display()
    )]
    IncompatibleTarget {
        path: PathBuf,
        runner: String,
        target: String,
    },

    /// An explicitly named candidate could not be read as a pack.
    #[error("failed to load extension candidate {}", .path.display())]
    CandidateLoad {
        path: PathBuf,
        #[source]
        source: PackError,
    },

    /// The requested runtime cannot run the pack's declared target.
    #[error("requested runtime '{requested}' cannot run a pack targeting '{declared}'")]
    RuntimeMismatch { requested: String, declared: String },

    /// A controller process could not be located or started.
    #[error("cannot start controller {}: {reason}", .path.display())]
    ControllerStart { path: PathBuf, reason: String },

    /// The controller ran an operation and reported failure.
    #[error("controller failed during {operation}: {message}")]
    Controller { operation: String, message: String },

    /// The controller does not implement the requested operation; the
    /// referenced framework does not match the driver's expectations.
    #[error("controller does not implement '{operation}'")]
    MissingOperation { operation: String },

    /// A driver operation was called before a successful load.
    #[error("driver '{id}' has no test pack loaded")]
    NotLoaded { id: String },

    /// Load was called twice on the same driver.
    #[error("driver '{id}' has already loaded a test pack")]
    AlreadyLoaded { id: String },

    /// The controller sent something the protocol does not allow.
    #[error("controller protocol violation: {0}")]
    Protocol(String),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
