use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Adapter credentials or URL were not supplied at startup.
    AdapterNotInitialized,
    /// Fewer positional arguments than the command requires.
    MissingArgument,
    /// A numeric argument could not be parsed.
    InvalidArgumentFormat,
    /// An external binary is not resolvable on the search path.
    ToolNotFound,
    /// Non-success HTTP status, network error or failed subprocess.
    ExternalCallFailure,
    /// Malformed JSON from an external tool or a history file.
    ParseFailure,
    TimeoutError,
    Cancelled,
    ValidationError,
    IoError,
    InternalError,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
    Debug,
}
