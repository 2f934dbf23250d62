use std::fmt;

/// Result type for nodehealth-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Provider layer error
    Provider(nodehealth_providers::Error),

    /// Core layer error (host lists, process plumbing)
    Core(nodehealth_core::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Report JSON could not be read or written
    Json(serde_json::Error),

    /// Report CSV could not be read or written
    Csv(csv::Error),

    /// Configuration error
    Config(String),

    /// Input that cannot be acted on (empty host list, unreadable report)
    InvalidInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Provider(err) => write!(f, "Provider error: {}", err),
            Error::Core(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Csv(err) => write!(f, "CSV error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Provider(err) => Some(err),
            Error::Core(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Csv(err) => Some(err),
            Error::Config(_) | Error::InvalidInput(_) => None,
        }
    }
}

impl From<nodehealth_providers::Error> for Error {
    fn from(err: nodehealth_providers::Error) -> Self {
        Error::Provider(err)
    }
}

impl From<nodehealth_core::Error> for Error {
    fn from(err: nodehealth_core::Error) -> Self {
        Error::Core(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
