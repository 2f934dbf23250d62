use std::fmt;

/// Result type for nodehealth-types operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A status string did not start with a known verdict
    InvalidStatus(String),

    /// A `host:interface` key could not be split
    InvalidKey(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidStatus(s) => write!(f, "Invalid status: '{}'", s),
            Error::InvalidKey(s) => write!(f, "Invalid link key: '{}'", s),
        }
    }
}

impl std::error::Error for Error {}
