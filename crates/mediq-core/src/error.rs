use thiserror::Error;

/// Top-level error type for the Mediq system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for MediqError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MediqError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Booking error: {0}")]
    Booking(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MediqError {
    fn from(err: toml::de::Error) -> Self {
        MediqError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MediqError {
    fn from(err: toml::ser::Error) -> Self {
        MediqError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MediqError {
    fn from(err: serde_json::Error) -> Self {
        MediqError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Mediq operations.
pub type Result<T> = std::result::Result<T, MediqError>;
