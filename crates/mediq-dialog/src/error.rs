use thiserror::Error;

/// Errors surfaced by the dialogue layer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DialogError {
    /// The incoming message was empty or whitespace.
    #[error("Empty message")]
    EmptyMessage,

    /// The incoming message exceeded the configured length limit.
    #[error("Message too long: {0} characters")]
    MessageTooLong(usize),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(String),

    /// Language-understanding failure.
    #[error("Language understanding error: {0}")]
    Nlu(String),

    /// Retrieval backend failure.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Booking store or slot validation failure.
    #[error("Booking error: {0}")]
    Booking(String),

    /// Error bubbled up from a core component.
    #[error(transparent)]
    Core(#[from] mediq_core::MediqError),
}

pub type Result<T> = std::result::Result<T, DialogError>;
