use thiserror::Error;

/// Failures reported by the persistence, search, and completion boundaries.
/// The engine never retries these; the next keystroke or query does.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("note not found: {0}")]
    NotFound(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
    #[error("completion service returned no text")]
    EmptyCompletion,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Transport(e.to_string())
    }
}

/// Errors returned from engine operations whose outcome the UI shell needs.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no note with id {0} in the note list")]
    UnknownNote(String),
    #[error("no note is being edited")]
    NoActiveNote,
    #[error(transparent)]
    Backend(#[from] BackendError),
}
