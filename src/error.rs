use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Message shown to the voter whenever the backend could not be reached or
/// answered with something we could not make sense of. Transport details are
/// logged, never displayed.
pub const CONNECTIVITY_MESSAGE: &str = "Error connecting to server";

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected locally; no request is ever dispatched for these.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The backend was reachable and refused the request, with a reason.
    #[error("rejected by server: {0}")]
    Rejection(String),
    /// The backend was unreachable, or its response was not parseable.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl Error {
    /// The text to surface to the voter. Server-provided reasons are shown
    /// verbatim; transport failures collapse into a generic message.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(msg) | Self::Rejection(msg) => msg,
            Self::Transport(_) => CONNECTIVITY_MESSAGE,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
