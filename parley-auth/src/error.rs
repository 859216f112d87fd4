//! Auth error types

use crate::forms::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Input failed local validation; nothing was sent
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),

    /// The gateway answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The gateway answered 2xx but without a token
    #[error("Auth gateway response did not include a token")]
    MissingToken,

    /// The gateway answered with an unexpected body
    #[error("Invalid auth gateway response: {0}")]
    InvalidResponse(String),

    /// The request never completed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Persisting or reading the session failed
    #[error(transparent)]
    Storage(#[from] parley_core::Error),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Http(e.to_string())
    }
}
