//! Error taxonomy shared by the API client and the session controller.

use thiserror::Error;

/// A failed API call, normalised by the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Network failure, non-JSON response, or HTTP-level failure without a
    /// JSON body. Carries the raw body text or `HTTP <status>`.
    #[error("{0}")]
    Transport(String),
    /// The response declared `application/json` but did not parse.
    #[error("server response is invalid (corrupted JSON)")]
    Malformed,
    /// The server answered with an error; carries its message.
    #[error("{0}")]
    Server(String),
}

/// Why a mode invariant rejected an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The action needs a selected log.
    NoSelection,
    /// The selected log is compressed.
    Compressed,
    /// Live mode cannot coexist with a search query.
    SearchActive,
    /// Search-all needs a query.
    EmptyQuery,
    /// Download is only offered for compressed logs.
    NotCompressed,
}

/// Every error the session controller can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response")]
    Malformed,
    #[error("server error: {0}")]
    Server(String),
    /// An update/installation is in progress.
    #[error("busy: an update is in progress")]
    Busy,
    /// The referenced log id is not in the catalog.
    #[error("log not found: {0}")]
    NotFound(String),
    #[error("rejected: {0:?}")]
    Guarded(Guard),
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(msg) => SessionError::Transport(msg),
            ApiError::Malformed => SessionError::Malformed,
            ApiError::Server(msg) => SessionError::Server(msg),
        }
    }
}
