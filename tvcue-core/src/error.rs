#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cancelled")]
    Cancelled,
    #[error("Transport error: {0}")]
    Transport(TransportError),
    #[error("Malformed response: {0}")]
    MalformedResponse(serde_json::Error),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(url::ParseError),
    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl Error {
    /// Returns `true` if the error is an expected outcome of a superseded or
    /// aborted request.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("{0}")]
    Reqwest(reqwest::Error),
    // Used by stubs and by callers that only have a message.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Transport(TransportError::Status(status.as_u16())),
            None => Self::Transport(TransportError::Reqwest(err)),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidIdentifier(err)
    }
}
