use thiserror::Error;

/// Errors produced by the mockcb callback client.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Opening or closing the transport failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Illegal callback binding (response and forward are exclusive).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server-issued client identifier could not be obtained.
    #[error("registration error: {0}")]
    Registration(String),

    /// An inbound frame was unsupported or could not be dispatched.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CallbackError {
    fn from(e: serde_json::Error) -> Self {
        CallbackError::Codec(e.to_string())
    }
}

pub type CbResult<T> = Result<T, CallbackError>;
