use sluice_buffer::BufferError;
use thiserror::Error;

/// Session-level error taxonomy.
///
/// Every variant maps onto a stable numeric code through [`SessionError::code`]
/// so FFI hosts can route errors without string matching.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid parameter")]
    InvalidParam,

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unsupported format: {0}")]
    InvalidFormat(String),

    #[error("end of stream")]
    Eof,

    #[error("frame precedes seek target")]
    OldFrame,

    #[error(transparent)]
    FifoFull(#[from] BufferError),

    #[error("stream is encrypted and playback is not authorized")]
    AuthorizationFailed,

    #[error("engine error: {0}")]
    Engine(String),
}

impl SessionError {
    /// Stable numeric code for the FFI edge. Positive values are returned
    /// negated by the wasm bridge.
    pub fn code(&self) -> i32 {
        match self {
            SessionError::InvalidParam => 1,
            SessionError::InvalidState(_) => 2,
            SessionError::InvalidData(_) => 3,
            SessionError::InvalidFormat(_) => 4,
            SessionError::Eof => 7,
            SessionError::Engine(_) => 8,
            SessionError::OldFrame => 9,
            SessionError::FifoFull(_) => 10,
            SessionError::AuthorizationFailed => 100,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
