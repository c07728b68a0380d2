//! Error types for the croupier session engine
//!
//! Every core operation returns one of these recoverable conditions to the
//! caller; none of them should crash the process.

use thiserror::Error;

/// Root error type for all engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// The scope already holds a non-terminal session
    #[error("scope already has an active session")]
    Busy,

    /// The wager exceeds the account balance
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// An action or timer arrived for a resolved/absent session
    #[error("no active session for this scope")]
    NoActiveSession,

    /// Non-positive or out-of-bounds wager, rejected before any mutation
    #[error("invalid wager: {0}")]
    InvalidWager(u64),

    /// The action does not apply to the session's kind or current payload
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// The actor is not allowed to perform this action on this session
    #[error("not eligible: {0}")]
    Ineligible(String),

    /// Daily bonus claimed again inside the cooldown window
    #[error("daily bonus on cooldown: {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },

    /// Ledger write failed; the operation is not committed
    #[error("ledger persistence failed: {0}")]
    Persistence(String),
}

impl From<rocksdb::Error> for EngineError {
    fn from(e: rocksdb::Error) -> Self {
        EngineError::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Persistence(e.to_string())
    }
}

impl From<bincode::Error> for EngineError {
    fn from(e: bincode::Error) -> Self {
        EngineError::Persistence(e.to_string())
    }
}

/// Convenience alias for engine results
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::InsufficientFunds {
            needed: 100,
            available: 40,
        };
        assert!(err.to_string().contains("need 100"));
        assert!(err.to_string().contains("have 40"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EngineError = io.into();
        match err {
            EngineError::Persistence(msg) => assert!(msg.contains("denied")),
            _ => panic!("expected persistence error"),
        }
    }
}
