//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror. A missing key is never an
//! error: lookups report it as an empty result.

use serde::Serialize;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its reference host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is empty or longer than the engine's key limit
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Stored value was requested as a different type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Policy configuration rejected at engine construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Session name is empty
    #[error("Invalid session name: {0}")]
    InvalidSession(String),

    /// No session is open under the given name
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// Host command line could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

impl CacheError {
    // == Error Code ==
    /// Stable machine-readable code, used by the host protocol.
    pub fn code(&self) -> ErrorCode {
        match self {
            CacheError::InvalidKey(_) => ErrorCode::InvalidKey,
            CacheError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            CacheError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            CacheError::InvalidSession(_) => ErrorCode::InvalidSession,
            CacheError::UnknownSession(_) => ErrorCode::UnknownSession,
            CacheError::InvalidCommand(_) => ErrorCode::InvalidCommand,
        }
    }
}

/// Serializable discriminant of [`CacheError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidKey,
    TypeMismatch,
    InvalidConfig,
    InvalidSession,
    UnknownSession,
    InvalidCommand,
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
