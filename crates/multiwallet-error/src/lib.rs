//! # Multiwallet Error
//!
//! Unified error types for the multiwallet chain-connection and balance core.
//!
//! ## Error Categories
//!
//! - [`CoreError`] - Top-level error type
//! - [`ParseError`] - Malformed numeric input handed to the balance normalizer
//!
//! Connectivity problems never surface through the connection tracker's
//! public API: adapters absorb them and report a `DISCONNECTED` status
//! instead. [`CoreError::Connectivity`] and [`CoreError::ConnectTimeout`]
//! are only returned at the adapter boundary and by an explicit connect.
//!
//! ## Example
//!
//! ```
//! use multiwallet_error::{CoreError, ParseError, Result};
//!
//! fn parse_free(raw: &str) -> Result<u128> {
//!     raw.parse::<u128>()
//!         .map_err(|e| ParseError::new("free", raw, e.to_string()).into())
//! }
//!
//! assert!(parse_free("100").is_ok());
//! assert!(matches!(parse_free("1x"), Err(CoreError::Parse(_))));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use thiserror::Error;

/// A numeric field could not be parsed.
///
/// Callers must be able to tell "zero balance" apart from "corrupt data", so
/// a malformed amount is never coerced to zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("Invalid {field} value '{value}': {reason}")]
pub struct ParseError {
    /// Name of the offending field (e.g. `free`, `miscFrozen`)
    pub field: String,
    /// The raw input as received
    pub value: String,
    /// Why it was rejected
    pub reason: String,
}

impl ParseError {
    /// Creates a new parse error
    pub fn new(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// The main error type for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ============ Balance Errors ============
    /// Malformed numeric input
    #[error(transparent)]
    Parse(#[from] ParseError),

    // ============ Chain Errors ============
    /// Low-level connect/reconnect failure at the adapter boundary
    #[error("Connection to {chain} failed: {reason}")]
    Connectivity {
        /// Chain slug
        chain: String,
        /// Error reason
        reason: String,
    },

    /// Waiting for an adapter to become ready took too long
    #[error("Connection to {chain} timed out after {millis}ms")]
    ConnectTimeout {
        /// Chain slug
        chain: String,
        /// Timeout that elapsed
        millis: u64,
    },

    /// No adapter registered for the chain
    #[error("Chain not found: {0}")]
    ChainNotFound(String),

    /// Chain is administratively disabled
    #[error("Chain is inactive: {0}")]
    ChainInactive(String),

    // ============ Service Errors ============
    /// Operation not valid in the current lifecycle state
    #[error("Invalid service state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ============ Parsing/IO Errors ============
    /// JSON parse error
    #[error("JSON error: {0}")]
    JsonError(String),

    /// File IO error
    #[error("IO error: {0}")]
    IoError(String),

    // ============ Generic ============
    /// Unknown/other error
    #[error("{0}")]
    Other(String),

    /// Wrapped error from external source
    #[error("External error: {message}")]
    External {
        /// Error message
        message: String,
    },
}

/// Convenient Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Adds context to an error
    fn context(self, ctx: impl Into<String>) -> Result<T>;

    /// Adds context using a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| CoreError::External {
            message: format!("{}: {}", ctx.into(), e),
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| CoreError::External {
            message: format!("{}: {}", f(), e),
        })
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| CoreError::Other(ctx.into()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| CoreError::Other(f()))
    }
}

// ============ From implementations for common error types ============

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::JsonError(err.to_string())
    }
}

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// Unknown error
    Unknown = 0,
    /// Malformed numeric input
    Parse = 1001,
    /// Adapter connectivity failure
    Connectivity = 2001,
    /// Adapter readiness timeout
    ConnectTimeout = 2002,
    /// Chain not registered
    ChainNotFound = 2003,
    /// Chain disabled
    ChainInactive = 2004,
    /// Invalid lifecycle state
    InvalidState = 3001,
    /// Bad configuration
    Config = 3002,
}

impl CoreError {
    /// Returns the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Parse(_) => ErrorCode::Parse,
            CoreError::Connectivity { .. } => ErrorCode::Connectivity,
            CoreError::ConnectTimeout { .. } => ErrorCode::ConnectTimeout,
            CoreError::ChainNotFound(_) => ErrorCode::ChainNotFound,
            CoreError::ChainInactive(_) => ErrorCode::ChainInactive,
            CoreError::InvalidState(_) => ErrorCode::InvalidState,
            CoreError::ConfigError(_) => ErrorCode::Config,
            _ => ErrorCode::Unknown,
        }
    }

    /// Returns true if this error is transient and worth retrying.
    ///
    /// Parse errors are caller bugs and never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Connectivity { .. } | CoreError::ConnectTimeout { .. }
        )
    }
}
