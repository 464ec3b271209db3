//! Error types for public key reconciliation.
//!
//! The `Display` output of every variant is the message surfaced to the
//! caller, so tests and automation match on it directly.

use thiserror::Error;

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum Error {
    /// The target system cannot be driven over REST, or is too old.
    #[error("{0}")]
    Capability(String),

    /// Caller supplied an incomplete or inconsistent desired state.
    #[error("{0}")]
    Validation(String),

    /// More than one key exists and nothing selects a single one.
    #[error("Error: index is required as more than one public_key exists for user account {account}.{hint}")]
    Ambiguous { account: String, hint: &'static str },

    /// A request failed; `method` names the phase that issued it.
    #[error("Error in {method}: {message}")]
    Rest {
        method: &'static str,
        message: String,
    },

    /// Internal contract broken, e.g. an empty or unsupported modify.
    #[error("Error: {0}")]
    Invariant(String),
}

impl Error {
    pub fn rest(method: &'static str, message: impl Into<String>) -> Self {
        Error::Rest {
            method,
            message: message.into(),
        }
    }

    /// Message reported to the caller in the `msg` field.
    pub fn msg(&self) -> String {
        self.to_string()
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
