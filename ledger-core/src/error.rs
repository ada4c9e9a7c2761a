//! Error types for the ledger core.

use thiserror::Error;

/// The single error kind produced by the ledger's validation pipeline,
/// plus the two kinds of infrastructure failure it can surface.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A transaction, header, or block failed a validation rule. The
    /// reason string is part of the observable contract: callers (and
    /// tests) match on it.
    #[error("{0}")]
    Invalid(String),

    /// A persisted document could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A base64 / base58check payload did not decode.
    #[error("bad encoding: {0}")]
    BadEncoding(String),
}

impl LedgerError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        LedgerError::Invalid(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
