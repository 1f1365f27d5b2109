//! Error types for the doula ledger
//!
//! Every failure surfaced to a caller is a [`LedgerError`]. Validation
//! failures are always raised before any write happens.
//!
//! # Error Categories
//!
//! - **Lookup Errors**: missing transaction, installment, client
//! - **Validation Errors**: malformed or non-positive amounts, empty messages
//! - **File I/O and CSV Errors**: journal and report files
//! - **Identity Errors**: rejected credentials, role not allowed for a portal
//! - **Delivery Errors**: push endpoint failures

use thiserror::Error;

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record ("transaction", "installment", "client", ...)
        entity: String,
        /// Identifier as given by the caller
        id: String,
    },

    /// Caller input was rejected before any write
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// Offending input field
        field: String,
        /// Human readable reason
        message: String,
    },

    /// Installment rows already exist for the transaction
    #[error("Transaction {tx} already has installment rows")]
    AlreadyProvisioned {
        /// Transaction ID
        tx: u32,
    },

    /// A transaction with this id was already recorded
    #[error("Duplicate transaction ID {tx}")]
    DuplicateTransaction {
        /// Transaction ID
        tx: u32,
    },

    /// I/O error while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// The auth provider rejected the credentials or the role is not allowed
    #[error("Authentication failed: {message}")]
    Auth {
        /// Description of the failure
        message: String,
    },

    /// A push endpoint could not be reached
    #[error("Delivery to {endpoint} failed: {message}")]
    Delivery {
        /// Subscription endpoint
        endpoint: String,
        /// Description of the failure
        message: String,
    },

    /// A branding color is not a `#rrggbb` value
    #[error("Invalid color '{value}'")]
    InvalidColor {
        /// The rejected input
        value: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::ParseError {
            line: Some(error.line() as u64),
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Create a NotFound error
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Create a NotFound error for a transaction
    pub fn transaction_not_found(tx: impl ToString) -> Self {
        Self::not_found("transaction", tx)
    }

    /// Create a NotFound error for an installment
    pub fn installment_not_found(id: impl ToString) -> Self {
        Self::not_found("installment", id)
    }

    /// Create a Validation error
    pub fn validation(field: &str, message: &str) -> Self {
        LedgerError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an AlreadyProvisioned error
    pub fn already_provisioned(tx: u32) -> Self {
        LedgerError::AlreadyProvisioned { tx }
    }

    /// Create a DuplicateTransaction error
    pub fn duplicate_transaction(tx: u32) -> Self {
        LedgerError::DuplicateTransaction { tx }
    }

    /// Create an Auth error
    pub fn auth(message: &str) -> Self {
        LedgerError::Auth {
            message: message.to_string(),
        }
    }

    /// Create a Delivery error
    pub fn delivery(endpoint: &str, message: &str) -> Self {
        LedgerError::Delivery {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an InvalidColor error
    pub fn invalid_color(value: &str) -> Self {
        LedgerError::InvalidColor {
            value: value.to_string(),
        }
    }

    /// Whether the error was raised by input validation
    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation { .. })
    }
}
