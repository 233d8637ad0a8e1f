#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::types::{CallId, Shortfall, UserId};
use thiserror::Error;

/// Error code constants for type-safe error handling
pub mod code {
    pub const CLI_ERROR: &str = "CLI_ERROR";
    pub const EXISTS: &str = "EXISTS";
    pub const NOTFOUND: &str = "NOTFOUND";
    pub const INVALID: &str = "INVALID";
    pub const CONFLICT: &str = "CONFLICT";
    pub const PAYMENT_REQUIRED: &str = "PAYMENT_REQUIRED";
    pub const DEPENDENCY: &str = "DEPENDENCY";
    pub const INTERNAL: &str = "INTERNAL";
}

/// SQLSTATE values Postgres uses for contention that a retry can resolve.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Wallet not found for user {user_id}")]
    WalletNotFound { user_id: UserId },

    #[error("Usage already recorded for call {call_id}")]
    AlreadyRecorded { call_id: CallId },

    #[error(
        "Insufficient balance: balance {}, required {}, shortfall {}",
        .0.balance,
        .0.required,
        .0.shortfall
    )]
    InsufficientBalance(Shortfall),

    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Classifies a driver error, turning lock contention into `StorageConflict`.
    #[must_use]
    pub fn from_db(context: &str, error: &sqlx::Error) -> Self {
        let contention = error
            .as_database_error()
            .and_then(|db_error| db_error.code())
            .is_some_and(|state| state == SERIALIZATION_FAILURE || state == DEADLOCK_DETECTED);

        if contention {
            Self::StorageConflict(format!("{context}: {error}"))
        } else {
            Self::DatabaseError(format!("{context}: {error}"))
        }
    }

    /// Returns the protocol error code for this error
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::WalletNotFound { .. } => code::NOTFOUND,
            Self::AlreadyRecorded { .. } => code::EXISTS,
            Self::InsufficientBalance(_) => code::PAYMENT_REQUIRED,
            Self::StorageConflict(_) => code::CONFLICT,
            Self::InvalidAmount(_)
            | Self::InvalidInput(_)
            | Self::ConfigError(_)
            | Self::SerializationError(_) => code::INVALID,
            Self::IoError(_) => code::DEPENDENCY,
            Self::DatabaseError(_) | Self::SqlxError(_) | Self::Internal(_) => code::INTERNAL,
        }
    }

    /// Returns the exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError(_) => 2,
            Self::DatabaseError(_) | Self::SqlxError(_) => 3,
            Self::WalletNotFound { .. } => 4,
            Self::InsufficientBalance(_) => 5,
            Self::StorageConflict(_) => 6,
            Self::IoError(_) => 7,
            Self::SerializationError(_) | Self::InvalidAmount(_) | Self::InvalidInput(_) => 8,
            Self::AlreadyRecorded { .. } => 0,
            Self::Internal(_) => 9,
        }
    }

    /// Duplicate deliveries are success-equivalent for callers.
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyRecorded { .. })
    }

    /// Safe to retry with the same idempotency key.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageConflict(_))
    }
}

/// Protocol error codes as documented in the CLI
pub const ERROR_CODES: &[(&str, &str, &str)] = &[
    (
        code::CLI_ERROR,
        "Invalid CLI usage",
        "Run 'ledger --help' for valid options",
    ),
    (
        code::EXISTS,
        "Event was already applied",
        "No action needed; the original result stands",
    ),
    (
        code::NOTFOUND,
        "Wallet was not found",
        "Open the wallet first or verify the user identifier",
    ),
    (
        code::INVALID,
        "Invalid request payload",
        "Check amounts are positive and all required fields are present",
    ),
    (
        code::CONFLICT,
        "Concurrent write contention",
        "Retry with the same payment reference or call id",
    ),
    (
        code::PAYMENT_REQUIRED,
        "Balance does not cover the charge",
        "Top up the wallet by at least the reported shortfall",
    ),
    (
        code::DEPENDENCY,
        "Missing file or system dependency",
        "Verify the path and permissions, then retry",
    ),
    (
        code::INTERNAL,
        "Unexpected internal failure",
        "Inspect logs and retry command",
    ),
];

/// Get error code details (description and fix) for a given error code
#[must_use]
pub fn get_error_info(error_code: &str) -> Option<(&'static str, &'static str)> {
    ERROR_CODES
        .iter()
        .find(|(code, _, _)| *code == error_code)
        .map(|(_, desc, fix)| (*desc, *fix))
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::{code, get_error_info, LedgerError};
    use crate::types::{CallId, Shortfall, UserId};
    use rust_decimal_macros::dec;

    #[test]
    fn insufficient_balance_message_carries_shortfall_detail() {
        let error = LedgerError::InsufficientBalance(Shortfall::new(dec!(0.05), dec!(0.10)));

        assert_eq!(
            error.to_string(),
            "Insufficient balance: balance 0.05, required 0.10, shortfall 0.05"
        );
        assert_eq!(error.code(), code::PAYMENT_REQUIRED);
    }

    #[test]
    fn already_recorded_is_benign_and_exits_cleanly() {
        let error = LedgerError::AlreadyRecorded {
            call_id: CallId::new("call-1"),
        };

        assert!(error.is_benign());
        assert!(!error.is_retryable());
        assert_eq!(error.exit_code(), 0);
    }

    #[test]
    fn only_storage_conflicts_are_retryable() {
        assert!(LedgerError::StorageConflict("busy".to_string()).is_retryable());
        assert!(!LedgerError::WalletNotFound {
            user_id: UserId::new("u")
        }
        .is_retryable());
        assert!(!LedgerError::DatabaseError("down".to_string()).is_retryable());
    }

    #[test]
    fn plain_driver_errors_stay_database_errors() {
        let error = LedgerError::from_db("Failed to lock wallet", &sqlx::Error::RowNotFound);

        assert!(matches!(error, LedgerError::DatabaseError(_)));
        assert!(error.to_string().contains("Failed to lock wallet"));
    }

    #[test]
    fn every_error_code_is_documented() {
        let errors = [
            LedgerError::WalletNotFound {
                user_id: UserId::new("u"),
            },
            LedgerError::StorageConflict("x".to_string()),
            LedgerError::InvalidAmount("x".to_string()),
            LedgerError::IoError(std::io::Error::other("x")),
            LedgerError::Internal("x".to_string()),
        ];

        for error in errors {
            assert!(
                get_error_info(error.code()).is_some(),
                "missing docs for {}",
                error.code()
            );
        }
    }
}
