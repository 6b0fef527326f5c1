//! Error taxonomy for the payment engine.
//!
//! Every error carries an [`ErrorCode`] classification. The mapping from
//! code to numeric code, HTTP status and retry class is total and static;
//! the tests enforce exhaustiveness.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable error classification, persisted on failed payments and carried
/// in completion notifications.
///
/// Numeric code ranges: payment 1xxx, account 2xxx, validation 3xxx,
/// system 5xxx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    PaymentNotFound,
    PaymentProcessingFailed,
    AccountNotFound,
    SenderAccountNotFound,
    ReceiverAccountNotFound,
    InsufficientBalance,
    SameAccount,
    ValidationError,
    InvalidAmount,
    InvalidCurrency,
    InternalError,
    ServiceUnavailable,
}

/// Retry classification for the saga's step runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Business or validation outcome - retrying cannot change it.
    Permanent,
    /// Infrastructure hiccup - safe to retry under a bounded policy.
    Transient,
}

impl ErrorCode {
    pub fn numeric_code(&self) -> u16 {
        match self {
            ErrorCode::PaymentNotFound => 1001,
            ErrorCode::PaymentProcessingFailed => 1003,
            ErrorCode::AccountNotFound => 2001,
            ErrorCode::SenderAccountNotFound => 2002,
            ErrorCode::ReceiverAccountNotFound => 2003,
            ErrorCode::InsufficientBalance => 2004,
            ErrorCode::SameAccount => 2005,
            ErrorCode::ValidationError => 3001,
            ErrorCode::InvalidAmount => 3002,
            ErrorCode::InvalidCurrency => 3003,
            ErrorCode::InternalError => 5001,
            ErrorCode::ServiceUnavailable => 5002,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PaymentNotFound => "PAYMENT_NOT_FOUND",
            ErrorCode::PaymentProcessingFailed => "PAYMENT_PROCESSING_FAILED",
            ErrorCode::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorCode::SenderAccountNotFound => "SENDER_ACCOUNT_NOT_FOUND",
            ErrorCode::ReceiverAccountNotFound => "RECEIVER_ACCOUNT_NOT_FOUND",
            ErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorCode::SameAccount => "SAME_ACCOUNT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidAmount => "INVALID_AMOUNT",
            ErrorCode::InvalidCurrency => "INVALID_CURRENCY",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAYMENT_NOT_FOUND" => Some(ErrorCode::PaymentNotFound),
            "PAYMENT_PROCESSING_FAILED" => Some(ErrorCode::PaymentProcessingFailed),
            "ACCOUNT_NOT_FOUND" => Some(ErrorCode::AccountNotFound),
            "SENDER_ACCOUNT_NOT_FOUND" => Some(ErrorCode::SenderAccountNotFound),
            "RECEIVER_ACCOUNT_NOT_FOUND" => Some(ErrorCode::ReceiverAccountNotFound),
            "INSUFFICIENT_BALANCE" => Some(ErrorCode::InsufficientBalance),
            "SAME_ACCOUNT" => Some(ErrorCode::SameAccount),
            "VALIDATION_ERROR" => Some(ErrorCode::ValidationError),
            "INVALID_AMOUNT" => Some(ErrorCode::InvalidAmount),
            "INVALID_CURRENCY" => Some(ErrorCode::InvalidCurrency),
            "INTERNAL_ERROR" => Some(ErrorCode::InternalError),
            "SERVICE_UNAVAILABLE" => Some(ErrorCode::ServiceUnavailable),
            _ => None,
        }
    }

    /// HTTP status suggestion for the (out-of-scope) API layer.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::PaymentNotFound | ErrorCode::AccountNotFound => 404,
            ErrorCode::SameAccount
            | ErrorCode::ValidationError
            | ErrorCode::InvalidAmount
            | ErrorCode::InvalidCurrency => 400,
            ErrorCode::SenderAccountNotFound
            | ErrorCode::ReceiverAccountNotFound
            | ErrorCode::InsufficientBalance => 422,
            ErrorCode::PaymentProcessingFailed | ErrorCode::InternalError => 500,
            ErrorCode::ServiceUnavailable => 503,
        }
    }

    pub fn retry_class(&self) -> RetryClass {
        match self {
            ErrorCode::ServiceUnavailable => RetryClass::Transient,
            ErrorCode::PaymentNotFound
            | ErrorCode::PaymentProcessingFailed
            | ErrorCode::AccountNotFound
            | ErrorCode::SenderAccountNotFound
            | ErrorCode::ReceiverAccountNotFound
            | ErrorCode::InsufficientBalance
            | ErrorCode::SameAccount
            | ErrorCode::ValidationError
            | ErrorCode::InvalidAmount
            | ErrorCode::InvalidCurrency
            | ErrorCode::InternalError => RetryClass::Permanent,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::parse(s).ok_or(())
    }
}

/// Payment engine error type.
///
/// Business failures (insufficient balance, missing accounts during a
/// transfer) are NOT expressed through this type at the executor boundary -
/// the executor returns them as a normal `TransferResult`. This type covers
/// validation rejected at intake, direct lookup misses, store/channel
/// failures and invariant violations.
#[derive(Error, Debug, Clone)]
pub enum PaymentError {
    // === Validation (rejected before any persistence) ===
    #[error("Sender and receiver cannot be the same account: {0}")]
    SameAccount(Uuid),

    #[error("Invalid payment amount: {0}. Amount must be greater than zero")]
    InvalidAmount(String),

    // === Not-found (synchronous lookups) ===
    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Sender account not found: {0}")]
    SenderAccountNotFound(Uuid),

    #[error("Receiver account not found: {0}")]
    ReceiverAccountNotFound(Uuid),

    // === Business (normally returned as a result, kept for direct callers) ===
    #[error("Account {account} has insufficient balance. Current: {balance}, Requested: {requested}")]
    InsufficientBalance {
        account: Uuid,
        balance: Decimal,
        requested: Decimal,
    },

    // === Invariant violations (fatal, not retried) ===
    #[error("Version conflict on account {0} - write bypassed the transfer path")]
    VersionConflict(Uuid),

    #[error("Invariant violation: {0}")]
    Internal(String),

    // === Transient infrastructure ===
    #[error("Store error: {0}")]
    Store(String),

    #[error("Message channel error: {0}")]
    Channel(String),

    #[error("Step '{step}' exhausted its retry budget after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        step: String,
        attempts: u32,
        last_error: String,
    },
}

impl PaymentError {
    /// Classification for status persistence and API mapping.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::SameAccount(_) => ErrorCode::SameAccount,
            PaymentError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            PaymentError::PaymentNotFound(_) => ErrorCode::PaymentNotFound,
            PaymentError::AccountNotFound(_) => ErrorCode::AccountNotFound,
            PaymentError::SenderAccountNotFound(_) => ErrorCode::SenderAccountNotFound,
            PaymentError::ReceiverAccountNotFound(_) => ErrorCode::ReceiverAccountNotFound,
            PaymentError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            PaymentError::VersionConflict(_) | PaymentError::Internal(_) => {
                ErrorCode::InternalError
            }
            PaymentError::Store(_)
            | PaymentError::Channel(_)
            | PaymentError::RetriesExhausted { .. } => ErrorCode::ServiceUnavailable,
        }
    }

    /// Whether the saga's step runner may retry after this error.
    pub fn retryable(&self) -> bool {
        self.code().retry_class() == RetryClass::Transient
    }
}

impl From<sqlx::Error> for PaymentError {
    fn from(e: sqlx::Error) -> Self {
        PaymentError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(e: serde_json::Error) -> Self {
        PaymentError::Internal(format!("serialization failed: {}", e))
    }
}
