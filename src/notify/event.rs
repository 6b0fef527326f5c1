//! Completion notification payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::ledger::AccountId;
use crate::money::format_amount;
use crate::payment::{Payment, PaymentId, PaymentStatus};

/// Event published when a payment reaches a terminal state.
///
/// The amount travels as a plain decimal string so consumers are never
/// exposed to float rounding or exponent notation. Field names are
/// camelCase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    pub payment_id: PaymentId,
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    pub amount: String,
    pub currency: String,
    pub status: PaymentStatus,
    pub error_code: Option<ErrorCode>,
    pub numeric_error_code: Option<u16>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PaymentNotification {
    pub fn from_payment(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            sender_account_id: payment.sender_account_id,
            receiver_account_id: payment.receiver_account_id,
            amount: format_amount(&payment.amount),
            currency: payment.currency.clone(),
            status: payment.status,
            error_code: payment.error_code,
            numeric_error_code: payment.error_code.map(|c| c.numeric_code()),
            error_message: payment.error_message.clone(),
            timestamp: Utc::now(),
        }
    }
}
