use super::ids::{ActorId, CorrelationId, TransactionId};
use super::money::Amount;
use super::phone::PayerPhone;
use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gateway result code meaning the payer approved the charge.
pub const RESULT_CODE_SUCCESS: i64 = 0;

const DEFAULT_FAILURE_REASON: &str = "Payment failed";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome reported for a push payment, by callback or by poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded { receipt_id: Option<String> },
    Failed { reason: String },
}

impl PaymentOutcome {
    /// Maps a gateway result code: `0` succeeds, any other code fails.
    pub fn from_result_code(
        result_code: i64,
        receipt_id: Option<String>,
        failure_reason: Option<String>,
    ) -> Self {
        if result_code == RESULT_CODE_SUCCESS {
            PaymentOutcome::Succeeded { receipt_id }
        } else {
            let reason = failure_reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string());
            PaymentOutcome::Failed { reason }
        }
    }

    pub fn status(&self) -> TransactionStatus {
        match self {
            PaymentOutcome::Succeeded { .. } => TransactionStatus::Completed,
            PaymentOutcome::Failed { .. } => TransactionStatus::Failed,
        }
    }
}

/// A push-payment transaction awaiting (or holding) its gateway outcome.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub correlation_id: CorrelationId,
    pub amount: Amount,
    pub payer_reference: PayerPhone,
    pub account_reference: String,
    pub description: String,
    pub initiated_by: Option<ActorId>,
    pub status: TransactionStatus,
    pub receipt_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn pending(
        correlation_id: CorrelationId,
        amount: Amount,
        payer_reference: PayerPhone,
        account_reference: impl Into<String>,
        description: impl Into<String>,
        initiated_by: Option<ActorId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            correlation_id,
            amount,
            payer_reference,
            account_reference: account_reference.into(),
            description: description.into(),
            initiated_by,
            status: TransactionStatus::Pending,
            receipt_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a gateway outcome. Only a pending transaction may be resolved;
    /// a terminal one is left untouched and `InvalidState` is returned.
    pub fn resolve(&mut self, outcome: PaymentOutcome, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if self.status.is_terminal() {
            return Err(ServiceError::invalid_state(format!(
                "transaction {} is already {}",
                self.correlation_id, self.status
            )));
        }

        self.status = outcome.status();
        match outcome {
            PaymentOutcome::Succeeded { receipt_id } => self.receipt_id = receipt_id,
            PaymentOutcome::Failed { reason } => self.failure_reason = Some(reason),
        }
        self.updated_at = now;
        Ok(())
    }
}
