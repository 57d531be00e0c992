use super::ids::{ActorId, AuditRecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of state transition recorded in the audit trail.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    PaymentReceived,
    PaymentFailed,
    RestockAlertCreated,
    RestockAlertAcknowledged,
    InventoryRestocked,
}

pub const TRANSACTIONS_TABLE: &str = "transactions";
pub const RESTOCK_ALERTS_TABLE: &str = "restock_alerts";
pub const PRODUCTS_TABLE: &str = "products";

/// An append-only snapshot of one state transition.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    /// `None` when the transition was triggered by the system (gateway callback, scan).
    pub actor_id: Option<ActorId>,
    pub action: AuditAction,
    pub subject_table: String,
    pub subject_id: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        actor_id: Option<ActorId>,
        action: AuditAction,
        subject_table: &str,
        subject_id: impl ToString,
        payload: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditRecordId::new(),
            actor_id,
            action,
            subject_table: subject_table.to_string(),
            subject_id: subject_id.to_string(),
            payload,
            created_at: now,
        }
    }
}
