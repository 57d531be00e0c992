use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::ids::ActorId;
use crate::domain::ports::AuditStoreRef;
use chrono::Utc;
use serde_json::Value;

/// Appends one immutable record per state transition.
///
/// A failed append never undoes the transition it describes. It is logged at
/// `error` level with the full record so the gap in the trail can be repaired.
#[derive(Clone)]
pub struct AuditRecorder {
    store: AuditStoreRef,
}

impl AuditRecorder {
    pub fn new(store: AuditStoreRef) -> Self {
        Self { store }
    }

    /// Returns the appended record, or `None` if the store rejected it.
    pub async fn record(
        &self,
        actor: Option<&ActorId>,
        action: AuditAction,
        subject_table: &str,
        subject_id: impl ToString,
        payload: Value,
    ) -> Option<AuditRecord> {
        let record = AuditRecord::new(
            actor.cloned(),
            action,
            subject_table,
            subject_id,
            payload,
            Utc::now(),
        );

        match self.store.append(record.clone()).await {
            Ok(()) => {
                tracing::debug!(action = ?record.action, subject_id = %record.subject_id, "Audit record appended");
                Some(record)
            }
            Err(e) => {
                tracing::error!(error = %e, ?record, "Audit append failed; trail has a gap");
                None
            }
        }
    }
}
