use super::audit::AuditRecorder;
use crate::domain::audit::{AuditAction, TRANSACTIONS_TABLE};
use crate::domain::gateway::{GatewayCredentials, QueryOutcome, StatusQuery};
use crate::domain::ids::{ActorId, CorrelationId};
use crate::domain::ports::{CasOutcome, PaymentGatewayRef, TransactionStoreRef};
use crate::domain::transaction::{PaymentOutcome, Transaction, TransactionStatus};
use crate::error::{Result, ServiceError};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;

/// Which signal reported the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Callback,
    Poll,
}

/// Final state of a reconciliation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub status: TransactionStatus,
    pub transaction: Transaction,
    /// `false` when the call was an idempotent replay, or lost a race to
    /// another signal for the same transaction.
    pub applied: bool,
}

impl Reconciliation {
    fn unchanged(transaction: Transaction) -> Self {
        Self {
            status: transaction.status,
            transaction,
            applied: false,
        }
    }
}

/// Single authority moving transactions out of `pending`.
///
/// Callbacks and polls race freely; the store's conditional update decides
/// which of them performs the transition, the others observe its result.
pub struct PaymentReconciler {
    transactions: TransactionStoreRef,
    recorder: AuditRecorder,
    gateway: Option<(PaymentGatewayRef, GatewayCredentials)>,
    timeout: Duration,
}

impl PaymentReconciler {
    pub fn new(transactions: TransactionStoreRef, recorder: AuditRecorder) -> Self {
        Self {
            transactions,
            recorder,
            gateway: None,
            timeout: Duration::from_secs(20),
        }
    }

    /// Enables [`PaymentReconciler::verify`], which queries the gateway.
    pub fn with_gateway(
        mut self,
        gateway: PaymentGatewayRef,
        credentials: GatewayCredentials,
        timeout: Duration,
    ) -> Self {
        self.gateway = Some((gateway, credentials));
        self.timeout = timeout;
        self
    }

    /// Entry point for the gateway's asynchronous callback. No user is attributed.
    #[instrument(skip_all, fields(correlation_id = %correlation_id, result_code = result_code))]
    pub async fn apply_callback(
        &self,
        correlation_id: &CorrelationId,
        result_code: i64,
        receipt_id: Option<String>,
        failure_reason: Option<String>,
    ) -> Result<Reconciliation> {
        let outcome = PaymentOutcome::from_result_code(result_code, receipt_id, failure_reason);
        self.reconcile(correlation_id, outcome, None, ResultSource::Callback)
            .await
    }

    /// Entry point for a status obtained by querying the gateway.
    #[instrument(skip_all, fields(correlation_id = %correlation_id, result_code = result_code))]
    pub async fn apply_poll_result(
        &self,
        correlation_id: &CorrelationId,
        result_code: i64,
        failure_reason: Option<String>,
        actor: Option<&ActorId>,
    ) -> Result<Reconciliation> {
        let outcome = PaymentOutcome::from_result_code(result_code, None, failure_reason);
        self.reconcile(correlation_id, outcome, actor, ResultSource::Poll)
            .await
    }

    /// On-demand verification. A resolved transaction is returned without
    /// contacting the gateway; a pending one is queried and the answer applied.
    /// A gateway error or timeout leaves the transaction pending.
    #[instrument(skip_all, fields(correlation_id = %correlation_id))]
    pub async fn verify(
        &self,
        correlation_id: &CorrelationId,
        actor: Option<&ActorId>,
    ) -> Result<Reconciliation> {
        let stored = self.load(correlation_id).await?;
        if stored.status.is_terminal() {
            return Ok(Reconciliation::unchanged(stored));
        }

        let (gateway, credentials) = self
            .gateway
            .as_ref()
            .ok_or_else(|| ServiceError::GatewayError("no payment gateway configured".into()))?;
        let query = StatusQuery::new(credentials, credentials.sign(Utc::now()), correlation_id.clone());

        let answer = tokio::time::timeout(self.timeout, gateway.query(&query))
            .await
            .map_err(|_| ServiceError::GatewayTimeout(self.timeout))??;

        match answer {
            QueryOutcome::Resolved {
                result_code,
                result_desc,
            } => {
                self.apply_poll_result(correlation_id, result_code, result_desc, actor)
                    .await
            }
            QueryOutcome::StillProcessing => {
                tracing::debug!("Gateway still processing; transaction stays pending");
                Ok(Reconciliation::unchanged(stored))
            }
        }
    }

    async fn load(&self, correlation_id: &CorrelationId) -> Result<Transaction> {
        self.transactions
            .get(correlation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("transaction", correlation_id))
    }

    async fn reconcile(
        &self,
        correlation_id: &CorrelationId,
        outcome: PaymentOutcome,
        actor: Option<&ActorId>,
        source: ResultSource,
    ) -> Result<Reconciliation> {
        let stored = self.load(correlation_id).await?;
        if stored.status.is_terminal() {
            tracing::debug!(status = %stored.status, ?source, "Transaction already resolved; ignoring");
            return Ok(Reconciliation::unchanged(stored));
        }

        let mut resolved = stored;
        resolved.resolve(outcome, Utc::now())?;

        let resolved = match self.transactions.update_if_pending(resolved).await? {
            Some(CasOutcome::Applied(tx)) => tx,
            Some(CasOutcome::Stale(current)) => {
                tracing::debug!(status = %current.status, ?source, "Lost race to another signal");
                return Ok(Reconciliation::unchanged(current));
            }
            None => return Err(ServiceError::not_found("transaction", correlation_id)),
        };

        let (action, payload) = match resolved.status {
            TransactionStatus::Completed => (
                AuditAction::PaymentReceived,
                json!({
                    "status": resolved.status,
                    "receipt_id": resolved.receipt_id,
                    "amount": resolved.amount,
                    "source": source,
                }),
            ),
            _ => (
                AuditAction::PaymentFailed,
                json!({
                    "status": resolved.status,
                    "failure_reason": resolved.failure_reason,
                    "source": source,
                }),
            ),
        };
        self.recorder
            .record(actor, action, TRANSACTIONS_TABLE, resolved.id, payload)
            .await;

        tracing::info!(status = %resolved.status, ?source, "Transaction resolved");
        Ok(Reconciliation {
            status: resolved.status,
            transaction: resolved,
            applied: true,
        })
    }
}
