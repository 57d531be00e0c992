use super::alert::{AlertStatus, RestockAlert, RestockQuantity};
use super::audit::AuditRecord;
use super::gateway::{PushAccepted, PushRequest, QueryOutcome, StatusQuery};
use super::ids::{AlertId, CorrelationId, ProductId};
use super::product::Product;
use super::transaction::Transaction;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome<T> {
    /// The guard held and the value was written.
    Applied(T),
    /// The guard failed; carries the value currently stored.
    Stale(T),
}

/// A committed restock: stock credited and alert completed in one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restock {
    pub alert: RestockAlert,
    pub previous_stock: u32,
    pub new_stock: u32,
}

/// Outcome of writing a scan snapshot onto a product's open alert.
///
/// The store re-reads the product in the same atomic unit as the write, so
/// the snapshot always carries the stored stock figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Applied(RestockAlert),
    /// Another writer got there first; carries the alert currently stored.
    Stale(RestockAlert),
    /// The stored product no longer needs restocking; nothing was written.
    Recovered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestockOutcome {
    Committed(Restock),
    /// The alert no longer had the expected status; nothing was written.
    Stale(RestockAlert),
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts a new transaction. Fails if the correlation id is already taken.
    async fn insert(&self, tx: Transaction) -> Result<()>;
    async fn get(&self, correlation_id: &CorrelationId) -> Result<Option<Transaction>>;
    /// Replaces the stored transaction only while it is still pending.
    async fn update_if_pending(&self, tx: Transaction) -> Result<Option<CasOutcome<Transaction>>>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn upsert(&self, product: Product) -> Result<()>;
    async fn get(&self, id: &ProductId) -> Result<Option<Product>>;
    /// Active products at or below their minimum stock level.
    async fn needing_restock(&self) -> Result<Vec<Product>>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn get(&self, id: AlertId) -> Result<Option<RestockAlert>>;
    async fn find_open(&self, product_id: &ProductId) -> Result<Option<RestockAlert>>;
    /// Inserts `alert` unless its product already has an open alert, which is
    /// then returned as `Stale`, or the product is no longer low.
    async fn insert_open(&self, alert: RestockAlert) -> Result<SnapshotOutcome>;
    /// Rewrites the snapshot of an open alert while its status equals
    /// `expected` and its product is still low. `None` if the alert is gone.
    async fn refresh_open(
        &self,
        alert: RestockAlert,
        expected: AlertStatus,
    ) -> Result<Option<SnapshotOutcome>>;
    /// Replaces the stored alert only while its status equals `expected`.
    async fn update_if_status(
        &self,
        alert: RestockAlert,
        expected: AlertStatus,
    ) -> Result<Option<CasOutcome<RestockAlert>>>;
    async fn all(&self) -> Result<Vec<RestockAlert>>;
}

#[async_trait]
pub trait RestockLedger: Send + Sync {
    /// Credits `quantity` to the alert's product and stores the completed
    /// alert as one atomic unit, provided the stored alert still has status
    /// `expected`.
    async fn commit_restock(
        &self,
        completed: RestockAlert,
        expected: AlertStatus,
        quantity: RestockQuantity,
    ) -> Result<RestockOutcome>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<()>;
    async fn all(&self) -> Result<Vec<AuditRecord>>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn push(&self, request: &PushRequest) -> Result<PushAccepted>;
    async fn query(&self, request: &StatusQuery) -> Result<QueryOutcome>;
}

pub type TransactionStoreRef = Arc<dyn TransactionStore>;
pub type InventoryStoreRef = Arc<dyn InventoryStore>;
pub type AlertStoreRef = Arc<dyn AlertStore>;
pub type RestockLedgerRef = Arc<dyn RestockLedger>;
pub type AuditStoreRef = Arc<dyn AuditStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
