use crate::domain::alert::{AlertStatus, RestockAlert, RestockQuantity};
use crate::domain::audit::AuditRecord;
use crate::domain::ids::{AlertId, CorrelationId, ProductId};
use crate::domain::ports::{
    AlertStore, AuditStore, CasOutcome, InventoryStore, Restock, RestockLedger, RestockOutcome,
    SnapshotOutcome, TransactionStore,
};
use crate::domain::product::Product;
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payment transactions, keyed by correlation id.
///
/// Every conditional update runs under the write lock, which makes the
/// read-check-write span atomic.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<CorrelationId, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&tx.correlation_id) {
            return Err(ServiceError::invalid_state(format!(
                "transaction {} already exists",
                tx.correlation_id
            )));
        }
        transactions.insert(tx.correlation_id.clone(), tx);
        Ok(())
    }

    async fn get(&self, correlation_id: &CorrelationId) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(correlation_id).cloned())
    }

    async fn update_if_pending(&self, tx: Transaction) -> Result<Option<CasOutcome<Transaction>>> {
        let mut transactions = self.transactions.write().await;
        let Some(stored) = transactions.get_mut(&tx.correlation_id) else {
            return Ok(None);
        };
        if stored.status != TransactionStatus::Pending {
            return Ok(Some(CasOutcome::Stale(stored.clone())));
        }
        *stored = tx.clone();
        Ok(Some(CasOutcome::Applied(tx)))
    }
}

#[derive(Default)]
struct InventoryTables {
    products: HashMap<ProductId, Product>,
    alerts: HashMap<AlertId, RestockAlert>,
    /// product id -> id of its single open alert
    open_alerts: HashMap<ProductId, AlertId>,
}

impl InventoryTables {
    fn put_alert(&mut self, alert: RestockAlert) {
        if alert.status.is_open() {
            self.open_alerts.insert(alert.product_id.clone(), alert.id);
        } else if self.open_alerts.get(&alert.product_id) == Some(&alert.id) {
            self.open_alerts.remove(&alert.product_id);
        }
        self.alerts.insert(alert.id, alert);
    }

    /// The stored product, if it still needs restocking.
    fn low_product(&self, id: &ProductId) -> Option<Product> {
        self.products.get(id).filter(|p| p.needs_restock()).cloned()
    }
}

/// Products and restock alerts behind a single lock.
///
/// Sharing the lock keeps the open-alert index and the restock commit
/// (stock credit plus alert completion) atomic.
#[derive(Default, Clone)]
pub struct InMemoryInventoryStore {
    tables: Arc<RwLock<InventoryTables>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn upsert(&self, product: Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.get(id).cloned())
    }

    async fn needing_restock(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| p.needs_restock())
            .cloned()
            .collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(products)
    }
}

#[async_trait]
impl AlertStore for InMemoryInventoryStore {
    async fn get(&self, id: AlertId) -> Result<Option<RestockAlert>> {
        let tables = self.tables.read().await;
        Ok(tables.alerts.get(&id).cloned())
    }

    async fn find_open(&self, product_id: &ProductId) -> Result<Option<RestockAlert>> {
        let tables = self.tables.read().await;
        Ok(tables
            .open_alerts
            .get(product_id)
            .and_then(|id| tables.alerts.get(id))
            .cloned())
    }

    async fn insert_open(&self, mut alert: RestockAlert) -> Result<SnapshotOutcome> {
        let mut tables = self.tables.write().await;
        let Some(product) = tables.low_product(&alert.product_id) else {
            return Ok(SnapshotOutcome::Recovered);
        };
        if let Some(existing) = tables
            .open_alerts
            .get(&alert.product_id)
            .and_then(|id| tables.alerts.get(id))
        {
            return Ok(SnapshotOutcome::Stale(existing.clone()));
        }
        alert.refresh(&product, alert.updated_at);
        tables.put_alert(alert.clone());
        Ok(SnapshotOutcome::Applied(alert))
    }

    async fn refresh_open(
        &self,
        mut alert: RestockAlert,
        expected: AlertStatus,
    ) -> Result<Option<SnapshotOutcome>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.alerts.get(&alert.id) else {
            return Ok(None);
        };
        if stored.status != expected {
            return Ok(Some(SnapshotOutcome::Stale(stored.clone())));
        }
        let Some(product) = tables.low_product(&alert.product_id) else {
            return Ok(Some(SnapshotOutcome::Recovered));
        };
        alert.refresh(&product, alert.updated_at);
        tables.put_alert(alert.clone());
        Ok(Some(SnapshotOutcome::Applied(alert)))
    }

    async fn update_if_status(
        &self,
        alert: RestockAlert,
        expected: AlertStatus,
    ) -> Result<Option<CasOutcome<RestockAlert>>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.alerts.get(&alert.id) else {
            return Ok(None);
        };
        if stored.status != expected {
            return Ok(Some(CasOutcome::Stale(stored.clone())));
        }
        tables.put_alert(alert.clone());
        Ok(Some(CasOutcome::Applied(alert)))
    }

    async fn all(&self) -> Result<Vec<RestockAlert>> {
        let tables = self.tables.read().await;
        Ok(tables.alerts.values().cloned().collect())
    }
}

#[async_trait]
impl RestockLedger for InMemoryInventoryStore {
    async fn commit_restock(
        &self,
        completed: RestockAlert,
        expected: AlertStatus,
        quantity: RestockQuantity,
    ) -> Result<RestockOutcome> {
        let mut tables = self.tables.write().await;

        let stored = tables
            .alerts
            .get(&completed.id)
            .ok_or_else(|| ServiceError::not_found("alert", completed.id))?;
        if stored.status != expected {
            return Ok(RestockOutcome::Stale(stored.clone()));
        }

        // Work on a copy so an overflow leaves the product untouched.
        let mut product = tables
            .products
            .get(&completed.product_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("product", &completed.product_id))?;
        let previous_stock = product.restock(quantity)?;
        let new_stock = product.stock_quantity;

        tables.products.insert(product.id.clone(), product);
        tables.put_alert(completed.clone());

        Ok(RestockOutcome::Committed(Restock {
            alert: completed,
            previous_stock,
            new_stock,
        }))
    }
}

/// Append-only in-memory audit trail.
#[derive(Default, Clone)]
pub struct InMemoryAuditStore {
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<AuditRecord>> {
        Ok(self.records.read().await.clone())
    }
}
