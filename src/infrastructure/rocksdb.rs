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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for payment transactions, keyed by correlation id.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for catalogue products, keyed by product id.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for restock alerts, keyed by alert id.
pub const CF_ALERTS: &str = "alerts";
/// Index of open alerts: product id -> alert id.
pub const CF_OPEN_ALERTS: &str = "open_alerts";
/// Column Family for the audit trail, keyed by (time-ordered) record id.
pub const CF_AUDIT: &str = "audit";

const COLUMN_FAMILIES: [&str; 5] = [CF_TRANSACTIONS, CF_PRODUCTS, CF_ALERTS, CF_OPEN_ALERTS, CF_AUDIT];

/// A persistent store implementation using RocksDB.
///
/// Implements every repository port over one database. Multi-row writes are
/// applied through a single `WriteBatch`; conditional updates hold
/// `write_lock` across their read-check-write span, which serializes them
/// within this process.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating any missing
    /// column family.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ServiceError::storage(format!("column family {name} not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn stage<T: Serialize>(&self, batch: &mut WriteBatch, cf: &str, key: &[u8], value: &T) -> Result<()> {
        batch.put_cf(self.cf(cf)?, key, serde_json::to_vec(value)?);
        Ok(())
    }

    /// Stages an alert write and keeps the open-alert index consistent with it.
    fn stage_alert(&self, batch: &mut WriteBatch, alert: &RestockAlert) -> Result<()> {
        self.stage(batch, CF_ALERTS, alert.id.as_uuid().as_bytes(), alert)?;
        let index_key = alert.product_id.as_str().as_bytes();
        if alert.status.is_open() {
            batch.put_cf(self.cf(CF_OPEN_ALERTS)?, index_key, alert.id.as_uuid().as_bytes());
        } else if self.open_alert_id(&alert.product_id)? == Some(alert.id) {
            batch.delete_cf(self.cf(CF_OPEN_ALERTS)?, index_key);
        }
        Ok(())
    }

    fn open_alert_id(&self, product_id: &ProductId) -> Result<Option<AlertId>> {
        let Some(bytes) = self
            .db
            .get_cf(self.cf(CF_OPEN_ALERTS)?, product_id.as_str().as_bytes())?
        else {
            return Ok(None);
        };
        let uuid = uuid::Uuid::from_slice(&bytes)
            .map_err(|e| ServiceError::storage(format!("corrupt open-alert index: {e}")))?;
        Ok(Some(AlertId::from_uuid(uuid)))
    }

    fn open_alert(&self, product_id: &ProductId) -> Result<Option<RestockAlert>> {
        match self.open_alert_id(product_id)? {
            Some(id) => self.read(CF_ALERTS, id.as_uuid().as_bytes()),
            None => Ok(None),
        }
    }

    /// The stored product, if it still needs restocking.
    fn low_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let product: Option<Product> = self.read(CF_PRODUCTS, id.as_str().as_bytes())?;
        Ok(product.filter(Product::needs_restock))
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn insert(&self, tx: Transaction) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = tx.correlation_id.as_str().as_bytes();
        if self.db.get_pinned_cf(self.cf(CF_TRANSACTIONS)?, key)?.is_some() {
            return Err(ServiceError::invalid_state(format!(
                "transaction {} already exists",
                tx.correlation_id
            )));
        }
        let mut batch = WriteBatch::default();
        self.stage(&mut batch, CF_TRANSACTIONS, key, &tx)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, correlation_id: &CorrelationId) -> Result<Option<Transaction>> {
        self.read(CF_TRANSACTIONS, correlation_id.as_str().as_bytes())
    }

    async fn update_if_pending(&self, tx: Transaction) -> Result<Option<CasOutcome<Transaction>>> {
        let _guard = self.write_lock.lock().await;
        let key = tx.correlation_id.as_str().as_bytes();
        let Some(stored) = self.read::<Transaction>(CF_TRANSACTIONS, key)? else {
            return Ok(None);
        };
        if stored.status != TransactionStatus::Pending {
            return Ok(Some(CasOutcome::Stale(stored)));
        }
        let mut batch = WriteBatch::default();
        self.stage(&mut batch, CF_TRANSACTIONS, key, &tx)?;
        self.db.write(batch)?;
        Ok(Some(CasOutcome::Applied(tx)))
    }
}

#[async_trait]
impl InventoryStore for RocksDBStore {
    async fn upsert(&self, product: Product) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        self.stage(&mut batch, CF_PRODUCTS, product.id.as_str().as_bytes(), &product)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>> {
        self.read(CF_PRODUCTS, id.as_str().as_bytes())
    }

    async fn needing_restock(&self) -> Result<Vec<Product>> {
        let products: Vec<Product> = self.scan(CF_PRODUCTS)?;
        Ok(products.into_iter().filter(|p| p.needs_restock()).collect())
    }
}

#[async_trait]
impl AlertStore for RocksDBStore {
    async fn get(&self, id: AlertId) -> Result<Option<RestockAlert>> {
        self.read(CF_ALERTS, id.as_uuid().as_bytes())
    }

    async fn find_open(&self, product_id: &ProductId) -> Result<Option<RestockAlert>> {
        self.open_alert(product_id)
    }

    async fn insert_open(&self, mut alert: RestockAlert) -> Result<SnapshotOutcome> {
        let _guard = self.write_lock.lock().await;
        let Some(product) = self.low_product(&alert.product_id)? else {
            return Ok(SnapshotOutcome::Recovered);
        };
        if let Some(existing) = self.open_alert(&alert.product_id)? {
            return Ok(SnapshotOutcome::Stale(existing));
        }
        alert.refresh(&product, alert.updated_at);
        let mut batch = WriteBatch::default();
        self.stage_alert(&mut batch, &alert)?;
        self.db.write(batch)?;
        Ok(SnapshotOutcome::Applied(alert))
    }

    async fn refresh_open(
        &self,
        mut alert: RestockAlert,
        expected: AlertStatus,
    ) -> Result<Option<SnapshotOutcome>> {
        let _guard = self.write_lock.lock().await;
        let Some(stored) = self.read::<RestockAlert>(CF_ALERTS, alert.id.as_uuid().as_bytes())? else {
            return Ok(None);
        };
        if stored.status != expected {
            return Ok(Some(SnapshotOutcome::Stale(stored)));
        }
        let Some(product) = self.low_product(&alert.product_id)? else {
            return Ok(Some(SnapshotOutcome::Recovered));
        };
        alert.refresh(&product, alert.updated_at);
        let mut batch = WriteBatch::default();
        self.stage_alert(&mut batch, &alert)?;
        self.db.write(batch)?;
        Ok(Some(SnapshotOutcome::Applied(alert)))
    }

    async fn update_if_status(
        &self,
        alert: RestockAlert,
        expected: AlertStatus,
    ) -> Result<Option<CasOutcome<RestockAlert>>> {
        let _guard = self.write_lock.lock().await;
        let Some(stored) = self.read::<RestockAlert>(CF_ALERTS, alert.id.as_uuid().as_bytes())? else {
            return Ok(None);
        };
        if stored.status != expected {
            return Ok(Some(CasOutcome::Stale(stored)));
        }
        let mut batch = WriteBatch::default();
        self.stage_alert(&mut batch, &alert)?;
        self.db.write(batch)?;
        Ok(Some(CasOutcome::Applied(alert)))
    }

    async fn all(&self) -> Result<Vec<RestockAlert>> {
        self.scan(CF_ALERTS)
    }
}

#[async_trait]
impl RestockLedger for RocksDBStore {
    async fn commit_restock(
        &self,
        completed: RestockAlert,
        expected: AlertStatus,
        quantity: RestockQuantity,
    ) -> Result<RestockOutcome> {
        let _guard = self.write_lock.lock().await;

        let stored: RestockAlert = self
            .read(CF_ALERTS, completed.id.as_uuid().as_bytes())?
            .ok_or_else(|| ServiceError::not_found("alert", completed.id))?;
        if stored.status != expected {
            return Ok(RestockOutcome::Stale(stored));
        }

        let mut product: Product = self
            .read(CF_PRODUCTS, completed.product_id.as_str().as_bytes())?
            .ok_or_else(|| ServiceError::not_found("product", &completed.product_id))?;
        let previous_stock = product.restock(quantity)?;
        let new_stock = product.stock_quantity;

        let mut batch = WriteBatch::default();
        self.stage(&mut batch, CF_PRODUCTS, product.id.as_str().as_bytes(), &product)?;
        self.stage_alert(&mut batch, &completed)?;
        self.db.write(batch)?;

        Ok(RestockOutcome::Committed(Restock {
            alert: completed,
            previous_stock,
            new_stock,
        }))
    }
}

#[async_trait]
impl AuditStore for RocksDBStore {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage(&mut batch, CF_AUDIT, record.id.as_uuid().as_bytes(), &record)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<AuditRecord>> {
        self.scan(CF_AUDIT)
    }
}
