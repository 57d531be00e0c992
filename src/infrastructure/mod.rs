//! Adapters for the domain ports: storage backends and the payment gateway.

pub mod daraja;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::ports::{
    AlertStoreRef, AuditStoreRef, InventoryStoreRef, RestockLedgerRef, TransactionStoreRef,
};
use in_memory::{InMemoryAuditStore, InMemoryInventoryStore, InMemoryTransactionStore};
use std::sync::Arc;

/// One handle per repository port, all backed by the same storage.
#[derive(Clone)]
pub struct Stores {
    pub transactions: TransactionStoreRef,
    pub inventory: InventoryStoreRef,
    pub alerts: AlertStoreRef,
    pub ledger: RestockLedgerRef,
    pub audit: AuditStoreRef,
}

impl Stores {
    pub fn in_memory() -> Self {
        let inventory = InMemoryInventoryStore::new();
        Self {
            transactions: Arc::new(InMemoryTransactionStore::new()),
            inventory: Arc::new(inventory.clone()),
            alerts: Arc::new(inventory.clone()),
            ledger: Arc::new(inventory),
            audit: Arc::new(InMemoryAuditStore::new()),
        }
    }

    #[cfg(feature = "storage-rocksdb")]
    pub fn rocksdb<P: AsRef<std::path::Path>>(path: P) -> crate::error::Result<Self> {
        let store = rocksdb::RocksDBStore::open(path)?;
        Ok(Self {
            transactions: Arc::new(store.clone()),
            inventory: Arc::new(store.clone()),
            alerts: Arc::new(store.clone()),
            ledger: Arc::new(store.clone()),
            audit: Arc::new(store),
        })
    }
}
