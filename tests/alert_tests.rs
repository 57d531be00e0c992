mod common;

use async_trait::async_trait;
use chrono::Utc;
use common::{alert_engine, product, seed_product};
use dukapay::application::alerts::StockAlertEngine;
use dukapay::application::audit::AuditRecorder;
use dukapay::domain::alert::{AlertStatus, RestockQuantity};
use dukapay::domain::audit::{AuditAction, PRODUCTS_TABLE, RESTOCK_ALERTS_TABLE};
use dukapay::domain::ids::{ActorId, AlertId, ProductId};
use dukapay::domain::ports::{AlertStoreRef, InventoryStore, InventoryStoreRef, RestockLedgerRef};
use dukapay::domain::product::Product;
use dukapay::error::{Result, ServiceError};
use dukapay::infrastructure::Stores;
use dukapay::interfaces::alert_action::Role;
use dukapay::interfaces::webhook::{handle_alert_action, scan_response};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

async fn stock_of(stores: &Stores, id: &str) -> u32 {
    stores
        .inventory
        .get(&ProductId::new(id))
        .await
        .unwrap()
        .unwrap()
        .stock_quantity
}

#[tokio::test]
async fn test_scan_opens_alert_for_low_stock() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 5, 20)).await;
    seed_product(&stores, product("p2", 50, 20)).await;
    seed_product(
        &stores,
        dukapay::domain::product::Product {
            is_active: false,
            ..product("p3", 0, 20)
        },
    )
    .await;

    let report = alert_engine(&stores).scan_and_create_alerts().await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.alerts.len(), 1);
    let alert = &report.alerts[0];
    assert_eq!(alert.product_id, ProductId::new("p1"));
    assert_eq!(alert.status, AlertStatus::Pending);
    assert_eq!(alert.current_stock_at_creation, 5);
    assert_eq!(alert.min_stock_level, 20);

    let audit = stores.audit.all().await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::RestockAlertCreated);
    assert_eq!(audit[0].subject_table, RESTOCK_ALERTS_TABLE);
    assert_eq!(audit[0].actor_id, None);
}

#[tokio::test]
async fn test_threshold_is_inclusive() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 20, 20)).await;
    seed_product(&stores, product("p2", 21, 20)).await;
    seed_product(&stores, product("p3", 0, 0)).await;

    let report = alert_engine(&stores).scan_and_create_alerts().await.unwrap();
    let mut ids: Vec<_> = report.alerts.iter().map(|a| a.product_id.to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["p1", "p3"]);
}

#[tokio::test]
async fn test_second_scan_refreshes_instead_of_duplicating() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 5, 20)).await;
    let engine = alert_engine(&stores);

    let first = engine.scan_and_create_alerts().await.unwrap();
    seed_product(&stores, product("p1", 3, 25)).await;
    let second = engine.scan_and_create_alerts().await.unwrap();

    assert_eq!(second.created, 0);
    assert_eq!(second.alerts.len(), 1);
    assert_eq!(second.alerts[0].id, first.alerts[0].id);
    assert_eq!(second.alerts[0].current_stock_at_creation, 3);
    assert_eq!(second.alerts[0].min_stock_level, 25);
    assert_eq!(engine.alerts().await.unwrap().len(), 1);

    let audit = stores.audit.all().await.unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[1].payload["refreshed"], true);
}

#[tokio::test]
async fn test_acknowledge_then_complete_credits_stock() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 5, 20)).await;
    let engine = alert_engine(&stores);
    let alert_id = engine.scan_and_create_alerts().await.unwrap().alerts[0].id;
    let audit_before = stores.audit.all().await.unwrap().len();
    let actor = ActorId::new("u1");

    let acknowledged = engine.acknowledge(alert_id, &actor).await.unwrap();
    assert_eq!(acknowledged.status, AlertStatus::Acknowledged);
    assert_eq!(acknowledged.acknowledged_by, Some(actor.clone()));

    let completed = engine.complete(alert_id, &actor, 40).await.unwrap();
    assert_eq!(completed.status, AlertStatus::Completed);
    assert_eq!(completed.completed_by, Some(actor.clone()));
    assert_eq!(completed.restocked_quantity, Some(40));
    assert_eq!(stock_of(&stores, "p1").await, 45);

    let audit = stores.audit.all().await.unwrap();
    assert_eq!(audit.len() - audit_before, 2);
    let restocked = audit.last().unwrap();
    assert_eq!(restocked.action, AuditAction::InventoryRestocked);
    assert_eq!(restocked.subject_table, PRODUCTS_TABLE);
    assert_eq!(restocked.subject_id, "p1");
    assert_eq!(restocked.payload["previous_stock"], 5);
    assert_eq!(restocked.payload["stock_quantity"], 45);
    assert_eq!(restocked.payload["alert_id"], alert_id.to_string());
}

#[tokio::test]
async fn test_pending_alert_completes_directly() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 2, 10)).await;
    let engine = alert_engine(&stores);
    let alert_id = engine.scan_and_create_alerts().await.unwrap().alerts[0].id;

    let completed = engine.complete(alert_id, &ActorId::new("u1"), 8).await.unwrap();
    assert_eq!(completed.status, AlertStatus::Completed);
    assert_eq!(completed.acknowledged_at, None);
    assert_eq!(stock_of(&stores, "p1").await, 10);
}

#[tokio::test]
async fn test_illegal_transitions_are_rejected() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 2, 10)).await;
    let engine = alert_engine(&stores);
    let alert_id = engine.scan_and_create_alerts().await.unwrap().alerts[0].id;
    let actor = ActorId::new("u1");

    engine.acknowledge(alert_id, &actor).await.unwrap();
    assert!(matches!(
        engine.acknowledge(alert_id, &actor).await,
        Err(ServiceError::InvalidState(_))
    ));

    engine.complete(alert_id, &actor, 5).await.unwrap();
    assert!(matches!(
        engine.complete(alert_id, &actor, 5).await,
        Err(ServiceError::InvalidState(_))
    ));
    assert!(matches!(
        engine.acknowledge(alert_id, &actor).await,
        Err(ServiceError::InvalidState(_))
    ));
    assert_eq!(stock_of(&stores, "p1").await, 7);
}

#[tokio::test]
async fn test_zero_quantity_and_unknown_alert() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 2, 10)).await;
    let engine = alert_engine(&stores);
    let alert_id = engine.scan_and_create_alerts().await.unwrap().alerts[0].id;
    let actor = ActorId::new("u1");

    assert!(matches!(
        engine.complete(alert_id, &actor, 0).await,
        Err(ServiceError::ValidationError(_))
    ));
    assert!(matches!(
        engine.acknowledge(AlertId::new(), &actor).await,
        Err(ServiceError::NotFound { .. })
    ));
    assert_eq!(stock_of(&stores, "p1").await, 2);
}

#[tokio::test]
async fn test_completed_alert_allows_a_new_one() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 2, 10)).await;
    let engine = alert_engine(&stores);
    let first = engine.scan_and_create_alerts().await.unwrap().alerts[0].id;
    engine.complete(first, &ActorId::new("u1"), 3).await.unwrap();

    // Still at or below the minimum after a partial restock.
    let report = engine.scan_and_create_alerts().await.unwrap();
    assert_eq!(report.created, 1);
    assert_ne!(report.alerts[0].id, first);
    assert_eq!(report.alerts[0].current_stock_at_creation, 5);

    let all = engine.alerts().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, report.alerts[0].id, "newest first");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scans_keep_one_open_alert() {
    let stores = Stores::in_memory();
    for i in 0..10 {
        seed_product(&stores, product(&format!("p{i}"), i, 20)).await;
    }
    let engine = Arc::new(alert_engine(&stores));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.scan_and_create_alerts().await.unwrap() })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        created += handle.await.unwrap().created;
    }

    assert_eq!(created, 10);
    let alerts = engine.alerts().await.unwrap();
    assert_eq!(alerts.len(), 10);
    assert!(alerts.iter().all(|a| a.status == AlertStatus::Pending));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_credit_once() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 1, 10)).await;
    let engine = Arc::new(alert_engine(&stores));
    let alert_id = engine.scan_and_create_alerts().await.unwrap().alerts[0].id;

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .complete(alert_id, &ActorId::new(format!("u{i}")), 10)
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(matches!(e, ServiceError::InvalidState(_)), "{e}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(stock_of(&stores, "p1").await, 11);
}

/// Inventory that, once armed, completes every listed product's open alert
/// right after handing out the low-stock list.
struct RestockedAfterListing {
    inner: InventoryStoreRef,
    alerts: AlertStoreRef,
    ledger: RestockLedgerRef,
    armed: AtomicBool,
}

#[async_trait]
impl InventoryStore for RestockedAfterListing {
    async fn upsert(&self, product: Product) -> Result<()> {
        self.inner.upsert(product).await
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>> {
        self.inner.get(id).await
    }

    async fn needing_restock(&self) -> Result<Vec<Product>> {
        let listed = self.inner.needing_restock().await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            let quantity = RestockQuantity::new(40)?;
            for product in &listed {
                if let Some(mut alert) = self.alerts.find_open(&product.id).await? {
                    let expected = alert.status;
                    alert.complete(&ActorId::new("manager-1"), quantity, Utc::now())?;
                    self.ledger.commit_restock(alert, expected, quantity).await?;
                }
            }
        }
        Ok(listed)
    }
}

#[tokio::test]
async fn test_scan_skips_product_restocked_after_listing() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 5, 20)).await;
    let inventory = Arc::new(RestockedAfterListing {
        inner: stores.inventory.clone(),
        alerts: stores.alerts.clone(),
        ledger: stores.ledger.clone(),
        armed: AtomicBool::new(false),
    });
    let engine = StockAlertEngine::new(
        inventory.clone(),
        stores.alerts.clone(),
        stores.ledger.clone(),
        AuditRecorder::new(stores.audit.clone()),
    );

    let first = engine.scan_and_create_alerts().await.unwrap();
    assert_eq!(first.created, 1);

    inventory.armed.store(true, Ordering::SeqCst);
    let second = engine.scan_and_create_alerts().await.unwrap();

    assert_eq!(second.created, 0);
    assert!(second.alerts.is_empty());
    assert_eq!(stock_of(&stores, "p1").await, 45);
    assert!(stores.alerts.find_open(&ProductId::new("p1")).await.unwrap().is_none());

    let alerts = engine.alerts().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, AlertStatus::Completed);

    let scan_records = stores
        .audit
        .all()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.action == AuditAction::RestockAlertCreated)
        .count();
    assert_eq!(scan_records, 1);
}

#[tokio::test]
async fn test_alert_actions_require_elevated_role() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 1, 10)).await;
    let engine = alert_engine(&stores);
    let alert_id = engine.scan_and_create_alerts().await.unwrap().alerts[0].id;
    let actor = ActorId::new("u1");

    let denied = handle_alert_action(
        &engine,
        alert_id,
        &actor,
        Role::Cashier,
        br#"{"action":"acknowledge"}"#,
    )
    .await;
    assert_eq!(denied.status, 403);

    let invalid = handle_alert_action(
        &engine,
        alert_id,
        &actor,
        Role::Manager,
        br#"{"action":"complete"}"#,
    )
    .await;
    assert_eq!(invalid.status, 400);

    let done = handle_alert_action(
        &engine,
        alert_id,
        &actor,
        Role::Admin,
        br#"{"action":"complete","quantity":25}"#,
    )
    .await;
    assert_eq!(done.status, 200);
    assert_eq!(done.body["result"]["status"], "completed");
    assert_eq!(stock_of(&stores, "p1").await, 26);

    let again = handle_alert_action(
        &engine,
        alert_id,
        &actor,
        Role::Admin,
        br#"{"action":"complete","quantity":25}"#,
    )
    .await;
    assert_eq!(again.status, 409);
}

#[tokio::test]
async fn test_scan_response_counts() {
    let stores = Stores::in_memory();
    seed_product(&stores, product("p1", 1, 10)).await;
    seed_product(&stores, product("p2", 2, 10)).await;
    let engine = alert_engine(&stores);

    let first = scan_response(engine.scan_and_create_alerts().await);
    assert_eq!(first.body["alerts_created"], 2);
    assert_eq!(first.body["alerts_pending"], 2);

    let p1_alert = engine
        .alerts()
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.product_id == ProductId::new("p1"))
        .unwrap();
    engine.acknowledge(p1_alert.id, &ActorId::new("u1")).await.unwrap();

    let second = scan_response(engine.scan_and_create_alerts().await);
    assert_eq!(second.status, 200);
    assert_eq!(second.body["alerts_checked"], 2);
    assert_eq!(second.body["alerts_created"], 0);
    assert_eq!(second.body["alerts_pending"], 1);
}
