use super::audit::AuditRecorder;
use crate::domain::alert::{AlertLookup, AlertStatus, RestockAlert, RestockQuantity};
use crate::domain::audit::{AuditAction, PRODUCTS_TABLE, RESTOCK_ALERTS_TABLE};
use crate::domain::ids::{ActorId, AlertId};
use crate::domain::ports::{
    AlertStoreRef, CasOutcome, InventoryStoreRef, RestockLedgerRef, RestockOutcome,
    SnapshotOutcome,
};
use crate::domain::product::Product;
use crate::error::{Result, ServiceError};
use chrono::Utc;
use serde_json::json;
use tracing::instrument;

/// Upper bound on optimistic retries when a concurrent scan or user action
/// changes an alert between lookup and write.
const MAX_ATTEMPTS: usize = 4;

/// Alerts touched by one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub alerts: Vec<RestockAlert>,
    /// How many of `alerts` were opened by this scan (the rest were refreshed).
    pub created: usize,
}

impl ScanReport {
    pub fn pending_count(&self) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.status == AlertStatus::Pending)
            .count()
    }
}

/// Raises restock alerts for low products and drives their lifecycle.
pub struct StockAlertEngine {
    inventory: InventoryStoreRef,
    alerts: AlertStoreRef,
    ledger: RestockLedgerRef,
    recorder: AuditRecorder,
}

impl StockAlertEngine {
    pub fn new(
        inventory: InventoryStoreRef,
        alerts: AlertStoreRef,
        ledger: RestockLedgerRef,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            inventory,
            alerts,
            ledger,
            recorder,
        }
    }

    /// Opens an alert for every active product at or below its
    /// `min_stock_level`, or refreshes the snapshot of the one already open.
    ///
    /// A product restocked after it was listed is skipped.
    #[instrument(skip_all)]
    pub async fn scan_and_create_alerts(&self) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        for product in self.inventory.needing_restock().await? {
            let lookup = AlertLookup::from(self.alerts.find_open(&product.id).await?);
            let Some((alert, created)) = self.upsert_open_alert(&product, lookup).await? else {
                tracing::debug!(product_id = %product.id, "Product restocked during scan; skipped");
                continue;
            };

            self.recorder
                .record(
                    None,
                    AuditAction::RestockAlertCreated,
                    RESTOCK_ALERTS_TABLE,
                    alert.id,
                    json!({
                        "product_id": alert.product_id,
                        "current_stock": alert.current_stock_at_creation,
                        "min_stock_level": alert.min_stock_level,
                        "status": alert.status,
                        "refreshed": !created,
                    }),
                )
                .await;

            if created {
                report.created += 1;
            }
            report.alerts.push(alert);
        }

        tracing::info!(
            touched = report.alerts.len(),
            created = report.created,
            "Low-stock scan finished"
        );
        Ok(report)
    }

    /// Returns the open alert for `product` and whether it was just created,
    /// or `None` once the stored product is no longer low.
    async fn upsert_open_alert(
        &self,
        product: &Product,
        mut lookup: AlertLookup,
    ) -> Result<Option<(RestockAlert, bool)>> {
        for _ in 0..MAX_ATTEMPTS {
            lookup = match lookup {
                AlertLookup::Found(mut alert) => {
                    let expected = alert.status;
                    alert.refresh(product, Utc::now());
                    match self.alerts.refresh_open(alert, expected).await? {
                        Some(SnapshotOutcome::Applied(alert)) => return Ok(Some((alert, false))),
                        Some(SnapshotOutcome::Stale(current)) => AlertLookup::from(Some(current)),
                        Some(SnapshotOutcome::Recovered) => return Ok(None),
                        None => AlertLookup::NotFound,
                    }
                }
                AlertLookup::NotFound => {
                    let alert = RestockAlert::open_for(product, Utc::now());
                    match self.alerts.insert_open(alert).await? {
                        SnapshotOutcome::Applied(alert) => {
                            tracing::info!(product_id = %product.id, alert_id = %alert.id, "Restock alert opened");
                            return Ok(Some((alert, true)));
                        }
                        SnapshotOutcome::Stale(existing) => AlertLookup::Found(existing),
                        SnapshotOutcome::Recovered => return Ok(None),
                    }
                }
            };
        }

        Err(ServiceError::invalid_state(format!(
            "open alert for product {} kept changing during scan",
            product.id
        )))
    }

    #[instrument(skip_all, fields(alert_id = %alert_id, actor = %actor))]
    pub async fn acknowledge(&self, alert_id: AlertId, actor: &ActorId) -> Result<RestockAlert> {
        let mut alert = self.load(alert_id).await?;
        alert.acknowledge(actor, Utc::now())?;

        let alert = match self
            .alerts
            .update_if_status(alert, AlertStatus::Pending)
            .await?
        {
            Some(CasOutcome::Applied(alert)) => alert,
            Some(CasOutcome::Stale(current)) => {
                return Err(ServiceError::invalid_state(format!(
                    "alert {alert_id} is already {}",
                    current.status
                )));
            }
            None => return Err(ServiceError::not_found("alert", alert_id)),
        };

        self.recorder
            .record(
                Some(actor),
                AuditAction::RestockAlertAcknowledged,
                RESTOCK_ALERTS_TABLE,
                alert.id,
                json!({
                    "status": alert.status,
                    "acknowledged_by": alert.acknowledged_by,
                    "acknowledged_at": alert.acknowledged_at,
                }),
            )
            .await;

        tracing::info!("Restock alert acknowledged");
        Ok(alert)
    }

    /// Credits `restocked_quantity` to the product and closes the alert.
    /// A completed alert is rejected, so stock is never credited twice.
    #[instrument(skip_all, fields(alert_id = %alert_id, actor = %actor, quantity = restocked_quantity))]
    pub async fn complete(
        &self,
        alert_id: AlertId,
        actor: &ActorId,
        restocked_quantity: u32,
    ) -> Result<RestockAlert> {
        let quantity = RestockQuantity::new(restocked_quantity)?;

        let mut alert = self.load(alert_id).await?;
        let expected = alert.status;
        alert.complete(actor, quantity, Utc::now())?;

        let restock = match self.ledger.commit_restock(alert, expected, quantity).await? {
            RestockOutcome::Committed(restock) => restock,
            RestockOutcome::Stale(current) => {
                return Err(ServiceError::invalid_state(format!(
                    "alert {alert_id} changed to {} before it could be completed",
                    current.status
                )));
            }
        };

        self.recorder
            .record(
                Some(actor),
                AuditAction::InventoryRestocked,
                PRODUCTS_TABLE,
                &restock.alert.product_id,
                json!({
                    "product_id": restock.alert.product_id,
                    "alert_id": restock.alert.id,
                    "previous_stock": restock.previous_stock,
                    "stock_quantity": restock.new_stock,
                    "restocked_quantity": quantity.value(),
                }),
            )
            .await;

        tracing::info!(
            product_id = %restock.alert.product_id,
            previous_stock = restock.previous_stock,
            new_stock = restock.new_stock,
            "Inventory restocked"
        );
        Ok(restock.alert)
    }

    /// All alerts, newest first.
    pub async fn alerts(&self) -> Result<Vec<RestockAlert>> {
        let mut alerts = self.alerts.all().await?;
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(alerts)
    }

    async fn load(&self, alert_id: AlertId) -> Result<RestockAlert> {
        self.alerts
            .get(alert_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("alert", alert_id))
    }
}
