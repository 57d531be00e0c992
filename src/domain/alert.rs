use super::ids::{ActorId, AlertId, ProductId};
use super::product::Product;
use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a restock alert.
///
/// `Pending -> Acknowledged -> Completed`, or `Pending -> Completed`.
/// `Completed` is terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Acknowledged,
    Completed,
}

impl AlertStatus {
    /// Open alerts count towards the one-open-alert-per-product rule.
    pub fn is_open(self) -> bool {
        !matches!(self, AlertStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strictly positive number of units received against an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RestockQuantity(u32);

impl RestockQuantity {
    pub fn new(value: u32) -> Result<Self, ServiceError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(ServiceError::validation("restocked quantity must be positive"))
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for RestockQuantity {
    type Error = ServiceError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RestockQuantity> for u32 {
    fn from(quantity: RestockQuantity) -> Self {
        quantity.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct RestockAlert {
    pub id: AlertId,
    pub product_id: ProductId,
    pub product_name: String,
    pub current_stock_at_creation: u32,
    pub min_stock_level: u32,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub acknowledged_by: Option<ActorId>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub completed_by: Option<ActorId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub restocked_quantity: Option<u32>,
}

/// Result of looking up the open alert of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertLookup {
    Found(RestockAlert),
    NotFound,
}

impl From<Option<RestockAlert>> for AlertLookup {
    fn from(alert: Option<RestockAlert>) -> Self {
        match alert {
            Some(alert) if alert.status.is_open() => AlertLookup::Found(alert),
            _ => AlertLookup::NotFound,
        }
    }
}

impl RestockAlert {
    /// Opens a pending alert carrying a snapshot of the product's stock.
    pub fn open_for(product: &Product, now: DateTime<Utc>) -> Self {
        Self {
            id: AlertId::new(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            current_stock_at_creation: product.stock_quantity,
            min_stock_level: product.min_stock_level,
            status: AlertStatus::Pending,
            created_at: now,
            updated_at: now,
            acknowledged_by: None,
            acknowledged_at: None,
            completed_by: None,
            completed_at: None,
            restocked_quantity: None,
        }
    }

    /// Replaces the stock snapshot with the product's current figures.
    pub fn refresh(&mut self, product: &Product, now: DateTime<Utc>) {
        self.product_name = product.name.clone();
        self.current_stock_at_creation = product.stock_quantity;
        self.min_stock_level = product.min_stock_level;
        self.updated_at = now;
    }

    pub fn acknowledge(&mut self, actor: &ActorId, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if self.status != AlertStatus::Pending {
            return Err(self.illegal_transition(AlertStatus::Acknowledged));
        }
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_by = Some(actor.clone());
        self.acknowledged_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Closes the alert. Both open states may complete directly.
    pub fn complete(
        &mut self,
        actor: &ActorId,
        quantity: RestockQuantity,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if !self.status.is_open() {
            return Err(self.illegal_transition(AlertStatus::Completed));
        }
        self.status = AlertStatus::Completed;
        self.completed_by = Some(actor.clone());
        self.completed_at = Some(now);
        self.restocked_quantity = Some(quantity.value());
        self.updated_at = now;
        Ok(())
    }

    fn illegal_transition(&self, to: AlertStatus) -> ServiceError {
        ServiceError::invalid_state(format!(
            "alert {} cannot move from {} to {}",
            self.id, self.status, to
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Maize flour 2kg".into(),
            stock_quantity: 5,
            min_stock_level: 20,
            is_active: true,
        }
    }

    fn actor() -> ActorId {
        ActorId::new("u1")
    }

    #[test]
    fn test_open_for_snapshots_product() {
        let alert = RestockAlert::open_for(&product(), Utc::now());
        assert_eq!(alert.status, AlertStatus::Pending);
        assert_eq!(alert.current_stock_at_creation, 5);
        assert_eq!(alert.min_stock_level, 20);
        assert_eq!(alert.product_name, "Maize flour 2kg");
    }

    #[test]
    fn test_acknowledge_then_complete() {
        let mut alert = RestockAlert::open_for(&product(), Utc::now());
        alert.acknowledge(&actor(), Utc::now()).unwrap();
        assert_eq!(alert.status, AlertStatus::Acknowledged);
        assert_eq!(alert.acknowledged_by, Some(actor()));

        alert
            .complete(&actor(), RestockQuantity::new(40).unwrap(), Utc::now())
            .unwrap();
        assert_eq!(alert.status, AlertStatus::Completed);
        assert_eq!(alert.restocked_quantity, Some(40));
    }

    #[test]
    fn test_pending_may_complete_directly() {
        let mut alert = RestockAlert::open_for(&product(), Utc::now());
        alert
            .complete(&actor(), RestockQuantity::new(1).unwrap(), Utc::now())
            .unwrap();
        assert_eq!(alert.status, AlertStatus::Completed);
        assert!(alert.acknowledged_at.is_none());
    }

    #[test]
    fn test_illegal_transitions_leave_alert_untouched() {
        let mut acknowledged = RestockAlert::open_for(&product(), Utc::now());
        acknowledged.acknowledge(&actor(), Utc::now()).unwrap();
        let snapshot = acknowledged.clone();
        assert!(matches!(
            acknowledged.acknowledge(&actor(), Utc::now()),
            Err(ServiceError::InvalidState(_))
        ));
        assert_eq!(acknowledged, snapshot);

        let mut completed = snapshot;
        completed
            .complete(&actor(), RestockQuantity::new(3).unwrap(), Utc::now())
            .unwrap();
        let snapshot = completed.clone();
        assert!(completed.acknowledge(&actor(), Utc::now()).is_err());
        assert!(
            completed
                .complete(&actor(), RestockQuantity::new(3).unwrap(), Utc::now())
                .is_err()
        );
        assert_eq!(completed, snapshot);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert!(matches!(
            RestockQuantity::new(0),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn test_lookup_ignores_completed_alerts() {
        let mut alert = RestockAlert::open_for(&product(), Utc::now());
        assert!(matches!(
            AlertLookup::from(Some(alert.clone())),
            AlertLookup::Found(_)
        ));
        alert
            .complete(&actor(), RestockQuantity::new(1).unwrap(), Utc::now())
            .unwrap();
        assert_eq!(AlertLookup::from(Some(alert)), AlertLookup::NotFound);
        assert_eq!(AlertLookup::from(None), AlertLookup::NotFound);
    }
}
