use super::alert::RestockQuantity;
use super::ids::ProductId;
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};

/// A catalogue product as seen by the restock flow.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub stock_quantity: u32,
    pub min_stock_level: u32,
    pub is_active: bool,
}

impl Product {
    /// Active products at or below their own minimum stock level need restocking.
    pub fn needs_restock(&self) -> bool {
        self.is_active && self.stock_quantity <= self.min_stock_level
    }

    /// Credits restocked units, returning the stock level before the credit.
    pub fn restock(&mut self, quantity: RestockQuantity) -> Result<u32, ServiceError> {
        let previous = self.stock_quantity;
        self.stock_quantity = previous.checked_add(quantity.value()).ok_or_else(|| {
            ServiceError::validation(format!(
                "restocking {} by {} overflows the stock counter",
                self.id,
                quantity.value()
            ))
        })?;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: u32, min: u32, active: bool) -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Sugar 1kg".into(),
            stock_quantity: stock,
            min_stock_level: min,
            is_active: active,
        }
    }

    #[test]
    fn test_threshold_is_inclusive_min_stock_level() {
        assert!(product(5, 20, true).needs_restock());
        assert!(product(20, 20, true).needs_restock());
        assert!(!product(21, 20, true).needs_restock());
        assert!(!product(5, 20, false).needs_restock());
    }

    #[test]
    fn test_restock_adds_quantity() {
        let mut p = product(5, 20, true);
        let previous = p.restock(RestockQuantity::new(40).unwrap()).unwrap();
        assert_eq!(previous, 5);
        assert_eq!(p.stock_quantity, 45);
    }

    #[test]
    fn test_restock_overflow_rejected() {
        let mut p = product(u32::MAX, 20, true);
        let result = p.restock(RestockQuantity::new(1).unwrap());
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
        assert_eq!(p.stock_quantity, u32::MAX);
    }
}
