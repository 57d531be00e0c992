use crate::domain::alert::RestockQuantity;
use crate::error::{Result, ServiceError};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Role claimed by the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

impl Role {
    /// Only admins and managers may act on restock alerts.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    pub fn require_elevated(self) -> Result<()> {
        if self.is_elevated() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "role {self} may not manage restock alerts"
            )))
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        })
    }
}

impl FromStr for Role {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            other => Err(ServiceError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// Request body for an alert action, e.g. `{"action":"complete","quantity":40}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertActionRequest {
    pub action: String,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    Acknowledge,
    Complete { quantity: RestockQuantity },
}

impl TryFrom<AlertActionRequest> for AlertAction {
    type Error = ServiceError;

    fn try_from(request: AlertActionRequest) -> Result<Self> {
        match request.action.as_str() {
            "acknowledge" => Ok(AlertAction::Acknowledge),
            "complete" => {
                let raw = request.quantity.ok_or_else(|| {
                    ServiceError::validation("quantity is required to complete an alert")
                })?;
                let value = u32::try_from(raw).map_err(|_| {
                    ServiceError::validation(format!("invalid restocked quantity: {raw}"))
                })?;
                Ok(AlertAction::Complete {
                    quantity: RestockQuantity::new(value)?,
                })
            }
            other => Err(ServiceError::validation(format!("invalid action: {other}"))),
        }
    }
}
