//! Framework-agnostic request handlers: each returns the HTTP status and
//! JSON body that the hosting web layer should send back.

use super::alert_action::{AlertAction, AlertActionRequest, Role};
use super::callback::parse_callback;
use crate::application::alerts::{ScanReport, StockAlertEngine};
use crate::application::reconciler::PaymentReconciler;
use crate::domain::alert::RestockAlert;
use crate::domain::ids::{ActorId, AlertId};
use crate::error::{Result, ServiceError};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<&ServiceError> for Response {
    fn from(err: &ServiceError) -> Self {
        let message = if err.is_client_error() {
            err.to_string()
        } else {
            "Internal server error".to_string()
        };
        Response {
            status: err.status_code(),
            body: json!({ "status": "error", "message": message }),
        }
    }
}

/// Handles one gateway callback delivery.
///
/// Malformed payloads are rejected before any store access; unknown
/// correlation ids answer 404; replays of a resolved transaction answer 200.
pub async fn handle_callback(reconciler: &PaymentReconciler, body: &[u8]) -> Response {
    let notice = match parse_callback(body) {
        Ok(notice) => notice,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected gateway callback");
            return Response::from(&e);
        }
    };

    let result = reconciler
        .apply_callback(
            &notice.correlation_id,
            notice.result_code,
            notice.receipt_id,
            notice.result_desc,
        )
        .await;

    match result {
        Ok(reconciliation) => Response {
            status: 200,
            body: json!({
                "status": "success",
                "transaction_status": reconciliation.status,
            }),
        },
        Err(e) => {
            match e {
                ServiceError::NotFound { .. } => {
                    tracing::warn!(correlation_id = %notice.correlation_id, "Callback for unknown transaction")
                }
                _ => tracing::error!(error = %e, "Error processing gateway callback"),
            }
            Response::from(&e)
        }
    }
}

/// Handles an alert action from an authenticated user.
pub async fn handle_alert_action(
    engine: &StockAlertEngine,
    alert_id: AlertId,
    actor: &ActorId,
    role: Role,
    body: &[u8],
) -> Response {
    match dispatch_alert_action(engine, alert_id, actor, role, body).await {
        Ok(alert) => Response {
            status: 200,
            body: json!({ "success": true, "result": alert }),
        },
        Err(e) => {
            tracing::warn!(error = %e, %alert_id, "Alert action rejected");
            Response::from(&e)
        }
    }
}

async fn dispatch_alert_action(
    engine: &StockAlertEngine,
    alert_id: AlertId,
    actor: &ActorId,
    role: Role,
    body: &[u8],
) -> Result<RestockAlert> {
    role.require_elevated()?;
    let request: AlertActionRequest = serde_json::from_slice(body)
        .map_err(|e| ServiceError::validation(format!("malformed alert action: {e}")))?;

    match AlertAction::try_from(request)? {
        AlertAction::Acknowledge => engine.acknowledge(alert_id, actor).await,
        AlertAction::Complete { quantity } => {
            engine.complete(alert_id, actor, quantity.value()).await
        }
    }
}

/// Body for the scan trigger.
pub fn scan_response(result: Result<ScanReport>) -> Response {
    match result {
        Ok(report) => Response {
            status: 200,
            body: json!({
                "success": true,
                "alerts_checked": report.alerts.len(),
                "alerts_created": report.created,
                "alerts_pending": report.pending_count(),
                "alerts": report.alerts,
            }),
        },
        Err(e) => {
            tracing::error!(error = %e, "Low-stock scan failed");
            Response::from(&e)
        }
    }
}
