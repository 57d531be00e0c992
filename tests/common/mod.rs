#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use dukapay::application::alerts::StockAlertEngine;
use dukapay::application::audit::AuditRecorder;
use dukapay::application::reconciler::PaymentReconciler;
use dukapay::domain::audit::AuditRecord;
use dukapay::domain::gateway::{
    GatewayCredentials, PushAccepted, PushRequest, QueryOutcome, StatusQuery,
};
use dukapay::domain::ids::CorrelationId;
use dukapay::domain::money::Amount;
use dukapay::domain::phone::PayerPhone;
use dukapay::domain::ports::{AuditStore, PaymentGateway};
use dukapay::domain::product::Product;
use dukapay::domain::transaction::Transaction;
use dukapay::error::{Result, ServiceError};
use dukapay::infrastructure::Stores;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

pub const SHORTCODE: &str = "174379";
pub const PASSKEY: &str = "bfb279f9aa9bdbcf158e97dd71a467cd2e0c893059b10f78e6b72ada1ed2c919";
pub const CALLBACK_URL: &str = "https://shop.example.com/api/mpesa/callback";

pub fn credentials() -> GatewayCredentials {
    GatewayCredentials::new(SHORTCODE, PASSKEY)
}

/// Gateway double answering from a script, optionally after a delay.
pub struct FakeGateway {
    push_answer: Mutex<Option<Result<PushAccepted>>>,
    query_answer: Mutex<Option<Result<QueryOutcome>>>,
    delay: Option<Duration>,
    pub pushes: Mutex<Vec<PushRequest>>,
    pub queries: AtomicUsize,
}

impl FakeGateway {
    pub fn accepting(checkout_request_id: &str) -> Self {
        Self::scripted(
            Some(Ok(PushAccepted {
                merchant_request_id: "29115-34620561-1".into(),
                checkout_request_id: CorrelationId::new(checkout_request_id),
                response_code: "0".into(),
                response_description: "Success. Request accepted for processing".into(),
                customer_message: "Success. Request accepted for processing".into(),
            })),
            None,
        )
    }

    pub fn rejecting(message: &str) -> Self {
        Self::scripted(Some(Err(ServiceError::GatewayError(message.into()))), None)
    }

    pub fn answering_query(outcome: Result<QueryOutcome>) -> Self {
        Self::scripted(None, Some(outcome))
    }

    pub fn scripted(push: Option<Result<PushAccepted>>, query: Option<Result<QueryOutcome>>) -> Self {
        Self {
            push_answer: Mutex::new(push),
            query_answer: Mutex::new(query),
            delay: None,
            pushes: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn push(&self, request: &PushRequest) -> Result<PushAccepted> {
        self.wait().await;
        self.pushes.lock().await.push(request.clone());
        self.push_answer
            .lock()
            .await
            .take()
            .unwrap_or_else(|| Err(ServiceError::GatewayError("no scripted push answer".into())))
    }

    async fn query(&self, _request: &StatusQuery) -> Result<QueryOutcome> {
        self.wait().await;
        self.queries.fetch_add(1, Ordering::SeqCst);
        match &*self.query_answer.lock().await {
            Some(Ok(outcome)) => Ok(outcome.clone()),
            Some(Err(e)) => Err(ServiceError::GatewayError(e.to_string())),
            None => Err(ServiceError::GatewayError("no scripted query answer".into())),
        }
    }
}

/// Audit store whose appends always fail.
pub struct FailingAuditStore;

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _record: AuditRecord) -> Result<()> {
        Err(ServiceError::storage("audit table unavailable"))
    }

    async fn all(&self) -> Result<Vec<AuditRecord>> {
        Ok(Vec::new())
    }
}

pub fn reconciler(stores: &Stores) -> PaymentReconciler {
    PaymentReconciler::new(
        stores.transactions.clone(),
        AuditRecorder::new(stores.audit.clone()),
    )
}

pub fn alert_engine(stores: &Stores) -> StockAlertEngine {
    StockAlertEngine::new(
        stores.inventory.clone(),
        stores.alerts.clone(),
        stores.ledger.clone(),
        AuditRecorder::new(stores.audit.clone()),
    )
}

pub fn pending_transaction(correlation_id: &str, amount: Decimal) -> Transaction {
    Transaction::pending(
        CorrelationId::new(correlation_id),
        Amount::new(amount).unwrap(),
        PayerPhone::parse("0712345678").unwrap(),
        "INV-1",
        "Order payment",
        None,
        Utc::now(),
    )
}

pub async fn seed_pending(stores: &Stores, correlation_id: &str, amount: Decimal) -> Transaction {
    let tx = pending_transaction(correlation_id, amount);
    stores.transactions.insert(tx.clone()).await.unwrap();
    tx
}

pub fn product(id: &str, stock: u32, min: u32) -> Product {
    Product {
        id: id.into(),
        name: format!("Product {id}"),
        stock_quantity: stock,
        min_stock_level: min,
        is_active: true,
    }
}

pub async fn seed_product(stores: &Stores, product: Product) {
    stores.inventory.upsert(product).await.unwrap();
}

pub fn shared(gateway: FakeGateway) -> Arc<FakeGateway> {
    Arc::new(gateway)
}
