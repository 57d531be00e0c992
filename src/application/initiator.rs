use crate::domain::gateway::{GatewayCredentials, PushRequest};
use crate::domain::ids::ActorId;
use crate::domain::money::Amount;
use crate::domain::phone::{DEFAULT_CALLING_CODE, PayerPhone};
use crate::domain::ports::{PaymentGatewayRef, TransactionStoreRef};
use crate::domain::transaction::Transaction;
use crate::error::{Result, ServiceError};
use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::instrument;

/// A caller's request to charge a payer.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub payer_phone: String,
    pub amount: Decimal,
    pub reference: String,
    pub description: String,
    pub initiated_by: Option<ActorId>,
}

/// Starts push payments and records them as pending transactions.
pub struct PaymentInitiator {
    gateway: PaymentGatewayRef,
    transactions: TransactionStoreRef,
    credentials: GatewayCredentials,
    callback_url: String,
    calling_code: String,
    timeout: Duration,
}

impl PaymentInitiator {
    pub fn new(
        gateway: PaymentGatewayRef,
        transactions: TransactionStoreRef,
        credentials: GatewayCredentials,
        callback_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            transactions,
            credentials,
            callback_url: callback_url.into(),
            calling_code: DEFAULT_CALLING_CODE.to_string(),
            timeout,
        }
    }

    pub fn with_calling_code(mut self, calling_code: impl Into<String>) -> Self {
        self.calling_code = calling_code.into();
        self
    }

    /// Sends the push request and persists the pending transaction.
    ///
    /// Nothing is persisted unless the gateway accepted the request; the
    /// returned transaction's `correlation_id` is the gateway's
    /// `CheckoutRequestID`.
    #[instrument(skip_all, fields(reference = %request.reference))]
    pub async fn initiate(&self, request: PaymentRequest) -> Result<Transaction> {
        let amount = Amount::new(request.amount)?;
        let payer = PayerPhone::parse_with_calling_code(&request.payer_phone, &self.calling_code)?;
        if request.reference.trim().is_empty() {
            return Err(ServiceError::validation("account reference is empty"));
        }

        let push = PushRequest::new(
            &self.credentials,
            self.credentials.sign(Utc::now()),
            amount,
            &payer,
            &self.callback_url,
            &request.reference,
            &request.description,
        );

        let accepted = tokio::time::timeout(self.timeout, self.gateway.push(&push))
            .await
            .map_err(|_| ServiceError::GatewayTimeout(self.timeout))??;

        let tx = Transaction::pending(
            accepted.checkout_request_id,
            amount,
            payer,
            request.reference,
            request.description,
            request.initiated_by,
            Utc::now(),
        );
        self.transactions.insert(tx.clone()).await?;

        tracing::info!(correlation_id = %tx.correlation_id, amount = %tx.amount, "Push payment initiated");
        Ok(tx)
    }
}
