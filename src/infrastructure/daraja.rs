//! M-Pesa Daraja adapter for the [`PaymentGateway`] port.

use crate::domain::gateway::{
    PushAccepted, PushRequest, QueryOutcome, StatusQuery, deserialize_result_code,
};
use crate::domain::ports::PaymentGateway;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const TOKEN_PATH: &str = "/oauth/v1/generate?grant_type=client_credentials";
const PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";
const QUERY_PATH: &str = "/mpesa/stkpushquery/v1/query";

/// Error code returned by the query endpoint while the payer has not yet
/// answered the prompt.
const STILL_PROCESSING_CODE: &str = "500.001.1001";

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryResponse {
    #[serde(deserialize_with = "deserialize_result_code")]
    result_code: i64,
    #[serde(default)]
    result_desc: Option<String>,
}

/// HTTPS client for the Daraja STK push and STK query endpoints.
///
/// Fetches a fresh OAuth token for every call, so no token state is cached
/// between requests.
#[derive(Clone)]
pub struct DarajaGateway {
    client: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    timeout: Duration,
}

impl DarajaGateway {
    pub fn new(
        base_url: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::GatewayError(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            timeout,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::GatewayTimeout(self.timeout)
        } else {
            ServiceError::GatewayError(err.to_string())
        }
    }

    async fn access_token(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, TOKEN_PATH))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(ServiceError::GatewayError(format!(
                "token request rejected with HTTP {}",
                response.status()
            )));
        }
        let token: AccessToken = self.body(response).await?;
        Ok(token.access_token)
    }

    async fn post<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let token = self.access_token().await?;
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))
    }

    async fn body<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::GatewayError(format!("unexpected gateway response: {e}")))
    }

    async fn error_body(&self, response: Response) -> ErrorBody {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => body,
            Err(_) => ErrorBody {
                error_code: None,
                error_message: Some(format!("HTTP {status}")),
            },
        }
    }
}

#[async_trait]
impl PaymentGateway for DarajaGateway {
    async fn push(&self, request: &PushRequest) -> Result<PushAccepted> {
        let response = self.post(PUSH_PATH, request).await?;

        if !response.status().is_success() {
            let error = self.error_body(response).await;
            return Err(ServiceError::GatewayError(
                error
                    .error_message
                    .unwrap_or_else(|| "Failed to initiate M-Pesa payment".to_string()),
            ));
        }

        let accepted: PushAccepted = self.body(response).await?;
        if !accepted.response_code.is_empty() && accepted.response_code != "0" {
            return Err(ServiceError::GatewayError(accepted.response_description));
        }
        Ok(accepted)
    }

    async fn query(&self, request: &StatusQuery) -> Result<QueryOutcome> {
        let response = self.post(QUERY_PATH, request).await?;

        if !response.status().is_success() {
            let error = self.error_body(response).await;
            if error.error_code.as_deref() == Some(STILL_PROCESSING_CODE) {
                return Ok(QueryOutcome::StillProcessing);
            }
            return Err(ServiceError::GatewayError(
                error
                    .error_message
                    .unwrap_or_else(|| "Failed to verify payment".to_string()),
            ));
        }

        let answer: QueryResponse = self.body(response).await?;
        Ok(QueryOutcome::Resolved {
            result_code: answer.result_code,
            result_desc: answer.result_desc,
        })
    }
}
