//! Payloads exchanged with the push-payment gateway (M-Pesa Express / STK push).

use super::ids::CorrelationId;
use super::money::Amount;
use super::phone::PayerPhone;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

pub const TRANSACTION_TYPE_PAYBILL: &str = "CustomerPayBillOnline";

/// Formats an instant as the gateway's compact `YYYYMMDDHHmmss` timestamp.
pub fn gateway_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// Shared secret material for signing gateway requests.
#[derive(Clone)]
pub struct GatewayCredentials {
    shortcode: String,
    passkey: String,
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("shortcode", &self.shortcode)
            .field("passkey", &"***")
            .finish()
    }
}

/// A timestamp together with the password derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub timestamp: String,
    pub password: String,
}

impl GatewayCredentials {
    pub fn new(shortcode: impl Into<String>, passkey: impl Into<String>) -> Self {
        Self {
            shortcode: shortcode.into(),
            passkey: passkey.into(),
        }
    }

    pub fn shortcode(&self) -> &str {
        &self.shortcode
    }

    /// `base64(shortcode + passkey + timestamp)`.
    pub fn sign(&self, at: DateTime<Utc>) -> Signature {
        let timestamp = gateway_timestamp(at);
        let password = STANDARD.encode(format!("{}{}{}", self.shortcode, self.passkey, timestamp));
        Signature {
            timestamp,
            password,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PushRequest {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub call_back_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

impl PushRequest {
    pub fn new(
        credentials: &GatewayCredentials,
        signature: Signature,
        amount: Amount,
        payer: &PayerPhone,
        callback_url: &str,
        account_reference: &str,
        description: &str,
    ) -> Self {
        Self {
            business_short_code: credentials.shortcode().to_string(),
            password: signature.password,
            timestamp: signature.timestamp,
            transaction_type: TRANSACTION_TYPE_PAYBILL.to_string(),
            amount: amount.value(),
            party_a: payer.as_str().to_string(),
            party_b: credentials.shortcode().to_string(),
            phone_number: payer.as_str().to_string(),
            call_back_url: callback_url.to_string(),
            account_reference: account_reference.to_string(),
            transaction_desc: description.to_string(),
        }
    }
}

/// Gateway acknowledgement of a push request.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PushAccepted {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: CorrelationId,
    #[serde(default)]
    pub response_code: String,
    #[serde(default)]
    pub response_description: String,
    #[serde(default)]
    pub customer_message: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct StatusQuery {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: CorrelationId,
}

impl StatusQuery {
    pub fn new(
        credentials: &GatewayCredentials,
        signature: Signature,
        checkout_request_id: CorrelationId,
    ) -> Self {
        Self {
            business_short_code: credentials.shortcode().to_string(),
            password: signature.password,
            timestamp: signature.timestamp,
            checkout_request_id,
        }
    }
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Resolved {
        result_code: i64,
        result_desc: Option<String>,
    },
    /// The payer has not answered the prompt yet.
    StillProcessing,
}

/// Accepts a result code sent either as a JSON number or as a numeric string.
pub fn deserialize_result_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Number(i64),
        Text(String),
    }

    match Code::deserialize(deserializer)? {
        Code::Number(n) => Ok(n),
        Code::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("result code {s:?} is not numeric"))),
    }
}
