//! STK push callback envelope as delivered by the gateway webhook.

use crate::domain::gateway::deserialize_result_code;
use crate::domain::ids::CorrelationId;
use crate::domain::transaction::RESULT_CODE_SUCCESS;
use crate::error::{Result, ServiceError};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Body")]
    body: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(rename = "stkCallback")]
    stk_callback: StkCallback,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: CorrelationId,
    #[serde(deserialize_with = "deserialize_result_code")]
    result_code: i64,
    #[serde(default)]
    result_desc: Option<String>,
    #[serde(default)]
    callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Deserialize)]
struct CallbackMetadata {
    #[serde(rename = "Item")]
    items: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
struct MetadataItem {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value", default)]
    value: Option<Value>,
}

/// A validated callback, flattened out of the gateway's nested envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackNotice {
    pub correlation_id: CorrelationId,
    pub merchant_request_id: Option<String>,
    pub result_code: i64,
    pub result_desc: Option<String>,
    pub receipt_id: Option<String>,
    pub amount: Option<Decimal>,
    pub transaction_date: Option<String>,
    pub phone_number: Option<String>,
}

impl CallbackNotice {
    pub fn is_success(&self) -> bool {
        self.result_code == RESULT_CODE_SUCCESS
    }
}

fn metadata_text(items: &[MetadataItem], name: &str) -> Option<String> {
    items
        .iter()
        .find(|item| item.name == name)
        .and_then(|item| match item.value.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Parses a raw callback body.
///
/// Fails with `ValidationError` when the envelope is not the expected shape,
/// or when a successful result lacks its metadata list or receipt number.
pub fn parse_callback(body: &[u8]) -> Result<CallbackNotice> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| ServiceError::validation(format!("malformed callback: {e}")))?;
    let callback = envelope.body.stk_callback;

    let mut notice = CallbackNotice {
        correlation_id: callback.checkout_request_id,
        merchant_request_id: callback.merchant_request_id,
        result_code: callback.result_code,
        result_desc: callback.result_desc,
        receipt_id: None,
        amount: None,
        transaction_date: None,
        phone_number: None,
    };

    if !notice.is_success() {
        return Ok(notice);
    }

    let metadata = callback.callback_metadata.ok_or_else(|| {
        ServiceError::validation("successful callback is missing CallbackMetadata")
    })?;
    let items = metadata.items.as_slice();

    notice.receipt_id = Some(metadata_text(items, "MpesaReceiptNumber").ok_or_else(|| {
        ServiceError::validation("successful callback is missing MpesaReceiptNumber")
    })?);
    notice.amount = metadata_text(items, "Amount").and_then(|a| a.parse().ok());
    notice.transaction_date = metadata_text(items, "TransactionDate");
    notice.phone_number = metadata_text(items, "PhoneNumber");
    Ok(notice)
}
