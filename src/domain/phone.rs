use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Country calling code substituted for the local trunk prefix by default.
pub const DEFAULT_CALLING_CODE: &str = "254";

const TRUNK_PREFIX: char = '0';
const MIN_DIGITS: usize = 9;
const MAX_DIGITS: usize = 15;

/// A payer's phone number in the gateway's canonical international format:
/// digits only, no leading `+`, country calling code instead of trunk `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayerPhone(String);

impl PayerPhone {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        Self::parse_with_calling_code(raw, DEFAULT_CALLING_CODE)
    }

    /// Normalizes `raw`: strips one leading `+`, then replaces a leading
    /// trunk `0` with `calling_code`. Anything else passes through unchanged.
    pub fn parse_with_calling_code(raw: &str, calling_code: &str) -> Result<Self, ServiceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::validation("payer phone is empty"));
        }

        let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let normalized = match unsigned.strip_prefix(TRUNK_PREFIX) {
            Some(rest) => format!("{calling_code}{rest}"),
            None => unsigned.to_string(),
        };

        if !normalized.chars().all(|c| c.is_ascii_digit()) {
            return Err(ServiceError::validation(format!(
                "payer phone {raw:?} contains non-digit characters"
            )));
        }
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&normalized.len()) {
            return Err(ServiceError::validation(format!(
                "payer phone {raw:?} must have between {MIN_DIGITS} and {MAX_DIGITS} digits"
            )));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayerPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trunk_prefix_replaced() {
        let phone = PayerPhone::parse("0712345678").unwrap();
        assert_eq!(phone.as_str(), "254712345678");
    }

    #[test]
    fn test_plus_stripped() {
        let phone = PayerPhone::parse("+254712345678").unwrap();
        assert_eq!(phone.as_str(), "254712345678");
    }

    #[test]
    fn test_international_passes_through() {
        let phone = PayerPhone::parse("254712345678").unwrap();
        assert_eq!(phone.as_str(), "254712345678");
    }

    #[test]
    fn test_custom_calling_code() {
        let phone = PayerPhone::parse_with_calling_code("0712345678", "255").unwrap();
        assert_eq!(phone.as_str(), "255712345678");
    }

    #[test]
    fn test_rejects_empty_and_malformed() {
        for raw in ["", "   ", "+", "07123abc78", "0712 345 678", "12345", "+2547123456789012"] {
            assert!(
                matches!(PayerPhone::parse(raw), Err(ServiceError::ValidationError(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
