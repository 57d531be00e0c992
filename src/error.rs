use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Gateway error: {0}")]
    GatewayError(String),
    #[error("Gateway did not answer within {0:?}")]
    GatewayTimeout(Duration),
    #[error("Storage error: {0}")]
    StorageError(Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError(Box::new(std::io::Error::other(msg.into())))
    }

    /// HTTP-equivalent status for the boundary that surfaces this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ValidationError(_) | Self::CsvError(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound { .. } => 404,
            Self::InvalidState(_) => 409,
            Self::GatewayError(_) => 502,
            Self::GatewayTimeout(_) => 504,
            Self::StorageError(_) | Self::IoError(_) => 500,
        }
    }

    /// Client-class errors leave no state change behind and are not worth retrying.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for ServiceError {
    fn from(err: rocksdb::Error) -> Self {
        Self::StorageError(Box::new(err))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageError(Box::new(err))
    }
}
