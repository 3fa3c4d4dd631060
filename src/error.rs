use thiserror::Error;

use crate::ledger::models::PaymentStatus;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Remote store error: {0}")]
    Store(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Delivery-related errors
///
/// Variants map onto the batch failure classes: validation errors fail
/// fast with no side effects, Fetch/Transmit leave the payment
/// `completed` and retry-eligible, WriteBack means the content was sent
/// but the ledger still shows `completed` (a retry will resend).
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Payment {payment_id} status is {status}, not completed")]
    PaymentNotCompleted {
        payment_id: String,
        status: PaymentStatus,
    },

    #[error("Content not found: {0}")]
    ContentNotFound(uuid::Uuid),

    #[error("Remote fetch failed for {remote_ref}: {message}")]
    Fetch { remote_ref: String, message: String },

    #[error("Transmit to user {user_id} failed: {message}")]
    Transmit { user_id: i64, message: String },

    #[error("Write-back failed after transmit for payment {payment_id}: {message}")]
    WriteBack { payment_id: String, message: String },
}

impl DeliveryError {
    /// True for the validation class: the executor performed no side
    /// effects before failing.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DeliveryError::PaymentNotFound(_)
                | DeliveryError::PaymentNotCompleted { .. }
                | DeliveryError::ContentNotFound(_)
        )
    }

    /// True when the content was already transmitted and a retry would
    /// send it again.
    pub fn is_write_back(&self) -> bool {
        matches!(self, DeliveryError::WriteBack { .. })
    }
}

/// Catalog-related errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Content name already exists: {0}")]
    NameTaken(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Store(format!("HTTP request error: {:?}", error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("{:?}", error))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
