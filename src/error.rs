use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::{common::ErrorResponse, status::ReceiptStatus};

/// Outcome of a rejected validation; every variant after acquisition
/// carries the receipt status that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("No receipt found in bundle")]
    NoReceiptFoundInBundle,

    #[error("Invalid receipt status: {0}")]
    InvalidStatusCode(ReceiptStatus),

    #[error("No receipt found in verification response (status {0})")]
    NoReceiptFoundInResponse(ReceiptStatus),

    #[error("Receipt bundle id does not match this application (status {0})")]
    BundleIdNotMatching(ReceiptStatus),

    #[error("No purchase of the requested product in receipt (status {0})")]
    ProductIdNotMatching(ReceiptStatus),

    #[error("Subscription expired (status {0})")]
    SubscriptionExpired(ReceiptStatus),

    #[error("Purchase was cancelled (status {0})")]
    PurchaseCancelled(ReceiptStatus),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReceiptError {
    pub fn status(&self) -> Option<ReceiptStatus> {
        match self {
            Self::InvalidStatusCode(status)
            | Self::NoReceiptFoundInResponse(status)
            | Self::BundleIdNotMatching(status)
            | Self::ProductIdNotMatching(status)
            | Self::SubscriptionExpired(status)
            | Self::PurchaseCancelled(status) => Some(*status),
            Self::NoReceiptFoundInBundle | Self::Other(_) => None,
        }
    }
}

/// Failure talking to the verification endpoint
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Verification endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Invalid response format: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Connection failed: {0}")]
    Connection(String),
}

impl From<TransportError> for ReceiptError {
    fn from(err: TransportError) -> Self {
        ReceiptError::Other(err.into())
    }
}

/// Failure producing the local receipt blob
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("No receipt present on device")]
    NoReceipt,

    #[error("Failed to read receipt: {0}")]
    Io(#[from] std::io::Error),

    #[error("Receipt refresh failed: {0}")]
    Refresh(String),
}

impl From<AcquireError> for ReceiptError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::NoReceipt => ReceiptError::NoReceiptFoundInBundle,
            other => ReceiptError::Other(other.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Receipt(ref err) => match err {
                ReceiptError::NoReceiptFoundInBundle => {
                    (StatusCode::NOT_FOUND, "NO_RECEIPT", err.to_string())
                }
                ReceiptError::InvalidStatusCode(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "INVALID_STATUS_CODE",
                    err.to_string(),
                ),
                ReceiptError::NoReceiptFoundInResponse(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "NO_RECEIPT_IN_RESPONSE",
                    err.to_string(),
                ),
                ReceiptError::BundleIdNotMatching(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "BUNDLE_ID_NOT_MATCHING",
                    err.to_string(),
                ),
                ReceiptError::ProductIdNotMatching(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "PRODUCT_ID_NOT_MATCHING",
                    err.to_string(),
                ),
                ReceiptError::SubscriptionExpired(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "SUBSCRIPTION_EXPIRED",
                    err.to_string(),
                ),
                ReceiptError::PurchaseCancelled(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "PURCHASE_CANCELLED",
                    err.to_string(),
                ),
                ReceiptError::Other(e) => {
                    tracing::error!("Receipt verification failed: {:?}", e);
                    (
                        StatusCode::BAD_GATEWAY,
                        "VERIFICATION_UNAVAILABLE",
                        "Receipt verification service unavailable".to_string(),
                    )
                }
            },
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let receipt_status = match &self {
            ApiError::Receipt(err) => err.status().map(|s| s.code()),
            _ => None,
        };

        (
            status,
            Json(ErrorResponse::new(error_code, message, receipt_status)),
        )
            .into_response()
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ApiError>;
