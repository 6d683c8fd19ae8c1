use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::OffsetDateTime;
use validator::Validate;

use super::{
    common::Environment,
    receipt::{ReceiptInApp, ReceiptResponse},
};

/// Where the receipt blob for one validation call comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptLocation {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// Validate that a single product was purchased and not refunded
#[derive(Debug, Clone)]
pub struct PurchaseValidationRequest {
    pub product_identifier: String,
    pub shared_secret: Option<String>,
    /// Externally supplied receipt; the receipt source is skipped when set
    pub receipt: Option<ReceiptLocation>,
}

impl PurchaseValidationRequest {
    pub fn new(product_identifier: impl Into<String>) -> Self {
        Self {
            product_identifier: product_identifier.into(),
            shared_secret: None,
            receipt: None,
        }
    }

    pub fn with_shared_secret(mut self, shared_secret: impl Into<String>) -> Self {
        self.shared_secret = Some(shared_secret.into());
        self
    }

    pub fn with_receipt(mut self, receipt: ReceiptLocation) -> Self {
        self.receipt = Some(receipt);
        self
    }
}

/// Compute the set of subscriptions active at `now`
#[derive(Debug, Clone)]
pub struct SubscriptionValidationRequest {
    pub shared_secret: Option<String>,
    pub refresh_local_receipt_if_needed: bool,
    pub exclude_old_transactions: bool,
    /// Reference instant, supplied by the caller
    pub now: OffsetDateTime,
    pub receipt: Option<ReceiptLocation>,
}

impl SubscriptionValidationRequest {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            shared_secret: None,
            refresh_local_receipt_if_needed: false,
            exclude_old_transactions: false,
            now,
            receipt: None,
        }
    }

    pub fn with_shared_secret(mut self, shared_secret: impl Into<String>) -> Self {
        self.shared_secret = Some(shared_secret.into());
        self
    }

    pub fn refresh_if_needed(mut self, refresh: bool) -> Self {
        self.refresh_local_receipt_if_needed = refresh;
        self
    }

    pub fn exclude_old_transactions(mut self, exclude: bool) -> Self {
        self.exclude_old_transactions = exclude;
        self
    }

    pub fn with_receipt(mut self, receipt: ReceiptLocation) -> Self {
        self.receipt = Some(receipt);
        self
    }
}

/// Accepted subscription validation
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionValidationResponse {
    /// Active entries, latest expiry first
    pub valid_subscription_receipts: Vec<ReceiptInApp>,
    pub receipt_response: ReceiptResponse,
}

impl SubscriptionValidationResponse {
    /// The subscription period currently in effect
    pub fn current(&self) -> Option<&ReceiptInApp> {
        self.valid_subscription_receipts.first()
    }

    pub fn is_entitled(&self) -> bool {
        !self.valid_subscription_receipts.is_empty()
    }
}

/// POST /api/v1/receipts/purchase
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseVerifyRequest {
    /// Base64 receipt as read from the device
    #[validate(length(min = 10, max = 1_000_000))]
    pub receipt: String,
    #[validate(length(min = 1, max = 255))]
    pub product_id: String,
    #[validate(length(max = 255))]
    pub shared_secret: Option<String>,
}

/// POST /api/v1/receipts/subscriptions
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionVerifyRequest {
    #[validate(length(min = 10, max = 1_000_000))]
    pub receipt: String,
    #[validate(length(max = 255))]
    pub shared_secret: Option<String>,
    #[serde(default)]
    pub exclude_old_transactions: bool,
    /// Defaults to the time the request arrived
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub now: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub product_id: String,
    pub transaction_id: String,
    pub original_transaction_id: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub purchase_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_date: Option<OffsetDateTime>,
    pub is_trial_period: bool,
    pub is_in_intro_offer_period: bool,
}

impl From<&ReceiptInApp> for TransactionSummary {
    fn from(entry: &ReceiptInApp) -> Self {
        Self {
            product_id: entry.product_id.clone(),
            transaction_id: entry.transaction_id.clone(),
            original_transaction_id: entry.original_transaction_id.clone(),
            purchase_date: entry.purchase_date,
            expires_date: entry.expires_date,
            is_trial_period: entry.is_trial_period.unwrap_or(false),
            is_in_intro_offer_period: entry.is_in_intro_offer_period.unwrap_or(false),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseVerifyData {
    pub status: i64,
    pub environment: Option<Environment>,
    pub bundle_id: String,
    pub transaction: TransactionSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionVerifyData {
    pub status: i64,
    pub environment: Option<Environment>,
    pub entitled: bool,
    pub active_subscriptions: Vec<TransactionSummary>,
    /// Product that renews next for the current subscription, when known
    pub will_renew_to: Option<String>,
}
