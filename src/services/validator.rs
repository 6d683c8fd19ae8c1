use crate::{
    error::ReceiptError,
    models::{
        iap::SubscriptionValidationResponse,
        receipt::{Receipt, ReceiptInApp, ReceiptResponse},
        status::ReceiptStatus,
    },
};
use time::OffsetDateTime;
use tracing::debug;

/// Business-rule checks applied to a decoded verification response
#[derive(Debug, Clone)]
pub struct ReceiptValidator {
    bundle_id: String,
}

impl ReceiptValidator {
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
        }
    }

    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    /// Status validity, receipt presence and bundle identity
    pub fn basic_validation<'a>(
        &self,
        response: &'a ReceiptResponse,
    ) -> Result<&'a Receipt, ReceiptError> {
        let status = response.status;
        if !status.is_valid() {
            return Err(ReceiptError::InvalidStatusCode(status));
        }

        let receipt = response
            .receipt
            .as_ref()
            .ok_or(ReceiptError::NoReceiptFoundInResponse(status))?;

        if receipt.bundle_id != self.bundle_id {
            debug!(
                expected = %self.bundle_id,
                actual = %receipt.bundle_id,
                "Receipt bundle id mismatch"
            );
            return Err(ReceiptError::BundleIdNotMatching(status));
        }

        Ok(receipt)
    }

    /// Accept the response if it holds a non-cancelled purchase of `product_id`
    pub fn validate_purchase(
        &self,
        response: ReceiptResponse,
        product_id: &str,
    ) -> Result<ReceiptResponse, ReceiptError> {
        let status = response.status;
        let receipt = self.basic_validation(&response)?;

        let entry = receipt
            .in_app
            .iter()
            .find(|entry| entry.product_id == product_id)
            .ok_or(ReceiptError::ProductIdNotMatching(status))?;

        if entry.is_cancelled() {
            return Err(ReceiptError::PurchaseCancelled(status));
        }

        Ok(response)
    }

    /// Accept the response and select the subscriptions active at `now`.
    /// An empty selection is a valid result.
    pub fn validate_subscriptions(
        &self,
        response: ReceiptResponse,
        now: OffsetDateTime,
    ) -> Result<SubscriptionValidationResponse, ReceiptError> {
        let status = response.status;
        let receipt = self.basic_validation(&response)?;

        if status == ReceiptStatus::SubscriptionExpired {
            return Err(ReceiptError::SubscriptionExpired(status));
        }

        let candidates = response
            .latest_receipt_info
            .as_deref()
            .unwrap_or(&receipt.in_app);
        let valid_subscription_receipts = active_subscriptions(candidates, now);

        Ok(SubscriptionValidationResponse {
            valid_subscription_receipts,
            receipt_response: response,
        })
    }
}

/// Entries that are not cancelled and expire at or after `now`, latest
/// expiry first. Entries without an expiry date are not subscriptions.
pub fn active_subscriptions(entries: &[ReceiptInApp], now: OffsetDateTime) -> Vec<ReceiptInApp> {
    let mut active: Vec<ReceiptInApp> = entries
        .iter()
        .filter(|entry| !entry.is_cancelled())
        .filter(|entry| entry.expires_date.is_some_and(|expires| expires >= now))
        .cloned()
        .collect();

    active.sort_by(|a, b| b.expires_date.cmp(&a.expires_date));
    active
}
