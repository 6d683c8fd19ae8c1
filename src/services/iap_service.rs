use crate::{
    config::Config,
    error::ReceiptError,
    models::{
        iap::{
            PurchaseValidationRequest, ReceiptLocation, SubscriptionValidationRequest,
            SubscriptionValidationResponse,
        },
        receipt::ReceiptResponse,
    },
    services::{
        receipt_source::{load_receipt, FileReceiptSource, InlineReceiptSource, ReceiptSource},
        validator::ReceiptValidator,
        verification::{ReqwestTransport, VerificationClient},
    },
};
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Validation pipeline: acquire receipt, verify remotely, apply business rules
///
/// Each operation is offered as a future, with a completion callback and as a
/// single-element stream. All three run the pipeline exactly once.
#[derive(Clone)]
pub struct IAPService {
    receipt_source: Arc<dyn ReceiptSource>,
    verification: Arc<VerificationClient>,
    validator: Arc<ReceiptValidator>,
    shared_secret: Option<String>,
}

impl IAPService {
    pub fn new(
        receipt_source: Arc<dyn ReceiptSource>,
        verification: VerificationClient,
        validator: ReceiptValidator,
    ) -> Self {
        Self {
            receipt_source,
            verification: Arc::new(verification),
            validator: Arc::new(validator),
            shared_secret: None,
        }
    }

    /// Shared secret used when a request does not carry its own
    pub fn with_shared_secret(mut self, shared_secret: Option<String>) -> Self {
        self.shared_secret = shared_secret;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let receipt_source: Arc<dyn ReceiptSource> = match &config.app.receipt_path {
            Some(path) => Arc::new(FileReceiptSource::new(path)),
            // Nothing on this host; callers must supply the receipt
            None => Arc::new(InlineReceiptSource::new(Vec::new())),
        };

        let transport = Arc::new(ReqwestTransport::new(&config.verification.transport));
        let verification = VerificationClient::new(&config.verification, transport);

        Self::new(
            receipt_source,
            verification,
            ReceiptValidator::new(&config.app.bundle_id),
        )
        .with_shared_secret(config.app.shared_secret.clone())
    }

    pub fn validator(&self) -> &ReceiptValidator {
        &self.validator
    }

    /// Validate a single purchase
    #[instrument(skip_all, fields(product_id = %request.product_identifier))]
    pub async fn validate_purchase(
        &self,
        request: PurchaseValidationRequest,
    ) -> Result<ReceiptResponse, ReceiptError> {
        let receipt = self.acquire(request.receipt, false).await?;
        let shared_secret = request.shared_secret.as_deref().or(self.shared_secret.as_deref());

        let response = self
            .verification
            .perform(&receipt, shared_secret, false)
            .await?;

        match self
            .validator
            .validate_purchase(response, &request.product_identifier)
        {
            Ok(response) => {
                info!(status = response.status.code(), "Purchase validated");
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "Purchase rejected");
                Err(e)
            }
        }
    }

    /// Validate subscriptions and select the ones active at `request.now`
    #[instrument(skip_all, fields(now = %request.now))]
    pub async fn validate_subscription(
        &self,
        request: SubscriptionValidationRequest,
    ) -> Result<SubscriptionValidationResponse, ReceiptError> {
        let receipt = self
            .acquire(request.receipt, request.refresh_local_receipt_if_needed)
            .await?;
        let shared_secret = request.shared_secret.as_deref().or(self.shared_secret.as_deref());

        let response = self
            .verification
            .perform(&receipt, shared_secret, request.exclude_old_transactions)
            .await?;

        match self.validator.validate_subscriptions(response, request.now) {
            Ok(validated) => {
                info!(
                    active = validated.valid_subscription_receipts.len(),
                    "Subscriptions validated"
                );
                Ok(validated)
            }
            Err(e) => {
                warn!(error = %e, "Subscription validation rejected");
                Err(e)
            }
        }
    }

    /// Callback form of [`IAPService::validate_purchase`], run on a spawned task
    pub fn validate_purchase_with<F>(
        &self,
        request: PurchaseValidationRequest,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<ReceiptResponse, ReceiptError>) + Send + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move { completion(service.validate_purchase(request).await) })
    }

    /// Callback form of [`IAPService::validate_subscription`], run on a spawned task
    pub fn validate_subscription_with<F>(
        &self,
        request: SubscriptionValidationRequest,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<SubscriptionValidationResponse, ReceiptError>) + Send + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move { completion(service.validate_subscription(request).await) })
    }

    /// Stream form of [`IAPService::validate_purchase`]; the pipeline starts
    /// on first poll and yields exactly one item.
    pub fn purchase_stream(
        &self,
        request: PurchaseValidationRequest,
    ) -> BoxStream<'static, Result<ReceiptResponse, ReceiptError>> {
        let service = self.clone();
        stream::once(async move { service.validate_purchase(request).await }).boxed()
    }

    /// Stream form of [`IAPService::validate_subscription`]
    pub fn subscription_stream(
        &self,
        request: SubscriptionValidationRequest,
    ) -> BoxStream<'static, Result<SubscriptionValidationResponse, ReceiptError>> {
        let service = self.clone();
        stream::once(async move { service.validate_subscription(request).await }).boxed()
    }

    async fn acquire(
        &self,
        supplied: Option<ReceiptLocation>,
        refresh_requested: bool,
    ) -> Result<Vec<u8>, ReceiptError> {
        let location = match supplied {
            Some(location) => location,
            None => self.receipt_source.fetch(refresh_requested).await?,
        };

        Ok(load_receipt(location).await?)
    }
}
