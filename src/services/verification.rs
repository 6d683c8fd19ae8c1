use crate::{
    config::{TransportConfig, VerificationConfig},
    error::TransportError,
    models::{receipt::ReceiptResponse, status::ReceiptStatus},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, instrument, warn};

/// Body of a `verifyReceipt` POST
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReceiptRequest {
    #[serde(rename = "receipt-data")]
    pub receipt_data: String,
    #[serde(rename = "exclude-old-transactions")]
    pub exclude_old_transactions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl VerifyReceiptRequest {
    pub fn new(receipt: &[u8], shared_secret: Option<&str>, exclude_old_transactions: bool) -> Self {
        Self {
            receipt_data: STANDARD.encode(receipt),
            exclude_old_transactions,
            password: shared_secret.map(str::to_string),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Opens network sessions; one session per verification call
pub trait HttpTransport: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn TransportSession>, TransportError>;
}

/// Exclusively owned by one `perform` call and released when dropped
#[async_trait]
pub trait TransportSession: Send {
    /// POST a JSON body and return the raw 2xx response body
    async fn post(&mut self, url: &str, body: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    config: TransportConfig,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn open_session(&self) -> Result<Box<dyn TransportSession>, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(self.config.connect_timeout_ms))
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Box::new(ReqwestSession { client }))
    }
}

struct ReqwestSession {
    client: reqwest::Client,
}

#[async_trait]
impl TransportSession for ReqwestSession {
    async fn post(&mut self, url: &str, body: &[u8]) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    TransportError::Connection(e.to_string())
                } else {
                    TransportError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Verification endpoint returned error status");
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Submits receipts to `verifyReceipt`, production first
pub struct VerificationClient {
    production_url: String,
    sandbox_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl VerificationClient {
    pub fn new(config: &VerificationConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            production_url: config.production_url.clone(),
            sandbox_url: config.sandbox_url.clone(),
            transport,
        }
    }

    /// Verify a receipt. A `21007` answer from production is retried once
    /// against the sandbox with the same body; whatever the sandbox says is
    /// final.
    #[instrument(skip_all, fields(receipt_sha256 = %receipt_fingerprint(receipt)))]
    pub async fn perform(
        &self,
        receipt: &[u8],
        shared_secret: Option<&str>,
        exclude_old_transactions: bool,
    ) -> Result<ReceiptResponse, TransportError> {
        let body =
            VerifyReceiptRequest::new(receipt, shared_secret, exclude_old_transactions).encode()?;

        let mut session = self.transport.open_session()?;

        let production = Self::attempt(&mut session, &self.production_url, &body).await?;
        if production.status != ReceiptStatus::TestReceipt {
            return Ok(production);
        }

        info!("Sandbox receipt sent to production, retrying against sandbox");
        Self::attempt(&mut session, &self.sandbox_url, &body).await
    }

    async fn attempt(
        session: &mut Box<dyn TransportSession>,
        url: &str,
        body: &[u8],
    ) -> Result<ReceiptResponse, TransportError> {
        let bytes = session.post(url, body).await?;
        let response = ReceiptResponse::from_slice(&bytes)?;

        debug!(
            url,
            status = response.status.code(),
            environment = ?response.environment,
            "Verification response decoded"
        );

        Ok(response)
    }
}

/// SHA-256 of the receipt, for correlating log lines without logging the receipt
pub fn receipt_fingerprint(receipt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(receipt);
    format!("{:x}", hasher.finalize())
}
