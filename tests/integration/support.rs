//! Test doubles for the network and the device receipt store

use async_trait::async_trait;
use receipt_validator::{
    config::{TransportConfig, VerificationConfig},
    error::{AcquireError, TransportError},
    models::{iap::ReceiptLocation, wire::format_apple_date},
    services::{
        HttpTransport, IAPService, ReceiptSource, ReceiptValidator, TransportSession,
        VerificationClient,
    },
};
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use time::OffsetDateTime;

pub const PRODUCTION_URL: &str = "https://production.test/verifyReceipt";
pub const SANDBOX_URL: &str = "https://sandbox.test/verifyReceipt";
pub const BUNDLE_ID: &str = "com.app";
pub const RECEIPT: &[u8] = b"device receipt bytes";

#[derive(Clone)]
pub enum Reply {
    Json(Value),
    HttpStatus(u16),
    Garbage,
    Delayed(Duration, Box<Reply>),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub body: Vec<u8>,
}

impl Call {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<Call>>,
    opened: AtomicUsize,
    live: AtomicUsize,
}

/// Answers each endpoint with a fixed reply and records every POST
#[derive(Clone)]
pub struct ScriptedTransport {
    production: Reply,
    sandbox: Reply,
    shared: Arc<Shared>,
}

impl ScriptedTransport {
    pub fn new(production: Reply, sandbox: Reply) -> Self {
        Self {
            production,
            sandbox,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.url).collect()
    }

    pub fn sessions_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn live_sessions(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }
}

impl HttpTransport for ScriptedTransport {
    fn open_session(&self) -> Result<Box<dyn TransportSession>, TransportError> {
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        self.shared.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            transport: self.clone(),
        }))
    }
}

struct ScriptedSession {
    transport: ScriptedTransport,
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.transport.shared.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportSession for ScriptedSession {
    async fn post(&mut self, url: &str, body: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.transport.shared.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            body: body.to_vec(),
        });

        let mut reply = match url {
            PRODUCTION_URL => self.transport.production.clone(),
            SANDBOX_URL => self.transport.sandbox.clone(),
            other => return Err(TransportError::Connection(format!("unknown host {}", other))),
        };

        loop {
            match reply {
                Reply::Json(value) => return Ok(serde_json::to_vec(&value).unwrap()),
                Reply::HttpStatus(code) => return Err(TransportError::HttpStatus(code)),
                Reply::Garbage => return Ok(b"<html>busy</html>".to_vec()),
                Reply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}

/// Device receipt store double
pub struct FakeReceiptSource {
    receipt: Option<Vec<u8>>,
    refresh_flags: Mutex<Vec<bool>>,
}

impl FakeReceiptSource {
    pub fn with_receipt(receipt: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            receipt: Some(receipt.to_vec()),
            refresh_flags: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            receipt: None,
            refresh_flags: Mutex::new(Vec::new()),
        })
    }

    pub fn refresh_flags(&self) -> Vec<bool> {
        self.refresh_flags.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReceiptSource for FakeReceiptSource {
    async fn fetch(&self, refresh_requested: bool) -> Result<ReceiptLocation, AcquireError> {
        self.refresh_flags.lock().unwrap().push(refresh_requested);
        self.receipt
            .clone()
            .map(ReceiptLocation::Bytes)
            .ok_or(AcquireError::NoReceipt)
    }
}

pub fn verification_config() -> VerificationConfig {
    VerificationConfig {
        production_url: PRODUCTION_URL.to_string(),
        sandbox_url: SANDBOX_URL.to_string(),
        transport: TransportConfig::default(),
    }
}

pub fn verification_client(transport: &ScriptedTransport) -> VerificationClient {
    VerificationClient::new(&verification_config(), Arc::new(transport.clone()))
}

pub fn service(
    source: Arc<FakeReceiptSource>,
    transport: &ScriptedTransport,
    bundle_id: &str,
) -> IAPService {
    IAPService::new(
        source,
        verification_client(transport),
        ReceiptValidator::new(bundle_id),
    )
}

pub fn in_app(
    product_id: &str,
    transaction_id: &str,
    expires: Option<OffsetDateTime>,
    cancelled: Option<OffsetDateTime>,
) -> Value {
    let mut entry = json!({
        "quantity": "1",
        "product_id": product_id,
        "transaction_id": transaction_id,
        "original_transaction_id": "1000",
        "purchase_date": "2024-01-01 00:00:00 Etc/GMT",
    });
    if let Some(expires) = expires {
        entry["expires_date"] = json!(format_apple_date(expires));
    }
    if let Some(cancelled) = cancelled {
        entry["cancellation_date"] = json!(format_apple_date(cancelled));
        entry["cancellation_reason"] = json!("0");
    }
    entry
}

pub fn receipt_response(status: i64, bundle_id: &str, in_app: Vec<Value>) -> Value {
    json!({
        "status": status,
        "environment": "Production",
        "receipt": {
            "receipt_type": "Production",
            "bundle_id": bundle_id,
            "application_version": "1",
            "receipt_creation_date": "2024-01-01 00:00:00 Etc/GMT",
            "request_date": "2024-05-01 00:00:00 Etc/GMT",
            "in_app": in_app,
        }
    })
}

pub fn status_only(status: i64) -> Value {
    json!({ "status": status })
}
