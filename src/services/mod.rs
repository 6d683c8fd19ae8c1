// Service modules
pub mod iap_service;
pub mod receipt_source;
pub mod validator;
pub mod verification;

pub use iap_service::IAPService;
pub use receipt_source::{FileReceiptSource, InlineReceiptSource, ReceiptRefresher, ReceiptSource};
pub use validator::{active_subscriptions, ReceiptValidator};
pub use verification::{HttpTransport, ReqwestTransport, TransportSession, VerificationClient};
