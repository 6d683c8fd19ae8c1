// Wire schema and request/response models
pub mod common;
pub mod iap;
pub mod receipt;
pub mod status;
pub mod wire;

pub use common::Environment;
pub use iap::{
    PurchaseValidationRequest, ReceiptLocation, SubscriptionValidationRequest,
    SubscriptionValidationResponse,
};
pub use receipt::{PendingRenewalInfo, Receipt, ReceiptInApp, ReceiptResponse};
pub use status::ReceiptStatus;
