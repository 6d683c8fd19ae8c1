use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use super::{
    common::Environment,
    status::ReceiptStatus,
    wire::{self, apple_date},
};

/// Decoded body of a `verifyReceipt` response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReceiptResponse {
    pub status: ReceiptStatus,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub receipt: Option<Receipt>,
    /// Base64 of the latest receipt, auto-renewable subscriptions only
    #[serde(default)]
    pub latest_receipt: Option<String>,
    /// Most recent renewal history; supersedes `receipt.in_app` for subscriptions
    #[serde(default)]
    pub latest_receipt_info: Option<Vec<ReceiptInApp>>,
    #[serde(default)]
    pub pending_renewal_info: Option<Vec<PendingRenewalInfo>>,
    #[serde(default, deserialize_with = "wire::opt_bool")]
    pub is_retryable: Option<bool>,
}

impl ReceiptResponse {
    /// Decode raw bytes returned by the verification service
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn pending_renewal_for(&self, product_id: &str) -> Option<&PendingRenewalInfo> {
        self.pending_renewal_info
            .as_deref()?
            .iter()
            .find(|info| info.product_id.as_deref() == Some(product_id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub receipt_type: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_i64")]
    pub adam_id: Option<i64>,
    #[serde(default, deserialize_with = "wire::opt_i64")]
    pub app_item_id: Option<i64>,
    pub bundle_id: String,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub application_version: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub original_application_version: Option<String>,
    /// Historically missing from some receipts
    #[serde(default, deserialize_with = "wire::opt_i64")]
    pub download_id: Option<i64>,
    #[serde(default, deserialize_with = "wire::opt_i64")]
    pub version_external_identifier: Option<i64>,
    #[serde(default, with = "apple_date::option")]
    pub receipt_creation_date: Option<OffsetDateTime>,
    #[serde(default, with = "apple_date::option")]
    pub receipt_expiration_date: Option<OffsetDateTime>,
    #[serde(default, with = "apple_date::option")]
    pub request_date: Option<OffsetDateTime>,
    #[serde(default, with = "apple_date::option")]
    pub original_purchase_date: Option<OffsetDateTime>,
    #[serde(default, with = "apple_date::option")]
    pub preorder_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub in_app: Vec<ReceiptInApp>,
}

/// One purchased or renewed unit
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReceiptInApp {
    #[serde(default, deserialize_with = "wire::opt_i64")]
    pub quantity: Option<i64>,
    pub product_id: String,
    #[serde(deserialize_with = "string_id")]
    pub transaction_id: String,
    #[serde(deserialize_with = "string_id")]
    pub original_transaction_id: String,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub web_order_line_item_id: Option<String>,
    #[serde(default, with = "apple_date::option")]
    pub purchase_date: Option<OffsetDateTime>,
    #[serde(default, with = "apple_date::option")]
    pub original_purchase_date: Option<OffsetDateTime>,
    /// Absent for anything that is not an auto-renewable subscription
    #[serde(default, with = "apple_date::option")]
    pub expires_date: Option<OffsetDateTime>,
    /// Set when Apple customer support refunded the transaction
    #[serde(default, with = "apple_date::option")]
    pub cancellation_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub cancellation_reason: Option<CancellationReason>,
    #[serde(default)]
    pub expiration_intent: Option<ExpirationIntent>,
    #[serde(default, deserialize_with = "wire::opt_bool")]
    pub is_in_billing_retry_period: Option<bool>,
    #[serde(default, deserialize_with = "wire::opt_bool")]
    pub is_trial_period: Option<bool>,
    #[serde(default, deserialize_with = "wire::opt_bool")]
    pub is_in_intro_offer_period: Option<bool>,
    #[serde(default)]
    pub auto_renew_status: Option<AutoRenewStatus>,
    #[serde(default)]
    pub auto_renew_product_id: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub subscription_group_identifier: Option<String>,
    #[serde(default)]
    pub in_app_ownership_type: Option<InAppOwnershipType>,
    #[serde(default)]
    pub promotional_offer_id: Option<String>,
    #[serde(default)]
    pub offer_code_ref_name: Option<String>,
}

impl ReceiptInApp {
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_date.is_some()
    }

    pub fn is_subscription(&self) -> bool {
        self.expires_date.is_some()
    }
}

/// Forthcoming or failed renewal of one subscription
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PendingRenewalInfo {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub auto_renew_product_id: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub original_transaction_id: Option<String>,
    #[serde(default)]
    pub auto_renew_status: Option<AutoRenewStatus>,
    #[serde(default)]
    pub expiration_intent: Option<ExpirationIntent>,
    #[serde(default, deserialize_with = "wire::opt_bool")]
    pub is_in_billing_retry_period: Option<bool>,
    #[serde(default, with = "apple_date::option")]
    pub grace_period_expires_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub price_consent_status: Option<PriceConsentStatus>,
    #[serde(default)]
    pub offer_code_ref_name: Option<String>,
    #[serde(default)]
    pub promotional_offer_id: Option<String>,
}

fn string_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    wire::opt_string(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("transaction identifier is null"))
}

/// Enumerations transmitted as small integers (often inside strings).
/// Values outside the documented set decode to `Unknown` instead of failing.
macro_rules! lenient_code_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal,)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            Unknown(i64),
        }

        impl $name {
            pub fn from_code(code: i64) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }

            pub fn code(&self) -> i64 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Unknown(code) => *code,
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                wire::lenient_i64(deserializer).map(Self::from_code)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_i64(self.code())
            }
        }
    };
}

lenient_code_enum! {
    /// Why a subscription expired
    pub enum ExpirationIntent {
        CustomerCancelled = 1,
        BillingError = 2,
        PriceIncreaseDeclined = 3,
        ProductUnavailable = 4,
        Other = 5,
    }
}

lenient_code_enum! {
    pub enum AutoRenewStatus {
        Off = 0,
        On = 1,
    }
}

lenient_code_enum! {
    pub enum CancellationReason {
        /// Refunded for another reason, e.g. accidental purchase
        Other = 0,
        /// Refunded because of an actual or perceived issue in the app
        AppIssue = 1,
    }
}

lenient_code_enum! {
    pub enum PriceConsentStatus {
        NotConsented = 0,
        Consented = 1,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InAppOwnershipType {
    Purchased,
    FamilyShared,
    Unknown(String),
}

impl InAppOwnershipType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Purchased => "PURCHASED",
            Self::FamilyShared => "FAMILY_SHARED",
            Self::Unknown(raw) => raw,
        }
    }
}

impl<'de> Deserialize<'de> for InAppOwnershipType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "PURCHASED" => Self::Purchased,
            "FAMILY_SHARED" => Self::FamilyShared,
            _ => Self::Unknown(raw),
        })
    }
}
