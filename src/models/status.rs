use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Overall verdict returned by the `verifyReceipt` endpoint
///
/// Unknown codes never fail decoding: they land in
/// [`ReceiptStatus::InternalDataAccessError`] with the raw value preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptStatus {
    /// 0
    Valid,
    /// 21000 - the App Store could not read the JSON object
    JsonNotReadable,
    /// 21002 - `receipt-data` was malformed or missing
    MalformedOrMissingData,
    /// 21003 - the receipt could not be authenticated
    ReceiptCouldNotBeAuthenticated,
    /// 21004 - the shared secret does not match the one on file
    SecretNotMatching,
    /// 21005 - the receipt server is temporarily unavailable
    ReceiptServerUnavailable,
    /// 21006 - valid receipt whose subscription has expired (iOS 6 style)
    SubscriptionExpired,
    /// 21007 - sandbox receipt sent to the production endpoint
    TestReceipt,
    /// 21008 - production receipt sent to the sandbox endpoint
    ProductionEnvironment,
    /// 21010 - the user account cannot be found or has been deleted
    AccountNotFound,
    /// 21009, 21100-21199 and any code this crate does not know about
    InternalDataAccessError(i64),
}

impl ReceiptStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Valid,
            21000 => Self::JsonNotReadable,
            21002 => Self::MalformedOrMissingData,
            21003 => Self::ReceiptCouldNotBeAuthenticated,
            21004 => Self::SecretNotMatching,
            21005 => Self::ReceiptServerUnavailable,
            21006 => Self::SubscriptionExpired,
            21007 => Self::TestReceipt,
            21008 => Self::ProductionEnvironment,
            21010 => Self::AccountNotFound,
            other => Self::InternalDataAccessError(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Valid => 0,
            Self::JsonNotReadable => 21000,
            Self::MalformedOrMissingData => 21002,
            Self::ReceiptCouldNotBeAuthenticated => 21003,
            Self::SecretNotMatching => 21004,
            Self::ReceiptServerUnavailable => 21005,
            Self::SubscriptionExpired => 21006,
            Self::TestReceipt => 21007,
            Self::ProductionEnvironment => 21008,
            Self::AccountNotFound => 21010,
            Self::InternalDataAccessError(code) => *code,
        }
    }

    /// Only a plain valid receipt and an iOS 6 style expired subscription
    /// pass the status layer.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid | Self::SubscriptionExpired)
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<i64> for ReceiptStatus {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl<'de> Deserialize<'de> for ReceiptStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = super::wire::lenient_i64(deserializer)?;
        Ok(Self::from_code(code))
    }
}

impl Serialize for ReceiptStatus {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}
