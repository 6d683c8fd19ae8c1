use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error response structure (paired with non-2xx HTTP status codes)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorObject,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: Option<i64>) -> Self {
        Self {
            success: false,
            error: ErrorObject {
                code: code.into(),
                message: message.into(),
                status,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
    /// Receipt status code that produced the rejection, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
}

/// Verification environment reported by the service (informational only)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Environment {
    Sandbox,
    Production,
    Unknown(String),
}

impl Environment {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sandbox => "Sandbox",
            Self::Production => "Production",
            Self::Unknown(raw) => raw,
        }
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.to_lowercase().as_str() {
            "sandbox" => Self::Sandbox,
            "production" => Self::Production,
            _ => Self::Unknown(raw),
        })
    }
}

impl Serialize for Environment {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
