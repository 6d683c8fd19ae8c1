use serde::Deserialize;
use std::path::PathBuf;

pub const PRODUCTION_VERIFY_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";
pub const SANDBOX_VERIFY_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "VerificationConfig::standard")]
    pub verification: VerificationConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Endpoints and transport settings for `verifyReceipt`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerificationConfig {
    #[serde(default = "default_production_url")]
    pub production_url: String,
    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,
    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransportConfig {
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

fn default_production_url() -> String {
    PRODUCTION_VERIFY_URL.to_string()
}

fn default_sandbox_url() -> String {
    SANDBOX_VERIFY_URL.to_string()
}

impl VerificationConfig {
    /// Apple's production and sandbox endpoints with default timeouts
    pub fn standard() -> Self {
        Self {
            production_url: default_production_url(),
            sandbox_url: default_sandbox_url(),
            transport: TransportConfig::default(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bundle identifier every receipt must carry
    pub bundle_id: String,
    /// App-specific shared secret, used when a request does not carry one
    #[serde(default)]
    pub shared_secret: Option<String>,
    /// Local receipt file for the file-backed receipt source
    #[serde(default)]
    pub receipt_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            // Allow environment variables to override config file
            .add_source(
                config::Environment::with_prefix("RECEIPT_VALIDATOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
