use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    /// Root prefix under which all per-session working directories live.
    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,
    /// Delivery destination overriding the per-session default recipient.
    #[serde(default)]
    pub delivery_chat_id: Option<String>,
    /// Allow-list of authorized requester ids. Absent means everyone.
    #[serde(default)]
    pub allowed_user_ids: Option<Vec<String>>,
}

/// Messaging gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Authentication credential for the messaging API.
    pub credential: String,
    /// API base endpoint.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Read timeout in seconds (default: 30)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u32,
}

fn default_work_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_api_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_read_timeout() -> u32 {
    30
}

impl Config {
    /// Whether the given requester id is allowed to submit jobs.
    ///
    /// An absent allow-list means everyone is authorized.
    pub fn is_authorized(&self, user_id: &str) -> bool {
        match &self.allowed_user_ids {
            Some(ids) => ids.iter().any(|id| id == user_id),
            None => true,
        }
    }
}

/// Sanitized config for logging and diagnostics (credential redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub gateway: SanitizedGatewayConfig,
    pub work_root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_chat_id: Option<String>,
    pub allowed_user_count: Option<usize>,
}

/// Sanitized gateway config (credential hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedGatewayConfig {
    pub credential_configured: bool,
    pub api_base_url: String,
    pub read_timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            gateway: SanitizedGatewayConfig {
                credential_configured: !config.gateway.credential.is_empty(),
                api_base_url: config.gateway.api_base_url.clone(),
                read_timeout_secs: config.gateway.read_timeout_secs,
            },
            work_root: config.work_root.clone(),
            delivery_chat_id: config.delivery_chat_id.clone(),
            allowed_user_count: config.allowed_user_ids.as_ref().map(|ids| ids.len()),
        }
    }
}
