//! Session gateway configuration from TOML (`[gateway]` section)

use serde::{Deserialize, Serialize};

/// Development default; override through `[gateway] secret` or `MAGI_GATEWAY__SECRET`.
pub const DEFAULT_SECRET: &str = "magi-gateway-development-secret";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    /// Bind address
    pub host: String,
    pub port: u16,
    /// Shared secret mixed into client tokens
    pub secret: String,
    /// Token bucket width in seconds
    pub token_window_secs: u64,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            secret: DEFAULT_SECRET.to_string(),
            token_window_secs: 60,
        }
    }
}

impl FileGatewayConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }
}
