use std::net::SocketAddr;

use anyhow::{Context, Result};

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `RelayConfig` used by the relay server.
pub struct RelayConfig {
    pub bind_host: String,
    pub port: u16,
    pub verify_token: Option<String>,
    pub send_read_receipts: bool,
    pub send_typing_indicator: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            verify_token: None,
            send_read_receipts: true,
            send_typing_indicator: true,
        }
    }
}

impl RelayConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.bind_host.trim(), self.port);
        raw.parse::<SocketAddr>()
            .with_context(|| format!("invalid bind address '{raw}'"))
    }

    pub fn verify_token(&self) -> Option<&str> {
        self.verify_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}
