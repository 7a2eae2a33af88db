use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::constants;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub rpc: RpcConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl Config {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parse config file {}", path.display()))?;
        Ok(config)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    /// Ethereum JSON-RPC provider endpoint.
    pub ethereum_rpc_url: String,
    /// Coordinator REST API base url.
    pub coordinator_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl RpcConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory holding the pending-operation documents.
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcilerConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// See [`constants::DEFAULT_CANCEL_GRACE_SECS`].
    #[serde(default = "default_cancel_grace_secs")]
    pub cancel_grace_secs: u64,
}

impl ReconcilerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_secs)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            poll_interval_secs: default_poll_interval_secs(),
            cancel_grace_secs: default_cancel_grace_secs(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_poll_interval_secs() -> u64 {
    constants::DEFAULT_POLL_INTERVAL_SECS
}

fn default_cancel_grace_secs() -> u64 {
    constants::DEFAULT_CANCEL_GRACE_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let config: Config = toml::from_str(
            r#"
            [rpc]
            ethereum_rpc_url = "http://127.0.0.1:8545"
            coordinator_url = "https://api.hermez.io"

            [store]
            path = "/tmp/wallet-store"
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc.http_timeout_secs, 15);
        assert_eq!(config.reconciler.poll_interval_secs, 60);
        assert_eq!(config.reconciler.cancel_grace_secs, 120);
    }

    #[test]
    fn reject_unknown_keys() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [rpc]
            ethereum_rpc_url = "http://127.0.0.1:8545"
            coordinator_url = "https://api.hermez.io"
            typo_key = 1

            [store]
            path = "/tmp/wallet-store"
            "#,
        );
        assert!(result.is_err());
    }
}
