// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Secret used when none is configured. Only suitable for local development:
/// every node sharing a ledger must be started with the same real secret.
pub const DEV_SECRET: &str = "consent-ledger-development-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// Root directory of the file store. `None` keeps ledgers in memory.
    pub data_dir: Option<PathBuf>,
    pub secret: String,
    /// Self identification reported to peers. Generated when absent.
    pub node_id: Option<String>,
    pub peers: Vec<String>,
    pub peer_timeout: Duration,
    pub resolve_interval_secs: Option<u64>,
    pub probe_interval_secs: Option<u64>,
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConfig")
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("secret", &"<redacted>")
            .field("node_id", &self.node_id)
            .field("peers", &self.peers)
            .field("peer_timeout", &self.peer_timeout)
            .field("resolve_interval_secs", &self.resolve_interval_secs)
            .field("probe_interval_secs", &self.probe_interval_secs)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            data_dir: None,
            secret: DEV_SECRET.to_string(),
            node_id: None,
            peers: Vec::new(),
            peer_timeout: Duration::from_secs(2),
            resolve_interval_secs: None,
            probe_interval_secs: Some(30),
            auth_token: None,
        }
    }
}

impl NodeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("CONSENT_NODE_BIND") {
            cfg.bind_addr = parse("CONSENT_NODE_BIND", &v)?;
        }
        if let Some(v) = get("CONSENT_NODE_DATA_DIR") {
            cfg.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("CONSENT_LEDGER_SECRET") {
            cfg.secret = v;
        }
        if let Some(v) = get("CONSENT_NODE_ID") {
            cfg.node_id = Some(v);
        }
        if let Some(v) = get("CONSENT_NODE_PEERS") {
            cfg.peers = v
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("CONSENT_NODE_PEER_TIMEOUT_MS") {
            let ms: u64 = parse("CONSENT_NODE_PEER_TIMEOUT_MS", &v)?;
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    key: "CONSENT_NODE_PEER_TIMEOUT_MS",
                    value: v,
                    reason: "timeout must be positive".into(),
                });
            }
            cfg.peer_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = get("CONSENT_NODE_RESOLVE_INTERVAL_SECS") {
            cfg.resolve_interval_secs = interval("CONSENT_NODE_RESOLVE_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("CONSENT_NODE_PROBE_INTERVAL_SECS") {
            cfg.probe_interval_secs = interval("CONSENT_NODE_PROBE_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("CONSENT_NODE_AUTH_TOKEN") {
            cfg.auth_token = Some(v);
        }

        Ok(cfg)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// `0` disables the task.
fn interval(key: &'static str, value: &str) -> Result<Option<u64>, ConfigError> {
    let secs: u64 = parse(key, value)?;
    Ok((secs > 0).then_some(secs))
}
