// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Known peer nodes.
//!
//! Entries are keyed by normalized URL and are never removed. A probe that
//! fails marks the entry unresolved; it stays registered and is retried on
//! the next probe.

use std::collections::BTreeMap;

use consent_ledger::types::Timestamp;
use futures::future::join_all;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::errors::NodeError;
use crate::network::PeerClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub url: String,
    /// Self identification reported by the peer on its last successful probe.
    pub id: Option<String>,
    pub resolved: bool,
    pub last_seen: Option<Timestamp>,
}

impl Node {
    fn new(url: String) -> Self {
        Self {
            url,
            id: None,
            resolved: false,
            last_seen: None,
        }
    }
}

/// Normalize a peer location: accepts `host:port` without a scheme and
/// strips trailing slashes.
pub fn normalize_url(location: &str) -> Result<String, NodeError> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(NodeError::InvalidInput("empty node location".into()));
    }
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let url = Url::parse(&candidate)
        .map_err(|e| NodeError::InvalidInput(format!("invalid node location '{location}': {e}")))?;
    if url.host_str().is_none() {
        return Err(NodeError::InvalidInput(format!("invalid node location '{location}'")));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[derive(Default)]
pub struct NodeRegistry {
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `location` to the registry. Registering a known URL is a no-op
    /// that returns the existing entry.
    pub async fn register(&self, location: &str) -> Result<Node, NodeError> {
        let url = normalize_url(location)?;
        let mut nodes = self.nodes.write().await;
        let node = nodes.entry(url.clone()).or_insert_with(|| {
            tracing::info!("Registered node {}", url);
            Node::new(url.clone())
        });
        Ok(node.clone())
    }

    pub async fn list(&self) -> Vec<Node> {
        self.nodes.read().await.values().cloned().collect()
    }

    pub async fn get(&self, url: &str) -> Option<Node> {
        self.nodes.read().await.get(url).cloned()
    }

    /// Probe `url` for its self identification and record the result.
    /// Returns `None` if `url` is not registered.
    pub async fn resolve(&self, client: &PeerClient, url: &str) -> Option<Node> {
        if !self.nodes.read().await.contains_key(url) {
            return None;
        }

        // The lock is not held across the probe.
        let probe = client.fetch_identity(url).await;

        let mut nodes = self.nodes.write().await;
        let node = nodes.get_mut(url)?;
        match probe {
            Ok(identity) => {
                if node.id.as_deref() != Some(identity.node.as_str()) {
                    tracing::info!("Node {} resolved as {}", url, identity.node);
                }
                node.id = Some(identity.node);
                node.resolved = true;
                node.last_seen = Some(Timestamp::now());
            }
            Err(e) => {
                tracing::warn!("Node id not resolved for {}: {}", url, e);
                node.id = None;
                node.resolved = false;
            }
        }
        Some(node.clone())
    }

    /// Probe every registered node concurrently.
    pub async fn resolve_all(&self, client: &PeerClient) -> Vec<Node> {
        let urls: Vec<String> = self.nodes.read().await.keys().cloned().collect();
        join_all(urls.iter().map(|url| self.resolve(client, url)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("192.168.0.5:5000").unwrap(), "http://192.168.0.5:5000");
        assert_eq!(normalize_url("http://peer:5000/").unwrap(), "http://peer:5000");
        assert_eq!(normalize_url(" https://peer.example ").unwrap(), "https://peer.example");
        assert!(normalize_url("").is_err());
        assert!(normalize_url("http://").is_err());
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = NodeRegistry::new();
        registry.register("127.0.0.1:5001").await.unwrap();
        registry.register("http://127.0.0.1:5001/").await.unwrap();
        registry.register("127.0.0.1:5002").await.unwrap();

        let nodes = registry.list().await;
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| !n.resolved && n.id.is_none()));
    }

    #[tokio::test]
    async fn test_failed_probe_keeps_entry() {
        let registry = NodeRegistry::new();
        let client = PeerClient::new(Duration::from_millis(200));
        registry.register("127.0.0.1:1").await.unwrap();

        let node = registry.resolve(&client, "http://127.0.0.1:1").await.unwrap();
        assert!(!node.resolved);
        assert_eq!(registry.list().await.len(), 1);
        assert!(registry.resolve(&client, "http://unknown:1").await.is_none());
    }
}
