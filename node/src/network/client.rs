// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::future::Future;
use std::time::Duration;

use consent_ledger::types::{Block, ChainId};
use reqwest::{Client, StatusCode};

use crate::api::{BlockEntries, ChainBlocksResponse, NodeIdentity};
use crate::errors::PeerError;

/// HTTP client for talking to peer nodes. Every call is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: Client,
    timeout: Duration,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(
        &self,
        url: &str,
        fut: impl Future<Output = Result<T, PeerError>>,
    ) -> Result<T, PeerError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| PeerError::Timeout { url: url.to_string() })?
    }

    /// Fetch the full block list of `chain_id` from the peer at `base_url`.
    /// `Ok(None)` means the peer does not hold the chain.
    pub async fn fetch_blocks(
        &self,
        base_url: &str,
        chain_id: &ChainId,
    ) -> Result<Option<Vec<Block>>, PeerError> {
        let url = format!("{}/chains/{}/blocks?detail=true", base_url.trim_end_matches('/'), chain_id);
        self.bounded(&url, async {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| PeerError::Unreachable {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !resp.status().is_success() {
                return Err(PeerError::Status {
                    url: url.clone(),
                    status: resp.status().as_u16(),
                });
            }

            let body: ChainBlocksResponse = resp.json().await.map_err(|e| PeerError::Malformed {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            let blocks = match body.blocks {
                BlockEntries::Full(blocks) => blocks,
                BlockEntries::Summary(_) => {
                    return Err(PeerError::Malformed {
                        url: url.clone(),
                        reason: "block detail missing".into(),
                    })
                }
            };
            if body.length != blocks.len() {
                return Err(PeerError::Malformed {
                    url: url.clone(),
                    reason: format!("declared length {} but sent {} blocks", body.length, blocks.len()),
                });
            }
            Ok(Some(blocks))
        })
        .await
    }

    /// Ask the peer at `base_url` for its self identification.
    pub async fn fetch_identity(&self, base_url: &str) -> Result<NodeIdentity, PeerError> {
        let url = format!("{}/", base_url.trim_end_matches('/'));
        self.bounded(&url, async {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| PeerError::Unreachable {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
            if !resp.status().is_success() {
                return Err(PeerError::Status {
                    url: url.clone(),
                    status: resp.status().as_u16(),
                });
            }
            resp.json().await.map_err(|e| PeerError::Malformed {
                url: url.clone(),
                reason: e.to_string(),
            })
        })
        .await
    }
}
