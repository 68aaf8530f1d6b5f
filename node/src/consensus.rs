// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Longest-valid-chain reconciliation.
//!
//! A round fetches the chain from every registered peer concurrently, drops
//! candidates that fail verification, and offers the longest survivor to the
//! ledger set. Ties keep the local chain. Peers that are unreachable or do not
//! hold the chain are skipped and reported, never raised.

use std::sync::Arc;
use std::time::Instant;

use consent_ledger::types::ChainId;
use consent_ledger::{Ledger, LedgerError};
use futures::future::join_all;
use serde::Serialize;

use crate::errors::{NodeError, PeerError};
use crate::ledgers::{ApplyOutcome, LedgerSet};
use crate::network::PeerClient;
use crate::registry::{Node, NodeRegistry};

/// Where a chain stands once a round finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainState {
    Absent,
    /// Held locally; no peer supplied a valid candidate to compare with.
    Local,
    Resolving,
    /// Compared against at least one valid peer chain.
    Reconciled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PeerStatus {
    Valid { length: usize },
    Invalid { length: usize, reason: String },
    NotFound,
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PeerReport {
    pub url: String,
    pub node: Option<String>,
    #[serde(flatten)]
    pub status: PeerStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub chain_id: ChainId,
    pub round: u64,
    pub state: ChainState,
    pub replaced: bool,
    pub minted: bool,
    /// A newer round completed first and this one was discarded.
    pub stale: bool,
    pub previous_length: usize,
    pub length: usize,
    pub adopted_from: Option<String>,
    pub peers: Vec<PeerReport>,
}

impl ResolutionReport {
    /// Whether any peer answered at all.
    pub fn peers_available(&self) -> bool {
        self.peers
            .iter()
            .any(|p| !matches!(p.status, PeerStatus::Unavailable { .. }))
    }
}

enum Fetched {
    Candidate(Ledger),
    Invalid { length: usize, reason: String },
    NotFound,
    Unavailable(PeerError),
}

pub struct ConsensusResolver {
    node_id: String,
    ledgers: Arc<LedgerSet>,
    registry: Arc<NodeRegistry>,
    client: PeerClient,
}

impl ConsensusResolver {
    pub fn new(
        node_id: String,
        ledgers: Arc<LedgerSet>,
        registry: Arc<NodeRegistry>,
        client: PeerClient,
    ) -> Self {
        Self {
            node_id,
            ledgers,
            registry,
            client,
        }
    }

    /// Peers to query: every registered node except this one.
    async fn peers(&self) -> Vec<Node> {
        self.registry
            .list()
            .await
            .into_iter()
            .filter(|n| n.id.as_deref() != Some(self.node_id.as_str()))
            .collect()
    }

    async fn fetch(&self, node: &Node, chain_id: &ChainId) -> Fetched {
        match self.client.fetch_blocks(&node.url, chain_id).await {
            Ok(None) => Fetched::NotFound,
            Ok(Some(blocks)) => {
                let length = blocks.len();
                match Ledger::from_blocks(chain_id.clone(), blocks, self.ledgers.secret()) {
                    Ok(ledger) => Fetched::Candidate(ledger),
                    Err(e) => Fetched::Invalid {
                        length,
                        reason: e.to_string(),
                    },
                }
            }
            Err(e) => Fetched::Unavailable(e),
        }
    }

    /// Run one round for `chain_id`.
    ///
    /// When neither this node nor any peer holds the chain, `mint_if_absent`
    /// decides between minting the deterministic genesis and `NotFound`.
    pub async fn resolve(
        &self,
        chain_id: &ChainId,
        mint_if_absent: bool,
    ) -> Result<ResolutionReport, NodeError> {
        let started = Instant::now();
        let round = self.ledgers.begin_round(chain_id).await?;
        let local = self.ledgers.get(chain_id).await?;
        let previous_length = local.as_ref().map_or(0, Ledger::len);

        let peers = self.peers().await;
        tracing::debug!(
            "Round {} for chain {}: local length {}, querying {} peers",
            round,
            chain_id,
            previous_length,
            peers.len()
        );

        let results = join_all(peers.iter().map(|node| self.fetch(node, chain_id))).await;

        let mut reports = Vec::with_capacity(results.len());
        let mut best: Option<(Ledger, String)> = None;
        for (node, fetched) in peers.into_iter().zip(results) {
            let status = match fetched {
                Fetched::Unavailable(e) => {
                    tracing::warn!("Skipping peer {} for chain {}: {}", node.url, chain_id, e);
                    metrics::increment_counter!("consent_peer_fetch_failures_total");
                    PeerStatus::Unavailable { reason: e.to_string() }
                }
                Fetched::NotFound => PeerStatus::NotFound,
                Fetched::Invalid { length, reason } => {
                    tracing::warn!(
                        "Discarding invalid chain {} ({} blocks) from {}: {}",
                        chain_id,
                        length,
                        node.url,
                        reason
                    );
                    PeerStatus::Invalid { length, reason }
                }
                Fetched::Candidate(candidate) => {
                    let length = candidate.len();
                    // First-seen wins among equally long candidates.
                    if best.as_ref().map_or(true, |(b, _)| length > b.len()) {
                        best = Some((candidate, node.url.clone()));
                    }
                    PeerStatus::Valid { length }
                }
            };
            reports.push(PeerReport {
                url: node.url,
                node: node.id,
                status,
            });
        }

        let compared = best.is_some();
        let (candidate, source) = match best {
            Some((ledger, url)) if ledger.len() > previous_length => (Some(ledger), Some(url)),
            _ => (None, None),
        };

        let outcome = self.ledgers.complete_round(chain_id, round, candidate).await?;
        let mut report = ResolutionReport {
            chain_id: chain_id.clone(),
            round,
            state: if compared { ChainState::Reconciled } else { ChainState::Local },
            replaced: outcome == ApplyOutcome::Replaced,
            minted: false,
            stale: outcome == ApplyOutcome::Stale,
            previous_length,
            length: previous_length,
            adopted_from: None,
            peers: reports,
        };
        if report.replaced {
            report.adopted_from = source;
            metrics::increment_counter!("consent_chain_replacements_total");
        }

        match self.ledgers.get(chain_id).await? {
            Some(ledger) => report.length = ledger.len(),
            None if mint_if_absent => {
                let (ledger, minted) = self.ledgers.get_or_mint(chain_id).await?;
                report.length = ledger.len();
                report.minted = minted;
                report.state = ChainState::Local;
            }
            None => {
                report.state = ChainState::Absent;
                self.finish(&report, started);
                return Err(LedgerError::NotFound(chain_id.clone()).into());
            }
        }

        self.finish(&report, started);
        Ok(report)
    }

    fn finish(&self, report: &ResolutionReport, started: Instant) {
        let outcome = if report.stale {
            "stale"
        } else if report.replaced {
            "replaced"
        } else if report.minted {
            "minted"
        } else if report.state == ChainState::Absent {
            "absent"
        } else {
            "kept"
        };
        metrics::increment_counter!("consent_resolution_rounds_total", "outcome" => outcome);
        metrics::histogram!(
            "consent_resolution_duration_seconds",
            started.elapsed().as_secs_f64()
        );
        tracing::info!(
            "Round {} for chain {} {}: length {} -> {} ({} peers, available: {})",
            report.round,
            report.chain_id,
            outcome,
            report.previous_length,
            report.length,
            report.peers.len(),
            report.peers_available()
        );
    }
}
