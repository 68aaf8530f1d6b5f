// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Node context.
//!
//! `Engine` owns everything an operation needs (node id, secret, ledgers,
//! registry, peer client) and is passed explicitly to handlers and
//! background tasks.

use std::sync::Arc;

use consent_ledger::replay::ConsentResolution;
use consent_ledger::types::{Block, BlockId, BlockRef, ChainId, Timestamp};
use consent_ledger::{
    prepare_consent, resolve_consents, ConsentSubmission, DataOriginals, DataPart, Ledger,
    LedgerError, LedgerSecret,
};
use uuid::Uuid;

use crate::api::NodeIdentity;
use crate::config::NodeConfig;
use crate::consensus::{ConsensusResolver, ResolutionReport};
use crate::errors::NodeError;
use crate::ledgers::LedgerSet;
use crate::network::PeerClient;
use crate::registry::{Node, NodeRegistry};
use crate::store::{FileLedgerStore, LedgerStore, MemoryLedgerStore};

/// How a request for a chain this node may not hold is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Answer from local state only.
    LocalOnly,
    /// Run a consensus round first if the chain is not held locally.
    ResolveIfAbsent,
    /// As `ResolveIfAbsent`, minting the genesis if no peer has the chain.
    ResolveOrMint,
}

impl ResolvePolicy {
    pub fn from_flag(resolve: bool) -> Self {
        if resolve {
            ResolvePolicy::ResolveIfAbsent
        } else {
            ResolvePolicy::LocalOnly
        }
    }
}

pub struct Engine {
    node_id: String,
    ledgers: Arc<LedgerSet>,
    registry: Arc<NodeRegistry>,
    client: PeerClient,
    resolver: ConsensusResolver,
}

impl Engine {
    pub fn new(cfg: &NodeConfig) -> Result<Self, NodeError> {
        let store: Arc<dyn LedgerStore> = match &cfg.data_dir {
            Some(dir) => {
                tracing::info!("Using file store at {:?}", dir);
                Arc::new(FileLedgerStore::open(dir)?)
            }
            None => {
                tracing::warn!("No data directory configured, ledgers are kept in memory");
                Arc::new(MemoryLedgerStore::new())
            }
        };
        Ok(Self::with_store(cfg, store))
    }

    pub fn with_store(cfg: &NodeConfig, store: Arc<dyn LedgerStore>) -> Self {
        let node_id = cfg
            .node_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let secret = Arc::new(LedgerSecret::new(&cfg.secret));
        let ledgers = Arc::new(LedgerSet::new(store, secret));
        let registry = Arc::new(NodeRegistry::new());
        let client = PeerClient::new(cfg.peer_timeout);
        let resolver = ConsensusResolver::new(
            node_id.clone(),
            ledgers.clone(),
            registry.clone(),
            client.clone(),
        );

        Self {
            node_id,
            ledgers,
            registry,
            client,
            resolver,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn secret(&self) -> &LedgerSecret {
        self.ledgers.secret()
    }

    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity {
            description: "consent ledger node".to_string(),
            node: self.node_id.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    // Registry

    pub async fn register_nodes(&self, locations: &[String]) -> Result<Vec<Node>, NodeError> {
        let mut nodes = Vec::with_capacity(locations.len());
        for location in locations {
            nodes.push(self.registry.register(location).await?);
        }
        Ok(nodes)
    }

    pub async fn nodes(&self) -> Vec<Node> {
        self.registry.list().await
    }

    pub async fn resolve_nodes(&self) -> Vec<Node> {
        self.registry.resolve_all(&self.client).await
    }

    // Chains

    pub async fn chains(&self) -> Result<Vec<ChainId>, NodeError> {
        self.ledgers.list().await
    }

    /// Mint a new ledger locally, generating an id if none is given.
    pub async fn create_chain(&self, chain_id: Option<ChainId>) -> Result<Ledger, NodeError> {
        let chain_id = chain_id.unwrap_or_else(ChainId::generate);
        self.ledgers.create(&chain_id).await
    }

    pub async fn ledger(&self, chain_id: &ChainId, policy: ResolvePolicy) -> Result<Ledger, NodeError> {
        if let Some(ledger) = self.ledgers.get(chain_id).await? {
            return Ok(ledger);
        }
        match policy {
            ResolvePolicy::LocalOnly => Err(LedgerError::NotFound(chain_id.clone()).into()),
            ResolvePolicy::ResolveIfAbsent | ResolvePolicy::ResolveOrMint => {
                self.resolver
                    .resolve(chain_id, policy == ResolvePolicy::ResolveOrMint)
                    .await?;
                self.ledgers
                    .get(chain_id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound(chain_id.clone()).into())
            }
        }
    }

    /// Explicit consensus round for a chain.
    pub async fn resolve_chain(&self, chain_id: &ChainId, mint_if_absent: bool) -> Result<ResolutionReport, NodeError> {
        self.resolver.resolve(chain_id, mint_if_absent).await
    }

    /// One round for every local chain. Failures are logged per chain.
    pub async fn resolve_all_chains(&self) -> Result<Vec<ResolutionReport>, NodeError> {
        let mut reports = Vec::new();
        for chain_id in self.chains().await? {
            match self.resolver.resolve(&chain_id, false).await {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!("Resolution of chain {} failed: {}", chain_id, e),
            }
        }
        Ok(reports)
    }

    pub async fn block(&self, chain_id: &ChainId, reference: BlockRef, policy: ResolvePolicy) -> Result<Block, NodeError> {
        let ledger = self.ledger(chain_id, policy).await?;
        ledger
            .block(reference)
            .cloned()
            .ok_or_else(|| NodeError::BlockNotFound(format!("{chain_id}/{}", describe_ref(reference))))
    }

    pub async fn find_block(&self, block_id: BlockId) -> Result<(ChainId, Block), NodeError> {
        self.ledgers
            .find_block(block_id)
            .await?
            .ok_or_else(|| NodeError::BlockNotFound(block_id.to_string()))
    }

    // Consents

    pub async fn consents(
        &self,
        chain_id: &ChainId,
        originals: Option<&DataOriginals>,
        policy: ResolvePolicy,
    ) -> Result<(Ledger, ConsentResolution), NodeError> {
        let ledger = self.ledger(chain_id, policy).await?;
        let resolution = resolve_consents(&ledger, Timestamp::now(), originals, self.secret());
        Ok((ledger, resolution))
    }

    /// Validate and record one consent. The submission is checked in full
    /// before any chain is touched; a rejected submission creates no block.
    pub async fn submit_consent(
        &self,
        chain_id: &ChainId,
        submission: ConsentSubmission,
        parts: Vec<DataPart>,
        policy: ResolvePolicy,
    ) -> Result<Block, NodeError> {
        let consent = match prepare_consent(submission, parts, self.secret(), Timestamp::now()) {
            Ok(consent) => consent,
            Err(e) => {
                metrics::increment_counter!("consent_submissions_rejected_total");
                tracing::debug!("Rejected submission for chain {}: {}", chain_id, e);
                return Err(e.into());
            }
        };

        self.ledger(chain_id, policy).await?;
        self.ledgers.append(chain_id, vec![consent]).await
    }
}

fn describe_ref(reference: BlockRef) -> String {
    match reference {
        BlockRef::Index(index) => index.to_string(),
        BlockRef::Id(id) => id.to_string(),
    }
}
