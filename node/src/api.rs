// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::collections::BTreeMap;

use consent_ledger::replay::ConsentResolution;
use consent_ledger::types::{Block, BlockSummary, ChainId};
use consent_ledger::{ConsentSubmission, DataOriginals, DataPart};
use serde::{Deserialize, Serialize};

use crate::errors::NodeError;
use crate::registry::Node;

/// Body of `GET /`, consumed by peers resolving this node's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub description: String,
    pub node: String,
    pub version: String,
}

#[derive(Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct NodesResponse {
    pub nodes: Vec<Node>,
    pub total: usize,
}

#[derive(Deserialize, Default)]
pub struct CreateChainRequest {
    #[serde(default)]
    pub id: Option<ChainId>,
}

#[derive(Serialize)]
pub struct ChainsResponse {
    pub chains: Vec<ChainId>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct ChainSummary {
    pub chain_id: ChainId,
    pub length: usize,
    pub head: Option<BlockSummary>,
}

#[derive(Deserialize, Default)]
pub struct ResolveQuery {
    #[serde(default)]
    pub resolve: bool,
}

#[derive(Deserialize, Default)]
pub struct BlocksQuery {
    #[serde(default)]
    pub detail: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockEntries {
    Full(Vec<Block>),
    Summary(Vec<BlockSummary>),
}

/// Body of `GET /chains/:id/blocks`, the peer chain fetch contract.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChainBlocksResponse {
    pub chain_id: ChainId,
    pub length: usize,
    pub blocks: BlockEntries,
}

#[derive(Serialize)]
pub struct BlockLookupResponse {
    pub chain_id: ChainId,
    pub block: Block,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    #[default]
    Utf8,
    Hex,
}

impl PayloadEncoding {
    pub fn decode(self, data: &str) -> Result<Vec<u8>, NodeError> {
        match self {
            PayloadEncoding::Utf8 => Ok(data.as_bytes().to_vec()),
            PayloadEncoding::Hex => hex::decode(data)
                .map_err(|e| NodeError::InvalidInput(format!("invalid hex payload: {e}"))),
        }
    }
}

/// Out-of-band data part carried alongside a submission.
#[derive(Deserialize)]
pub struct DataPartPayload {
    pub id: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub encoding: PayloadEncoding,
    pub data: String,
}

impl DataPartPayload {
    pub fn into_part(self) -> Result<DataPart, NodeError> {
        Ok(DataPart {
            data: self.encoding.decode(&self.data)?,
            id: self.id,
            media_type: self.media_type,
        })
    }
}

#[derive(Deserialize)]
pub struct SubmitConsentRequest {
    pub consent: ConsentSubmission,
    #[serde(default)]
    pub parts: Vec<DataPartPayload>,
}

#[derive(Serialize)]
pub struct SubmitConsentResponse {
    pub chain_id: ChainId,
    pub block: Block,
}

#[derive(Deserialize)]
pub struct VerifyConsentsRequest {
    pub originals: BTreeMap<String, String>,
    #[serde(default)]
    pub encoding: PayloadEncoding,
}

impl VerifyConsentsRequest {
    pub fn into_originals(self) -> Result<DataOriginals, NodeError> {
        let encoding = self.encoding;
        self.originals
            .into_iter()
            .map(|(id, data)| Ok((id, encoding.decode(&data)?)))
            .collect()
    }
}

#[derive(Serialize)]
pub struct ConsentsResponse {
    pub chain_id: ChainId,
    pub length: usize,
    #[serde(flatten)]
    pub resolution: ConsentResolution,
}
