// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use crate::digest::{Digest, LedgerSecret};
use crate::types::consent::Consent;
use crate::types::id::{BlockId, ChainId};
use crate::types::time::{Timestamp, GENESIS_CREATED};

/// Immutable unit of a ledger.
///
/// The persisted record holds exactly these fields. `hash` is computed once
/// when the block is minted and only recomputed afterwards to verify it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub id: BlockId,
    pub created: Timestamp,
    pub previous_hash: Option<Digest>,
    pub hash: Digest,
    #[serde(default)]
    pub consents: Vec<Consent>,
}

impl Block {
    pub fn mint(
        index: u64,
        id: BlockId,
        created: Timestamp,
        previous_hash: Option<Digest>,
        consents: Vec<Consent>,
        secret: &LedgerSecret,
    ) -> Self {
        let hash = secret.block_digest(index, &id, created, previous_hash.as_ref(), &consents);
        Self {
            index,
            id,
            created,
            previous_hash,
            hash,
            consents,
        }
    }

    /// Index 0 block with no predecessor. Every input is fixed by the chain id,
    /// so independent nodes sharing a secret agree on its hash.
    pub fn genesis(chain_id: &ChainId, secret: &LedgerSecret) -> Self {
        Self::mint(0, BlockId::genesis(chain_id), GENESIS_CREATED, None, Vec::new(), secret)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Recompute the digest from the stored fields.
    pub fn compute_hash(&self, secret: &LedgerSecret) -> Digest {
        secret.block_digest(
            self.index,
            &self.id,
            self.created,
            self.previous_hash.as_ref(),
            &self.consents,
        )
    }

    pub fn has_valid_hash(&self, secret: &LedgerSecret) -> bool {
        self.compute_hash(secret) == self.hash
    }
}

/// Block listing without embedded consent detail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub index: u64,
    pub id: BlockId,
    pub created: Timestamp,
    pub previous_hash: Option<Digest>,
    pub hash: Digest,
    pub consents: usize,
}

impl From<&Block> for BlockSummary {
    fn from(block: &Block) -> Self {
        Self {
            index: block.index,
            id: block.id,
            created: block.created,
            previous_hash: block.previous_hash,
            hash: block.hash,
            consents: block.consents.len(),
        }
    }
}
