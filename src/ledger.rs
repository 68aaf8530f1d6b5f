// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Hash-linked ledger of one logical owner.
//!
//! # Invariants
//! - `blocks[i].index == i`
//! - `blocks[0].previous_hash` is absent
//! - `blocks[i].previous_hash == blocks[i - 1].hash`
//! - every stored `hash` recomputes from the block fields under the secret
//!
//! Blocks are never reordered or edited. The only mutations are appending a
//! freshly minted block and replacing the whole block list with another
//! chain that passed verification.

use serde::Serialize;

use crate::digest::LedgerSecret;
use crate::error::{IntegrityError, LedgerError};
use crate::types::block::Block;
use crate::types::consent::Consent;
use crate::types::id::{BlockId, BlockRef, ChainId};
use crate::types::time::Timestamp;
use crate::verify::verify_chain;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ledger {
    chain_id: ChainId,
    blocks: Vec<Block>,
}

impl Ledger {
    /// Empty ledger. Valid, but has no genesis yet.
    pub fn empty(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            blocks: Vec::new(),
        }
    }

    /// Ledger holding only the deterministic genesis block.
    pub fn with_genesis(chain_id: ChainId, secret: &LedgerSecret) -> Self {
        let genesis = Block::genesis(&chain_id, secret);
        Self {
            chain_id,
            blocks: vec![genesis],
        }
    }

    /// Adopt a block list after verifying it.
    pub fn from_blocks(
        chain_id: ChainId,
        blocks: Vec<Block>,
        secret: &LedgerSecret,
    ) -> Result<Self, IntegrityError> {
        verify_chain(&blocks, secret)?;
        Ok(Self { chain_id, blocks })
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn block(&self, reference: BlockRef) -> Option<&Block> {
        match reference {
            BlockRef::Index(index) => usize::try_from(index).ok().and_then(|i| self.blocks.get(i)),
            BlockRef::Id(id) => self.blocks.iter().find(|b| b.id == id),
        }
    }

    pub fn validate(&self, secret: &LedgerSecret) -> bool {
        verify_chain(&self.blocks, secret).is_ok()
    }

    pub fn verify(&self, secret: &LedgerSecret) -> Result<(), IntegrityError> {
        verify_chain(&self.blocks, secret)
    }

    /// Mint the next block from `consents` and append it.
    ///
    /// `created` defaults to now. The extended chain is re-verified before it
    /// replaces the current one; on failure the ledger is left untouched.
    pub fn append(
        &mut self,
        consents: Vec<Consent>,
        created: Option<Timestamp>,
        secret: &LedgerSecret,
    ) -> Result<&Block, LedgerError> {
        let block = Block::mint(
            self.blocks.len() as u64,
            BlockId::generate(),
            created.unwrap_or_else(Timestamp::now),
            self.last_block().map(|b| b.hash),
            consents,
            secret,
        );

        self.blocks.push(block);
        if let Err(e) = verify_chain(&self.blocks, secret) {
            self.blocks.pop();
            return Err(e.into());
        }

        let index = self.blocks.len() - 1;
        Ok(&self.blocks[index])
    }
}
