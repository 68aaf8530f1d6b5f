// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Reading a persisted `chain.json` outside of a running node.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use consent_ledger::types::{Block, ChainId};
use consent_ledger::{Ledger, LedgerSecret};

pub struct LedgerFile {
    pub path: PathBuf,
    pub chain_id: ChainId,
    pub blocks: Vec<Block>,
}

impl LedgerFile {
    /// Load the block list at `path`. The chain id is `chain_id` if given,
    /// otherwise the name of the directory holding the file.
    pub fn open(path: impl AsRef<Path>, chain_id: Option<&str>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let blocks: Vec<Block> = serde_json::from_slice(&data)
            .with_context(|| format!("{} is not a ledger file", path.display()))?;

        let name = match chain_id {
            Some(id) => id.to_string(),
            None => path
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
                .map(String::from)
                .context("Cannot infer the chain id from the path; pass --chain-id")?,
        };
        let chain_id = ChainId::new(name)?;

        Ok(Self {
            path,
            chain_id,
            blocks,
        })
    }

    /// Verify under `secret` and wrap as a ledger.
    pub fn into_ledger(self, secret: &LedgerSecret) -> Result<Ledger> {
        let path = self.path;
        Ledger::from_blocks(self.chain_id, self.blocks, secret)
            .with_context(|| format!("{} failed verification", path.display()))
    }
}
