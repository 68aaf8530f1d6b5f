// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable ledger storage.
//!
//! A ledger is persisted as its literal, complete, ordered block list in
//! `<root>/<chain_id>/chain.json`. Writes go to a sibling temp file which is
//! fsynced and renamed over the target, so a reader sees either the previous
//! list or the new one.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use consent_ledger::types::{Block, ChainId};
use thiserror::Error;

pub const CHAIN_FILE: &str = "chain.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stored chain '{chain_id}' is unreadable: {source}")]
    Corrupt {
        chain_id: ChainId,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode chain '{chain_id}': {source}")]
    Encode {
        chain_id: ChainId,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistence of ledgers keyed by chain id.
///
/// Implementations store and return block lists verbatim; verification is
/// the caller's job.
pub trait LedgerStore: Send + Sync {
    fn load(&self, chain_id: &ChainId) -> Result<Option<Vec<Block>>, StoreError>;

    /// Replace the stored chain as one atomic step.
    fn save(&self, chain_id: &ChainId, blocks: &[Block]) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<ChainId>, StoreError>;
}

pub struct FileLedgerStore {
    root: PathBuf,
}

impl FileLedgerStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chain_path(&self, chain_id: &ChainId) -> PathBuf {
        self.root.join(chain_id.as_str()).join(CHAIN_FILE)
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl LedgerStore for FileLedgerStore {
    fn load(&self, chain_id: &ChainId) -> Result<Option<Vec<Block>>, StoreError> {
        let path = self.chain_path(chain_id);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };
        let blocks = serde_json::from_slice(&data).map_err(|source| StoreError::Corrupt {
            chain_id: chain_id.clone(),
            source,
        })?;
        Ok(Some(blocks))
    }

    fn save(&self, chain_id: &ChainId, blocks: &[Block]) -> Result<(), StoreError> {
        let path = self.chain_path(chain_id);
        let dir = self.root.join(chain_id.as_str());
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;

        let data = serde_json::to_vec_pretty(blocks).map_err(|source| StoreError::Encode {
            chain_id: chain_id.clone(),
            source,
        })?;

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path).map_err(io_err(&tmp_path))?;
            file.write_all(&data).map_err(io_err(&tmp_path))?;
            file.sync_all().map_err(io_err(&tmp_path))?;
        }
        fs::rename(&tmp_path, &path).map_err(io_err(&path))?;

        tracing::debug!("Persisted chain {} ({} blocks) to {:?}", chain_id, blocks.len(), path);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ChainId>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(io_err(&self.root))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err(&self.root))?;
            if !entry.path().join(CHAIN_FILE).is_file() {
                continue;
            }
            // Directories that are not valid chain ids were not written by us.
            if let Some(id) = entry.file_name().to_str().and_then(|n| ChainId::new(n).ok()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Volatile store, used when no data directory is configured and in tests.
#[derive(Default)]
pub struct MemoryLedgerStore {
    chains: Mutex<BTreeMap<ChainId, Vec<Block>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self, chain_id: &ChainId) -> Result<Option<Vec<Block>>, StoreError> {
        let chains = self.chains.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(chains.get(chain_id).cloned())
    }

    fn save(&self, chain_id: &ChainId, blocks: &[Block]) -> Result<(), StoreError> {
        let mut chains = self.chains.lock().unwrap_or_else(PoisonError::into_inner);
        chains.insert(chain_id.clone(), blocks.to_vec());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ChainId>, StoreError> {
        let chains = self.chains.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(chains.keys().cloned().collect())
    }
}
