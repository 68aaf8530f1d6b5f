// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity types.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Namespace for ids derived from a chain id (genesis block ids).
const CHAIN_NAMESPACE: Uuid = Uuid::from_u128(0x6c65_6467_6572_4000_8000_636f_6e73_656e);

const MAX_CHAIN_ID_LEN: usize = 128;

/// Stable identifier of a ledger's logical owner.
///
/// Restricted to `[A-Za-z0-9._-]` since stores use it as a directory name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        let valid_chars = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if value.is_empty()
            || value.len() > MAX_CHAIN_ID_LEN
            || !valid_chars
            || value == "."
            || value == ".."
        {
            return Err(LedgerError::InvalidChainId(value));
        }
        Ok(Self(value))
    }

    /// Fresh random chain id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChainId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ChainId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub Uuid);

impl BlockId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Genesis ids are a function of the chain id so that two nodes minting
    /// the same ledger independently produce the same block.
    pub fn genesis(chain_id: &ChainId) -> Self {
        Self(Uuid::new_v5(&CHAIN_NAMESPACE, chain_id.as_str().as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to a block within a chain: either its position or its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockRef {
    Index(u64),
    Id(BlockId),
}

impl FromStr for BlockRef {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<u64>() {
            return Ok(BlockRef::Index(index));
        }
        Uuid::parse_str(s)
            .map(|id| BlockRef::Id(BlockId(id)))
            .map_err(|_| LedgerError::InvalidBlockRef(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_validation() {
        assert!(ChainId::new("U1").is_ok());
        assert!(ChainId::new("4f1c2a9e-0000-4000-8000-000000000001").is_ok());
        assert!(ChainId::new("").is_err());
        assert!(ChainId::new("..").is_err());
        assert!(ChainId::new("a/b").is_err());
        assert!(ChainId::new("x".repeat(129)).is_err());
    }

    #[test]
    fn test_genesis_id_is_stable() {
        let chain = ChainId::new("U1").unwrap();
        assert_eq!(BlockId::genesis(&chain), BlockId::genesis(&chain));
        assert_ne!(
            BlockId::genesis(&chain),
            BlockId::genesis(&ChainId::new("U2").unwrap())
        );
    }

    #[test]
    fn test_block_ref_parse() {
        assert_eq!("3".parse::<BlockRef>().unwrap(), BlockRef::Index(3));
        let id = BlockId::generate();
        assert_eq!(id.to_string().parse::<BlockRef>().unwrap(), BlockRef::Id(id));
        assert!("not-a-ref".parse::<BlockRef>().is_err());
    }
}
