// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

use crate::types::id::ChainId;

/// A chain failed self-validation. Never repaired; the chain is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("block at position {position} carries index {found}")]
    IndexMismatch { position: u64, found: u64 },
    #[error("genesis block must not reference a previous hash")]
    GenesisHasPrevious,
    #[error("block {index} does not reference a previous hash")]
    MissingPreviousHash { index: u64 },
    #[error("block {index} does not link to the hash of its predecessor")]
    BrokenLink { index: u64 },
    #[error("block {index} digest does not match its contents")]
    DigestMismatch { index: u64 },
}

/// A consent submission was rejected as a whole; no block was created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("no data part supplied for data_id '{0}'")]
    UnmatchedDataId(String),
    #[error("data part '{0}' is not referenced by any subsystem")]
    UnmatchedPart(String),
    #[error("data part '{0}' supplied more than once")]
    DuplicatePart(String),
    #[error("data_id '{0}' declared by more than one subsystem")]
    DuplicateDataId(String),
    #[error("malformed consent: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("submission rejected: {0}")]
    Submission(#[from] SubmissionError),
    #[error("chain '{0}' not found")]
    NotFound(ChainId),
    #[error("invalid chain id '{0}'")]
    InvalidChainId(String),
    #[error("invalid block reference '{0}'")]
    InvalidBlockRef(String),
}

pub type LedgerResult<T> = core::result::Result<T, LedgerError>;
