// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Chain Verification.

use crate::digest::LedgerSecret;
use crate::error::IntegrityError;
use crate::types::block::Block;

/// Checks every block of a chain against the secret.
///
/// **Scope**: positional indices, genesis shape, linkage of each block to the
/// stored hash of its predecessor, and each block's own digest recomputed
/// from its fields. An empty chain is valid.
pub fn verify_chain(blocks: &[Block], secret: &LedgerSecret) -> Result<(), IntegrityError> {
    let mut previous: Option<&Block> = None;

    for (position, block) in blocks.iter().enumerate() {
        let position = position as u64;
        if block.index != position {
            return Err(IntegrityError::IndexMismatch {
                position,
                found: block.index,
            });
        }

        match (previous, block.previous_hash) {
            (None, Some(_)) => return Err(IntegrityError::GenesisHasPrevious),
            (Some(_), None) => return Err(IntegrityError::MissingPreviousHash { index: block.index }),
            (Some(prev), Some(link)) if prev.hash != link => {
                return Err(IntegrityError::BrokenLink { index: block.index })
            }
            _ => {}
        }

        if !block.has_valid_hash(secret) {
            return Err(IntegrityError::DigestMismatch { index: block.index });
        }

        previous = Some(block);
    }

    Ok(())
}

pub fn is_valid_chain(blocks: &[Block], secret: &LedgerSecret) -> bool {
    verify_chain(blocks, secret).is_ok()
}
