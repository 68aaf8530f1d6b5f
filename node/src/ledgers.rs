// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Live ledgers with per-chain write serialization.
//!
//! Every chain id owns one slot guarded by an async mutex. Appends and
//! consensus replacements both take the slot lock, so two writers on the same
//! chain never interleave, while different chains proceed independently.
//! A change is written to the store before the in-memory ledger is swapped;
//! if the write fails the slot keeps the previous chain.
//!
//! Slots for chains that are held neither in memory nor in the store, and
//! have no round in flight, are dropped once their lock is released.

use std::sync::Arc;

use consent_ledger::types::{Block, BlockId, ChainId, Consent};
use consent_ledger::{Ledger, LedgerError, LedgerSecret};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::NodeError;
use crate::store::LedgerStore;

#[derive(Default)]
struct ChainSlot {
    loaded: bool,
    ledger: Option<Ledger>,
    /// Last consensus round handed out for this chain.
    next_round: u64,
    /// Newest round whose outcome has been applied.
    applied_round: u64,
    /// Rounds handed out but not yet completed.
    in_flight: u64,
}

impl ChainSlot {
    fn is_vacant(&self) -> bool {
        self.ledger.is_none() && self.in_flight == 0
    }
}

/// What happened to a candidate chain offered by a consensus round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Replaced,
    /// The local chain is at least as long as the candidate.
    KeptLocal,
    /// A newer round already completed; the candidate was discarded.
    Stale,
}

pub struct LedgerSet {
    store: Arc<dyn LedgerStore>,
    secret: Arc<LedgerSecret>,
    slots: DashMap<ChainId, Arc<Mutex<ChainSlot>>>,
}

impl LedgerSet {
    pub fn new(store: Arc<dyn LedgerStore>, secret: Arc<LedgerSecret>) -> Self {
        Self {
            store,
            secret,
            slots: DashMap::new(),
        }
    }

    pub fn secret(&self) -> &LedgerSecret {
        &self.secret
    }

    async fn lock(&self, chain_id: &ChainId) -> Result<OwnedMutexGuard<ChainSlot>, NodeError> {
        let slot = self
            .slots
            .entry(chain_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ChainSlot::default())))
            .clone();
        let mut guard = slot.lock_owned().await;

        if !guard.loaded {
            if let Some(blocks) = self.store.load(chain_id)? {
                let ledger = Ledger::from_blocks(chain_id.clone(), blocks, &self.secret)
                    .map_err(LedgerError::from)?;
                tracing::debug!("Loaded chain {} ({} blocks) from store", chain_id, ledger.len());
                guard.ledger = Some(ledger);
            }
            guard.loaded = true;
        }
        Ok(guard)
    }

    /// Release `slot`, dropping it from the map if it holds nothing.
    fn release(&self, chain_id: &ChainId, slot: OwnedMutexGuard<ChainSlot>) {
        let vacant = slot.is_vacant();
        drop(slot);
        if vacant {
            // Only the map's own reference may remain; anyone else holding the
            // Arc is queued on the lock and keeps the slot alive.
            self.slots.remove_if(chain_id, |_, slot| {
                Arc::strong_count(slot) == 1
                    && slot.try_lock().map_or(false, |s| s.is_vacant())
            });
        }
    }

    /// Snapshot of the current chain, if held locally.
    pub async fn get(&self, chain_id: &ChainId) -> Result<Option<Ledger>, NodeError> {
        let slot = self.lock(chain_id).await?;
        let ledger = slot.ledger.clone();
        self.release(chain_id, slot);
        Ok(ledger)
    }

    pub async fn list(&self) -> Result<Vec<ChainId>, NodeError> {
        Ok(self.store.list()?)
    }

    /// Mint a genesis-only ledger. Fails if the chain already exists.
    pub async fn create(&self, chain_id: &ChainId) -> Result<Ledger, NodeError> {
        let mut slot = self.lock(chain_id).await?;
        if slot.ledger.is_some() {
            return Err(NodeError::AlreadyExists(chain_id.clone()));
        }
        let ledger = Ledger::with_genesis(chain_id.clone(), &self.secret);
        self.store.save(chain_id, ledger.blocks())?;
        tracing::info!("Minted genesis for chain {}", chain_id);
        slot.ledger = Some(ledger.clone());
        Ok(ledger)
    }

    /// Current chain, minting the deterministic genesis if absent.
    /// Returns the ledger and whether it was minted by this call.
    pub async fn get_or_mint(&self, chain_id: &ChainId) -> Result<(Ledger, bool), NodeError> {
        let mut slot = self.lock(chain_id).await?;
        if let Some(ledger) = &slot.ledger {
            return Ok((ledger.clone(), false));
        }
        let ledger = Ledger::with_genesis(chain_id.clone(), &self.secret);
        self.store.save(chain_id, ledger.blocks())?;
        tracing::info!("Minted genesis for chain {}", chain_id);
        slot.ledger = Some(ledger.clone());
        Ok((ledger, true))
    }

    /// Append one block holding `consents`. All-or-nothing: on any failure
    /// neither the store nor the live ledger changes.
    pub async fn append(&self, chain_id: &ChainId, consents: Vec<Consent>) -> Result<Block, NodeError> {
        let mut slot = self.lock(chain_id).await?;
        let mut next = match slot.ledger.clone() {
            Some(current) => current,
            None => {
                self.release(chain_id, slot);
                return Err(LedgerError::NotFound(chain_id.clone()).into());
            }
        };
        let block = next.append(consents, None, &self.secret)?.clone();
        self.store.save(chain_id, next.blocks())?;
        slot.ledger = Some(next);

        metrics::increment_counter!("consent_blocks_appended_total");
        tracing::debug!("Appended block {} ({}) to chain {}", block.index, block.id, chain_id);
        Ok(block)
    }

    /// Hand out the next round token for `chain_id`.
    pub async fn begin_round(&self, chain_id: &ChainId) -> Result<u64, NodeError> {
        let mut slot = self.lock(chain_id).await?;
        slot.next_round += 1;
        slot.in_flight += 1;
        Ok(slot.next_round)
    }

    /// Close `round`, adopting `candidate` if it still beats the local chain.
    ///
    /// The comparison is repeated under the slot lock against whatever the
    /// chain holds now, since appends may have landed while peers were being
    /// queried. A round older than one already closed is discarded.
    pub async fn complete_round(
        &self,
        chain_id: &ChainId,
        round: u64,
        candidate: Option<Ledger>,
    ) -> Result<ApplyOutcome, NodeError> {
        let mut slot = self.lock(chain_id).await?;
        slot.in_flight = slot.in_flight.saturating_sub(1);
        let outcome = self.apply_candidate(chain_id, &mut slot, round, candidate);
        self.release(chain_id, slot);
        outcome
    }

    fn apply_candidate(
        &self,
        chain_id: &ChainId,
        slot: &mut ChainSlot,
        round: u64,
        candidate: Option<Ledger>,
    ) -> Result<ApplyOutcome, NodeError> {
        if round < slot.applied_round {
            tracing::debug!(
                "Discarding round {} for chain {}: round {} already applied",
                round,
                chain_id,
                slot.applied_round
            );
            return Ok(ApplyOutcome::Stale);
        }

        let local_len = slot.ledger.as_ref().map_or(0, Ledger::len);
        let outcome = match candidate {
            Some(candidate) if candidate.len() > local_len => {
                candidate.verify(&self.secret).map_err(LedgerError::from)?;
                self.store.save(chain_id, candidate.blocks())?;
                tracing::info!(
                    "Replaced chain {} ({} blocks) with candidate of {} blocks",
                    chain_id,
                    local_len,
                    candidate.len()
                );
                slot.ledger = Some(candidate);
                ApplyOutcome::Replaced
            }
            _ => ApplyOutcome::KeptLocal,
        };
        slot.applied_round = round;
        Ok(outcome)
    }

    /// Locate a block by id across every local chain.
    pub async fn find_block(&self, block_id: BlockId) -> Result<Option<(ChainId, Block)>, NodeError> {
        for chain_id in self.list().await? {
            if let Some(ledger) = self.get(&chain_id).await? {
                if let Some(block) = ledger.blocks().iter().find(|b| b.id == block_id) {
                    return Ok(Some((chain_id, block.clone())));
                }
            }
        }
        Ok(None)
    }
}
