// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! consent-ledger: per-owner hash-linked consent ledgers, keyed block
//! digests, and deterministic replay of consent state.

pub mod digest;
pub mod error;
pub mod ledger;
pub mod replay;
pub mod submission;
pub mod types;
pub mod verify;

pub use digest::{Digest, LedgerSecret};
pub use error::{IntegrityError, LedgerError, LedgerResult, SubmissionError};
pub use ledger::Ledger;
pub use replay::{resolve_consents, ConsentResolution, DataOriginals};
pub use submission::{prepare_consent, ConsentSubmission, DataPart, SubsystemSubmission};

#[cfg(test)]
pub mod tests;
