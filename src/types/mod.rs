// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod block;
pub mod consent;
pub mod id;
pub mod time;

pub use block::{Block, BlockSummary};
pub use consent::{Consent, ConsentAction, Subsystem};
pub use id::{BlockId, BlockRef, ChainId};
pub use time::{Timestamp, GENESIS_CREATED};
