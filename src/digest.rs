// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Keyed BLAKE3 digests.
//!
//! Block hashes and data digests are BLAKE3 in keyed mode. The key is derived
//! from the deployment-wide ledger secret, one key per purpose, so a block hash
//! can never be replayed as a data digest or the other way around. BLAKE3 is
//! not subject to length extension, so a known hash gives no way to forge a
//! continuation of its preimage.
//!
//! # Block Hash Input Structure
//! ```text
//! index (u64 LE)
//! id (16 bytes)
//! created (canonical timestamp text, length-prefixed)
//! previous_hash (0 | 1 + 32 bytes)
//! consent count (u64 LE)
//! For each consent (insertion order):
//!   action, consent (u8), created, expire (optional)
//!   subsystem count (u64 LE)
//!   For each subsystem:
//!     data_id, data_type, data_provider, data_source, media_type,
//!     data_description (optional text each)
//!     metadata entry count, then key + canonical JSON value per entry
//!     digest (0 | 1 + 32 bytes)
//! ```
//! Text is `u64 LE length` followed by UTF-8 bytes. Optional values are a
//! presence marker (0 or 1) followed by the value.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::consent::{Consent, Subsystem};
use crate::types::id::BlockId;
use crate::types::time::Timestamp;

const BLOCK_KEY_CONTEXT: &str = "consent-ledger 2025-01-01 block digest v1";
const DATA_KEY_CONTEXT: &str = "consent-ledger 2025-01-01 data digest v1";

/// 32-byte digest, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(pub [u8; 32]);

#[derive(Debug, thiserror::Error)]
#[error("invalid digest '{0}'")]
pub struct DigestParseError(String);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex characters, for logs and tables.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short())
    }
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| DigestParseError(s.to_string()))?;
        Ok(Digest(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Deployment-wide secret keying every digest of a ledger.
#[derive(Clone)]
pub struct LedgerSecret {
    block_key: [u8; 32],
    data_key: [u8; 32],
}

impl fmt::Debug for LedgerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LedgerSecret(..)")
    }
}

impl LedgerSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            block_key: blake3::derive_key(BLOCK_KEY_CONTEXT, secret),
            data_key: blake3::derive_key(DATA_KEY_CONTEXT, secret),
        }
    }

    /// Keyed digest over a block's canonical field encoding.
    pub fn block_digest(
        &self,
        index: u64,
        id: &BlockId,
        created: Timestamp,
        previous_hash: Option<&Digest>,
        consents: &[Consent],
    ) -> Digest {
        let mut hasher = blake3::Hasher::new_keyed(&self.block_key);

        hasher.update(&index.to_le_bytes());
        hasher.update(id.as_bytes());
        update_str(&mut hasher, &created.canonical());
        update_opt_digest(&mut hasher, previous_hash);

        hasher.update(&(consents.len() as u64).to_le_bytes());
        for consent in consents {
            update_consent(&mut hasher, consent);
        }

        Digest(*hasher.finalize().as_bytes())
    }

    /// Keyed digest of an external data payload.
    pub fn data_digest(&self, payload: &[u8]) -> Digest {
        Digest(*blake3::keyed_hash(&self.data_key, payload).as_bytes())
    }
}

fn update_consent(hasher: &mut blake3::Hasher, consent: &Consent) {
    update_str(hasher, consent.action.as_str());
    hasher.update(&[u8::from(consent.consent)]);
    update_str(hasher, &consent.created.canonical());
    update_opt_str(hasher, consent.expire.map(|e| e.canonical()).as_deref());

    hasher.update(&(consent.subsystems.len() as u64).to_le_bytes());
    for subsystem in &consent.subsystems {
        update_subsystem(hasher, subsystem);
    }
}

fn update_subsystem(hasher: &mut blake3::Hasher, subsystem: &Subsystem) {
    update_opt_str(hasher, subsystem.data_id.as_deref());
    update_opt_str(hasher, subsystem.data_type.as_deref());
    update_opt_str(hasher, subsystem.data_provider.as_deref());
    update_opt_str(hasher, subsystem.data_source.as_deref());
    update_opt_str(hasher, subsystem.media_type.as_deref());
    update_opt_str(hasher, subsystem.data_description.as_deref());

    // BTreeMap iterates in key order; nested objects print with sorted keys.
    // Floats print shortest-form and parse back exactly (`float_roundtrip`).
    hasher.update(&(subsystem.metadata.len() as u64).to_le_bytes());
    for (key, value) in &subsystem.metadata {
        update_str(hasher, key);
        update_str(hasher, &value.to_string());
    }

    update_opt_digest(hasher, subsystem.digest.as_ref());
}

fn update_str(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn update_opt_str(hasher: &mut blake3::Hasher, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(&[1]);
            update_str(hasher, v);
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

fn update_opt_digest(hasher: &mut blake3::Hasher, value: Option<&Digest>) {
    match value {
        Some(d) => {
            hasher.update(&[1]);
            hasher.update(d.as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}
