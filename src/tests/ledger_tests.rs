// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::digest::LedgerSecret;
use crate::error::{IntegrityError, LedgerError};
use crate::ledger::Ledger;
use crate::types::block::Block;
use crate::types::consent::{Consent, ConsentAction};
use crate::types::id::{BlockRef, ChainId};
use crate::types::time::{Timestamp, GENESIS_CREATED};

fn chain_id(s: &str) -> ChainId {
    ChainId::new(s).unwrap()
}

fn ts(s: &str) -> Timestamp {
    s.parse().unwrap()
}

fn consent(action: ConsentAction, granted: bool) -> Consent {
    Consent::new(action, granted, ts("2021-03-04T05:06:07.123456Z"))
}

#[test]
fn test_genesis_determinism() {
    let secret = LedgerSecret::new("deployment-secret");
    let a = Ledger::with_genesis(chain_id("U1"), &secret);
    let b = Ledger::with_genesis(chain_id("U1"), &LedgerSecret::new("deployment-secret"));

    assert_eq!(a.blocks()[0].hash, b.blocks()[0].hash);
    assert_eq!(a.blocks()[0].created, GENESIS_CREATED);
    assert!(a.blocks()[0].previous_hash.is_none());
    assert!(a.validate(&secret));
}

#[test]
fn test_genesis_differs_per_chain_and_secret() {
    let secret = LedgerSecret::new("deployment-secret");
    let u1 = Ledger::with_genesis(chain_id("U1"), &secret);
    let u2 = Ledger::with_genesis(chain_id("U2"), &secret);
    let other = Ledger::with_genesis(chain_id("U1"), &LedgerSecret::new("elsewhere"));

    assert_ne!(u1.blocks()[0].hash, u2.blocks()[0].hash);
    assert_ne!(u1.blocks()[0].hash, other.blocks()[0].hash);
}

#[test]
fn test_append_links_blocks() {
    let secret = LedgerSecret::new("k");
    let mut ledger = Ledger::with_genesis(chain_id("U1"), &secret);

    let first = ledger
        .append(vec![consent(ConsentAction::FirstNameRead, true)], None, &secret)
        .unwrap()
        .clone();
    let second = ledger
        .append(vec![consent(ConsentAction::EmailRead, false)], Some(ts("2022-01-01T00:00:00Z")), &secret)
        .unwrap()
        .clone();

    assert_eq!(first.index, 1);
    assert_eq!(second.index, 2);
    assert_eq!(first.previous_hash, Some(ledger.blocks()[0].hash));
    assert_eq!(second.previous_hash, Some(first.hash));
    assert_eq!(second.created, ts("2022-01-01T00:00:00Z"));
    assert_ne!(first.id, second.id);
    assert!(ledger.validate(&secret));
}

#[test]
fn test_append_to_empty_ledger_mints_index_zero() {
    let secret = LedgerSecret::new("k");
    let mut ledger = Ledger::empty(chain_id("U1"));
    assert!(ledger.validate(&secret));

    let block = ledger.append(Vec::new(), None, &secret).unwrap();
    assert_eq!(block.index, 0);
    assert!(block.previous_hash.is_none());
}

#[test]
fn test_append_refuses_corrupted_chain() {
    let secret = LedgerSecret::new("k");
    let mut ledger = Ledger::with_genesis(chain_id("U1"), &secret);
    ledger.append(vec![consent(ConsentAction::EmailRead, true)], None, &secret).unwrap();

    // A ledger loaded under a different secret cannot be extended: the
    // existing blocks no longer verify.
    let other = LedgerSecret::new("not-k");
    let err = ledger.append(Vec::new(), None, &other).unwrap_err();
    assert!(matches!(err, LedgerError::Integrity(IntegrityError::DigestMismatch { index: 0 })));
    assert_eq!(ledger.len(), 2);
}

#[test]
fn test_digest_stable_across_serialization() {
    let secret = LedgerSecret::new("k");
    let mut ledger = Ledger::with_genesis(chain_id("U1"), &secret);
    let mut c = consent(ConsentAction::LastNameWrite, true).with_expire(ts("2030-01-01T00:00:00Z"));
    c.subsystems.push(crate::types::consent::Subsystem {
        data_id: Some("X1".into()),
        media_type: Some("text/plain".into()),
        digest: Some(secret.data_digest(b"Doe")),
        ..Default::default()
    });
    ledger.append(vec![c], None, &secret).unwrap();

    let json = serde_json::to_string(ledger.blocks()).unwrap();
    let blocks: Vec<Block> = serde_json::from_str(&json).unwrap();

    for (original, reloaded) in ledger.blocks().iter().zip(&blocks) {
        assert_eq!(reloaded.compute_hash(&secret), original.hash);
        assert_eq!(reloaded, original);
    }
    assert!(Ledger::from_blocks(chain_id("U1"), blocks, &secret).is_ok());
}

#[test]
fn test_float_metadata_survives_reload() {
    let secret = LedgerSecret::new("k");
    let mut ledger = Ledger::with_genesis(chain_id("U1"), &secret);
    for raw in ["1.0715660391465826e-75", "0.1", "-0.0", "2.2250738585072014e-308", "1e300"] {
        let mut c = consent(ConsentAction::EmailRead, true);
        let mut subsystem = crate::types::consent::Subsystem::default();
        subsystem
            .metadata
            .insert("x".into(), serde_json::from_str(raw).unwrap());
        c.subsystems.push(subsystem);
        ledger.append(vec![c], None, &secret).unwrap();
    }

    let json = serde_json::to_string_pretty(ledger.blocks()).unwrap();
    let blocks: Vec<Block> = serde_json::from_str(&json).unwrap();
    for (original, reloaded) in ledger.blocks().iter().zip(&blocks) {
        assert_eq!(reloaded.compute_hash(&secret), original.hash);
    }
    assert!(Ledger::from_blocks(chain_id("U1"), blocks, &secret).is_ok());
}

#[test]
fn test_persisted_record_has_exact_fields() {
    let secret = LedgerSecret::new("k");
    let ledger = Ledger::with_genesis(chain_id("U1"), &secret);
    let value = serde_json::to_value(&ledger.blocks()[0]).unwrap();
    let mut keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    keys.sort();
    assert_eq!(keys, ["consents", "created", "hash", "id", "index", "previous_hash"]);
    assert_eq!(value["previous_hash"], serde_json::Value::Null);
    assert_eq!(value["created"], "1970-01-01T00:00:00.000000Z");
}

#[test]
fn test_from_blocks_rejects_tampering() {
    let secret = LedgerSecret::new("k");
    let mut ledger = Ledger::with_genesis(chain_id("U1"), &secret);
    ledger.append(vec![consent(ConsentAction::EmailRead, true)], None, &secret).unwrap();

    let mut blocks = ledger.into_blocks();
    blocks[1].consents[0].action = ConsentAction::EmailWrite;
    let err = Ledger::from_blocks(chain_id("U1"), blocks, &secret).unwrap_err();
    assert_eq!(err, IntegrityError::DigestMismatch { index: 1 });
}

#[test]
fn test_block_lookup() {
    let secret = LedgerSecret::new("k");
    let mut ledger = Ledger::with_genesis(chain_id("U1"), &secret);
    let id = ledger.append(Vec::new(), None, &secret).unwrap().id;

    assert_eq!(ledger.block(BlockRef::Index(1)).map(|b| b.id), Some(id));
    assert_eq!(ledger.block(BlockRef::Id(id)).map(|b| b.index), Some(1));
    assert!(ledger.block(BlockRef::Index(7)).is_none());
}
