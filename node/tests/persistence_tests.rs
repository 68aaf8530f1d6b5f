// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::collections::HashSet;
use std::sync::Arc;

use consent_ledger::types::{ChainId, ConsentAction};
use consent_ledger::ConsentSubmission;
use consent_node::config::NodeConfig;
use consent_node::engine::{Engine, ResolvePolicy};
use consent_node::errors::NodeError;
use consent_node::store::{FileLedgerStore, LedgerStore};
use tempfile::tempdir;

fn submission(action: ConsentAction, consent: bool) -> ConsentSubmission {
    ConsentSubmission {
        action,
        consent,
        expire: None,
        subsystems: Vec::new(),
    }
}

fn config(dir: &std::path::Path) -> NodeConfig {
    NodeConfig {
        data_dir: Some(dir.to_path_buf()),
        secret: "persisted".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_chain_survives_restart() {
    let dir = tempdir().unwrap();
    let id = ChainId::new("U1").unwrap();

    let before = {
        let engine = Engine::new(&config(dir.path())).unwrap();
        engine.create_chain(Some(id.clone())).await.unwrap();
        engine
            .submit_consent(&id, submission(ConsentAction::LastNameRead, true), Vec::new(), ResolvePolicy::LocalOnly)
            .await
            .unwrap();
        engine.ledger(&id, ResolvePolicy::LocalOnly).await.unwrap()
    };

    let engine = Engine::new(&config(dir.path())).unwrap();
    assert_eq!(engine.chains().await.unwrap(), vec![id.clone()]);
    let after = engine.ledger(&id, ResolvePolicy::LocalOnly).await.unwrap();
    assert_eq!(after, before);
    assert!(after.validate(engine.secret()));
}

#[tokio::test]
async fn test_tampered_file_never_served() {
    let dir = tempdir().unwrap();
    let id = ChainId::new("U1").unwrap();
    {
        let engine = Engine::new(&config(dir.path())).unwrap();
        engine
            .submit_consent(&id, submission(ConsentAction::EmailRead, false), Vec::new(), ResolvePolicy::ResolveOrMint)
            .await
            .unwrap();
    }

    let store = FileLedgerStore::open(dir.path()).unwrap();
    let path = store.chain_path(&id);
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, text.replace("\"consent\": false", "\"consent\": true")).unwrap();
    assert!(store.load(&id).unwrap().is_some());

    let engine = Engine::new(&config(dir.path())).unwrap();
    let err = engine.ledger(&id, ResolvePolicy::LocalOnly).await.unwrap_err();
    assert!(matches!(err, NodeError::Ledger(consent_ledger::LedgerError::Integrity(_))));
}

#[tokio::test]
async fn test_concurrent_appends_are_serialized() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(Engine::new(&config(dir.path())).unwrap());
    let id = ChainId::new("U1").unwrap();
    engine.create_chain(Some(id.clone())).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = engine.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .submit_consent(&id, submission(ConsentAction::EmailWrite, i % 2 == 0), Vec::new(), ResolvePolicy::LocalOnly)
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let ledger = engine.ledger(&id, ResolvePolicy::LocalOnly).await.unwrap();
    assert_eq!(ledger.len(), 17);
    assert!(ledger.validate(engine.secret()));

    let links: HashSet<_> = ledger.blocks().iter().filter_map(|b| b.previous_hash).collect();
    assert_eq!(links.len(), 16);

    let stored = FileLedgerStore::open(dir.path()).unwrap().load(&id).unwrap().unwrap();
    assert_eq!(stored, ledger.blocks());
}

#[tokio::test]
async fn test_chains_are_independent() {
    let engine = Arc::new(Engine::new(&NodeConfig::default()).unwrap());
    let u1 = ChainId::new("U1").unwrap();
    let u2 = ChainId::new("U2").unwrap();

    let (a, b) = tokio::join!(
        engine.submit_consent(&u1, submission(ConsentAction::FirstNameRead, true), Vec::new(), ResolvePolicy::ResolveOrMint),
        engine.submit_consent(&u2, submission(ConsentAction::FirstNameRead, false), Vec::new(), ResolvePolicy::ResolveOrMint),
    );
    assert_eq!(a.unwrap().index, 1);
    assert_eq!(b.unwrap().index, 1);
    assert_eq!(engine.chains().await.unwrap(), vec![u1, u2]);
}

#[tokio::test]
async fn test_float_metadata_chain_reloads() {
    let dir = tempdir().unwrap();
    let id = ChainId::new("U1").unwrap();
    let request: ConsentSubmission = serde_json::from_str(
        r#"{
            "action": "email-read",
            "consent": true,
            "subsystems": [{"metadata": {"x": 1.0715660391465826e-75, "y": 0.1}}]
        }"#,
    )
    .unwrap();

    {
        let engine = Engine::new(&config(dir.path())).unwrap();
        engine
            .submit_consent(&id, request, Vec::new(), ResolvePolicy::ResolveOrMint)
            .await
            .unwrap();
    }

    let engine = Engine::new(&config(dir.path())).unwrap();
    let ledger = engine.ledger(&id, ResolvePolicy::LocalOnly).await.unwrap();
    assert_eq!(ledger.len(), 2);
    assert!(ledger.validate(engine.secret()));
}
