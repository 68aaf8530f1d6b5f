// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::{Path, PathBuf};

use consent_cli::commands::{inspect, latest, timeline, verify};
use consent_cli::ledger_file::LedgerFile;
use consent_ledger::types::{ChainId, Consent, ConsentAction, Timestamp};
use consent_ledger::{Ledger, LedgerSecret};
use tempfile::tempdir;

const SECRET: &str = "cli-secret";

fn write_ledger(root: &Path) -> PathBuf {
    let secret = LedgerSecret::new(SECRET);
    let mut ledger = Ledger::with_genesis(ChainId::new("U1").unwrap(), &secret);
    let created: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
    ledger
        .append(vec![Consent::new(ConsentAction::FirstNameRead, true, created)], None, &secret)
        .unwrap();
    ledger
        .append(
            vec![Consent::new(ConsentAction::FirstNameRead, false, created)
                .with_expire("2030-01-01T00:00:00Z".parse().unwrap())],
            None,
            &secret,
        )
        .unwrap();

    let dir = root.join("U1");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("chain.json");
    std::fs::write(&path, serde_json::to_vec_pretty(ledger.blocks()).unwrap()).unwrap();
    path
}

#[test]
fn test_integration_workflow() {
    let dir = tempdir().unwrap();
    let path = write_ledger(dir.path());
    let path = path.to_str().unwrap();

    assert!(verify::run(path, None, SECRET).is_ok());
    assert!(inspect::run(path, None, Some(SECRET)).is_ok());
    assert!(inspect::run(path, None, None).is_ok());
    assert!(timeline::run(path, None, SECRET).is_ok());
    assert!(latest::run(path, None, SECRET, Some("2031-01-01T00:00:00Z")).is_ok());
}

#[test]
fn test_chain_id_from_directory() {
    let dir = tempdir().unwrap();
    let path = write_ledger(dir.path());

    let file = LedgerFile::open(&path, None).unwrap();
    assert_eq!(file.chain_id.as_str(), "U1");
    assert_eq!(file.blocks.len(), 3);

    let file = LedgerFile::open(&path, Some("other")).unwrap();
    assert_eq!(file.chain_id.as_str(), "other");
}

#[test]
fn test_wrong_secret_fails_verification() {
    let dir = tempdir().unwrap();
    let path = write_ledger(dir.path());
    let path = path.to_str().unwrap();

    assert!(verify::run(path, None, "not-the-secret").is_err());
    assert!(timeline::run(path, None, "not-the-secret").is_err());
}

#[test]
fn test_tampered_file_fails_verification() {
    let dir = tempdir().unwrap();
    let path = write_ledger(dir.path());
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, text.replacen("\"consent\": true", "\"consent\": false", 1)).unwrap();

    assert!(verify::run(path.to_str().unwrap(), None, SECRET).is_err());
}

#[test]
fn test_invalid_inputs() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("U1").join("chain.json");
    assert!(verify::run(missing.to_str().unwrap(), None, SECRET).is_err());

    let path = write_ledger(dir.path());
    assert!(latest::run(path.to_str().unwrap(), None, SECRET, Some("yesterday")).is_err());
}
