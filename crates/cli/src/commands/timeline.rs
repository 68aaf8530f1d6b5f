// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use consent_ledger::replay::ChangeStatus;
use consent_ledger::types::Timestamp;
use consent_ledger::{resolve_consents, LedgerSecret};

use crate::ledger_file::LedgerFile;

pub fn run(path: &str, chain_id: Option<&str>, secret: &str) -> anyhow::Result<()> {
    let secret = LedgerSecret::new(secret);
    let ledger = LedgerFile::open(path, chain_id)?.into_ledger(&secret)?;
    let resolution = resolve_consents(&ledger, Timestamp::now(), None, &secret);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Block", "Created", "Action", "Consent", "Expire", "Status"]);

    for change in &resolution.changes {
        let status = match change.status {
            ChangeStatus::Initial => "initial",
            ChangeStatus::Updated => "updated",
            ChangeStatus::Unchanged => "unchanged",
        };
        table.add_row(vec![
            change.block.to_string(),
            change.created.to_string(),
            change.action.to_string(),
            change.consent.to_string(),
            change.expire.map(|e| e.to_string()).unwrap_or_else(|| "forever".into()),
            status.to_string(),
        ]);
    }

    println!("\nConsent Timeline for {}\n", ledger.chain_id());
    if resolution.changes.is_empty() {
        println!("(no consents recorded)\n");
    } else {
        println!("{table}\n");
    }

    Ok(())
}
