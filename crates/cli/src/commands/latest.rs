// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use consent_ledger::replay::ModificationType;
use consent_ledger::types::Timestamp;
use consent_ledger::{resolve_consents, LedgerSecret};

use crate::ledger_file::LedgerFile;

/// Latest consent per action, evaluated at `at` (defaults to now).
pub fn run(path: &str, chain_id: Option<&str>, secret: &str, at: Option<&str>) -> anyhow::Result<()> {
    let secret = LedgerSecret::new(secret);
    let now = match at {
        Some(at) => at.parse::<Timestamp>().with_context(|| format!("Invalid --at value '{at}'"))?,
        None => Timestamp::now(),
    };
    let ledger = LedgerFile::open(path, chain_id)?.into_ledger(&secret)?;
    let resolution = resolve_consents(&ledger, now, None, &secret);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Action", "Consent", "Effective", "Created", "Expire", "Block", "Type"]);

    for entry in resolution.rendered() {
        let kind = match entry.modification {
            ModificationType::Created => "created",
            ModificationType::Updated => "updated",
            ModificationType::Virtual => "virtual",
        };
        table.add_row(vec![
            entry.action.to_string(),
            entry.consent.to_string(),
            entry.effective.to_string(),
            entry.created.map(|c| c.to_string()).unwrap_or_default(),
            entry.expire.map(|e| e.to_string()).unwrap_or_default(),
            entry.block.map(|b| b.to_string()).unwrap_or_default(),
            kind.to_string(),
        ]);
    }

    println!("\nLatest Consents for {} at {}\n", ledger.chain_id(), now);
    println!("{table}\n");

    Ok(())
}
