// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use consent_ledger::LedgerSecret;

use crate::ledger_file::LedgerFile;

/// Block table. With a secret, each block's digest is recomputed as well.
pub fn run(path: &str, chain_id: Option<&str>, secret: Option<&str>) -> anyhow::Result<()> {
    let file = LedgerFile::open(path, chain_id)?;
    let secret = secret.map(LedgerSecret::new);

    let mut header = vec!["Index", "Id", "Created", "Previous", "Hash", "Consents"];
    if secret.is_some() {
        header.push("Digest");
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    for block in &file.blocks {
        let mut row = vec![
            block.index.to_string(),
            block.id.to_string(),
            block.created.to_string(),
            block.previous_hash.map(|h| h.short()).unwrap_or_else(|| "-".into()),
            block.hash.short(),
            block.consents.len().to_string(),
        ];
        if let Some(secret) = &secret {
            let ok = block.has_valid_hash(secret);
            row.push(if ok { "OK" } else { "MISMATCH" }.to_string());
        }
        table.add_row(row);
    }

    println!("\nChain {} ({} blocks)\n", file.chain_id, file.blocks.len());
    println!("{table}\n");

    Ok(())
}
