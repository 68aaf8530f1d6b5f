// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use consent_ledger::verify::verify_chain;
use consent_ledger::LedgerSecret;

use crate::ledger_file::LedgerFile;

pub fn run(path: &str, chain_id: Option<&str>, secret: &str) -> anyhow::Result<()> {
    let file = LedgerFile::open(path, chain_id)?;
    let secret = LedgerSecret::new(secret);

    match verify_chain(&file.blocks, &secret) {
        Ok(()) => {
            println!("\n✅ VERIFIED\n");
            println!("Chain:  {}", file.chain_id);
            println!("Blocks: {}", file.blocks.len());
            if let Some(head) = file.blocks.last() {
                println!("Head:   {}\n", head.hash);
            }
            Ok(())
        }
        Err(e) => {
            println!("\n❌ CORRUPTED\n");
            println!("Chain:  {}", file.chain_id);
            println!("Reason: {}\n", e);
            Err(e.into())
        }
    }
}
