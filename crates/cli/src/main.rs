// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand};
use consent_cli::commands::{inspect, latest, timeline, verify};

#[derive(Parser)]
#[command(name = "consent")]
#[command(about = "Consent Ledger CLI - offline verification and inspection of persisted ledgers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the hash chain of a ledger file
    Verify {
        /// Path to a chain.json file
        path: String,

        /// Chain id (defaults to the name of the containing directory)
        #[arg(long)]
        chain_id: Option<String>,

        /// Deployment secret the ledger was written with
        #[arg(long, env = "CONSENT_LEDGER_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Show the blocks of a ledger file
    Inspect {
        path: String,

        #[arg(long)]
        chain_id: Option<String>,

        /// Also recompute each block digest
        #[arg(long, env = "CONSENT_LEDGER_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },
    /// List every consent change in ledger order
    Timeline {
        path: String,

        #[arg(long)]
        chain_id: Option<String>,

        #[arg(long, env = "CONSENT_LEDGER_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Show the latest consent per action
    Latest {
        path: String,

        #[arg(long)]
        chain_id: Option<String>,

        #[arg(long, env = "CONSENT_LEDGER_SECRET", hide_env_values = true)]
        secret: String,

        /// Evaluate expiry at this RFC 3339 time instead of now
        #[arg(long)]
        at: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            path,
            chain_id,
            secret,
        } => verify::run(&path, chain_id.as_deref(), &secret),
        Commands::Inspect {
            path,
            chain_id,
            secret,
        } => inspect::run(&path, chain_id.as_deref(), secret.as_deref()),
        Commands::Timeline {
            path,
            chain_id,
            secret,
        } => timeline::run(&path, chain_id.as_deref(), &secret),
        Commands::Latest {
            path,
            chain_id,
            secret,
            at,
        } => latest::run(&path, chain_id.as_deref(), &secret, at.as_deref()),
    }
}
