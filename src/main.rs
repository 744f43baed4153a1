//! Worker Wallet Pool - ephemeral Solana worker wallets funded from a treasury
//!
//! # WARNING
//! - Transfers move real SOL unless `--dry-run` is used or the endpoint is devnet.
//! - A worker that is never closed keeps its balance on-chain.
//! - A transfer that times out may still land; check balances before retrying.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use worker_pool::cli::commands;
use worker_pool::config::Config;

/// Worker Wallet Pool - fund and reclaim ephemeral Solana wallets
#[derive(Parser)]
#[command(name = "worker-pool")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long, env = "WORKER_POOL_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and fund a worker, simulate activity, then reclaim it
    Demo {
        /// Run against an in-memory ledger (no real transfers)
        #[arg(long)]
        dry_run: bool,

        /// Skip the mainnet confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the balance of an address
    Balance {
        /// Account address (base58)
        address: String,
    },

    /// Show treasury address and balance
    Treasury,

    /// Generate a new treasury keypair
    Keygen,

    /// Show current configuration (secrets masked)
    Config,

    /// Check RPC connectivity and treasury credential
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.log_json);

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Demo { dry_run, yes } => commands::demo(&config, dry_run, yes).await,
        Commands::Balance { address } => commands::balance(&config, &address).await,
        Commands::Treasury => commands::treasury(&config).await,
        Commands::Keygen => commands::keygen(),
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("worker_pool=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
