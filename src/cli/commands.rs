//! CLI command implementations

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use dialoguer::Confirm;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use tracing::{error, info, warn};

use crate::config::{Config, DemoConfig};
use crate::ledger::{InMemoryLedger, LedgerClient, RpcLedger};
use crate::wallet::{
    encode_keypair, lamports_to_sol, load_keypair, sol_to_lamports, ReclaimOutcome, WalletManager,
};

/// Confirmation latency simulated by `--dry-run`, roughly one slot
const DRY_RUN_CONFIRMATION_DELAY: Duration = Duration::from_millis(400);

/// Run the worker lifecycle demo: fund a worker, simulate activity, reclaim it
pub async fn demo(config: &Config, dry_run: bool, yes: bool) -> Result<()> {
    info!("Starting worker wallet demo");

    let manager = if dry_run {
        warn!("Running in DRY-RUN mode - transfers go to an in-memory ledger");
        dry_run_manager(config).await?
    } else {
        if !yes && config.rpc.endpoint.contains("mainnet") {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "{} looks like mainnet. Move real SOL through a worker wallet?",
                    config.rpc.endpoint
                ))
                .default(false)
                .interact()?;

            if !confirmed {
                info!("Demo cancelled by user");
                return Ok(());
            }
        }
        WalletManager::from_config(config)?
    };

    run_demo(&manager, &config.demo).await
}

/// Build a manager backed by an in-memory ledger seeded with treasury funds
async fn dry_run_manager(config: &Config) -> Result<WalletManager> {
    let treasury_key = match &config.treasury.private_key {
        Some(key) if !key.trim().is_empty() => key.clone(),
        _ => {
            warn!("No treasury key configured, using a throwaway keypair");
            encode_keypair(&Keypair::new())
        }
    };

    let ledger = Arc::new(InMemoryLedger::new().with_confirmation_delay(DRY_RUN_CONFIRMATION_DELAY));
    let manager = WalletManager::new(Some(treasury_key.as_str()), ledger.clone())?;
    ledger
        .airdrop(
            &manager.treasury_pubkey(),
            sol_to_lamports(config.demo.dry_run_treasury_sol),
        )
        .await;

    Ok(manager)
}

/// The demo flow against an already constructed manager
pub async fn run_demo(manager: &WalletManager, demo: &DemoConfig) -> Result<()> {
    let treasury = manager.treasury_pubkey();
    let initial_treasury = manager.get_sol_balance(&treasury).await?;
    info!("Initial Treasury Balance: {:.4} SOL", initial_treasury);

    if initial_treasury < demo.min_treasury_balance_sol {
        error!(
            "Treasury balance is too low. Please airdrop at least {} SOL to it on devnet to run this demo.",
            demo.min_treasury_balance_sol
        );
        error!("Your treasury address is: {}", treasury);
        error!("Run: solana airdrop 2 {}", treasury);
        return Ok(());
    }

    let settle = Duration::from_millis(demo.settle_delay_ms);

    info!("--- Starting Worker Wallet Creation ---");
    let worker = match manager.create_and_fund_wallet(demo.funding_amount_sol).await {
        Ok(worker) => worker,
        Err(e) => {
            error!("Failed during worker wallet creation and funding: {}", e);
            cleanup(manager).await;
            anyhow::bail!("Aborting demo: {}", e);
        }
    };
    tokio::time::sleep(settle).await;

    let worker_balance = manager.get_sol_balance(&worker.pubkey()).await?;
    info!(
        "Worker wallet {} created and funded with ~{:.4} SOL.",
        worker.pubkey(),
        worker_balance
    );

    info!("--- Simulating Trading Activity... ---");
    tokio::time::sleep(Duration::from_millis(demo.activity_duration_ms)).await;
    info!("--- Trading Simulation Complete. ---");

    info!("--- Starting Worker Wallet Closure ---");
    match manager.close_wallet_and_reclaim_sol(&worker).await {
        Ok(ReclaimOutcome::Reclaimed {
            signature,
            lamports,
        }) => {
            info!("Reclaimed {} lamports (sig: {})", lamports, signature);
        }
        Ok(ReclaimOutcome::NoTransferNeeded) => {
            info!("Worker was already empty, no transaction needed");
        }
        Err(e) => {
            error!("Failed to close the worker wallet: {}", e);
            cleanup(manager).await;
            anyhow::bail!("Worker {} may still hold funds", worker.pubkey());
        }
    }
    tokio::time::sleep(settle).await;

    let final_worker = manager.get_sol_balance(&worker.pubkey()).await?;
    let final_treasury = manager.get_sol_balance(&treasury).await?;
    info!("Final Worker Balance: {:.4} SOL", final_worker);
    info!("Final Treasury Balance: {:.4} SOL", final_treasury);
    info!(
        "Net treasury change: {:.9} SOL",
        final_treasury - initial_treasury
    );

    info!("Worker wallet demo complete");
    Ok(())
}

/// Last attempt to sweep any worker left behind by a failed step
async fn cleanup(manager: &WalletManager) {
    let open = manager.active_workers();
    if open.is_empty() {
        return;
    }

    for worker in &open {
        warn!(worker = %worker, "Worker left open by a failed step");
    }
    warn!("Attempting to reclaim {} open worker(s)", open.len());
    for (worker, outcome) in manager.close_all_wallets().await {
        match outcome {
            Ok(outcome) => info!(
                "Closed {} ({} lamports reclaimed)",
                worker,
                outcome.reclaimed_lamports()
            ),
            Err(e) => error!("Worker {} still open: {}", worker, e),
        }
    }
}

/// Print the balance of an address
pub async fn balance(config: &Config, address: &str) -> Result<()> {
    let address: Pubkey = address
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address {}: {}", address, e))?;

    let ledger = RpcLedger::new(&config.rpc);
    let lamports = ledger.get_balance(&address).await?;

    println!("{}: {:.9} SOL ({} lamports)", address, lamports_to_sol(lamports), lamports);
    Ok(())
}

/// Print the treasury address and balance
pub async fn treasury(config: &Config) -> Result<()> {
    let manager = WalletManager::from_config(config)?;
    let treasury = manager.treasury_pubkey();
    let balance = manager.get_sol_balance(&treasury).await?;

    println!("\n=== TREASURY ===\n");
    println!("Address: {}", treasury);
    println!("Balance: {:.4} SOL", balance);
    println!("Endpoint: {}", config.rpc.endpoint);
    Ok(())
}

/// Generate a new keypair for use as a treasury
pub fn keygen() -> Result<()> {
    let keypair = Keypair::new();

    println!("\n=== NEW KEYPAIR ===\n");
    println!("Address: {}", keypair.pubkey());
    println!("Secret key (base58): {}", encode_keypair(&keypair));
    println!("\nStore the secret key as PRIVATE_KEY in your .env file.");
    println!("Devnet funding: solana airdrop 2 {} --url devnet", keypair.pubkey());
    Ok(())
}

/// Show configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check ledger connectivity
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== SYSTEM HEALTH CHECK ===\n");

    let ledger = RpcLedger::new(&config.rpc);
    print!("RPC Endpoint... ");
    let start = Instant::now();
    match ledger.get_latest_blockhash().await {
        Ok(_) => println!("OK ({}ms)", start.elapsed().as_millis()),
        Err(e) => {
            println!("FAILED: {}", e);
            anyhow::bail!("Ledger unreachable");
        }
    }

    print!("Treasury credential... ");
    match load_keypair(config.treasury.private_key.as_deref()) {
        Ok(keypair) => println!("OK ({})", keypair.pubkey()),
        Err(e) => {
            println!("FAILED: {}", e);
            anyhow::bail!("Treasury credential unusable");
        }
    }

    println!("\nAll checks passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_demo() -> DemoConfig {
        DemoConfig {
            settle_delay_ms: 0,
            activity_duration_ms: 0,
            ..DemoConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_demo_reclaims_worker() {
        let ledger = Arc::new(InMemoryLedger::new());
        let manager =
            WalletManager::new(Some(encode_keypair(&Keypair::new()).as_str()), ledger.clone())
                .unwrap();
        ledger.airdrop(&manager.treasury_pubkey(), 1_000_000_000).await;

        run_demo(&manager, &quick_demo()).await.unwrap();

        assert_eq!(manager.worker_count(), 0);
        assert_eq!(ledger.submission_count().await, 2);
    }

    #[tokio::test]
    async fn test_run_demo_skips_underfunded_treasury() {
        let ledger = Arc::new(InMemoryLedger::new());
        let manager =
            WalletManager::new(Some(encode_keypair(&Keypair::new()).as_str()), ledger.clone())
                .unwrap();
        ledger.airdrop(&manager.treasury_pubkey(), 1_000_000).await;

        run_demo(&manager, &quick_demo()).await.unwrap();
        assert_eq!(ledger.submission_count().await, 0);
    }

    #[tokio::test]
    async fn test_dry_run_without_key_uses_throwaway_treasury() {
        let config = Config::default();
        let manager = dry_run_manager(&config).await.unwrap();
        assert_eq!(
            manager.get_sol_balance(&manager.treasury_pubkey()).await.unwrap(),
            config.demo.dry_run_treasury_sol
        );
    }
}
