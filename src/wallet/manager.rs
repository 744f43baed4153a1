//! Wallet manager - worker wallet lifecycle
//!
//! Funds ephemeral worker wallets from the treasury and sweeps them back.
//! Every ledger interaction is awaited to confirmation before an operation
//! returns; nothing is fire-and-forget.

use std::sync::Arc;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ledger::{LedgerClient, RpcLedger};

use super::credentials::load_keypair;
use super::registry::{WorkerRegistry, WorkerWallet};
use super::transfer::{checked_sol_to_lamports, lamports_to_sol, TransferIntent};

/// Result of closing a worker wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReclaimOutcome {
    /// The worker was already empty; nothing was submitted
    NoTransferNeeded,
    /// The worker's whole balance was swept back to the treasury
    Reclaimed { signature: Signature, lamports: u64 },
}

impl ReclaimOutcome {
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            ReclaimOutcome::NoTransferNeeded => None,
            ReclaimOutcome::Reclaimed { signature, .. } => Some(signature),
        }
    }

    pub fn reclaimed_lamports(&self) -> u64 {
        match self {
            ReclaimOutcome::NoTransferNeeded => 0,
            ReclaimOutcome::Reclaimed { lamports, .. } => *lamports,
        }
    }
}

/// Core wallet manager
pub struct WalletManager {
    /// Funding source and sweep destination
    treasury: Keypair,

    /// Ledger connection for balances and transfers
    ledger: Arc<dyn LedgerClient>,

    /// Workers created by this manager and not yet closed
    workers: WorkerRegistry,
}

impl WalletManager {
    /// Create a new wallet manager
    ///
    /// Fails with `Error::Config` when no credential material is supplied and
    /// with `Error::InvalidCredential` when it cannot be decoded. Neither case
    /// touches the ledger.
    pub fn new(credential_material: Option<&str>, ledger: Arc<dyn LedgerClient>) -> Result<Self> {
        let treasury = load_keypair(credential_material).map_err(|e| {
            error!("Failed to load treasury wallet: {}", e);
            e
        })?;

        info!(
            pubkey = %treasury.pubkey(),
            ledger = %ledger.endpoint(),
            "Treasury wallet loaded successfully"
        );

        Ok(Self {
            treasury,
            ledger,
            workers: WorkerRegistry::new(),
        })
    }

    /// Create a wallet manager talking to the configured RPC endpoint
    pub fn from_config(config: &Config) -> Result<Self> {
        let ledger = Arc::new(RpcLedger::new(&config.rpc));
        Self::new(config.treasury.private_key.as_deref(), ledger)
    }

    /// Treasury address
    pub fn treasury_pubkey(&self) -> Pubkey {
        self.treasury.pubkey()
    }

    /// Create a worker wallet and fund it from the treasury
    ///
    /// The worker is registered before the funding transfer is submitted, so a
    /// failed transfer still leaves it reachable through [`Self::worker`] for
    /// cleanup. The failure is returned as `Error::Transfer` whose `to` is the
    /// worker address.
    pub async fn create_and_fund_wallet(&self, amount_sol: f64) -> Result<WorkerWallet> {
        let lamports = checked_sol_to_lamports(amount_sol)?;

        let worker = self.workers.generate();
        info!(
            worker = %worker.pubkey(),
            lamports,
            "Creating and funding worker wallet with {} SOL", amount_sol
        );

        self.transfer_sol(&self.treasury, &worker.pubkey(), amount_sol)
            .await?;

        Ok(worker)
    }

    /// Transfer SOL, signed and paid for by `from`
    ///
    /// Not idempotent. If this fails with a transient error the transaction
    /// may still have landed; check balances (or the signature named in the
    /// error) before calling again, or the amount can be sent twice.
    pub async fn transfer_sol(
        &self,
        from: &Keypair,
        to: &Pubkey,
        amount_sol: f64,
    ) -> Result<Signature> {
        let lamports = checked_sol_to_lamports(amount_sol)
            .map_err(|e| Error::transfer(from.pubkey(), *to, amount_sol, e))?;

        let intent = TransferIntent::new(from.pubkey(), *to, lamports);
        self.submit(&intent, intent.to_transaction(), &[from]).await
    }

    /// Sweep a worker's entire balance back to the treasury and forget it
    ///
    /// The treasury pays the network fee, so the full balance is recoverable
    /// however small it is. An empty worker is removed without submitting
    /// anything. On failure the worker stays registered.
    pub async fn close_wallet_and_reclaim_sol(
        &self,
        worker: &WorkerWallet,
    ) -> Result<ReclaimOutcome> {
        let address = worker.pubkey();
        let treasury = self.treasury.pubkey();

        if !self.workers.contains(&address) {
            warn!(worker = %address, "Closing a worker this manager does not track");
        }

        let balance = self.ledger.get_balance(&address).await.map_err(|e| {
            error!(worker = %address, "Failed to read worker balance: {}", e);
            e
        })?;

        if balance == 0 {
            info!(worker = %address, "Worker wallet has zero balance");
            self.workers.remove(&address);
            return Ok(ReclaimOutcome::NoTransferNeeded);
        }

        let amount_sol = lamports_to_sol(balance);
        let blockhash = self
            .ledger
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::transfer(address, treasury, amount_sol, e))?;

        let intent = TransferIntent::new(address, treasury, balance).with_fee_payer(treasury);
        let mut transaction = intent.to_transaction();
        transaction.message.recent_blockhash = blockhash;

        let signature = self
            .submit(&intent, transaction, &[worker.keypair(), &self.treasury])
            .await
            .map_err(|e| {
                error!(worker = %address, "Failed to close worker wallet");
                e
            })?;

        self.workers.remove(&address);
        info!(
            worker = %address,
            %signature,
            "Wallet closed and {} SOL reclaimed", amount_sol
        );

        Ok(ReclaimOutcome::Reclaimed {
            signature,
            lamports: balance,
        })
    }

    /// Close every tracked worker, one at a time
    pub async fn close_all_wallets(&self) -> Vec<(Pubkey, Result<ReclaimOutcome>)> {
        let mut results = Vec::new();
        for worker in self.workers.workers() {
            let outcome = self.close_wallet_and_reclaim_sol(&worker).await;
            if let Err(e) = &outcome {
                warn!(worker = %worker.pubkey(), "Worker left open: {}", e);
            }
            results.push((worker.pubkey(), outcome));
        }
        results
    }

    /// Get balance of an address in SOL
    pub async fn get_sol_balance(&self, address: &Pubkey) -> Result<f64> {
        Ok(lamports_to_sol(self.get_balance_lamports(address).await?))
    }

    /// Get balance of an address in lamports
    pub async fn get_balance_lamports(&self, address: &Pubkey) -> Result<u64> {
        self.ledger.get_balance(address).await
    }

    /// Look up a tracked worker
    pub fn worker(&self, address: &Pubkey) -> Option<WorkerWallet> {
        self.workers.get(address)
    }

    pub fn is_active(&self, address: &Pubkey) -> bool {
        self.workers.contains(address)
    }

    pub fn active_workers(&self) -> Vec<Pubkey> {
        self.workers.addresses()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    async fn submit(
        &self,
        intent: &TransferIntent,
        transaction: Transaction,
        signers: &[&Keypair],
    ) -> Result<Signature> {
        let amount_sol = lamports_to_sol(intent.lamports);
        info!(
            from = %intent.from,
            to = %intent.to,
            fee_payer = %intent.payer(),
            amount_sol,
            "Initiating SOL transfer"
        );

        match self.ledger.submit_and_confirm(transaction, signers).await {
            Ok(signature) => {
                info!(%signature, "Transfer successful");
                Ok(signature)
            }
            Err(e) => {
                error!(
                    from = %intent.from,
                    to = %intent.to,
                    amount_sol,
                    "Transfer failed: {}", e
                );
                debug!(
                    "Transfer failure is {}",
                    if e.is_safe_to_resubmit() {
                        "safe to resubmit"
                    } else {
                        "ambiguous, check balances before resubmitting"
                    }
                );
                Err(Error::transfer(intent.from, intent.to, amount_sol, e))
            }
        }
    }
}
