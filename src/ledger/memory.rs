//! In-memory ledger
//!
//! Deterministic stand-in for a Solana cluster that executes system transfers,
//! charges per-signature fees to the fee payer and enforces blockhash validity
//! and duplicate-signature rejection. Backs `--dry-run` and the test suite.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    system_instruction::SystemInstruction,
    system_program,
    transaction::Transaction,
};
use tokio::sync::Mutex;
use tracing::debug;

use super::LedgerClient;
use crate::error::{Error, Result};

/// Fee charged per required signature (Solana's base fee)
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

/// Number of recent blockhashes accepted for new transactions
const MAX_RECENT_BLOCKHASHES: usize = 150;

/// Failure to return from the next submission
#[derive(Debug, Clone)]
pub enum InjectedFailure {
    /// Refuse the transaction without executing it
    Rejection(String),
    /// Drop the transaction and report a timeout
    Timeout,
    /// Execute the transaction but report a timeout
    TimeoutAfterLanding,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Pubkey, u64>,
    recent_blockhashes: VecDeque<Hash>,
    processed: HashSet<Signature>,
    submissions: usize,
    fees_collected: u64,
    next_failure: Option<InjectedFailure>,
}

impl LedgerState {
    fn issue_blockhash(&mut self) -> Hash {
        let blockhash = Hash::new_unique();
        self.recent_blockhashes.push_back(blockhash);
        while self.recent_blockhashes.len() > MAX_RECENT_BLOCKHASHES {
            self.recent_blockhashes.pop_front();
        }
        blockhash
    }

    /// Apply a signed transaction atomically
    fn execute(&mut self, transaction: &Transaction) -> Result<Signature> {
        transaction
            .verify()
            .map_err(|e| Error::LedgerRejection(format!("Signature verification failed: {}", e)))?;

        let message = &transaction.message;
        if !self.recent_blockhashes.contains(&message.recent_blockhash) {
            return Err(Error::LedgerRejection("Blockhash not found".to_string()));
        }

        let signature = transaction.signatures[0];
        if self.processed.contains(&signature) {
            return Err(Error::LedgerRejection(
                "This transaction has already been processed".to_string(),
            ));
        }

        let account = |index: u8| -> Result<Pubkey> {
            message
                .account_keys
                .get(index as usize)
                .copied()
                .ok_or_else(|| {
                    Error::LedgerRejection(format!("Account index {} out of range", index))
                })
        };

        let fee_payer = account(0)?;
        let fee = LAMPORTS_PER_SIGNATURE * message.header.num_required_signatures as u64;

        let mut balances = self.balances.clone();
        debit(&mut balances, &fee_payer, fee)
            .map_err(|e| Error::LedgerRejection(format!("Insufficient funds for fee: {}", e)))?;

        for instruction in &message.instructions {
            if account(instruction.program_id_index)? != system_program::id() {
                return Err(Error::LedgerRejection(
                    "Only system program instructions are supported".to_string(),
                ));
            }

            let lamports = match bincode::deserialize::<SystemInstruction>(&instruction.data) {
                Ok(SystemInstruction::Transfer { lamports }) => lamports,
                Ok(other) => {
                    return Err(Error::LedgerRejection(format!(
                        "Unsupported system instruction: {:?}",
                        other
                    )))
                }
                Err(e) => {
                    return Err(Error::LedgerRejection(format!(
                        "Invalid instruction data: {}",
                        e
                    )))
                }
            };

            let (from_index, to_index) = match instruction.accounts.as_slice() {
                [from, to, ..] => (*from, *to),
                _ => {
                    return Err(Error::LedgerRejection(
                        "Transfer requires two accounts".to_string(),
                    ))
                }
            };

            if !message.is_signer(from_index as usize) {
                return Err(Error::LedgerRejection(
                    "Transfer source did not sign".to_string(),
                ));
            }

            let from = account(from_index)?;
            let to = account(to_index)?;
            debit(&mut balances, &from, lamports).map_err(Error::LedgerRejection)?;
            credit(&mut balances, &to, lamports).map_err(Error::LedgerRejection)?;
        }

        self.balances = balances;
        self.processed.insert(signature);
        self.fees_collected = self.fees_collected.saturating_add(fee);

        Ok(signature)
    }
}

fn debit(
    balances: &mut HashMap<Pubkey, u64>,
    account: &Pubkey,
    lamports: u64,
) -> std::result::Result<(), String> {
    let balance = balances.entry(*account).or_insert(0);
    let available = *balance;
    *balance = available.checked_sub(lamports).ok_or_else(|| {
        format!(
            "account {} has {} lamports, needs {}",
            account, available, lamports
        )
    })?;
    Ok(())
}

fn credit(
    balances: &mut HashMap<Pubkey, u64>,
    account: &Pubkey,
    lamports: u64,
) -> std::result::Result<(), String> {
    let balance = balances.entry(*account).or_insert(0);
    let current = *balance;
    *balance = current.checked_add(lamports).ok_or_else(|| {
        format!(
            "account {} would overflow: has {} lamports, receives {}",
            account, current, lamports
        )
    })?;
    Ok(())
}

/// Simulated ledger held in process memory
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    offline: AtomicBool,
    confirmation_delay: Duration,
}

impl InMemoryLedger {
    /// Create an empty ledger that confirms instantly
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            offline: AtomicBool::new(false),
            confirmation_delay: Duration::ZERO,
        }
    }

    /// Wait this long before confirming each submission
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Credit lamports to an account out of thin air
    pub async fn airdrop(&self, address: &Pubkey, lamports: u64) {
        let mut state = self.state.lock().await;
        let balance = state.balances.entry(*address).or_insert(0);
        *balance = balance.saturating_add(lamports);
        debug!("Airdropped {} lamports to {}", lamports, address);
    }

    /// Number of submissions received, including failed ones
    pub async fn submission_count(&self) -> usize {
        self.state.lock().await.submissions
    }

    /// Total fees charged so far
    pub async fn fees_collected(&self) -> u64 {
        self.state.lock().await.fees_collected
    }

    /// Make the next submission fail
    pub async fn fail_next_submission(&self, failure: InjectedFailure) {
        self.state.lock().await.next_failure = Some(failure);
    }

    /// Invalidate every blockhash issued so far
    pub async fn expire_blockhashes(&self) {
        self.state.lock().await.recent_blockhashes.clear();
    }

    /// Simulate losing the connection to the cluster
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::LedgerConnectivity(
                "in-memory ledger is offline".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state.balances.get(address).copied().unwrap_or(0))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.check_online()?;
        Ok(self.state.lock().await.issue_blockhash())
    }

    async fn submit_and_confirm(
        &self,
        mut transaction: Transaction,
        signers: &[&Keypair],
    ) -> Result<Signature> {
        self.check_online()?;

        let mut state = self.state.lock().await;
        state.submissions += 1;

        let blockhash = if transaction.message.recent_blockhash == Hash::default() {
            state.issue_blockhash()
        } else {
            transaction.message.recent_blockhash
        };
        transaction
            .try_sign(signers, blockhash)
            .map_err(|e| Error::LedgerRejection(format!("Signing failed: {}", e)))?;

        let outcome = match state.next_failure.take() {
            None => state.execute(&transaction),
            Some(InjectedFailure::Rejection(reason)) => Err(Error::LedgerRejection(reason)),
            Some(InjectedFailure::Timeout) => Err(Error::LedgerConnectivity(
                "confirmation timed out".to_string(),
            )),
            Some(InjectedFailure::TimeoutAfterLanding) => match state.execute(&transaction) {
                Ok(signature) => Err(Error::LedgerConnectivity(format!(
                    "confirmation timed out (transaction {} may still land)",
                    signature
                ))),
                Err(e) => Err(e),
            },
        };
        drop(state);

        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }

        outcome
    }

    fn endpoint(&self) -> String {
        "in-memory".to_string()
    }
}
