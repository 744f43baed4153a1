//! Ledger client abstraction
//!
//! Every call is a suspension point: the caller's flow waits for the ledger
//! to answer. Timeouts and commitment levels belong to the implementation,
//! never to the wallet manager.

pub mod memory;
pub mod rpc;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};

use crate::error::Result;

pub use memory::{InMemoryLedger, InjectedFailure, LAMPORTS_PER_SIGNATURE};
pub use rpc::RpcLedger;

/// Connection to the ledger that holds balances and confirms transactions
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Balance of an account in lamports
    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;

    /// Recent blockhash used to anchor a transaction
    async fn get_latest_blockhash(&self) -> Result<Hash>;

    /// Sign, submit and wait for confirmation
    ///
    /// A transaction whose recent blockhash is unset is anchored to the latest
    /// blockhash before signing.
    async fn submit_and_confirm(
        &self,
        transaction: Transaction,
        signers: &[&Keypair],
    ) -> Result<Signature>;

    /// Endpoint description for logs
    fn endpoint(&self) -> String;
}
