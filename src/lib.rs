//! Worker Wallet Pool Library
//!
//! Funds ephemeral Solana worker wallets from a treasury and reclaims them.

pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{InMemoryLedger, LedgerClient, RpcLedger};
pub use wallet::{ReclaimOutcome, WalletManager, WorkerWallet};
