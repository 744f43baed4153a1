//! Wallet management module
//!
//! Treasury + ephemeral worker architecture:
//! - Credential decoding (base58 or JSON byte array)
//! - Worker registry owned by a single manager
//! - Transfer construction and SOL/lamport conversion
//! - Lifecycle manager: fund, inspect, reclaim
//!
//! # Architecture
//!
//! ```text
//! credentials → WalletManager → TransferIntent → LedgerClient
//!                    ↕
//!              WorkerRegistry
//! ```
//!
//! # Lifecycle
//!
//! A worker is registered, funded from the treasury, used, then swept back
//! with the treasury paying the fee. Workers that are never closed keep their
//! balance on-chain; nothing sweeps them in the background.

pub mod credentials;
pub mod manager;
pub mod registry;
pub mod transfer;

pub use credentials::{encode_keypair, load_keypair};
pub use manager::{ReclaimOutcome, WalletManager};
pub use registry::{WorkerRegistry, WorkerWallet};
pub use transfer::{lamports_to_sol, sol_to_lamports, TransferIntent};
