//! Active worker registry
//!
//! Owned by a single `WalletManager`. Holds each worker keypair from creation
//! until the worker is closed.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

/// Handle to a worker wallet held in the registry
#[derive(Clone)]
pub struct WorkerWallet {
    keypair: Arc<Keypair>,
}

impl WorkerWallet {
    fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub(crate) fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for WorkerWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerWallet")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

/// Worker keypairs keyed by address
#[derive(Default)]
pub struct WorkerRegistry {
    workers: DashMap<Pubkey, WorkerWallet>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh worker keypair and register it
    pub fn generate(&self) -> WorkerWallet {
        let worker = WorkerWallet::new(Keypair::new());
        self.workers.insert(worker.pubkey(), worker.clone());
        worker
    }

    pub fn get(&self, address: &Pubkey) -> Option<WorkerWallet> {
        self.workers.get(address).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, address: &Pubkey) -> bool {
        self.workers.contains_key(address)
    }

    /// Remove a worker, returning it if it was registered
    pub fn remove(&self, address: &Pubkey) -> Option<WorkerWallet> {
        self.workers.remove(address).map(|(_, worker)| worker)
    }

    pub fn addresses(&self) -> Vec<Pubkey> {
        self.workers.iter().map(|entry| *entry.key()).collect()
    }

    pub fn workers(&self) -> Vec<WorkerWallet> {
        self.workers.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_registers_worker() {
        let registry = WorkerRegistry::new();
        assert!(registry.is_empty());

        let worker = registry.generate();
        assert!(registry.contains(&worker.pubkey()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&worker.pubkey()).unwrap().pubkey(), worker.pubkey());
    }

    #[test]
    fn test_workers_are_distinct() {
        let registry = WorkerRegistry::new();
        let a = registry.generate();
        let b = registry.generate();
        assert_ne!(a.pubkey(), b.pubkey());

        let mut addresses = registry.addresses();
        addresses.sort();
        let mut expected = vec![a.pubkey(), b.pubkey()];
        expected.sort();
        assert_eq!(addresses, expected);
    }

    #[test]
    fn test_remove() {
        let registry = WorkerRegistry::new();
        let worker = registry.generate();

        assert!(registry.remove(&worker.pubkey()).is_some());
        assert!(registry.remove(&worker.pubkey()).is_none());
        assert!(!registry.contains(&worker.pubkey()));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let registry = WorkerRegistry::new();
        let worker = registry.generate();
        let secret = bs58::encode(worker.keypair().to_bytes()).into_string();

        let shown = format!("{:?}", worker);
        assert!(shown.contains(&worker.pubkey().to_string()));
        assert!(!shown.contains(&secret));
    }
}
