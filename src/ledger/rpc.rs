//! Solana JSON-RPC ledger client

use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use tracing::{debug, info};

use super::LedgerClient;
use crate::config::RpcConfig;
use crate::error::{Error, Result};

/// Ledger client backed by a Solana RPC node
pub struct RpcLedger {
    rpc_client: RpcClient,
}

impl RpcLedger {
    /// Create a new RPC ledger client
    pub fn new(config: &RpcConfig) -> Self {
        info!(
            "RPC ledger client for {} (commitment: {:?}, timeout: {}ms)",
            config.endpoint, config.commitment, config.timeout_ms
        );

        let rpc_client = RpcClient::new_with_timeout_and_commitment(
            config.endpoint.clone(),
            Duration::from_millis(config.timeout_ms),
            config.commitment.to_commitment_config(),
        );

        Self { rpc_client }
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        self.rpc_client
            .get_balance(address)
            .await
            .map_err(|e| Error::LedgerConnectivity(format!("Failed to get balance: {}", e)))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.rpc_client
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::LedgerConnectivity(format!("Failed to get blockhash: {}", e)))
    }

    async fn submit_and_confirm(
        &self,
        mut transaction: Transaction,
        signers: &[&Keypair],
    ) -> Result<Signature> {
        let blockhash = if transaction.message.recent_blockhash == Hash::default() {
            self.get_latest_blockhash().await?
        } else {
            transaction.message.recent_blockhash
        };

        transaction
            .try_sign(signers, blockhash)
            .map_err(|e| Error::LedgerRejection(format!("Signing failed: {}", e)))?;

        // The first signature is the transaction id, known before submission
        let signature = transaction.signatures[0];
        debug!("Submitting transaction {}", signature);

        self.rpc_client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(|e| match Error::from(e) {
                Error::LedgerConnectivity(msg) => Error::LedgerConnectivity(format!(
                    "{} (transaction {} may still land)",
                    msg, signature
                )),
                other => other,
            })
    }

    fn endpoint(&self) -> String {
        self.rpc_client.url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Commitment;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connectivity_error() {
        let config = RpcConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout_ms: 500,
            commitment: Commitment::Confirmed,
        };
        let ledger = RpcLedger::new(&config);
        assert_eq!(ledger.endpoint(), "http://127.0.0.1:1");

        let err = ledger.get_balance(&Pubkey::new_unique()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
