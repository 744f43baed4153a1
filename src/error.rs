//! Error types for the worker wallet pool

use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::RpcError;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the worker wallet pool
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    // Ledger errors
    #[error("Ledger connectivity error: {0}")]
    LedgerConnectivity(String),

    #[error("Ledger rejected transaction: {0}")]
    LedgerRejection(String),

    // Transfer errors
    #[error("Transfer of {amount_sol} SOL from {from} to {to} failed: {source}")]
    Transfer {
        from: Pubkey,
        to: Pubkey,
        amount_sol: f64,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid transfer amount: {0} SOL")]
    InvalidAmount(f64),
}

impl Error {
    /// Wrap a ledger failure with the context of the transfer that caused it
    pub fn transfer(from: Pubkey, to: Pubkey, amount_sol: f64, source: Error) -> Self {
        Error::Transfer {
            from,
            to,
            amount_sol,
            source: Box::new(source),
        }
    }

    /// Check if this error is a transient network condition
    ///
    /// Transient errors on a transfer are ambiguous: the transaction may still
    /// land, so resubmitting can move funds twice.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::LedgerConnectivity(_) => true,
            Error::Transfer { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Check if the failed operation can be rebuilt and resubmitted without
    /// risk of a duplicate transfer
    pub fn is_safe_to_resubmit(&self) -> bool {
        match self {
            Error::LedgerRejection(_) => true,
            Error::Transfer { source, .. } => source.is_safe_to_resubmit(),
            _ => false,
        }
    }

    /// Check if this error is fatal to construction
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::InvalidCredential(_))
    }
}

// Conversion from solana_client errors
impl From<ClientError> for Error {
    fn from(e: ClientError) -> Self {
        match e.kind() {
            ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
                Error::LedgerConnectivity(e.to_string())
            }
            // Raised when confirmation polling gives up
            ClientErrorKind::RpcError(RpcError::ForUser(_)) => {
                Error::LedgerConnectivity(e.to_string())
            }
            ClientErrorKind::RpcError(_)
            | ClientErrorKind::TransactionError(_)
            | ClientErrorKind::SigningError(_) => Error::LedgerRejection(e.to_string()),
            _ => Error::LedgerConnectivity(e.to_string()),
        }
    }
}
