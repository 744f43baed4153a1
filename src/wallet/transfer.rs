//! SOL transfer construction
//!
//! Builds the single-instruction system transfers used for funding and
//! reclaiming worker wallets, and converts between SOL and lamports.

use solana_sdk::{
    native_token::LAMPORTS_PER_SOL, pubkey::Pubkey, system_instruction,
    transaction::Transaction,
};

use crate::error::{Error, Result};

/// A transfer waiting to be signed and submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub from: Pubkey,
    pub to: Pubkey,
    pub lamports: u64,
    /// Account paying the network fee; the source pays when unset
    pub fee_payer: Option<Pubkey>,
}

impl TransferIntent {
    pub fn new(from: Pubkey, to: Pubkey, lamports: u64) -> Self {
        Self {
            from,
            to,
            lamports,
            fee_payer: None,
        }
    }

    /// Have another account pay the fee so the source can be emptied
    pub fn with_fee_payer(mut self, fee_payer: Pubkey) -> Self {
        self.fee_payer = Some(fee_payer);
        self
    }

    /// Account that will be charged the network fee
    pub fn payer(&self) -> Pubkey {
        self.fee_payer.unwrap_or(self.from)
    }

    /// Build the unsigned transaction for this transfer
    pub fn to_transaction(&self) -> Transaction {
        let instruction = system_instruction::transfer(&self.from, &self.to, self.lamports);
        Transaction::new_with_payer(&[instruction], Some(&self.payer()))
    }
}

/// Convert SOL to lamports
///
/// Rounds to the nearest lamport, halves away from zero, so that amounts like
/// 0.29 SOL (289_999_999.99... after multiplication) land on the intended value.
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}

/// Convert lamports to SOL
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert a caller-supplied SOL amount, rejecting values that cannot be sent
pub fn checked_sol_to_lamports(sol: f64) -> Result<u64> {
    if !sol.is_finite() || sol <= 0.0 || sol > u64::MAX as f64 / LAMPORTS_PER_SOL as f64 {
        return Err(Error::InvalidAmount(sol));
    }

    match sol_to_lamports(sol) {
        0 => Err(Error::InvalidAmount(sol)),
        lamports => Ok(lamports),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sol_lamports_conversion() {
        assert_eq!(sol_to_lamports(1.0), 1_000_000_000);
        assert_eq!(sol_to_lamports(0.5), 500_000_000);
        assert_eq!(sol_to_lamports(0.001), 1_000_000);
        assert_eq!(sol_to_lamports(0.01), 10_000_000);

        assert_eq!(lamports_to_sol(1_000_000_000), 1.0);
        assert_eq!(lamports_to_sol(500_000_000), 0.5);
        assert_eq!(lamports_to_sol(1_000_000), 0.001);
    }

    #[test]
    fn test_rounds_to_nearest_lamport() {
        // Truncation would give 289_999_999
        assert_eq!(sol_to_lamports(0.29), 290_000_000);
        assert_eq!(sol_to_lamports(0.000_000_000_4), 0);
        assert_eq!(sol_to_lamports(0.000_000_000_6), 1);
    }

    #[test]
    fn test_checked_conversion_rejects_unsendable_amounts() {
        assert!(matches!(checked_sol_to_lamports(0.0), Err(Error::InvalidAmount(_))));
        assert!(matches!(checked_sol_to_lamports(-1.0), Err(Error::InvalidAmount(_))));
        assert!(checked_sol_to_lamports(f64::NAN).is_err());
        assert!(checked_sol_to_lamports(f64::INFINITY).is_err());
        assert!(checked_sol_to_lamports(0.000_000_000_1).is_err());
        assert_eq!(checked_sol_to_lamports(0.01).unwrap(), 10_000_000);
    }

    #[test]
    fn test_fee_payer_defaults_to_source() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let intent = TransferIntent::new(from, to, 42);
        assert_eq!(intent.payer(), from);

        let tx = intent.to_transaction();
        assert_eq!(tx.message.account_keys[0], from);
        assert_eq!(tx.message.header.num_required_signatures, 1);
    }

    #[test]
    fn test_separate_fee_payer_requires_two_signatures() {
        let worker = Pubkey::new_unique();
        let treasury = Pubkey::new_unique();
        let intent = TransferIntent::new(worker, treasury, 42).with_fee_payer(treasury);

        let tx = intent.to_transaction();
        assert_eq!(tx.message.account_keys[0], treasury);
        assert_eq!(tx.message.header.num_required_signatures, 2);
        assert!(tx.message.is_signer(1));
    }
}
