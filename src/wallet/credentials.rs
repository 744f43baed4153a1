//! Credential decoding
//!
//! Turns configured key material into a validated keypair. Accepts the two
//! formats Solana tooling writes: a base58 secret key (as exported by wallets)
//! and a JSON byte array (as written by `solana-keygen`).

use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::signer::Signer;
use tracing::debug;

use crate::error::{Error, Result};

/// Length of an encoded ed25519 keypair: 32-byte secret followed by 32-byte public key
pub const KEYPAIR_LENGTH: usize = 64;

/// Decode and validate treasury credential material
///
/// Missing or blank material is a configuration error; material that is
/// present but does not decode to a consistent keypair is an invalid credential.
pub fn load_keypair(material: Option<&str>) -> Result<Keypair> {
    let material = material.map(str::trim).unwrap_or_default();
    if material.is_empty() {
        return Err(Error::Config(
            "PRIVATE_KEY is missing from configuration".to_string(),
        ));
    }

    let bytes = if material.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(material).map_err(|e| {
            Error::InvalidCredential(format!("Failed to parse keypair JSON: {}", e))
        })?
    } else {
        bs58::decode(material)
            .into_vec()
            .map_err(|e| Error::InvalidCredential(format!("Invalid base58: {}", e)))?
    };

    keypair_from_bytes(&bytes)
}

/// Build a keypair from its 64-byte encoding
///
/// The public half must match the key derived from the secret half.
pub fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair> {
    if bytes.len() != KEYPAIR_LENGTH {
        return Err(Error::InvalidCredential(format!(
            "Expected {} bytes, got {}",
            KEYPAIR_LENGTH,
            bytes.len()
        )));
    }

    let (secret, public) = bytes.split_at(32);
    let keypair = keypair_from_seed(secret)
        .map_err(|e| Error::InvalidCredential(format!("Invalid secret key: {}", e)))?;

    if keypair.pubkey().as_ref() != public {
        return Err(Error::InvalidCredential(
            "Public key does not match secret key".to_string(),
        ));
    }

    debug!("Decoded keypair for {}", keypair.pubkey());
    Ok(keypair)
}

/// Encode a keypair as a base58 secret key
pub fn encode_keypair(keypair: &Keypair) -> String {
    bs58::encode(keypair.to_bytes()).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_missing_material_is_config_error() {
        assert!(matches!(load_keypair(None), Err(Error::Config(_))));
        assert!(matches!(load_keypair(Some("")), Err(Error::Config(_))));
        assert!(matches!(load_keypair(Some("   \n")), Err(Error::Config(_))));
    }

    #[test]
    fn test_base58_round_trip() {
        let keypair = Keypair::new();
        let decoded = load_keypair(Some(encode_keypair(&keypair).as_str())).unwrap();
        assert_eq!(decoded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_json_array_format() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        let decoded = load_keypair(Some(json.as_str())).unwrap();
        assert_eq!(decoded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_not_base58() {
        // '0', 'O', 'I' and 'l' are outside the base58 alphabet
        let result = load_keypair(Some("0OIl0OIl"));
        assert!(matches!(result, Err(Error::InvalidCredential(_))));
    }

    #[test]
    fn test_public_key_only() {
        let keypair = Keypair::new();
        let result = load_keypair(Some(keypair.pubkey().to_string().as_str()));
        assert!(matches!(result, Err(Error::InvalidCredential(_))));
    }

    proptest! {
        #[test]
        fn prop_valid_keypairs_decode(seed in prop::array::uniform32(any::<u8>())) {
            let keypair = keypair_from_seed(&seed).unwrap();
            let decoded = load_keypair(Some(encode_keypair(&keypair).as_str())).unwrap();
            prop_assert_eq!(decoded.pubkey(), keypair.pubkey());
        }

        #[test]
        fn prop_wrong_length_rejected(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
            prop_assume!(bytes.len() != KEYPAIR_LENGTH);
            let encoded = bs58::encode(&bytes).into_string();
            prop_assume!(!encoded.is_empty());
            let result = load_keypair(Some(encoded.as_str()));
            prop_assert!(matches!(result, Err(Error::InvalidCredential(_))));
        }

        #[test]
        fn prop_corrupted_public_half_rejected(
            seed in prop::array::uniform32(any::<u8>()),
            index in 32usize..64,
            flip in 1u8..=255,
        ) {
            let keypair = keypair_from_seed(&seed).unwrap();
            let mut bytes = keypair.to_bytes();
            bytes[index] ^= flip;
            let encoded = bs58::encode(bytes).into_string();
            let result = load_keypair(Some(encoded.as_str()));
            prop_assert!(matches!(result, Err(Error::InvalidCredential(_))));
        }
    }
}
