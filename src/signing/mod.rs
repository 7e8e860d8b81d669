//! Wallet signing and CLOB authentication.
//!
//! The private key is parsed once at startup into a [`Wallet`]; a key that
//! cannot be parsed is a fatal configuration error.

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use tracing::debug;

use crate::error::TradingError;

/// A local signing wallet bound to one chain.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    address: String,
}

impl Wallet {
    /// Parse a hex private key (with or without `0x`) and bind it to `chain_id`.
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self, TradingError> {
        let key_bytes = parse_private_key(private_key)?;

        let signer = PrivateKeySigner::from_bytes(&key_bytes.into())
            .map_err(|e| TradingError::SigningError(format!("Failed to create signer: {}", e)))?
            .with_chain_id(Some(chain_id));

        // Checksummed hex
        let address = format!("{:?}", signer.address());

        Ok(Self { signer, address })
    }

    /// Wallet address as checksummed hex.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Chain id the signer is bound to.
    pub fn chain_id(&self) -> Option<u64> {
        self.signer.chain_id()
    }

    /// Sign an arbitrary message, returning the signature as 0x-prefixed hex.
    pub async fn sign_hex(&self, message: &[u8]) -> Result<String, TradingError> {
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|e| TradingError::SigningError(format!("Failed to sign message: {}", e)))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }

    /// CLOB authentication headers: a signature over the current timestamp.
    pub async fn auth_headers(&self) -> Result<Vec<(String, String)>, TradingError> {
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = self
            .sign_hex(format!("polymarket:{}", timestamp).as_bytes())
            .await?;

        debug!(address = %self.address, "Generated auth headers");

        Ok(vec![
            ("POLY_ADDRESS".to_string(), self.address.clone()),
            ("POLY_SIGNATURE".to_string(), signature),
            ("POLY_TIMESTAMP".to_string(), timestamp),
            ("POLY_NONCE".to_string(), "0".to_string()),
        ])
    }
}

/// Decode a 32-byte hex private key.
fn parse_private_key(private_key: &str) -> Result<[u8; 32], TradingError> {
    let key = private_key.strip_prefix("0x").unwrap_or(private_key);
    let bytes = hex::decode(key)
        .map_err(|e| TradingError::SigningError(format!("Invalid private key hex: {}", e)))?;

    bytes.try_into().map_err(|bytes: Vec<u8>| {
        TradingError::SigningError(format!(
            "Private key must be 32 bytes, got {}",
            bytes.len()
        ))
    })
}

/// Get the wallet address from a private key.
pub fn address_from_private_key(private_key: &str) -> Result<String, TradingError> {
    let key_bytes = parse_private_key(private_key)?;
    let signer = PrivateKeySigner::from_bytes(&key_bytes.into())
        .map_err(|e| TradingError::SigningError(format!("Failed to create signer: {}", e)))?;
    Ok(format!("{:?}", signer.address()))
}
