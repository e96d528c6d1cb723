use std::io;

use thiserror::Error;

/// Errors from key management and signing.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("address {0} not found in wallet")]
    UnknownAddress(String),

    #[error("invalid address {input}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("no default wallet address set and {0} keys available")]
    NoDefaultAddress(usize),

    #[error("invalid key info: {0}")]
    InvalidKeyInfo(String),

    #[error("unsupported key type {0}")]
    UnsupportedKeyType(String),

    #[error("signing failed: {0}")]
    Crypto(#[from] alloy_signer::k256::ecdsa::Error),

    #[error("keystore unavailable: {0}")]
    Keystore(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
