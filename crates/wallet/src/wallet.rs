use std::{str::FromStr, sync::Arc};

use alloy_signer::k256::ecdsa::SigningKey;
use async_trait::async_trait;
use pledge_primitives::{Address, Signature};
use rand::Rng;
use tracing::debug;

use crate::{KeyInfo, KeyType, Keystore, Signer, WalletError, address_of, sign_secp256k1};

/// Wallet signing with secp256k1 keys held in a [`Keystore`].
#[derive(Clone)]
pub struct LocalWallet {
    keystore: Arc<dyn Keystore>,
    default_address: Option<Address>,
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("default_address", &self.default_address)
            .finish_non_exhaustive()
    }
}

impl LocalWallet {
    pub fn new(keystore: impl Keystore + 'static) -> Self {
        Self { keystore: Arc::new(keystore), default_address: None }
    }

    /// Sets the address used when no hint is given.
    pub fn with_default_address(mut self, address: Option<Address>) -> Self {
        self.default_address = address;
        self
    }

    /// Generates and stores a fresh secp256k1 key.
    pub fn generate(&self) -> Result<Address, WalletError> {
        let mut key_bytes = [0u8; 32];
        rand::rng().fill(&mut key_bytes);
        self.import(KeyInfo::secp256k1(key_bytes.to_vec()))
    }

    /// Stores an existing key, returning its address.
    pub fn import(&self, key: KeyInfo) -> Result<Address, WalletError> {
        let signing_key = signing_key(&key)?;
        let address = address_of(&signing_key)?;
        self.keystore.put(&address, &key)?;
        debug!(%address, "stored wallet key");
        Ok(address)
    }

    pub fn export(&self, address: &Address) -> Result<KeyInfo, WalletError> {
        self.keystore.get(address)
    }

    pub fn list(&self) -> Result<Vec<Address>, WalletError> {
        self.keystore.list()
    }
}

fn signing_key(key: &KeyInfo) -> Result<SigningKey, WalletError> {
    match key.key_type {
        KeyType::Secp256k1 => Ok(SigningKey::from_slice(&key.private_key)?),
        other => Err(WalletError::UnsupportedKeyType(other.to_string())),
    }
}

#[async_trait]
impl Signer for LocalWallet {
    async fn sign(&self, address: &Address, message: &[u8]) -> Result<Signature, WalletError> {
        let key = signing_key(&self.keystore.get(address)?)?;
        debug!(%address, len = message.len(), "signing message");
        sign_secp256k1(&key, message)
    }

    async fn default_or_named(&self, hint: Option<&str>) -> Result<Address, WalletError> {
        if let Some(hint) = hint {
            let address = Address::from_str(hint.trim()).map_err(|e| {
                WalletError::InvalidAddress { input: hint.to_string(), reason: e.to_string() }
            })?;
            if !self.keystore.exists(&address) {
                return Err(WalletError::UnknownAddress(address.to_string()));
            }
            return Ok(address);
        }

        if let Some(address) = self.default_address {
            return Ok(address);
        }

        let addresses = self.keystore.list()?;
        match addresses.as_slice() {
            [only] => Ok(*only),
            _ => Err(WalletError::NoDefaultAddress(addresses.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryKeystore, verify_secp256k1};
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_generate_and_sign() {
        let wallet = LocalWallet::new(MemoryKeystore::new());
        let address = wallet.generate().unwrap();

        let signature = wallet.sign(&address, b"proposal bytes").await.unwrap();
        assert!(verify_secp256k1(&signature, &address, b"proposal bytes"));
    }

    #[tokio::test]
    async fn test_sign_unknown_address() {
        let wallet = LocalWallet::new(MemoryKeystore::new());
        assert_matches!(
            wallet.sign(&Address::new_id(9), b"x").await,
            Err(WalletError::UnknownAddress(_))
        );
    }

    #[tokio::test]
    async fn test_import_rejects_bls() {
        let wallet = LocalWallet::new(MemoryKeystore::new());
        let key = KeyInfo { key_type: KeyType::Bls, private_key: vec![1; 32] };
        assert_matches!(wallet.import(key), Err(WalletError::UnsupportedKeyType(_)));
    }

    #[tokio::test]
    async fn test_default_or_named() {
        let wallet = LocalWallet::new(MemoryKeystore::new());
        assert_matches!(wallet.default_or_named(None).await, Err(WalletError::NoDefaultAddress(0)));

        let first = wallet.generate().unwrap();
        assert_eq!(wallet.default_or_named(None).await.unwrap(), first);

        let second = wallet.generate().unwrap();
        assert_matches!(wallet.default_or_named(None).await, Err(WalletError::NoDefaultAddress(2)));

        let named = wallet.default_or_named(Some(&second.to_string())).await.unwrap();
        assert_eq!(named, second);

        let wallet = wallet.with_default_address(Some(first));
        assert_eq!(wallet.default_or_named(None).await.unwrap(), first);

        assert_matches!(
            wallet.default_or_named(Some("f0123")).await,
            Err(WalletError::UnknownAddress(_))
        );
        assert_matches!(
            wallet.default_or_named(Some("nonsense")).await,
            Err(WalletError::InvalidAddress { .. })
        );
    }
}
