//! Key storage for the local wallet.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::RwLock,
};

use pledge_primitives::Address;
use tracing::warn;

use crate::{KeyInfo, WalletError};

const KEY_FILE_PREFIX: &str = "wallet-";

/// Storage of private keys indexed by address.
pub trait Keystore: Send + Sync {
    /// Loads the key for `address`.
    fn get(&self, address: &Address) -> Result<KeyInfo, WalletError>;

    /// Stores `key` under `address`, replacing any previous key.
    fn put(&self, address: &Address, key: &KeyInfo) -> Result<(), WalletError>;

    /// All stored addresses, sorted.
    fn list(&self) -> Result<Vec<Address>, WalletError>;

    fn exists(&self, address: &Address) -> bool;
}

/// Directory backed keystore.
///
/// Each key is a `wallet-<address>` file holding the hex export of its
/// [`KeyInfo`], readable only by the owner on unix.
#[derive(Debug, Clone)]
pub struct FileKeystore {
    path: PathBuf,
}

impl FileKeystore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key_path(&self, address: &Address) -> PathBuf {
        self.path.join(format!("{KEY_FILE_PREFIX}{address}"))
    }
}

impl Keystore for FileKeystore {
    fn get(&self, address: &Address) -> Result<KeyInfo, WalletError> {
        let path = self.key_path(address);
        if !path.exists() {
            return Err(WalletError::UnknownAddress(address.to_string()));
        }
        fs::read_to_string(&path)?.parse()
    }

    fn put(&self, address: &Address, key: &KeyInfo) -> Result<(), WalletError> {
        fs::create_dir_all(&self.path)?;

        let path = self.key_path(address);
        fs::write(&path, key.export()?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    fn list(&self) -> Result<Vec<Address>, WalletError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut addresses = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let name = entry?.file_name();
            let Some(encoded) = name.to_str().and_then(|n| n.strip_prefix(KEY_FILE_PREFIX)) else {
                continue;
            };
            match Address::from_str(encoded) {
                Ok(address) => addresses.push(address),
                Err(e) => warn!(file = ?name, error = %e, "skipping unreadable key file"),
            }
        }
        addresses.sort_by_key(|a| a.to_string());
        Ok(addresses)
    }

    fn exists(&self, address: &Address) -> bool {
        self.key_path(address).exists()
    }
}

/// In-memory keystore, for tests and throwaway wallets.
#[derive(Debug, Default)]
pub struct MemoryKeystore {
    keys: RwLock<HashMap<Address, KeyInfo>>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Keystore for MemoryKeystore {
    fn get(&self, address: &Address) -> Result<KeyInfo, WalletError> {
        let keys = self.keys.read().map_err(|_| WalletError::Keystore("lock poisoned".into()))?;
        keys.get(address).cloned().ok_or_else(|| WalletError::UnknownAddress(address.to_string()))
    }

    fn put(&self, address: &Address, key: &KeyInfo) -> Result<(), WalletError> {
        let mut keys =
            self.keys.write().map_err(|_| WalletError::Keystore("lock poisoned".into()))?;
        keys.insert(*address, key.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Address>, WalletError> {
        let keys = self.keys.read().map_err(|_| WalletError::Keystore("lock poisoned".into()))?;
        let mut addresses: Vec<_> = keys.keys().copied().collect();
        addresses.sort_by_key(|a| a.to_string());
        Ok(addresses)
    }

    fn exists(&self, address: &Address) -> bool {
        self.keys.read().map(|keys| keys.contains_key(address)).unwrap_or(false)
    }
}
