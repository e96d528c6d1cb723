//! Client wallet for signing deal proposals.
//!
//! The [`Signer`] trait is the narrow interface the deal session consumes.
//! [`LocalWallet`] implements it over a [`Keystore`] of Lotus style
//! [`KeyInfo`] records holding secp256k1 keys.

use async_trait::async_trait;
use pledge_primitives::{Address, Signature};

mod error;
mod key_info;
mod keystore;
mod secp;
mod wallet;

pub use error::WalletError;
pub use key_info::{KeyInfo, KeyType};
pub use keystore::{FileKeystore, Keystore, MemoryKeystore};
pub use secp::{address_of, blake2b_256, sign_secp256k1, verify_secp256k1};
pub use wallet::LocalWallet;

/// Produces signatures on behalf of client addresses.
///
/// Implementations must be safe to share between concurrent deal sessions.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Signs `message` with the key behind `address`.
    async fn sign(&self, address: &Address, message: &[u8]) -> Result<Signature, WalletError>;

    /// Resolves the address to sign with.
    ///
    /// `hint` names an address explicitly; without one the wallet's default is used.
    async fn default_or_named(&self, hint: Option<&str>) -> Result<Address, WalletError>;
}
