//! Filecoin secp256k1 signatures.
//!
//! Messages are hashed with blake2b-256 and signed with recoverable ECDSA.
//! The signature bytes are `r || s || v` (65 bytes).

use alloy_signer::k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use fvm_shared::crypto::signature::SignatureType;
use pledge_primitives::{Address, Signature};

use crate::WalletError;

const SECP_SIGNATURE_LEN: usize = 65;

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new().hash_length(32).to_state().update(data).finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// The `f1` address of a secp256k1 key.
pub fn address_of(key: &SigningKey) -> Result<Address, WalletError> {
    let public = key.verifying_key().to_encoded_point(false);
    Address::new_secp256k1(public.as_bytes())
        .map_err(|e| WalletError::InvalidKeyInfo(e.to_string()))
}

pub fn sign_secp256k1(key: &SigningKey, message: &[u8]) -> Result<Signature, WalletError> {
    let digest = blake2b_256(message);
    let (signature, recovery_id) = key.sign_prehash_recoverable(&digest)?;

    let mut bytes = Vec::with_capacity(SECP_SIGNATURE_LEN);
    bytes.extend_from_slice(&signature.to_bytes());
    bytes.push(recovery_id.to_byte());
    Ok(Signature::new_secp256k1(bytes))
}

/// Checks that `signature` over `message` recovers to `address`.
pub fn verify_secp256k1(signature: &Signature, address: &Address, message: &[u8]) -> bool {
    if signature.signature_type() != SignatureType::Secp256k1 {
        return false;
    }
    let Some((rs, v)) = signature.bytes().split_at_checked(64) else {
        return false;
    };
    let Some(recovery_id) = v.first().copied().and_then(RecoveryId::from_byte) else {
        return false;
    };
    let Ok(ecdsa) = EcdsaSignature::from_slice(rs) else {
        return false;
    };

    let digest = blake2b_256(message);
    VerifyingKey::recover_from_prehash(&digest, &ecdsa, recovery_id)
        .ok()
        .and_then(|key| Address::new_secp256k1(key.to_encoded_point(false).as_bytes()).ok())
        .is_some_and(|recovered| &recovered == address)
}
