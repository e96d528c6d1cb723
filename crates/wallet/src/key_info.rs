use std::{fmt, str::FromStr};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::WalletError;

/// Key algorithm of a [`KeyInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Secp256k1,
    Bls,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp256k1 => f.write_str("secp256k1"),
            Self::Bls => f.write_str("bls"),
        }
    }
}

/// A private key as exported by `lotus wallet export`.
///
/// The export format is the hex encoding of this record's JSON, with the key
/// itself base64 encoded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    #[serde(rename = "Type")]
    pub key_type: KeyType,
    #[serde(rename = "PrivateKey", with = "base64_bytes")]
    pub private_key: Vec<u8>,
}

impl fmt::Debug for KeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyInfo").field("key_type", &self.key_type).finish_non_exhaustive()
    }
}

impl KeyInfo {
    pub fn secp256k1(private_key: Vec<u8>) -> Self {
        Self { key_type: KeyType::Secp256k1, private_key }
    }

    /// Hex encoded JSON, the format accepted by `wallet import`.
    pub fn export(&self) -> Result<String, WalletError> {
        let json =
            serde_json::to_vec(self).map_err(|e| WalletError::InvalidKeyInfo(e.to_string()))?;
        Ok(hex::encode(json))
    }
}

impl FromStr for KeyInfo {
    type Err = WalletError;

    /// Accepts either the hex export format or the raw JSON record.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let json = if s.starts_with('{') {
            s.as_bytes().to_vec()
        } else {
            hex::decode(s).map_err(|e| WalletError::InvalidKeyInfo(e.to_string()))?
        };
        serde_json::from_slice(&json).map_err(|e| WalletError::InvalidKeyInfo(e.to_string()))
    }
}

mod base64_bytes {
    use super::*;

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_key_info_json_shape() {
        let info = KeyInfo::secp256k1(vec![1, 2, 3]);
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"Type":"secp256k1","PrivateKey":"AQID"}"#);
    }

    #[test]
    fn test_key_info_export_import() {
        let info = KeyInfo::secp256k1(vec![42; 32]);
        let exported = info.export().unwrap();
        assert!(exported.chars().all(|c| c.is_ascii_hexdigit()));

        let imported: KeyInfo = exported.parse().unwrap();
        assert_eq!(imported, info);

        let from_json: KeyInfo = r#"{"Type":"secp256k1","PrivateKey":"AQID"}"#.parse().unwrap();
        assert_eq!(from_json.private_key, vec![1, 2, 3]);
    }

    #[test]
    fn test_key_info_rejects_garbage() {
        assert_matches!("zz".parse::<KeyInfo>(), Err(WalletError::InvalidKeyInfo(_)));
        assert_matches!("{}".parse::<KeyInfo>(), Err(WalletError::InvalidKeyInfo(_)));
    }

    #[test]
    fn test_key_info_debug_hides_key() {
        let info = KeyInfo::secp256k1(vec![0xab; 32]);
        assert!(!format!("{info:?}").contains("171"));
    }
}
