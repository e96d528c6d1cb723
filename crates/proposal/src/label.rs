use std::fmt;

use pledge_primitives::DEAL_MAX_LABEL_SIZE;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};

use crate::ProposalError;

/// Client chosen deal label.
///
/// Encoded as a CBOR text string or byte string, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    String(String),
    Bytes(Vec<u8>),
}

impl Label {
    /// Builds a text label, enforcing the market actor's length limit.
    pub fn new_string(text: impl Into<String>) -> Result<Self, ProposalError> {
        let text = text.into();
        check_len(text.len())?;
        Ok(Self::String(text))
    }

    /// Builds a byte label, enforcing the market actor's length limit.
    pub fn new_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, ProposalError> {
        let bytes = bytes.into();
        check_len(bytes.len())?;
        Ok(Self::Bytes(bytes))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::String(s) => s.len(),
            Self::Bytes(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::String(String::new())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

fn check_len(len: usize) -> Result<(), ProposalError> {
    if len > DEAL_MAX_LABEL_SIZE {
        return Err(ProposalError::LabelEncodingError { len, max: DEAL_MAX_LABEL_SIZE });
    }
    Ok(())
}

impl Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_bytes(b),
        }
    }
}

struct LabelVisitor;

impl<'de> Visitor<'de> for LabelVisitor {
    type Value = Label;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a text or byte string of at most 256 bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Label::new_string(v).map_err(E::custom)
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Label::new_string(v).map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Label::new_bytes(v).map_err(E::custom)
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Label::new_bytes(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LabelVisitor)
    }
}
