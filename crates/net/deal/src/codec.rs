//! Codec and messages for the deal protocol.

use cid::Cid;
use pledge_net_codec::{CborCodec, CodecError};
use pledge_proposal::SignedDealProposal;
use uuid::Uuid;

/// Codec for deal proposal requests.
pub type DealParamsCodec = CborCodec<wire::DealParams, DealParams, DealCodecError>;

/// Codec for deal proposal responses.
pub type DealResponseCodec = CborCodec<wire::DealResponse, DealResponse, DealCodecError>;

/// Error type for deal codec operations.
#[derive(Debug, thiserror::Error)]
pub enum DealCodecError {
    /// Framing or (de)serialization failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] CodecError),
    /// IO error during read/write
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Deal identifiers are 16 byte UUIDs
    #[error("Invalid deal uuid length: expected 16, got {0}")]
    InvalidUuidLength(usize),
}

/// Transfer metadata for a deal.
///
/// Offline deals carry an empty type and no params; only the size of the CAR
/// file the provider will import out of band.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transfer {
    pub transfer_type: String,
    pub client_id: String,
    pub params: Vec<u8>,
    pub size: u64,
}

impl Transfer {
    pub fn offline(size: u64) -> Self {
        Self { size, ..Default::default() }
    }
}

/// A deal proposal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealParams {
    /// Fresh random identifier for this attempt.
    pub deal_uuid: Uuid,
    /// Data is handed to the provider out of band.
    pub is_offline: bool,
    pub client_deal_proposal: SignedDealProposal,
    /// Root cid of the payload DAG.
    pub deal_data_root: Cid,
    pub transfer: Transfer,
    pub remove_unsealed_copy: bool,
    pub skip_ipni_announce: bool,
}

/// The provider's verdict on a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealResponse {
    pub accepted: bool,
    /// Reason for rejection; usually empty when accepted.
    pub message: String,
}

impl DealResponse {
    pub fn accepted() -> Self {
        Self { accepted: true, message: String::new() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self { accepted: false, message: message.into() }
    }
}

impl TryFrom<wire::DealParams> for DealParams {
    type Error = DealCodecError;

    fn try_from(value: wire::DealParams) -> Result<Self, Self::Error> {
        let deal_uuid = Uuid::from_slice(&value.deal_uuid)
            .map_err(|_| DealCodecError::InvalidUuidLength(value.deal_uuid.len()))?;
        Ok(Self {
            deal_uuid,
            is_offline: value.is_offline,
            client_deal_proposal: value.client_deal_proposal,
            deal_data_root: value.deal_data_root,
            transfer: value.transfer.into(),
            remove_unsealed_copy: value.remove_unsealed_copy,
            skip_ipni_announce: value.skip_ipni_announce,
        })
    }
}

impl From<DealParams> for wire::DealParams {
    fn from(value: DealParams) -> Self {
        wire::DealParams {
            deal_uuid: value.deal_uuid.as_bytes().to_vec(),
            transfer: value.transfer.into(),
            is_offline: value.is_offline,
            deal_data_root: value.deal_data_root,
            skip_ipni_announce: value.skip_ipni_announce,
            client_deal_proposal: value.client_deal_proposal,
            remove_unsealed_copy: value.remove_unsealed_copy,
        }
    }
}

impl From<wire::Transfer> for Transfer {
    fn from(value: wire::Transfer) -> Self {
        Self {
            transfer_type: value.transfer_type,
            client_id: value.client_id,
            params: value.params,
            size: value.size,
        }
    }
}

impl From<Transfer> for wire::Transfer {
    fn from(value: Transfer) -> Self {
        wire::Transfer {
            size: value.size,
            transfer_type: value.transfer_type,
            params: value.params,
            client_id: value.client_id,
        }
    }
}

impl TryFrom<wire::DealResponse> for DealResponse {
    type Error = DealCodecError;

    fn try_from(value: wire::DealResponse) -> Result<Self, Self::Error> {
        Ok(Self { accepted: value.accepted, message: value.message })
    }
}

impl From<DealResponse> for wire::DealResponse {
    fn from(value: DealResponse) -> Self {
        wire::DealResponse { message: value.message, accepted: value.accepted }
    }
}

/// Wire structs. Field order is canonical DAG-CBOR key order (length, then
/// bytewise) and must not change.
pub mod wire {
    use cid::Cid;
    use fvm_ipld_encoding::strict_bytes;
    use pledge_proposal::SignedDealProposal;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DealParams {
        #[serde(rename = "DealUUID", with = "strict_bytes")]
        pub deal_uuid: Vec<u8>,
        #[serde(rename = "Transfer")]
        pub transfer: Transfer,
        #[serde(rename = "IsOffline")]
        pub is_offline: bool,
        #[serde(rename = "DealDataRoot")]
        pub deal_data_root: Cid,
        #[serde(rename = "SkipIPNIAnnounce")]
        pub skip_ipni_announce: bool,
        #[serde(rename = "ClientDealProposal")]
        pub client_deal_proposal: SignedDealProposal,
        #[serde(rename = "RemoveUnsealedCopy")]
        pub remove_unsealed_copy: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Transfer {
        #[serde(rename = "Size")]
        pub size: u64,
        #[serde(rename = "Type")]
        pub transfer_type: String,
        #[serde(rename = "Params", with = "strict_bytes")]
        pub params: Vec<u8>,
        #[serde(rename = "ClientID")]
        pub client_id: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DealResponse {
        #[serde(rename = "Message")]
        pub message: String,
        #[serde(rename = "Accepted")]
        pub accepted: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asynchronous_codec::{Decoder, Encoder};
    use bytes::BytesMut;

    #[test]
    fn test_response_key_order() {
        let mut codec = DealResponseCodec::new(1024);
        let mut dst = BytesMut::new();
        codec.encode(DealResponse::rejected("no"), &mut dst).unwrap();

        let expected: &[u8] = &[
            0xa2, // map(2)
            0x67, b'M', b'e', b's', b's', b'a', b'g', b'e', 0x62, b'n', b'o', //
            0x68, b'A', b'c', b'c', b'e', b'p', b't', b'e', b'd', 0xf4,
        ];
        assert_eq!(&dst[..], expected);
    }

    #[test]
    fn test_response_decode() {
        let mut codec = DealResponseCodec::new(1024);
        let mut dst = BytesMut::new();
        codec.encode(DealResponse::accepted(), &mut dst).unwrap();

        let decoded = codec.decode(&mut dst).unwrap().unwrap();
        assert_eq!(decoded, DealResponse::accepted());
        assert!(dst.is_empty());
    }

    #[test]
    fn test_params_decode_mainnet_scale() {
        use pledge_primitives::{Address, PaddedPieceSize, Signature, TokenAmount};
        use pledge_proposal::{DealProposal, Label};

        let root: Cid = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".parse().unwrap();
        let proposal = DealProposal {
            piece_cid: root,
            piece_size: PaddedPieceSize(32 << 30),
            verified_deal: false,
            client: Address::new_id(1001),
            provider: Address::new_id(1002),
            label: Label::String(root.to_string()),
            start_epoch: 4_000_000,
            end_epoch: 4_518_400,
            storage_price_per_epoch: TokenAmount::from_atto(976_562_500_000u64),
            provider_collateral: TokenAmount::from_atto(1_234_567_890_123_456_789u64),
            client_collateral: TokenAmount::from_atto(0),
        };
        let params = DealParams {
            deal_uuid: Uuid::new_v4(),
            is_offline: true,
            client_deal_proposal: SignedDealProposal::new(
                proposal,
                Signature::new_secp256k1(vec![7; 65]),
            ),
            deal_data_root: root,
            transfer: Transfer::offline(30 << 30),
            remove_unsealed_copy: true,
            skip_ipni_announce: false,
        };

        let mut codec = DealParamsCodec::new(crate::MAX_MESSAGE_SIZE);
        let mut dst = BytesMut::new();
        codec.encode(params.clone(), &mut dst).unwrap();

        let decoded = codec.decode(&mut dst).unwrap().unwrap();
        assert_eq!(decoded, params);
        assert!(dst.is_empty());
    }
}
