use cid::Cid;
use fvm_ipld_encoding::tuple::*;
use pledge_primitives::{Address, ChainEpoch, PaddedPieceSize, Signature, TokenAmount};

use crate::{Label, ProposalError};

/// Terms of a storage deal as the market actor sees them.
///
/// Field order is the wire order; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct DealProposal {
    pub piece_cid: Cid,
    pub piece_size: PaddedPieceSize,
    pub verified_deal: bool,
    pub client: Address,
    pub provider: Address,
    /// Arbitrary client chosen label, by convention the payload root cid.
    pub label: Label,
    /// Nominal start epoch. The deal must be proven in a sealed sector by then.
    pub start_epoch: ChainEpoch,
    pub end_epoch: ChainEpoch,
    pub storage_price_per_epoch: TokenAmount,
    pub provider_collateral: TokenAmount,
    pub client_collateral: TokenAmount,
}

impl DealProposal {
    pub fn duration(&self) -> ChainEpoch {
        self.end_epoch - self.start_epoch
    }

    /// The DAG-CBOR bytes a client signs.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, ProposalError> {
        Ok(fvm_ipld_encoding::to_vec(self)?)
    }
}

/// A proposal together with the client's signature over its canonical bytes.
///
/// Known on the wire as `ClientDealProposal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct SignedDealProposal {
    pub proposal: DealProposal,
    pub client_signature: Signature,
}

impl SignedDealProposal {
    pub fn new(proposal: DealProposal, client_signature: Signature) -> Self {
        Self { proposal, client_signature }
    }
}
