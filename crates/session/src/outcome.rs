use pledge_primitives::ChainEpoch;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a session that reached the provider ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DealOutcome {
    Accepted(DealSummary),
    /// The provider declined. Definite, unlike a timed out exchange.
    Rejected { deal_uuid: Uuid, message: String },
}

impl DealOutcome {
    pub fn deal_uuid(&self) -> Uuid {
        match self {
            Self::Accepted(summary) => summary.deal_uuid,
            Self::Rejected { deal_uuid, .. } => *deal_uuid,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// What was agreed, as printed for the user on acceptance.
///
/// Addresses, cids and token amounts are rendered in their text forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealSummary {
    pub deal_uuid: Uuid,
    pub provider: String,
    pub client_wallet: String,
    pub payload_cid: String,
    pub commp: String,
    pub start_epoch: ChainEpoch,
    pub end_epoch: ChainEpoch,
    /// attoFIL
    pub provider_collateral: String,
    pub piece_size: u64,
    /// attoFIL
    pub storage_price_per_epoch: String,
}
