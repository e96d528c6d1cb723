use cid::Cid;
use num_traits::Signed;
use pledge_primitives::{
    Address, ChainEpoch, FIL_COMMITMENT_UNSEALED, PaddedPieceSize, TokenAmount, validate_padded,
};

use crate::{DealProposal, Label, ProposalError};

/// Caller supplied inputs to [`build_proposal`].
///
/// Start epoch and provider collateral are expected to be resolved already;
/// defaulting them is the job of the session's policy resolver.
#[derive(Debug, Clone)]
pub struct ProposalParams {
    pub piece_cid: String,
    pub piece_size: PaddedPieceSize,
    pub root_cid: String,
    pub client: Address,
    pub provider: Address,
    pub start_epoch: ChainEpoch,
    pub duration: ChainEpoch,
    pub verified: bool,
    pub provider_collateral: TokenAmount,
    pub storage_price_per_epoch: TokenAmount,
}

/// Output of [`build_proposal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltProposal {
    pub proposal: DealProposal,
    /// Parsed payload root, sent alongside the proposal as the deal data root.
    pub data_root: Cid,
}

/// Parses a textual cid, naming `field` in the error.
pub fn parse_cid(field: &'static str, text: &str) -> Result<Cid, ProposalError> {
    Cid::try_from(text.trim())
        .map_err(|e| ProposalError::MalformedIdentifier { field, reason: e.to_string() })
}

/// Validates `params` and assembles the unsigned proposal.
///
/// The label is the root cid's canonical text form. Client collateral is
/// always zero.
pub fn build_proposal(params: &ProposalParams) -> Result<BuiltProposal, ProposalError> {
    let piece_cid = parse_cid("piece", &params.piece_cid)?;
    if piece_cid.codec() != FIL_COMMITMENT_UNSEALED {
        return Err(ProposalError::MalformedIdentifier {
            field: "piece",
            reason: format!(
                "expected fil-commitment-unsealed codec 0x{FIL_COMMITMENT_UNSEALED:x}, got 0x{:x}",
                piece_cid.codec()
            ),
        });
    }
    let data_root = parse_cid("root", &params.root_cid)?;

    if params.piece_size.0 == 0 {
        return Err(ProposalError::InvalidPieceSize { size: 0, reason: "must provide piece-size" });
    }
    validate_padded(params.piece_size)
        .map_err(|reason| ProposalError::InvalidPieceSize { size: params.piece_size.0, reason })?;

    if params.duration <= 0 {
        return Err(ProposalError::InvalidDuration(params.duration));
    }
    let end_epoch = params.start_epoch.checked_add(params.duration).ok_or(
        ProposalError::EpochOverflow { start: params.start_epoch, duration: params.duration },
    )?;

    if params.provider_collateral.atto().is_negative() {
        return Err(ProposalError::NegativeAmount { field: "provider collateral" });
    }
    if params.storage_price_per_epoch.atto().is_negative() {
        return Err(ProposalError::NegativeAmount { field: "storage price per epoch" });
    }

    let label = Label::new_string(data_root.to_string())?;

    Ok(BuiltProposal {
        proposal: DealProposal {
            piece_cid,
            piece_size: params.piece_size,
            verified_deal: params.verified,
            client: params.client,
            provider: params.provider,
            label,
            start_epoch: params.start_epoch,
            end_epoch,
            storage_price_per_epoch: params.storage_price_per_epoch.clone(),
            provider_collateral: params.provider_collateral.clone(),
            client_collateral: TokenAmount::default(),
        },
        data_root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use cid::multihash::Multihash;

    const SHA2_256_TRUNC254_PADDED: u64 = 0x1012;
    const DAG_PB: u64 = 0x70;
    const SHA2_256: u64 = 0x12;

    fn piece_cid() -> String {
        let digest = Multihash::<64>::wrap(SHA2_256_TRUNC254_PADDED, &[7u8; 32]).unwrap();
        Cid::new_v1(FIL_COMMITMENT_UNSEALED, digest).to_string()
    }

    fn root_cid() -> String {
        let digest = Multihash::<64>::wrap(SHA2_256, &[9u8; 32]).unwrap();
        Cid::new_v1(DAG_PB, digest).to_string()
    }

    fn params() -> ProposalParams {
        ProposalParams {
            piece_cid: piece_cid(),
            piece_size: PaddedPieceSize(32_768),
            root_cid: root_cid(),
            client: Address::new_id(1001),
            provider: Address::new_id(1002),
            start_epoch: 10_000,
            duration: 518_400,
            verified: false,
            provider_collateral: TokenAmount::from_atto(1200),
            storage_price_per_epoch: TokenAmount::from_atto(0),
        }
    }

    #[test]
    fn test_build_proposal() {
        let built = build_proposal(&params()).unwrap();
        let proposal = &built.proposal;

        assert_eq!(proposal.end_epoch, 10_000 + 518_400);
        assert_eq!(proposal.duration(), 518_400);
        assert_eq!(proposal.label, Label::String(root_cid()));
        assert_eq!(proposal.client_collateral, TokenAmount::from_atto(0));
        assert_eq!(proposal.provider_collateral, TokenAmount::from_atto(1200));
        assert_eq!(built.data_root.to_string(), root_cid());
    }

    #[test]
    fn test_build_proposal_is_deterministic() {
        let first = build_proposal(&params()).unwrap().proposal.canonical_bytes().unwrap();
        let second = build_proposal(&params()).unwrap().proposal.canonical_bytes().unwrap();
        assert_eq!(first, second);

        // 11 element cbor array
        assert_eq!(first.first(), Some(&0x8b));
    }

    #[test]
    fn test_canonical_bytes_decode() {
        let proposal = build_proposal(&params()).unwrap().proposal;
        let bytes = proposal.canonical_bytes().unwrap();
        let decoded: DealProposal = fvm_ipld_encoding::from_slice(&bytes).unwrap();
        assert_eq!(decoded, proposal);
    }

    #[test]
    fn test_rejects_malformed_cids() {
        let mut bad_piece = params();
        bad_piece.piece_cid = "not-a-cid".into();
        assert_matches!(
            build_proposal(&bad_piece),
            Err(ProposalError::MalformedIdentifier { field: "piece", .. })
        );

        let mut wrong_codec = params();
        wrong_codec.piece_cid = root_cid();
        assert_matches!(
            build_proposal(&wrong_codec),
            Err(ProposalError::MalformedIdentifier { field: "piece", .. })
        );

        let mut bad_root = params();
        bad_root.root_cid = "bafy???".into();
        assert_matches!(
            build_proposal(&bad_root),
            Err(ProposalError::MalformedIdentifier { field: "root", .. })
        );
    }

    #[test]
    fn test_rejects_invalid_piece_size() {
        let mut zero = params();
        zero.piece_size = PaddedPieceSize(0);
        assert_matches!(build_proposal(&zero), Err(ProposalError::InvalidPieceSize { size: 0, .. }));

        let mut odd = params();
        odd.piece_size = PaddedPieceSize(1000);
        assert_matches!(
            build_proposal(&odd),
            Err(ProposalError::InvalidPieceSize { size: 1000, .. })
        );
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        for duration in [0, -1] {
            let mut p = params();
            p.duration = duration;
            assert_matches!(build_proposal(&p), Err(ProposalError::InvalidDuration(d)) if d == duration);
        }

        let mut overflow = params();
        overflow.start_epoch = i64::MAX;
        assert_matches!(build_proposal(&overflow), Err(ProposalError::EpochOverflow { .. }));
    }

    #[test]
    fn test_rejects_negative_amounts() {
        let mut p = params();
        p.provider_collateral = TokenAmount::from_atto(-5);
        assert_matches!(build_proposal(&p), Err(ProposalError::NegativeAmount { .. }));
    }
}
