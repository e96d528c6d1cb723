use fvm_shared::{econ::TokenAmount, piece::PaddedPieceSize, sector::SectorSize};
use num_traits::Signed;
use thiserror::Error;

use crate::{BYTES_PER_GIB, padded_piece_size, piece_holds, sector_size_for, validate_padded};

/// Reasons the pricing inputs of a deal are rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("size of car file cannot be 0")]
    EmptyFile,

    #[error("ask price cannot be negative: {0} attoFIL")]
    NegativePrice(String),

    #[error("piece of {0} bytes does not fit in any sector size")]
    PieceTooLarge(u64),

    #[error("invalid piece size {size}: {reason}")]
    InvalidPieceSize { size: u64, reason: &'static str },

    #[error("piece size {piece_size} cannot hold a {file_size} byte car file")]
    PieceTooSmall { piece_size: u64, file_size: u64 },
}

/// The priced shape of a deal: padded piece, sector class and per-epoch cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealEconomics {
    /// Raw CAR file size in bytes.
    pub file_size: u64,
    /// Padded piece size offered to the provider.
    pub piece_size: PaddedPieceSize,
    /// Sector size class the piece is sealed into.
    pub sector_size: SectorSize,
    /// Total price per epoch for the whole piece.
    pub price_per_epoch: TokenAmount,
    /// Whether the deal uses verified datacap.
    pub verified: bool,
}

impl DealEconomics {
    /// Prices a deal whose piece size is derived from `file_size`.
    pub fn compute(
        file_size: u64,
        ask: &TokenAmount,
        verified: bool,
    ) -> Result<Self, PricingError> {
        if file_size == 0 {
            return Err(PricingError::EmptyFile);
        }
        let piece_size =
            padded_piece_size(file_size).ok_or(PricingError::PieceTooLarge(file_size))?;
        Self::priced(file_size, piece_size, ask, verified)
    }

    /// Prices a deal for a caller-supplied piece size.
    ///
    /// The piece must be a valid padded size large enough for `file_size`.
    pub fn with_piece_size(
        file_size: u64,
        piece_size: PaddedPieceSize,
        ask: &TokenAmount,
        verified: bool,
    ) -> Result<Self, PricingError> {
        if file_size == 0 {
            return Err(PricingError::EmptyFile);
        }
        validate_padded(piece_size)
            .map_err(|reason| PricingError::InvalidPieceSize { size: piece_size.0, reason })?;
        if !piece_holds(piece_size, file_size) {
            return Err(PricingError::PieceTooSmall { piece_size: piece_size.0, file_size });
        }
        Self::priced(file_size, piece_size, ask, verified)
    }

    fn priced(
        file_size: u64,
        piece_size: PaddedPieceSize,
        ask: &TokenAmount,
        verified: bool,
    ) -> Result<Self, PricingError> {
        if ask.atto().is_negative() {
            return Err(PricingError::NegativePrice(ask.atto().to_string()));
        }
        let sector_size =
            sector_size_for(piece_size).ok_or(PricingError::PieceTooLarge(piece_size.0))?;

        Ok(Self {
            file_size,
            piece_size,
            sector_size,
            price_per_epoch: price_per_epoch(piece_size, ask),
            verified,
        })
    }
}

/// Computes `(padded piece size, price per epoch)` for a raw file size.
///
/// The verified flag is carried for the caller's benefit; the ask is expected
/// to already be the verified or unverified price as appropriate.
pub fn compute_pricing(
    file_size: u64,
    ask: &TokenAmount,
    verified: bool,
) -> Result<(PaddedPieceSize, TokenAmount), PricingError> {
    let economics = DealEconomics::compute(file_size, ask, verified)?;
    Ok((economics.piece_size, economics.price_per_epoch))
}

/// `floor(piece_size * ask / 2^30)`, the price of a piece for one epoch.
pub fn price_per_epoch(piece_size: PaddedPieceSize, ask: &TokenAmount) -> TokenAmount {
    TokenAmount::from_atto(ask.atto() * piece_size.0 / BYTES_PER_GIB)
}
