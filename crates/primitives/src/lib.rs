//! Primitive types and pure computations shared by the pledge deal client.
//!
//! This crate owns the economics of a storage deal: how a raw CAR file size maps
//! onto a padded piece size, which sector size class that piece lands in, and
//! what the provider charges per epoch for it. Everything here is a pure
//! function of its inputs.

pub mod constants;
pub use constants::*;

mod economics;
pub use economics::{DealEconomics, PricingError, compute_pricing, price_per_epoch};

mod piece;
pub use piece::{padded_piece_size, piece_holds, validate_padded};

mod sector;
pub use sector::sector_size_for;

pub use cid::Cid;
pub use fvm_shared::{
    address::Address,
    clock::ChainEpoch,
    crypto::signature::Signature,
    econ::TokenAmount,
    piece::{PaddedPieceSize, UnpaddedPieceSize},
    sector::SectorSize,
};
