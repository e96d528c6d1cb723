//! Chain and market constants used when shaping a deal.

use fvm_shared::clock::ChainEpoch;

/// Epochs produced by the chain in one day (30 second block time).
pub const EPOCHS_PER_DAY: ChainEpoch = 2880;

/// Distance between the current chain head and a defaulted deal start epoch.
///
/// Two days gives the provider time to receive the data, seal it and publish
/// the deal before the start epoch passes.
pub const START_EPOCH_SAFETY_WINDOW: ChainEpoch = 2 * EPOCHS_PER_DAY;

/// Default deal duration (180 days).
pub const DEFAULT_DEAL_DURATION: ChainEpoch = 180 * EPOCHS_PER_DAY;

/// Ask prices are quoted per GiB of padded piece per epoch.
pub const BYTES_PER_GIB: u64 = 1 << 30;

/// Smallest padded piece the commitment tree can describe.
pub const MIN_PADDED_PIECE_SIZE: u64 = 128;

/// Maximum byte length of a deal label accepted by the market actor.
pub const DEAL_MAX_LABEL_SIZE: usize = 256;

/// Multicodec of an unsealed piece commitment (`fil-commitment-unsealed`).
pub const FIL_COMMITMENT_UNSEALED: u64 = 0xf101;

/// Provider collateral safety margin, expressed as the ratio `6 / 5`.
pub const COLLATERAL_MARGIN_NUMERATOR: u64 = 6;
/// See [`COLLATERAL_MARGIN_NUMERATOR`].
pub const COLLATERAL_MARGIN_DENOMINATOR: u64 = 5;
