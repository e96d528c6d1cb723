use fvm_shared::piece::PaddedPieceSize;

use crate::MIN_PADDED_PIECE_SIZE;

/// Returns the smallest padded piece size able to hold `file_size` bytes.
///
/// Fr32 padding spends 2 bits of every 256, so a padded piece of `P` bytes
/// carries `P - P / 128` bytes of payload. Padded sizes are powers of two no
/// smaller than 128 bytes. Returns `None` when no `u64` piece size fits.
pub fn padded_piece_size(file_size: u64) -> Option<PaddedPieceSize> {
    let needed = (u128::from(file_size) * 128).div_ceil(127);
    let needed = u64::try_from(needed).ok()?.max(MIN_PADDED_PIECE_SIZE);
    needed.checked_next_power_of_two().map(PaddedPieceSize)
}

/// Whether a padded piece of `piece_size` can carry `file_size` payload bytes.
pub fn piece_holds(piece_size: PaddedPieceSize, file_size: u64) -> bool {
    piece_size.0 - piece_size.0 / 128 >= file_size
}

/// Checks that `piece_size` is a power of two of at least 128 bytes.
pub fn validate_padded(piece_size: PaddedPieceSize) -> Result<(), &'static str> {
    if piece_size.0 < MIN_PADDED_PIECE_SIZE {
        return Err("minimum padded piece size is 128 bytes");
    }
    if !piece_size.0.is_power_of_two() {
        return Err("padded piece size must be a power of 2");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_piece_size_boundaries() {
        assert_eq!(padded_piece_size(1), Some(PaddedPieceSize(128)));
        assert_eq!(padded_piece_size(127), Some(PaddedPieceSize(128)));
        assert_eq!(padded_piece_size(128), Some(PaddedPieceSize(256)));
        assert_eq!(padded_piece_size(254), Some(PaddedPieceSize(256)));
        assert_eq!(padded_piece_size(255), Some(PaddedPieceSize(512)));
        assert_eq!(padded_piece_size(26_666), Some(PaddedPieceSize(32_768)));
        assert_eq!(padded_piece_size(32_512), Some(PaddedPieceSize(32_768)));
        assert_eq!(padded_piece_size(32_513), Some(PaddedPieceSize(65_536)));
    }

    #[test]
    fn test_padded_piece_size_overflow() {
        assert_eq!(padded_piece_size(u64::MAX), None);
    }

    #[test]
    fn test_piece_holds() {
        assert!(piece_holds(PaddedPieceSize(32_768), 32_512));
        assert!(!piece_holds(PaddedPieceSize(32_768), 32_513));
    }

    #[test]
    fn test_validate_padded() {
        assert!(validate_padded(PaddedPieceSize(128)).is_ok());
        assert!(validate_padded(PaddedPieceSize(1 << 35)).is_ok());
        assert!(validate_padded(PaddedPieceSize(64)).is_err());
        assert!(validate_padded(PaddedPieceSize(3 << 10)).is_err());
    }
}
