use fvm_shared::{piece::PaddedPieceSize, sector::SectorSize};

const SECTOR_CLASSES: [SectorSize; 5] = [
    SectorSize::_2KiB,
    SectorSize::_8MiB,
    SectorSize::_512MiB,
    SectorSize::_32GiB,
    SectorSize::_64GiB,
];

/// Smallest sector size class that can store a piece of `piece_size`.
pub fn sector_size_for(piece_size: PaddedPieceSize) -> Option<SectorSize> {
    SECTOR_CLASSES
        .into_iter()
        .find(|class| *class as u64 >= piece_size.0)
}
