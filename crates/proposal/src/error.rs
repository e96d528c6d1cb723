use thiserror::Error;

/// Errors raised while assembling a deal proposal.
#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("malformed {field} cid: {reason}")]
    MalformedIdentifier { field: &'static str, reason: String },

    #[error("invalid piece size {size}: {reason}")]
    InvalidPieceSize { size: u64, reason: &'static str },

    #[error("deal duration must be positive, got {0} epochs")]
    InvalidDuration(i64),

    #[error("end epoch overflows: start {start} + duration {duration}")]
    EpochOverflow { start: i64, duration: i64 },

    #[error("{field} cannot be negative")]
    NegativeAmount { field: &'static str },

    #[error("label of {len} bytes exceeds the {max} byte limit")]
    LabelEncodingError { len: usize, max: usize },

    #[error("failed to encode proposal: {0}")]
    Encoding(#[from] fvm_ipld_encoding::Error),
}
