use thiserror::Error;

/// Errors from chain state queries.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain rpc failed: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),

    #[error("invalid chain api configuration: {0}")]
    Config(String),

    #[error("provider {0} has no published peer id")]
    NoPeerRecord(String),

    #[error("provider {0} has no published multiaddrs")]
    NoAddresses(String),

    #[error("provider {provider} published an invalid peer record: {reason}")]
    InvalidPeerRecord { provider: String, reason: String },

    #[error("unexpected chain response: {0}")]
    InvalidResponse(String),
}
