use libp2p::PeerId;
use pledge_chain::ChainError;
use pledge_primitives::Address;

/// Errors from the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build transport: {0}")]
    Setup(String),
    #[error("dial failed: {0}")]
    Dial(String),
    #[error("no connection to {0}")]
    NotConnected(PeerId),
    #[error("identify failed: {0}")]
    Identify(String),
    #[error("failed to open stream: {0}")]
    Stream(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("network task stopped")]
    ChannelClosed,
}

/// Errors from [`crate::PeerNegotiator::negotiate`].
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("provider {provider} lookup failed: {source}")]
    ProviderLookupFailed {
        provider: Address,
        #[source]
        source: ChainError,
    },

    #[error("connection to {peer_id} failed: {source}")]
    ConnectionFailed {
        peer_id: PeerId,
        #[source]
        source: TransportError,
    },

    #[error("provider {peer_id} does not support protocol {protocol}")]
    UnsupportedProtocol {
        peer_id: PeerId,
        protocol: &'static str,
        advertised: Vec<String>,
    },
}
