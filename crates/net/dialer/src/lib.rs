//! Reaching a storage provider.
//!
//! [`PeerNegotiator`] resolves a provider's on-chain address to a libp2p
//! identity, connects, and confirms the provider speaks the deal protocol.
//! The resulting [`PeerHandle`] owns the connection until it is closed.
//!
//! The network itself sits behind the [`Transport`] trait;
//! [`Libp2pTransport`] is the production implementation.

use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite};
use libp2p::{PeerId, StreamProtocol};
use pledge_chain::ProviderPeer;
use tokio_util::sync::CancellationToken;

mod error;
mod libp2p_transport;
mod negotiator;

pub use error::{NegotiationError, TransportError};
pub use libp2p_transport::{Libp2pTransport, TransportConfig};
pub use negotiator::{PeerHandle, PeerNegotiator, deal_protocol};

/// Connection management as seen by the negotiator.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// A bidirectional stream to a peer.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Establishes a connection to `peer`, returning once it is usable.
    async fn connect(
        &self,
        peer: &ProviderPeer,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError>;

    /// Protocols the connected peer advertises.
    async fn protocols(
        &self,
        peer_id: PeerId,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, TransportError>;

    /// Opens a stream to `peer_id` speaking `protocol`.
    async fn open_stream(
        &self,
        peer_id: PeerId,
        protocol: StreamProtocol,
    ) -> Result<Self::Stream, TransportError>;

    /// Drops every connection to `peer_id`. Never blocks.
    fn disconnect(&self, peer_id: PeerId);
}
