use std::sync::Arc;

use libp2p::{PeerId, StreamProtocol};
use pledge_chain::ChainState;
use pledge_net_deal::PROTOCOL_NAME;
use pledge_primitives::Address;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{NegotiationError, Transport, TransportError};

/// The deal protocol as a libp2p stream protocol.
pub fn deal_protocol() -> StreamProtocol {
    StreamProtocol::new(PROTOCOL_NAME)
}

/// Finds and connects to storage providers.
pub struct PeerNegotiator<T> {
    chain: Arc<dyn ChainState>,
    transport: Arc<T>,
}

impl<T> std::fmt::Debug for PeerNegotiator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerNegotiator").finish_non_exhaustive()
    }
}

impl<T: Transport> PeerNegotiator<T> {
    pub fn new(chain: Arc<dyn ChainState>, transport: Arc<T>) -> Self {
        Self { chain, transport }
    }

    /// Connects to `provider` and checks it speaks the deal protocol.
    ///
    /// A provider without the protocol is a hard failure for this attempt;
    /// the connection is dropped before returning.
    pub async fn negotiate(
        &self,
        provider: &Address,
        cancel: &CancellationToken,
    ) -> Result<PeerHandle<T>, NegotiationError> {
        let peer = self.chain.resolve_peer(provider).await.map_err(|source| {
            NegotiationError::ProviderLookupFailed { provider: *provider, source }
        })?;
        let peer_id = peer.peer_id;
        debug!(%provider, %peer_id, addrs = ?peer.multiaddrs, "Resolved provider peer");

        self.transport
            .connect(&peer, cancel)
            .await
            .map_err(|source| NegotiationError::ConnectionFailed { peer_id, source })?;

        // From here on the handle owns the connection and releases it on drop.
        let handle = PeerHandle {
            peer_id,
            provider: *provider,
            transport: self.transport.clone(),
            closed: false,
        };

        let advertised = self
            .transport
            .protocols(peer_id, cancel)
            .await
            .map_err(|source| NegotiationError::ConnectionFailed { peer_id, source })?;

        if !advertised.iter().any(|p| p == PROTOCOL_NAME) {
            warn!(%peer_id, protocol = PROTOCOL_NAME, ?advertised, "Provider lacks deal protocol");
            handle.close();
            return Err(NegotiationError::UnsupportedProtocol {
                peer_id,
                protocol: PROTOCOL_NAME,
                advertised,
            });
        }

        info!(%provider, %peer_id, "Provider supports deal protocol");
        Ok(handle)
    }
}

/// An open connection to a provider that supports the deal protocol.
///
/// Closing is idempotent and also happens on drop, so the connection is
/// released on every exit path.
pub struct PeerHandle<T: Transport> {
    peer_id: PeerId,
    provider: Address,
    transport: Arc<T>,
    closed: bool,
}

impl<T: Transport> std::fmt::Debug for PeerHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerHandle")
            .field("peer_id", &self.peer_id)
            .field("provider", &self.provider)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> PeerHandle<T> {
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn provider(&self) -> &Address {
        &self.provider
    }

    /// Opens a deal protocol stream on this connection.
    pub async fn open_stream(&self) -> Result<T::Stream, TransportError> {
        self.transport.open_stream(self.peer_id, deal_protocol()).await
    }

    /// Releases the connection.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(peer_id = %self.peer_id, "Releasing provider connection");
            self.transport.disconnect(self.peer_id);
        }
    }
}

impl<T: Transport> Drop for PeerHandle<T> {
    fn drop(&mut self) {
        self.release();
    }
}
