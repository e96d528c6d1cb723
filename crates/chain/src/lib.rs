//! Chain state collaborator.
//!
//! The deal session needs three facts from the chain: the current height, the
//! provider collateral bounds for a piece, and the network record a provider
//! published on chain. [`ChainState`] is that narrow interface;
//! [`LotusClient`] answers it over the Lotus JSON-RPC API and
//! [`PolicyResolver`] turns the answers into proposal defaults.

use async_trait::async_trait;
use libp2p::{Multiaddr, PeerId};
use pledge_primitives::{Address, ChainEpoch, PaddedPieceSize, TokenAmount};

mod error;
mod lotus;
mod policy;

pub use error::ChainError;
pub use lotus::{LotusClient, LotusConfig};
pub use policy::{PolicyResolver, collateral_with_margin};

/// Network identity a storage provider published on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPeer {
    pub peer_id: PeerId,
    pub multiaddrs: Vec<Multiaddr>,
}

/// Provider collateral range the market actor accepts for a deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralBounds {
    pub min: TokenAmount,
    pub max: TokenAmount,
}

/// Read-only chain queries used while shaping a deal.
///
/// Implementations must tolerate concurrent use by several sessions.
#[async_trait]
pub trait ChainState: Send + Sync {
    /// Height of the current chain head.
    async fn current_height(&self) -> Result<ChainEpoch, ChainError>;

    /// Provider collateral bounds for a piece of `piece_size`.
    async fn collateral_bounds(
        &self,
        piece_size: PaddedPieceSize,
        verified: bool,
    ) -> Result<CollateralBounds, ChainError>;

    /// Resolves a provider's on-chain address to its libp2p identity.
    async fn resolve_peer(&self, provider: &Address) -> Result<ProviderPeer, ChainError>;
}
