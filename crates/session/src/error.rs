use libp2p::PeerId;
use pledge_chain::ChainError;
use pledge_net_deal::ExchangeError;
use pledge_net_dialer::{NegotiationError, TransportError};
use pledge_primitives::{Address, PricingError};
use pledge_proposal::ProposalError;
use pledge_wallet::WalletError;
use uuid::Uuid;

/// Coarse classification of a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    PricingError,
    ProposalConstructionError,
    SigningFailed,
    ProviderLookupFailed,
    ConnectionFailed,
    UnsupportedProtocol,
    TransportError,
    ExchangeCancelled,
}

/// Why a deal session ended in `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid pricing inputs: {0}")]
    Pricing(#[from] PricingError),

    #[error("invalid proposal: {0}")]
    Proposal(#[from] ProposalError),

    #[error("resolving proposal defaults failed: {0}")]
    Defaults(#[source] ChainError),

    #[error("signing with wallet {} failed: {source}", display_wallet(.client))]
    Signing {
        client: Option<Address>,
        #[source]
        source: WalletError,
    },

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("deal {deal_uuid}: opening stream to {peer_id} failed: {source}")]
    Stream {
        deal_uuid: Uuid,
        peer_id: PeerId,
        #[source]
        source: TransportError,
    },

    #[error("deal {deal_uuid} with {peer_id}: {source}")]
    Exchange {
        deal_uuid: Uuid,
        peer_id: PeerId,
        #[source]
        source: ExchangeError,
    },
}

fn display_wallet(client: &Option<Address>) -> String {
    client.map(|a| a.to_string()).unwrap_or_else(|| "<unresolved>".to_string())
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Pricing(_) => ErrorKind::PricingError,
            Self::Proposal(_) | Self::Defaults(_) => ErrorKind::ProposalConstructionError,
            Self::Signing { .. } => ErrorKind::SigningFailed,
            Self::Negotiation(NegotiationError::ProviderLookupFailed { .. }) => {
                ErrorKind::ProviderLookupFailed
            }
            Self::Negotiation(NegotiationError::ConnectionFailed { .. }) => {
                ErrorKind::ConnectionFailed
            }
            Self::Negotiation(NegotiationError::UnsupportedProtocol { .. }) => {
                ErrorKind::UnsupportedProtocol
            }
            Self::Stream { .. } => ErrorKind::TransportError,
            Self::Exchange { source: ExchangeError::Cancelled(_), .. } => {
                ErrorKind::ExchangeCancelled
            }
            Self::Exchange { source: ExchangeError::Transport(_), .. } => ErrorKind::TransportError,
        }
    }

    /// The deal identifier, once one has been sent to a provider.
    pub fn deal_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Stream { deal_uuid, .. } | Self::Exchange { deal_uuid, .. } => Some(*deal_uuid),
            _ => None,
        }
    }

    /// Whether the provider may have received the proposal.
    ///
    /// Such a deal should be looked up with the provider before retrying, to
    /// avoid submitting it twice.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Exchange { source: ExchangeError::Cancelled(_), .. })
    }
}
