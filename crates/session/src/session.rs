use std::{sync::Arc, time::Duration};

use pledge_chain::{ChainState, PolicyResolver};
use pledge_net_deal::{CancelReason, DealParams, DealResponse, ExchangeError, Transfer, exchange};
use pledge_net_dialer::{PeerHandle, PeerNegotiator, Transport};
use pledge_primitives::{
    Address, ChainEpoch, Cid, DEFAULT_DEAL_DURATION, DealEconomics, PaddedPieceSize, TokenAmount,
};
use pledge_proposal::{ProposalParams, SignedDealProposal, build_proposal};
use pledge_wallet::Signer;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::{DealOutcome, DealSummary, SessionError};

/// Everything the caller decides about a deal.
///
/// Unset start epoch and collateral are resolved from chain state. When the
/// piece size is unset it is derived from the CAR size.
#[derive(Debug, Clone)]
pub struct DealRequest {
    pub provider: Address,
    /// Wallet address to sign with; the wallet's default when unset.
    pub wallet: Option<String>,
    /// Piece commitment (commP).
    pub piece_cid: String,
    pub piece_size: Option<PaddedPieceSize>,
    /// Root of the payload DAG.
    pub payload_cid: String,
    /// Size of the CAR file the provider imports out of band.
    pub car_size: u64,
    pub start_epoch: Option<ChainEpoch>,
    pub duration: ChainEpoch,
    pub provider_collateral: Option<TokenAmount>,
    /// Provider's ask, per GiB per epoch.
    pub price: TokenAmount,
    pub verified: bool,
    /// Keep an unsealed copy for fast retrieval.
    pub fast_retrieval: bool,
    pub skip_ipni_announce: bool,
}

impl DealRequest {
    pub fn new(
        provider: Address,
        piece_cid: impl Into<String>,
        payload_cid: impl Into<String>,
        car_size: u64,
    ) -> Self {
        Self {
            provider,
            wallet: None,
            piece_cid: piece_cid.into(),
            piece_size: None,
            payload_cid: payload_cid.into(),
            car_size,
            start_epoch: None,
            duration: DEFAULT_DEAL_DURATION,
            provider_collateral: None,
            price: TokenAmount::from_atto(0),
            verified: false,
            fast_retrieval: true,
            skip_ipni_announce: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Budget for writing the proposal and reading the verdict.
    pub exchange_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { exchange_timeout: Duration::from_secs(60) }
    }
}

/// Where a session is in its single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionState {
    Initialized,
    PriceComputed,
    ProposalBuilt,
    Signed,
    PeerNegotiated,
    Exchanged,
    Accepted,
    Rejected,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Failed)
    }
}

/// One attempt at proposing a deal to one provider.
///
/// Steps run strictly in order and nothing is retried. Running a finished
/// session again starts over with a fresh deal UUID.
pub struct DealSession<T: Transport> {
    deal_uuid: Uuid,
    state: SessionState,
    transitions: Vec<SessionState>,
    policy: PolicyResolver,
    signer: Arc<dyn Signer>,
    negotiator: PeerNegotiator<T>,
    config: SessionConfig,
    cancel: CancellationToken,
}

impl<T: Transport> std::fmt::Debug for DealSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DealSession")
            .field("deal_uuid", &self.deal_uuid)
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> DealSession<T> {
    pub fn new(
        chain: Arc<dyn ChainState>,
        signer: Arc<dyn Signer>,
        transport: Arc<T>,
        config: SessionConfig,
    ) -> Self {
        Self {
            deal_uuid: Uuid::new_v4(),
            state: SessionState::Initialized,
            transitions: vec![SessionState::Initialized],
            policy: PolicyResolver::new(chain.clone()),
            signer,
            negotiator: PeerNegotiator::new(chain, transport),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to abort connecting and the exchange.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn deal_uuid(&self) -> Uuid {
        self.deal_uuid
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn transitions(&self) -> &[SessionState] {
        &self.transitions
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs the session to a terminal state.
    ///
    /// A provider rejection is an `Ok` outcome. Any error leaves the session in
    /// [`SessionState::Failed`] with the peer connection released.
    pub async fn run(&mut self, request: &DealRequest) -> Result<DealOutcome, SessionError> {
        if self.state != SessionState::Initialized {
            self.deal_uuid = Uuid::new_v4();
            self.state = SessionState::Initialized;
            self.transitions = vec![SessionState::Initialized];
        }

        let span = info_span!("deal", deal_uuid = %self.deal_uuid, provider = %request.provider);
        async {
            let result = self.drive(request).await;
            match &result {
                Ok(DealOutcome::Accepted(summary)) => {
                    self.advance(SessionState::Accepted);
                    info!(start_epoch = summary.start_epoch, "Deal accepted by provider");
                }
                Ok(DealOutcome::Rejected { message, .. }) => {
                    self.advance(SessionState::Rejected);
                    info!(%message, "Deal rejected by provider");
                }
                Err(error) => {
                    self.advance(SessionState::Failed);
                    warn!(kind = %error.kind(), %error, "Deal session failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self, request: &DealRequest) -> Result<DealOutcome, SessionError> {
        // Pricing
        let economics = match request.piece_size {
            Some(piece_size) => DealEconomics::with_piece_size(
                request.car_size,
                piece_size,
                &request.price,
                request.verified,
            ),
            None => DealEconomics::compute(request.car_size, &request.price, request.verified),
        }?;
        debug!(
            piece_size = economics.piece_size.0,
            sector_size = ?economics.sector_size,
            price_per_epoch = %economics.price_per_epoch.atto(),
            "Deal: Priced"
        );
        self.advance(SessionState::PriceComputed);

        // Proposal
        let client = self
            .signer
            .default_or_named(request.wallet.as_deref())
            .await
            .map_err(|source| SessionError::Signing { client: None, source })?;
        let start_epoch =
            self.policy.start_epoch(request.start_epoch).await.map_err(SessionError::Defaults)?;
        let provider_collateral = self
            .policy
            .provider_collateral(
                request.provider_collateral.clone(),
                economics.piece_size,
                request.verified,
            )
            .await
            .map_err(SessionError::Defaults)?;

        let built = build_proposal(&ProposalParams {
            piece_cid: request.piece_cid.clone(),
            piece_size: economics.piece_size,
            root_cid: request.payload_cid.clone(),
            client,
            provider: request.provider,
            start_epoch,
            duration: request.duration,
            verified: request.verified,
            provider_collateral,
            storage_price_per_epoch: economics.price_per_epoch.clone(),
        })?;
        self.advance(SessionState::ProposalBuilt);

        // Signature
        let bytes = built.proposal.canonical_bytes()?;
        let signature = self
            .signer
            .sign(&client, &bytes)
            .await
            .map_err(|source| SessionError::Signing { client: Some(client), source })?;
        let signed = SignedDealProposal::new(built.proposal, signature);
        self.advance(SessionState::Signed);

        // Provider
        let handle = self.negotiator.negotiate(&request.provider, &self.cancel).await?;
        self.advance(SessionState::PeerNegotiated);

        let summary = summarize(self.deal_uuid, &signed, &built.data_root);
        let params = DealParams {
            deal_uuid: self.deal_uuid,
            is_offline: true,
            client_deal_proposal: signed,
            deal_data_root: built.data_root,
            transfer: Transfer::offline(request.car_size),
            remove_unsealed_copy: !request.fast_retrieval,
            skip_ipni_announce: request.skip_ipni_announce,
        };

        let response = self.exchange(&handle, params).await;
        handle.close();
        let response = response?;
        self.advance(SessionState::Exchanged);

        if response.accepted {
            Ok(DealOutcome::Accepted(summary))
        } else {
            Ok(DealOutcome::Rejected { deal_uuid: self.deal_uuid, message: response.message })
        }
    }

    async fn exchange(
        &self,
        handle: &PeerHandle<T>,
        params: DealParams,
    ) -> Result<DealResponse, SessionError> {
        let deal_uuid = self.deal_uuid;
        let peer_id = handle.peer_id();

        // Opening the stream and the round trip share one deadline.
        let deadline = Instant::now() + self.config.exchange_timeout;
        let cancelled = |reason: CancelReason| SessionError::Exchange {
            deal_uuid,
            peer_id,
            source: ExchangeError::Cancelled(reason),
        };

        let stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(cancelled(CancelReason::Cancelled)),
            opened = tokio::time::timeout_at(deadline, handle.open_stream()) => match opened {
                Ok(stream) => {
                    stream.map_err(|source| SessionError::Stream { deal_uuid, peer_id, source })?
                }
                Err(_) => return Err(cancelled(CancelReason::DeadlineExceeded)),
            },
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        exchange(stream, params, &self.cancel, remaining)
            .await
            .map_err(|source| SessionError::Exchange { deal_uuid, peer_id, source })
    }

    fn advance(&mut self, next: SessionState) {
        info!(from = %self.state, to = %next, "Deal session state");
        self.state = next;
        self.transitions.push(next);
    }
}

fn summarize(deal_uuid: Uuid, signed: &SignedDealProposal, data_root: &Cid) -> DealSummary {
    let proposal = &signed.proposal;
    DealSummary {
        deal_uuid,
        provider: proposal.provider.to_string(),
        client_wallet: proposal.client.to_string(),
        payload_cid: data_root.to_string(),
        commp: proposal.piece_cid.to_string(),
        start_epoch: proposal.start_epoch,
        end_epoch: proposal.end_epoch,
        provider_collateral: proposal.provider_collateral.atto().to_string(),
        piece_size: proposal.piece_size.0,
        storage_price_per_epoch: proposal.storage_price_per_epoch.atto().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Accepted.is_terminal());
        assert!(SessionState::Rejected.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Exchanged.is_terminal());
        assert!(!SessionState::Initialized.is_terminal());
    }

    #[test]
    fn test_request_defaults() {
        let request = DealRequest::new(Address::new_id(1000), "commp", "root", 10);
        assert_eq!(request.duration, DEFAULT_DEAL_DURATION);
        assert!(request.fast_retrieval);
        assert!(request.start_epoch.is_none());
        assert!(request.provider_collateral.is_none());
        assert_eq!(SessionState::PeerNegotiated.to_string(), "PeerNegotiated");
    }
}
