//! In-memory chain and provider for driving deal sessions in tests.

#![allow(dead_code, unreachable_pub)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use cid::{Cid, multihash::Multihash};
use libp2p::{PeerId, StreamProtocol};
use pledge_chain::{ChainError, ChainState, CollateralBounds, ProviderPeer};
use pledge_net_deal::{DealParams, MAX_MESSAGE_SIZE, PROTOCOL_NAME, read_request};
use pledge_net_dialer::{Transport, TransportError};
use pledge_primitives::{
    Address, ChainEpoch, FIL_COMMITMENT_UNSEALED, PaddedPieceSize, TokenAmount,
};
use pledge_session::{DealSession, SessionConfig};
use pledge_wallet::{LocalWallet, MemoryKeystore};
use tokio::sync::Notify;
use tokio_util::{
    compat::{Compat, TokioAsyncReadCompatExt},
    sync::CancellationToken,
};

pub const HEAD: ChainEpoch = 100_000;
pub const MIN_COLLATERAL: u64 = 1001;

// ============================================================================
// Chain
// ============================================================================

pub struct FakeChain {
    pub height: ChainEpoch,
    pub min_collateral: TokenAmount,
    pub peer: Option<ProviderPeer>,
    pub height_calls: AtomicUsize,
    pub collateral_calls: AtomicUsize,
}

impl FakeChain {
    pub fn new(peer: Option<ProviderPeer>) -> Arc<Self> {
        Arc::new(Self {
            height: HEAD,
            min_collateral: TokenAmount::from_atto(MIN_COLLATERAL),
            peer,
            height_calls: AtomicUsize::new(0),
            collateral_calls: AtomicUsize::new(0),
        })
    }

    pub fn with_provider() -> Arc<Self> {
        Self::new(Some(ProviderPeer {
            peer_id: PeerId::random(),
            multiaddrs: vec!["/ip4/127.0.0.1/tcp/24001".parse().unwrap()],
        }))
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer.as_ref().unwrap().peer_id
    }
}

#[async_trait]
impl ChainState for FakeChain {
    async fn current_height(&self) -> Result<ChainEpoch, ChainError> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.height)
    }

    async fn collateral_bounds(
        &self,
        _piece_size: PaddedPieceSize,
        _verified: bool,
    ) -> Result<CollateralBounds, ChainError> {
        self.collateral_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CollateralBounds {
            min: self.min_collateral.clone(),
            max: TokenAmount::from_atto(self.min_collateral.atto() * 10u64),
        })
    }

    async fn resolve_peer(&self, provider: &Address) -> Result<ProviderPeer, ChainError> {
        self.peer.clone().ok_or_else(|| ChainError::NoPeerRecord(provider.to_string()))
    }
}

// ============================================================================
// Transport
// ============================================================================

/// What the in-memory provider does with a proposal.
#[derive(Debug, Clone)]
pub enum ProviderScript {
    Accept,
    Reject(String),
    /// Reads the proposal and never answers.
    Silent,
    /// Drops the stream without reading.
    HangUp,
    /// Accepts the connection but never finishes opening a stream.
    StallOpen,
}

#[derive(Debug, Default)]
pub struct TransportLog {
    pub connects: usize,
    pub streams: usize,
    pub disconnects: Vec<PeerId>,
}

pub struct MemoryTransport {
    protocols: Vec<String>,
    script: ProviderScript,
    pub log: Mutex<TransportLog>,
    /// Proposals the provider has read.
    pub received: Arc<Mutex<Vec<DealParams>>>,
    /// Notified each time the provider reads a proposal.
    pub request_seen: Arc<Notify>,
}

impl MemoryTransport {
    pub fn new(script: ProviderScript) -> Arc<Self> {
        Self::with_protocols(script, &["/ipfs/id/1.0.0", PROTOCOL_NAME])
    }

    pub fn with_protocols(script: ProviderScript, protocols: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            protocols: protocols.iter().map(|p| p.to_string()).collect(),
            script,
            log: Mutex::new(TransportLog::default()),
            received: Arc::new(Mutex::new(Vec::new())),
            request_seen: Arc::new(Notify::new()),
        })
    }

    pub fn received(&self) -> Vec<DealParams> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Stream = Compat<tokio::io::DuplexStream>;

    async fn connect(
        &self,
        _peer: &ProviderPeer,
        _cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        self.log.lock().unwrap().connects += 1;
        Ok(())
    }

    async fn protocols(
        &self,
        _peer_id: PeerId,
        _cancel: &CancellationToken,
    ) -> Result<Vec<String>, TransportError> {
        Ok(self.protocols.clone())
    }

    async fn open_stream(
        &self,
        _peer_id: PeerId,
        protocol: StreamProtocol,
    ) -> Result<Self::Stream, TransportError> {
        assert_eq!(protocol.as_ref(), PROTOCOL_NAME);
        if matches!(self.script, ProviderScript::StallOpen) {
            return std::future::pending().await;
        }
        self.log.lock().unwrap().streams += 1;

        let (client, provider) = tokio::io::duplex(MAX_MESSAGE_SIZE);
        let script = self.script.clone();
        let received = self.received.clone();
        let request_seen = self.request_seen.clone();

        tokio::spawn(async move {
            let provider = provider.compat();
            if matches!(script, ProviderScript::HangUp) {
                drop(provider);
                return;
            }
            let Ok((params, responder)) = read_request(provider).await else {
                return;
            };
            received.lock().unwrap().push(params);
            request_seen.notify_one();

            match script {
                ProviderScript::Accept => {
                    let _ = responder.accept().await;
                }
                ProviderScript::Reject(message) => {
                    let _ = responder.reject(message).await;
                }
                ProviderScript::Silent => {
                    let _responder = responder;
                    std::future::pending::<()>().await;
                }
                ProviderScript::HangUp | ProviderScript::StallOpen => {}
            }
        });

        Ok(client.compat())
    }

    fn disconnect(&self, peer_id: PeerId) {
        self.log.lock().unwrap().disconnects.push(peer_id);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn piece_cid() -> String {
    let digest = Multihash::<64>::wrap(0x1012, &[7u8; 32]).unwrap();
    Cid::new_v1(FIL_COMMITMENT_UNSEALED, digest).to_string()
}

pub fn payload_cid() -> String {
    let digest = Multihash::<64>::wrap(0x12, &[9u8; 32]).unwrap();
    Cid::new_v1(0x70, digest).to_string()
}

pub fn provider() -> Address {
    Address::new_id(1000)
}

/// A wallet holding one freshly generated key.
pub fn wallet() -> (Arc<LocalWallet>, Address) {
    let wallet = LocalWallet::new(MemoryKeystore::new());
    let address = wallet.generate().unwrap();
    (Arc::new(wallet), address)
}

pub fn session(
    chain: Arc<FakeChain>,
    wallet: Arc<LocalWallet>,
    transport: Arc<MemoryTransport>,
) -> DealSession<MemoryTransport> {
    DealSession::new(chain, wallet, transport, SessionConfig::default())
}
