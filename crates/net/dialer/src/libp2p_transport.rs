//! libp2p implementation of [`Transport`].
//!
//! # Transport Stack
//!
//! ```text
//! DNS (resolves /dns4/, /dns6/, /dnsaddr/)
//!   └── TCP
//!         └── Noise (encryption)
//!               └── Yamux (multiplexing)
//! ```
//!
//! The swarm runs on a background task. [`Libp2pTransport`] talks to it over
//! a command channel; streams are opened directly through the
//! `libp2p-stream` control handle.

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use libp2p::{
    PeerId, Stream, StreamProtocol, Swarm, SwarmBuilder, identify,
    identity::Keypair,
    noise,
    swarm::{NetworkBehaviour, SwarmEvent, dial_opts::DialOpts},
    tcp, yamux,
};
use pledge_chain::ProviderPeer;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Transport, TransportError};

/// Protocol version announced over identify.
const IDENTIFY_PROTOCOL_VERSION: &str = "/pledge/1.0.0";

/// Configuration for [`Libp2pTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on dialing a provider.
    pub connect_timeout: Duration,
    /// Upper bound on waiting for the provider's identify record.
    pub identify_timeout: Duration,
    /// Connection idle timeout.
    pub idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            identify_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Network behaviour of the deal client.
#[derive(NetworkBehaviour)]
struct DealBehaviour {
    /// Identify protocol - learns the provider's supported protocols.
    identify: identify::Behaviour,

    /// Raw streams for the deal protocol.
    stream: libp2p_stream::Behaviour,
}

impl DealBehaviour {
    fn new(keypair: &Keypair) -> Self {
        Self {
            identify: identify::Behaviour::new(
                identify::Config::new(IDENTIFY_PROTOCOL_VERSION.to_string(), keypair.public())
                    .with_agent_version(format!("pledge/{}", env!("CARGO_PKG_VERSION"))),
            ),
            stream: libp2p_stream::Behaviour::new(),
        }
    }
}

enum Command {
    Dial { peer: ProviderPeer, reply: oneshot::Sender<Result<(), TransportError>> },
    Protocols { peer_id: PeerId, reply: oneshot::Sender<Result<Vec<String>, TransportError>> },
    Disconnect { peer_id: PeerId },
}

/// [`Transport`] over a TCP/Noise/Yamux libp2p swarm.
#[derive(Clone)]
pub struct Libp2pTransport {
    commands: mpsc::UnboundedSender<Command>,
    control: libp2p_stream::Control,
    local_peer_id: PeerId,
    config: TransportConfig,
}

impl std::fmt::Debug for Libp2pTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Libp2pTransport")
            .field("local_peer_id", &self.local_peer_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Libp2pTransport {
    /// Builds a swarm with a fresh identity and spawns its event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: TransportConfig) -> Result<Self, TransportError> {
        let swarm = SwarmBuilder::with_new_identity()
            .with_tokio()
            .with_tcp(tcp::Config::default(), noise::Config::new, yamux::Config::default)
            .map_err(|e| TransportError::Setup(e.to_string()))?
            .with_dns()
            .map_err(|e| TransportError::Setup(e.to_string()))?
            .with_behaviour(DealBehaviour::new)
            .map_err(|e| TransportError::Setup(e.to_string()))?
            .with_swarm_config(|cfg| cfg.with_idle_connection_timeout(config.idle_timeout))
            .build();

        let local_peer_id = *swarm.local_peer_id();
        let control = swarm.behaviour().stream.new_control();
        info!(%local_peer_id, "Local peer ID");

        let (commands, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(SwarmTask::new(swarm, command_rx).run());

        Ok(Self { commands, control, local_peer_id, config })
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    fn send(&self, command: Command) -> Result<(), TransportError> {
        self.commands.send(command).map_err(|_| TransportError::ChannelClosed)
    }
}

/// Awaits `rx` unless `cancel` fires or `timeout` elapses first.
async fn await_reply<T>(
    rx: oneshot::Receiver<T>,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<T, TransportError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        reply = tokio::time::timeout(timeout, rx) => match reply {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(TransportError::ChannelClosed),
            Err(_) => Err(TransportError::Timeout(timeout)),
        },
    }
}

#[async_trait]
impl Transport for Libp2pTransport {
    type Stream = Stream;

    async fn connect(
        &self,
        peer: &ProviderPeer,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Dial { peer: peer.clone(), reply })?;
        let result = await_reply(rx, cancel, self.config.connect_timeout).await;
        if matches!(result, Err(TransportError::Cancelled | TransportError::Timeout(_))) {
            // The dial may still complete; nobody would own that connection.
            self.disconnect(peer.peer_id);
        }
        result?
    }

    async fn protocols(
        &self,
        peer_id: PeerId,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Protocols { peer_id, reply })?;
        await_reply(rx, cancel, self.config.identify_timeout).await?
    }

    async fn open_stream(
        &self,
        peer_id: PeerId,
        protocol: StreamProtocol,
    ) -> Result<Self::Stream, TransportError> {
        let mut control = self.control.clone();
        control
            .open_stream(peer_id, protocol)
            .await
            .map_err(|e| TransportError::Stream(e.to_string()))
    }

    fn disconnect(&self, peer_id: PeerId) {
        // A stopped task has already dropped every connection.
        let _ = self.send(Command::Disconnect { peer_id });
    }
}

// ============================================================================
// Swarm task
// ============================================================================

struct SwarmTask {
    swarm: Swarm<DealBehaviour>,
    commands: mpsc::UnboundedReceiver<Command>,
    pending_dials: HashMap<PeerId, Vec<oneshot::Sender<Result<(), TransportError>>>>,
    pending_identify: HashMap<PeerId, Vec<oneshot::Sender<Result<Vec<String>, TransportError>>>>,
    identified: HashMap<PeerId, Vec<String>>,
    /// Dials whose caller gave up; closed as soon as they connect.
    abandoned_dials: HashSet<PeerId>,
}

impl SwarmTask {
    fn new(swarm: Swarm<DealBehaviour>, commands: mpsc::UnboundedReceiver<Command>) -> Self {
        Self {
            swarm,
            commands,
            pending_dials: HashMap::new(),
            pending_identify: HashMap::new(),
            identified: HashMap::new(),
            abandoned_dials: HashSet::new(),
        }
    }

    async fn run(mut self) {
        debug!("Starting swarm task");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = self.swarm.select_next_some() => self.handle_swarm_event(event),
            }
        }
        debug!("Swarm task shutting down");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Dial { peer, reply } => {
                let peer_id = peer.peer_id;
                if self.swarm.is_connected(&peer_id) {
                    let _ = reply.send(Ok(()));
                    return;
                }
                debug!(%peer_id, addrs = ?peer.multiaddrs, "Dialing provider");
                let opts = DialOpts::peer_id(peer_id).addresses(peer.multiaddrs).build();
                match self.swarm.dial(opts) {
                    Ok(()) => self.pending_dials.entry(peer_id).or_default().push(reply),
                    Err(e) => {
                        let _ = reply.send(Err(TransportError::Dial(e.to_string())));
                    }
                }
            }
            Command::Protocols { peer_id, reply } => {
                if let Some(protocols) = self.identified.get(&peer_id) {
                    let _ = reply.send(Ok(protocols.clone()));
                } else if self.swarm.is_connected(&peer_id) {
                    self.pending_identify.entry(peer_id).or_default().push(reply);
                } else {
                    let _ = reply.send(Err(TransportError::NotConnected(peer_id)));
                }
            }
            Command::Disconnect { peer_id } => {
                debug!(%peer_id, "Disconnecting provider");
                if self.pending_dials.remove(&peer_id).is_some() {
                    self.abandoned_dials.insert(peer_id);
                }
                let _ = self.swarm.disconnect_peer_id(peer_id);
                self.identified.remove(&peer_id);
                self.pending_identify.remove(&peer_id);
            }
        }
    }

    fn handle_swarm_event(&mut self, event: SwarmEvent<DealBehaviourEvent>) {
        match event {
            SwarmEvent::ConnectionEstablished { peer_id, endpoint, .. } => {
                info!(%peer_id, endpoint = %endpoint.get_remote_address(), "Connection established");
                let replies = self.pending_dials.remove(&peer_id).unwrap_or_default();
                if self.abandoned_dials.remove(&peer_id) && replies.is_empty() {
                    debug!(%peer_id, "Closing abandoned connection");
                    let _ = self.swarm.disconnect_peer_id(peer_id);
                    return;
                }
                for reply in replies {
                    let _ = reply.send(Ok(()));
                }
            }
            SwarmEvent::OutgoingConnectionError { peer_id: Some(peer_id), error, .. } => {
                warn!(%peer_id, %error, "Outgoing connection error");
                self.abandoned_dials.remove(&peer_id);
                for reply in self.pending_dials.remove(&peer_id).unwrap_or_default() {
                    let _ = reply.send(Err(TransportError::Dial(error.to_string())));
                }
            }
            SwarmEvent::ConnectionClosed { peer_id, num_established: 0, cause, .. } => {
                debug!(%peer_id, cause = ?cause, "Connection closed");
                self.identified.remove(&peer_id);
                self.fail_identify(peer_id, || TransportError::NotConnected(peer_id));
            }
            SwarmEvent::Behaviour(DealBehaviourEvent::Identify(event)) => {
                self.handle_identify_event(event);
            }
            _ => {}
        }
    }

    fn handle_identify_event(&mut self, event: identify::Event) {
        match event {
            identify::Event::Received { peer_id, info, .. } => {
                debug!(
                    %peer_id,
                    agent_version = %info.agent_version,
                    protocols = info.protocols.len(),
                    "Received identify info"
                );
                let protocols: Vec<String> =
                    info.protocols.iter().map(|p| p.as_ref().to_string()).collect();
                for reply in self.pending_identify.remove(&peer_id).unwrap_or_default() {
                    let _ = reply.send(Ok(protocols.clone()));
                }
                self.identified.insert(peer_id, protocols);
            }
            identify::Event::Error { peer_id, error, .. } => {
                warn!(%peer_id, %error, "Identify error");
                let reason = error.to_string();
                self.fail_identify(peer_id, || TransportError::Identify(reason.clone()));
            }
            _ => {}
        }
    }

    fn fail_identify(&mut self, peer_id: PeerId, error: impl Fn() -> TransportError) {
        for reply in self.pending_identify.remove(&peer_id).unwrap_or_default() {
            let _ = reply.send(Err(error()));
        }
    }
}
