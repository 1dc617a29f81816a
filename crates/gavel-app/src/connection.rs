// Event channel connection manager.
//
// One background session task per `AuctionConnection`. The task dials the
// server, performs the Engine.IO / Socket.IO handshake, joins the auction
// room, and then multiplexes outgoing intents, incoming frames, heartbeat
// liveness and shutdown with `tokio::select!`. A lost session is redialed
// after a fixed delay and every successful (re)connect is reported as
// `ChannelEvent::Connected` so the app can reload its snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use gavel_core::config::Config;
use gavel_core::model::LiveAuctionState;
use gavel_core::protocol::{ClientIntent, OpenHandshake, Packet, ProtocolError, ServerEvent};

// ---------------------------------------------------------------------------
// Errors and events
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("not connected to the auction server")]
    NotConnected,

    #[error("failed to connect to {url}: {message}")]
    Dial { url: String, message: String },

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Events surfaced to the app loop, in receipt order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Joined the auction room (first connect or any reconnect).
    Connected,
    /// Session lost or shut down. Intents are rejected until the next
    /// `Connected`.
    Disconnected { reason: String },
    /// Server says data changed; re-fetch the snapshot.
    DataUpdate,
    /// Live state replaced.
    AuctionState(LiveAuctionState),
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// A connected, text-framed duplex channel.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, frame: String) -> Result<(), ChannelError>;

    /// Next text frame. `None` means the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<String, ChannelError>>;

    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Opens fresh transports; called once per (re)connect attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn Transport>, ChannelError>;
}

/// WebSocket connector for a Socket.IO endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn from_config(config: &Config) -> Result<Self, gavel_core::config::ConfigError> {
        Ok(Self::new(config.socket_url()?))
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, ChannelError> {
        debug!("dialing {}", self.url);
        let (stream, _resp) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Dial {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(Box::new(WsTransport { stream }))
    }
}

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(_)) => return None,
                Ok(_) => {
                    // Binary and websocket-level ping/pong are not used by
                    // Engine.IO text framing; tungstenite answers pings.
                }
                Err(e) => return Some(Err(ChannelError::Transport(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Fixed wait before redialing a lost session.
    pub reconnect_delay: Duration,
    pub event_channel_capacity: usize,
    /// Bound on the open/connect exchange after dialing.
    pub handshake_timeout: Duration,
    /// How long `shutdown()` waits before aborting the task.
    pub shutdown_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(2000),
            event_channel_capacity: 256,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ConnectionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reconnect_delay: Duration::from_millis(config.channel.reconnect_delay_ms),
            event_channel_capacity: config.channel.event_channel_capacity,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable submitter for client intents.
#[derive(Debug, Clone)]
pub struct IntentSender {
    tx: mpsc::UnboundedSender<ClientIntent>,
    connected: Arc<AtomicBool>,
}

impl IntentSender {
    /// Queue an intent for the live session. Rejected while disconnected.
    pub fn submit(&self, intent: ClientIntent) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(ChannelError::NotConnected);
        }
        debug!("submitting {}", intent.event_name());
        self.tx.send(intent).map_err(|_| ChannelError::NotConnected)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Owned handle to one auction's event channel session.
pub struct AuctionConnection {
    intents: IntentSender,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
    auction_id: String,
}

impl AuctionConnection {
    /// Spawn the session task and return the handle plus the event receiver.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn open<C: Connector>(
        connector: C,
        auction_id: impl Into<String>,
        options: ConnectionOptions,
    ) -> (Self, mpsc::Receiver<ChannelEvent>) {
        let auction_id = auction_id.into();
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(options.event_channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(false));

        let session = Session {
            connector,
            auction_id: auction_id.clone(),
            options: options.clone(),
            intent_rx,
            event_tx,
            connected: Arc::clone(&connected),
            shutdown_rx,
        };
        let task = tokio::spawn(session.run());

        let handle = Self {
            intents: IntentSender {
                tx: intent_tx,
                connected,
            },
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: options.shutdown_timeout,
            auction_id,
        };
        (handle, event_rx)
    }

    pub fn auction_id(&self) -> &str {
        &self.auction_id
    }

    pub fn intents(&self) -> IntentSender {
        self.intents.clone()
    }

    pub fn submit(&self, intent: ClientIntent) -> Result<(), ChannelError> {
        self.intents.submit(intent)
    }

    pub fn is_connected(&self) -> bool {
        self.intents.is_connected()
    }

    /// Close the transport and stop the session task, aborting it if it
    /// does not exit within the shutdown timeout.
    pub async fn shutdown(&mut self) {
        debug!("connection shutdown requested");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => warn!("session task terminated with join error: {join_err}"),
                Err(_) => {
                    warn!("session task did not exit within timeout; aborting");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session task aborted: {join_err}");
                    }
                }
            }
        }
        self.intents.connected.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for AuctionConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionConnection")
            .field("auction_id", &self.auction_id)
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for AuctionConnection {
    fn drop(&mut self) {
        // No executor to await a graceful close here; abort the task so the
        // transport and event sender are dropped with it.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

enum SessionEnd {
    Shutdown,
    Lost(String),
}

struct Session<C> {
    connector: C,
    auction_id: String,
    options: ConnectionOptions,
    intent_rx: mpsc::UnboundedReceiver<ClientIntent>,
    event_tx: mpsc::Sender<ChannelEvent>,
    connected: Arc<AtomicBool>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl<C: Connector> Session<C> {
    async fn run(mut self) {
        info!("event channel session started for auction {}", self.auction_id);
        loop {
            match self.connect_once().await {
                SessionEnd::Shutdown => {
                    self.emit_disconnected("client shut down".into()).await;
                    break;
                }
                SessionEnd::Lost(reason) => {
                    warn!("event channel lost: {reason}");
                    self.emit_disconnected(reason).await;
                }
            }

            tokio::select! {
                _ = &mut self.shutdown_rx => {
                    debug!("shutdown during reconnect delay");
                    break;
                }
                _ = tokio::time::sleep(self.options.reconnect_delay) => {
                    debug!("reconnecting to auction {}", self.auction_id);
                }
            }
        }
        info!("event channel session exited for auction {}", self.auction_id);
    }

    /// Dial, handshake, join, then pump frames until the session ends.
    async fn connect_once(&mut self) -> SessionEnd {
        let dialed = tokio::select! {
            _ = &mut self.shutdown_rx => return SessionEnd::Shutdown,
            r = self.connector.connect() => r,
        };
        let mut transport = match dialed {
            Ok(t) => t,
            Err(e) => return SessionEnd::Lost(e.to_string()),
        };

        let handshake = tokio::select! {
            _ = &mut self.shutdown_rx => {
                let _ = transport.close().await;
                return SessionEnd::Shutdown;
            }
            r = tokio::time::timeout(self.options.handshake_timeout, handshake(transport.as_mut())) => r,
        };
        let open = match handshake {
            Ok(Ok(open)) => open,
            Ok(Err(e)) => return SessionEnd::Lost(e.to_string()),
            Err(_) => return SessionEnd::Lost("handshake timed out".into()),
        };

        let join = ClientIntent::JoinAuction {
            auction_id: self.auction_id.clone(),
        };
        if let Err(e) = transport.send(join.to_frame()).await {
            return SessionEnd::Lost(e.to_string());
        }

        // Anything queued before this session existed belongs to a dead one.
        while let Ok(stale) = self.intent_rx.try_recv() {
            debug!("dropping intent queued while disconnected: {}", stale.event_name());
        }
        self.connected.store(true, Ordering::Release);
        info!("joined auction {} (sid {})", self.auction_id, open.sid);
        if self.event_tx.send(ChannelEvent::Connected).await.is_err() {
            let _ = transport.close().await;
            return SessionEnd::Shutdown;
        }

        let liveness = open.liveness_window();
        let mut deadline = Instant::now() + liveness;

        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => {
                    debug!("shutdown signal received");
                    // Intents accepted while connected still go out.
                    while let Ok(intent) = self.intent_rx.try_recv() {
                        if transport.send(intent.to_frame()).await.is_err() {
                            break;
                        }
                    }
                    let _ = transport.close().await;
                    return SessionEnd::Shutdown;
                }

                intent = self.intent_rx.recv() => {
                    match intent {
                        Some(intent) => {
                            if let Err(e) = transport.send(intent.to_frame()).await {
                                return SessionEnd::Lost(e.to_string());
                            }
                        }
                        None => {
                            // Handle dropped.
                            let _ = transport.close().await;
                            return SessionEnd::Shutdown;
                        }
                    }
                }

                incoming = transport.recv() => {
                    deadline = Instant::now() + liveness;
                    match incoming {
                        Some(Ok(frame)) => {
                            match self.handle_frame(transport.as_mut(), &frame).await {
                                Ok(FrameOutcome::Continue) => {}
                                Ok(FrameOutcome::Ended(reason)) => return SessionEnd::Lost(reason),
                                Ok(FrameOutcome::ReceiverGone) => {
                                    let _ = transport.close().await;
                                    return SessionEnd::Shutdown;
                                }
                                Err(e) => warn!("ignoring undecodable frame: {e}"),
                            }
                        }
                        Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                        None => return SessionEnd::Lost("server closed the connection".into()),
                    }
                }

                _ = tokio::time::sleep_until(deadline) => {
                    let _ = transport.close().await;
                    return SessionEnd::Lost(format!("heartbeat timeout after {liveness:?}"));
                }
            }
        }
    }

    async fn handle_frame(
        &mut self,
        transport: &mut dyn Transport,
        frame: &str,
    ) -> Result<FrameOutcome, ChannelError> {
        match Packet::decode(frame)? {
            Packet::Ping => {
                transport.send(Packet::Pong.encode()).await?;
            }
            Packet::Event { name, args } => match ServerEvent::from_event(&name, &args)? {
                Some(ServerEvent::DataUpdate) => {
                    return Ok(self.forward(ChannelEvent::DataUpdate).await);
                }
                Some(ServerEvent::AuctionState(state)) => {
                    return Ok(self.forward(ChannelEvent::AuctionState(state)).await);
                }
                None => debug!("ignoring event {name}"),
            },
            Packet::Close | Packet::Disconnect => {
                return Ok(FrameOutcome::Ended("server ended the session".into()));
            }
            Packet::ConnectError(msg) => {
                return Ok(FrameOutcome::Ended(format!("server rejected namespace: {msg}")));
            }
            Packet::Open(_) | Packet::Pong | Packet::Noop | Packet::Connect(_) => {}
        }
        Ok(FrameOutcome::Continue)
    }

    async fn forward(&self, event: ChannelEvent) -> FrameOutcome {
        match self.event_tx.send(event).await {
            Ok(()) => FrameOutcome::Continue,
            Err(_) => FrameOutcome::ReceiverGone,
        }
    }

    async fn emit_disconnected(&self, reason: String) {
        self.connected.store(false, Ordering::Release);
        if self
            .event_tx
            .send(ChannelEvent::Disconnected { reason })
            .await
            .is_err()
        {
            debug!("event channel closed, receiver dropped");
        }
    }
}

enum FrameOutcome {
    Continue,
    Ended(String),
    ReceiverGone,
}

/// Wait for the Engine.IO open packet, request the default namespace, and
/// wait for the namespace ack. Pings during the exchange are answered.
async fn handshake(transport: &mut dyn Transport) -> Result<OpenHandshake, ChannelError> {
    let open = loop {
        match next_packet(transport).await? {
            Packet::Open(open) => break open,
            Packet::Ping => transport.send(Packet::Pong.encode()).await?,
            other => {
                return Err(ChannelError::Handshake(format!(
                    "expected open packet, got {other:?}"
                )))
            }
        }
    };

    transport.send(Packet::Connect(None).encode()).await?;

    loop {
        match next_packet(transport).await? {
            Packet::Connect(_) => return Ok(open),
            Packet::Ping => transport.send(Packet::Pong.encode()).await?,
            Packet::ConnectError(msg) => return Err(ChannelError::Handshake(msg)),
            Packet::Noop => {}
            other => {
                return Err(ChannelError::Handshake(format!(
                    "expected namespace ack, got {other:?}"
                )))
            }
        }
    }
}

async fn next_packet(transport: &mut dyn Transport) -> Result<Packet, ChannelError> {
    match transport.recv().await {
        Some(Ok(frame)) => Ok(Packet::decode(&frame)?),
        Some(Err(e)) => Err(e),
        None => Err(ChannelError::Handshake("connection closed during handshake".into())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    pub(crate) const OPEN: &str =
        r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
    pub(crate) const ACK: &str = r#"40{"sid":"n1"}"#;

    pub(crate) type Script = Vec<Option<Result<String, ChannelError>>>;

    pub(crate) struct MockTransport {
        incoming: VecDeque<Option<Result<String, ChannelError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, frame: String) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
            match self.incoming.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), ChannelError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    /// Hands out one scripted transport per connect; hangs once exhausted.
    pub(crate) struct MockConnector {
        scripts: StdMutex<VecDeque<Script>>,
        pub sent: Arc<StdMutex<Vec<String>>>,
        pub closed: Arc<AtomicBool>,
        pub dials: Arc<AtomicUsize>,
    }

    impl MockConnector {
        pub(crate) fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: StdMutex::new(scripts.into()),
                sent: Arc::new(StdMutex::new(Vec::new())),
                closed: Arc::new(AtomicBool::new(false)),
                dials: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self) -> Result<Box<dyn Transport>, ChannelError> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            let next = self.scripts.lock().unwrap().pop_front();
            match next {
                Some(script) => Ok(Box::new(MockTransport {
                    incoming: script.into(),
                    sent: Arc::clone(&self.sent),
                    closed: Arc::clone(&self.closed),
                })),
                None => std::future::pending().await,
            }
        }
    }

    pub(crate) fn frame(s: &str) -> Option<Result<String, ChannelError>> {
        Some(Ok(s.to_string()))
    }

    pub(crate) fn handshake_script() -> Script {
        vec![frame(OPEN), frame(ACK)]
    }

    fn opts() -> ConnectionOptions {
        ConnectionOptions {
            reconnect_delay: Duration::from_millis(500),
            event_channel_capacity: 16,
            ..ConnectionOptions::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_joins_room_and_forwards_events() {
        let mut script = handshake_script();
        script.push(frame("2"));
        script.push(frame(
            r#"42["auction_state",{"currentBid":40,"leadingTeamId":"t1","currentPlayerId":"p1","status":"ACTIVE"}]"#,
        ));
        script.push(frame(r#"42["chat","hello"]"#));
        script.push(frame(r#"42["data_update"]"#));
        let connector = MockConnector::new(vec![script]);
        let sent = Arc::clone(&connector.sent);

        let (conn, mut events) = AuctionConnection::open(connector, "A", opts());

        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Connected);
        match events.recv().await.unwrap() {
            ChannelEvent::AuctionState(s) => assert_eq!(s.current_bid, 40),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(events.recv().await.unwrap(), ChannelEvent::DataUpdate);

        let sent = sent.lock().unwrap().clone();
        assert_eq!(sent[0], "40");
        assert_eq!(sent[1], r#"42["join_auction","A"]"#);
        assert_eq!(sent[2], "3");
        assert!(conn.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn intents_rejected_before_connect() {
        let connector = MockConnector::new(vec![]);
        let (conn, _events) = AuctionConnection::open(connector, "A", opts());
        let err = conn
            .submit(ClientIntent::UndoBid {
                auction_id: "A".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConnected));
    }

    #[tokio::test(start_paused = true)]
    async fn intents_reach_the_wire_when_connected() {
        let connector = MockConnector::new(vec![handshake_script()]);
        let sent = Arc::clone(&connector.sent);
        let (conn, mut events) = AuctionConnection::open(connector, "A", opts());
        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Connected);

        conn.submit(ClientIntent::PlaceBid {
            auction_id: "A".into(),
            team_id: "T1".into(),
            amount: 50,
        })
        .unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        let sent = sent.lock().unwrap().clone();
        assert_eq!(
            sent.last().map(String::as_str),
            Some(r#"42["place_bid",{"auctionId":"A","teamId":"T1","amount":50}]"#)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_fixed_delay_and_rejoins() {
        let mut first = handshake_script();
        first.push(None);
        let connector = MockConnector::new(vec![first, handshake_script()]);
        let dials = Arc::clone(&connector.dials);
        let sent = Arc::clone(&connector.sent);

        let (conn, mut events) = AuctionConnection::open(connector, "A", opts());
        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Connected);
        assert!(matches!(
            events.recv().await.unwrap(),
            ChannelEvent::Disconnected { .. }
        ));
        assert!(!conn.is_connected());

        let before = Instant::now();
        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Connected);
        assert!(before.elapsed() >= Duration::from_millis(500));
        assert_eq!(dials.load(Ordering::SeqCst), 2);

        let joins = sent
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.contains("join_auction"))
            .count();
        assert_eq!(joins, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_past_liveness_window_drops_session() {
        let script = vec![
            frame(r#"0{"sid":"s1","pingInterval":100,"pingTimeout":50}"#),
            frame(ACK),
        ];
        let connector = MockConnector::new(vec![script]);
        let closed = Arc::clone(&connector.closed);
        let (_conn, mut events) = AuctionConnection::open(connector, "A", opts());

        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Connected);
        let start = Instant::now();
        match events.recv().await.unwrap() {
            ChannelEvent::Disconnected { reason } => assert!(reason.contains("heartbeat")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
        assert!(closed.load(Ordering::Relaxed));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_error_during_handshake_is_retried() {
        let rejected = vec![frame(OPEN), frame(r#"44{"message":"nope"}"#)];
        let connector = MockConnector::new(vec![rejected, handshake_script()]);
        let (_conn, mut events) = AuctionConnection::open(connector, "A", opts());

        match events.recv().await.unwrap() {
            ChannelEvent::Disconnected { reason } => assert!(reason.contains("nope")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_transport_and_ends_stream() {
        let connector = MockConnector::new(vec![handshake_script()]);
        let closed = Arc::clone(&connector.closed);
        let (mut conn, mut events) = AuctionConnection::open(connector, "A", opts());
        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Connected);

        conn.shutdown().await;
        assert!(closed.load(Ordering::Relaxed));
        assert!(!conn.is_connected());
        assert!(matches!(
            events.recv().await,
            Some(ChannelEvent::Disconnected { .. })
        ));
        assert!(events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_intent_is_flushed_on_shutdown() {
        let connector = MockConnector::new(vec![handshake_script()]);
        let sent = Arc::clone(&connector.sent);
        let (mut conn, mut events) = AuctionConnection::open(connector, "A", opts());
        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Connected);

        conn.submit(ClientIntent::RequestRefresh).unwrap();
        conn.shutdown().await;

        let sent = sent.lock().unwrap().clone();
        assert_eq!(sent.last().map(String::as_str), Some(r#"42["data_update"]"#));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_ends_event_stream() {
        let connector = MockConnector::new(vec![handshake_script()]);
        let (conn, mut events) = AuctionConnection::open(connector, "A", opts());
        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Connected);

        drop(conn);
        assert!(events.recv().await.is_none());
    }
}
