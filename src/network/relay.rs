//! WebSocket Relay
//!
//! Pub/sub fan-out for sessions whose participants run on different
//! machines. The relay never simulates: it tracks presence per session,
//! pushes the roster on every change and forwards each published message to
//! every other member. Delivery is fire-and-forget; a member whose outbound
//! queue is full misses the message. A missed roster is resent ahead of the
//! next frame that fits.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::protocol::{
    ClientFrame, ErrorCode, JoinMode, RelayFrame, RosterEntry, WireMessage,
};

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Outbound frames queued per connection.
    pub outbound_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            outbound_capacity: 256,
        }
    }
}

impl RelayConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// - `ARENA_RELAY_ADDR`: bind address, e.g. `0.0.0.0:8080`
    /// - `ARENA_RELAY_MAX_CONNECTIONS`: connection cap
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("ARENA_RELAY_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(e) => warn!("Ignoring ARENA_RELAY_ADDR={}: {}", addr, e),
            }
        }

        if let Ok(max) = std::env::var("ARENA_RELAY_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(parsed) => config.max_connections = parsed,
                Err(e) => warn!("Ignoring ARENA_RELAY_MAX_CONNECTIONS={}: {}", max, e),
            }
        }

        config
    }
}

/// Relay errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A subscribed connection.
struct Member {
    entry: RosterEntry,
    sender: mpsc::Sender<RelayFrame>,
    /// Set when a roster announcement did not fit in the queue.
    stale_roster: AtomicBool,
}

impl Member {
    fn new(entry: RosterEntry, sender: mpsc::Sender<RelayFrame>) -> Self {
        Self {
            entry,
            sender,
            stale_roster: AtomicBool::new(false),
        }
    }

    fn send_roster(&self, entries: Vec<RosterEntry>) -> bool {
        let sent = self.sender.try_send(RelayFrame::Roster { entries }).is_ok();
        self.stale_roster.store(!sent, Ordering::Relaxed);
        sent
    }
}

/// Members of one session, keyed by connection.
#[derive(Default)]
struct Room {
    members: BTreeMap<SocketAddr, Member>,
}

impl Room {
    fn roster(&self) -> Vec<RosterEntry> {
        let mut entries: Vec<RosterEntry> = self.members.values().map(|m| m.entry.clone()).collect();
        entries.sort();
        entries
    }

    fn announce(&self) {
        let roster = self.roster();
        for member in self.members.values() {
            if !member.send_roster(roster.clone()) {
                debug!(to = %member.entry.participant_id, "Outbound queue full, roster deferred");
            }
        }
    }

    /// Forward a message from `addr` to every other member.
    fn forward(&self, addr: SocketAddr, message: &WireMessage) {
        let Some(from) = self.members.get(&addr).map(|m| m.entry.participant_id.clone()) else {
            return;
        };

        for (member_addr, member) in self.members.iter() {
            if *member_addr == addr {
                continue;
            }
            if member.stale_roster.load(Ordering::Relaxed) && !member.send_roster(self.roster()) {
                continue;
            }
            let frame = RelayFrame::Message {
                from: from.clone(),
                message: message.clone(),
            };
            if member.sender.try_send(frame).is_err() {
                debug!(to = %member.entry.participant_id, "Outbound queue full, message dropped");
            }
        }
    }
}

type Rooms = Arc<RwLock<BTreeMap<String, Room>>>;

/// The relay server.
pub struct RelayServer {
    config: RelayConfig,
    rooms: Rooms,
    connections: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Create a relay.
    pub fn new(config: RelayConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            rooms: Arc::new(RwLock::new(BTreeMap::new())),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self), fields(addr = %self.config.bind_addr))]
    pub async fn run(&self) -> Result<(), RelayError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), RelayError> {
        info!("Relay listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::Relaxed) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Stop accepting and drop every connection.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Number of sessions with at least one member.
    pub async fn session_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let rooms = self.rooms.clone();
        let connections = self.connections.clone();
        let capacity = self.config.outbound_capacity;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    connections.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (frame_tx, mut frame_rx) = mpsc::channel::<RelayFrame>(capacity);

            // Outbound pump
            let sender_task = tokio::spawn(async move {
                while let Some(frame) = frame_rx.recv().await {
                    let text = match frame.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize frame: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            let mut joined: Option<String> = None;

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let frame = match ClientFrame::from_json(&text) {
                                    Ok(f) => f,
                                    Err(e) => {
                                        debug!("Invalid frame from {}: {}", addr, e);
                                        reject(&frame_tx, ErrorCode::InvalidMessage, "Invalid frame format");
                                        continue;
                                    }
                                };
                                match frame {
                                    ClientFrame::Subscribe { session_id, entry, mode } => {
                                        if let Some(previous) = joined.take() {
                                            leave(&rooms, &previous, addr).await;
                                        }
                                        if subscribe(&rooms, &session_id, entry, mode, addr, &frame_tx).await {
                                            joined = Some(session_id);
                                        }
                                    }
                                    ClientFrame::Publish { message } => match &joined {
                                        Some(session_id) => publish(&rooms, session_id, addr, message).await,
                                        None => reject(&frame_tx, ErrorCode::NotSubscribed, "Subscribe first"),
                                    },
                                    ClientFrame::Leave => {
                                        if let Some(session_id) = joined.take() {
                                            leave(&rooms, &session_id, addr).await;
                                        }
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                debug!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            if let Some(session_id) = joined.take() {
                leave(&rooms, &session_id, addr).await;
            }
            drop(frame_tx);
            let _ = sender_task.await;
            connections.fetch_sub(1, Ordering::Relaxed);
            debug!("Client {} cleaned up", addr);
        });
    }
}

fn reject(sender: &mpsc::Sender<RelayFrame>, code: ErrorCode, message: &str) {
    let _ = sender.try_send(RelayFrame::Error {
        code,
        message: message.to_string(),
    });
}

/// Add a member and announce the new roster. Returns whether it joined.
async fn subscribe(
    rooms: &Rooms,
    session_id: &str,
    entry: RosterEntry,
    mode: JoinMode,
    addr: SocketAddr,
    sender: &mpsc::Sender<RelayFrame>,
) -> bool {
    let mut rooms = rooms.write().await;

    match (mode, rooms.contains_key(session_id)) {
        (JoinMode::Create, true) => {
            reject(sender, ErrorCode::SessionExists, "Session already exists");
            return false;
        }
        (JoinMode::Join, false) => {
            reject(sender, ErrorCode::SessionNotFound, "Session not found");
            return false;
        }
        _ => {}
    }

    let room = rooms.entry(session_id.to_string()).or_default();
    info!(session_id, participant = %entry.participant_id, "Participant joined");
    room.members.insert(addr, Member::new(entry, sender.clone()));

    let _ = sender.try_send(RelayFrame::Subscribed { session_id: session_id.to_string() });
    room.announce();
    true
}

/// Forward a message to every other member of the session.
async fn publish(rooms: &Rooms, session_id: &str, addr: SocketAddr, message: WireMessage) {
    let rooms = rooms.read().await;
    if let Some(room) = rooms.get(session_id) {
        room.forward(addr, &message);
    }
}

/// Remove a member, announce the roster and drop the session once empty.
async fn leave(rooms: &Rooms, session_id: &str, addr: SocketAddr) {
    let mut rooms = rooms.write().await;
    let Some(room) = rooms.get_mut(session_id) else {
        return;
    };
    if let Some(member) = room.members.remove(&addr) {
        info!(session_id, participant = %member.entry.participant_id, "Participant left");
    }
    if room.members.is_empty() {
        rooms.remove(session_id);
        info!(session_id, "Session closed");
    } else {
        room.announce();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::Archetype;
    use crate::game::input::InputVector;
    use crate::network::transport::{Envelope, Hub, Transport, TransportError};
    use crate::network::ws::{WsHub, WsTransport};
    use std::time::Duration;

    async fn start_relay() -> (Arc<RelayServer>, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(RelayServer::new(RelayConfig::default()));
        let running = server.clone();
        tokio::spawn(async move {
            let _ = running.serve(listener).await;
        });
        (server, format!("ws://{}", addr))
    }

    /// Poll until something arrives or two seconds pass.
    async fn wait_for(transport: &mut WsTransport) -> Vec<Envelope> {
        for _ in 0..200 {
            let received = transport.drain();
            if !received.is_empty() {
                return received;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Vec::new()
    }

    fn roster_ids(envelopes: &[Envelope]) -> Option<Vec<String>> {
        envelopes.iter().rev().find_map(|e| match e {
            Envelope::Roster(entries) => Some(entries.iter().map(|r| r.participant_id.clone()).collect()),
            _ => None,
        })
    }

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 1000);
    }

    #[tokio::test]
    async fn test_relay_roster_and_fan_out() {
        let (server, url) = start_relay().await;
        let hub = WsHub::new(url);

        let mut a = hub.open("room", RosterEntry::new("a", Archetype::Austin), JoinMode::Create).await.unwrap();
        assert_eq!(roster_ids(&wait_for(&mut a).await), Some(vec!["a".to_string()]));

        let mut b = hub.open("room", RosterEntry::new("b", Archetype::Brady), JoinMode::Join).await.unwrap();
        assert_eq!(roster_ids(&wait_for(&mut b).await), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(roster_ids(&wait_for(&mut a).await), Some(vec!["a".to_string(), "b".to_string()]));

        let msg = WireMessage::Input { slot: 2, input: InputVector { dash: true, ..Default::default() } };
        b.publish(msg.clone()).unwrap();
        assert_eq!(wait_for(&mut a).await, vec![Envelope::Message { from: "b".into(), message: msg }]);

        b.close();
        assert_eq!(roster_ids(&wait_for(&mut a).await), Some(vec!["a".to_string()]));
        assert_eq!(server.session_count().await, 1);
        server.shutdown();
    }

    #[test]
    fn test_missed_roster_resent_before_next_message() {
        let a: SocketAddr = "127.0.0.1:1001".parse().unwrap();
        let c: SocketAddr = "127.0.0.1:1003".parse().unwrap();
        let (a_tx, _a_rx) = mpsc::channel(8);
        let (c_tx, mut c_rx) = mpsc::channel(1);

        let mut room = Room::default();
        room.members.insert(a, Member::new(RosterEntry::new("a", Archetype::Austin), a_tx));
        room.members.insert(c, Member::new(RosterEntry::new("c", Archetype::Chef), c_tx));

        // c's queue is full when the roster goes out
        let input = WireMessage::Input { slot: 1, input: InputVector::idle() };
        room.forward(a, &input);
        room.announce();
        assert!(room.members[&c].stale_roster.load(Ordering::Relaxed));

        // Still full: the next message is dropped and the roster stays owed
        room.forward(a, &input);
        assert!(room.members[&c].stale_roster.load(Ordering::Relaxed));

        assert!(matches!(c_rx.try_recv(), Ok(RelayFrame::Message { .. })));
        room.forward(a, &input);
        match c_rx.try_recv() {
            Ok(RelayFrame::Roster { entries }) => assert_eq!(entries, room.roster()),
            other => panic!("expected roster, got {:?}", other),
        }
        assert!(!room.members[&c].stale_roster.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_relay_rejects_unknown_session() {
        let (server, url) = start_relay().await;
        let hub = WsHub::new(url);
        let result = hub.open("ghost", RosterEntry::new("a", Archetype::Chef), JoinMode::Join).await;
        assert!(matches!(result, Err(TransportError::SessionNotFound(_))));
        server.shutdown();
    }
}
