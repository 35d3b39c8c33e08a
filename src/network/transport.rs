//! Pub/Sub Transport
//!
//! A session is a channel scoped to a session identifier. Members publish
//! [`WireMessage`]s to everyone else and receive the presence roster on
//! every membership change. Delivery is at-most-once with no persistence:
//! a slow reader that falls behind loses the oldest messages.
//!
//! [`LocalHub`] keeps every session in process on a tokio broadcast
//! channel; the WebSocket client in `ws` talks to the relay server.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info};

use crate::network::protocol::{JoinMode, RosterEntry, WireMessage};

/// Messages buffered per session before slow readers start losing them.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The subscription has been torn down.
    #[error("Transport closed")]
    Closed,

    /// Join of a session nobody created.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Create of a session that already exists.
    #[error("Session already exists: {0}")]
    SessionExists(String),

    /// The relay refused the request.
    #[error("Relay rejected request: {0}")]
    Rejected(String),

    /// Message could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something received from the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Current membership, sorted by participant id.
    Roster(Vec<RosterEntry>),
    /// A message from another member.
    Message {
        /// Sender's participant id
        from: String,
        /// Payload
        message: WireMessage,
    },
}

/// A live subscription to one session.
///
/// Publishing never waits for delivery; draining never blocks.
pub trait Transport: Send {
    /// Send a message to every other member.
    fn publish(&mut self, message: WireMessage) -> Result<(), TransportError>;

    /// Everything received since the last drain, in arrival order.
    fn drain(&mut self) -> Vec<Envelope>;

    /// Unsubscribe and withdraw presence. Idempotent.
    fn close(&mut self);

    /// Check if the subscription is still open.
    fn is_open(&self) -> bool;
}

/// Something that can open subscriptions.
pub trait Hub {
    /// Subscription type handed out.
    type Transport: Transport;

    /// Subscribe to a session and announce presence.
    ///
    /// Completes once the subscription is live.
    fn open(
        &self,
        session_id: &str,
        entry: RosterEntry,
        mode: JoinMode,
    ) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}

// =============================================================================
// IN-PROCESS HUB
// =============================================================================

struct Room {
    tx: broadcast::Sender<Envelope>,
    members: BTreeMap<String, RosterEntry>,
}

impl Room {
    fn roster(&self) -> Vec<RosterEntry> {
        self.members.values().cloned().collect()
    }
}

type Rooms = Arc<Mutex<BTreeMap<String, Room>>>;

/// In-process session registry.
///
/// Cheap to clone; clones share the same sessions.
#[derive(Clone)]
pub struct LocalHub {
    rooms: Rooms,
    capacity: usize,
}

impl LocalHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create an empty hub with a per-session buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(BTreeMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.rooms.lock().map(|rooms| rooms.len()).unwrap_or(0)
    }

    /// Current roster of a session.
    pub fn roster(&self, session_id: &str) -> Option<Vec<RosterEntry>> {
        let rooms = self.rooms.lock().ok()?;
        rooms.get(session_id).map(Room::roster)
    }

    fn subscribe(
        &self,
        session_id: &str,
        entry: RosterEntry,
        mode: JoinMode,
    ) -> Result<LocalTransport, TransportError> {
        let mut rooms = self.rooms.lock().map_err(|_| TransportError::Closed)?;

        match (mode, rooms.contains_key(session_id)) {
            (JoinMode::Create, true) => {
                return Err(TransportError::SessionExists(session_id.to_string()));
            }
            (JoinMode::Join, false) => {
                return Err(TransportError::SessionNotFound(session_id.to_string()));
            }
            (JoinMode::Create, false) => {
                let (tx, _) = broadcast::channel(self.capacity);
                rooms.insert(session_id.to_string(), Room { tx, members: BTreeMap::new() });
                info!(session_id, "Session created");
            }
            (JoinMode::Join, true) => {}
        }

        let room = rooms
            .get_mut(session_id)
            .ok_or_else(|| TransportError::SessionNotFound(session_id.to_string()))?;

        // Subscribe first so the joiner sees its own roster announcement
        let rx = room.tx.subscribe();
        let me = entry.participant_id.clone();
        room.members.insert(me.clone(), entry);
        let _ = room.tx.send(Envelope::Roster(room.roster()));
        info!(session_id, participant = %me, members = room.members.len(), "Participant joined");

        Ok(LocalTransport {
            session_id: session_id.to_string(),
            me,
            rooms: self.rooms.clone(),
            tx: room.tx.clone(),
            rx,
            open: true,
        })
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub for LocalHub {
    type Transport = LocalTransport;

    fn open(
        &self,
        session_id: &str,
        entry: RosterEntry,
        mode: JoinMode,
    ) -> impl Future<Output = Result<LocalTransport, TransportError>> + Send {
        let result = self.subscribe(session_id, entry, mode);
        async move { result }
    }
}

/// Subscription to a [`LocalHub`] session.
pub struct LocalTransport {
    session_id: String,
    me: String,
    rooms: Rooms,
    tx: broadcast::Sender<Envelope>,
    rx: broadcast::Receiver<Envelope>,
    open: bool,
}

impl LocalTransport {
    /// Session this subscription belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn current_roster(&self) -> Option<Vec<RosterEntry>> {
        let rooms = self.rooms.lock().ok()?;
        rooms.get(&self.session_id).map(Room::roster)
    }
}

impl Transport for LocalTransport {
    fn publish(&mut self, message: WireMessage) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        // No receivers is not an error: nobody is listening yet
        let _ = self.tx.send(Envelope::Message {
            from: self.me.clone(),
            message,
        });
        Ok(())
    }

    fn drain(&mut self) -> Vec<Envelope> {
        let mut received = Vec::new();
        if !self.open {
            return received;
        }
        let mut lagged = false;
        loop {
            match self.rx.try_recv() {
                Ok(Envelope::Message { from, .. }) if from == self.me => {}
                Ok(envelope) => received.push(envelope),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(session_id = %self.session_id, skipped, "Receiver lagged, messages dropped");
                    lagged = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        // A skipped roster is never replayed, so hand out the current one
        if lagged {
            if let Some(roster) = self.current_roster() {
                received.push(Envelope::Roster(roster));
            }
        }
        received
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let Ok(mut rooms) = self.rooms.lock() else {
            return;
        };
        let emptied = match rooms.get_mut(&self.session_id) {
            Some(room) => {
                room.members.remove(&self.me);
                let _ = room.tx.send(Envelope::Roster(room.roster()));
                room.members.is_empty()
            }
            None => false,
        };
        if emptied {
            rooms.remove(&self.session_id);
            info!(session_id = %self.session_id, "Session closed");
        }
        info!(session_id = %self.session_id, participant = %self.me, "Participant left");
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        self.close();
    }
}
