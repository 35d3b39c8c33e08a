//! Protocol Messages
//!
//! Two layers travel over the wire:
//!
//! - [`WireMessage`]: what participants say to each other inside a session
//!   (a client's input, the host's snapshot).
//! - [`ClientFrame`] / [`RelayFrame`]: the envelope a WebSocket relay wraps
//!   around them (join, presence roster, fan-out).
//!
//! Everything is JSON.

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::game::archetype::Archetype;
use crate::game::events::GameEvent;
use crate::game::input::InputVector;
use crate::game::state::{
    ActiveEvent, Camera, MatchPhase, Obstacle, Player, Powerup, Projectile, Referee, Simulation,
};

// =============================================================================
// SESSION MESSAGES
// =============================================================================

/// Message exchanged between participants of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// Client input for its own slot.
    Input {
        /// Sender's slot
        slot: u8,
        /// Buttons held this frame
        input: InputVector,
    },
    /// Full host state after a tick.
    Snapshot(Box<Snapshot>),
}

impl WireMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Complete sync-visible state of the arena for one tick.
///
/// Players and projectiles travel as the simulation's own structs;
/// projectile owners are slots, never references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Host tick
    pub tick: u64,
    /// Round number
    pub round: u32,
    /// Match phase
    pub phase: MatchPhase,
    /// All four slots
    pub players: Vec<Player>,
    /// Live projectiles
    pub projectiles: Vec<Projectile>,
    /// Pickups on the floor
    pub powerups: Vec<Powerup>,
    /// Arena layout and temporary walls
    pub obstacles: Vec<Obstacle>,
    /// Referee actor
    pub referee: Referee,
    /// Global event, if any
    pub event: Option<ActiveEvent>,
    /// Host camera
    pub camera: Camera,
    /// Events produced by this tick
    #[serde(default)]
    pub events: Vec<GameEvent>,
    /// Hash of the state above as the host computed it
    #[serde(with = "hex_hash")]
    pub state_hash: StateHash,
}

impl Snapshot {
    /// Capture the simulation after a tick.
    pub fn capture(sim: &Simulation, events: &[GameEvent]) -> Self {
        Self {
            tick: sim.tick,
            round: sim.round,
            phase: sim.phase,
            players: sim.players.clone(),
            projectiles: sim.projectiles.clone(),
            powerups: sim.powerups.clone(),
            obstacles: sim.obstacles.clone(),
            referee: sim.referee.clone(),
            event: sim.event.clone(),
            camera: sim.camera.clone(),
            events: events.to_vec(),
            state_hash: sim.state_hash(),
        }
    }

    /// Overwrite the local simulation with this snapshot.
    ///
    /// No interpolation: the local state snaps to the host's. Applying the
    /// same snapshot twice leaves the state unchanged.
    pub fn apply_to(&self, sim: &mut Simulation) {
        sim.tick = self.tick;
        sim.round = self.round;
        sim.phase = self.phase;
        sim.players.clone_from(&self.players);
        sim.projectiles.clone_from(&self.projectiles);
        sim.powerups.clone_from(&self.powerups);
        sim.obstacles.clone_from(&self.obstacles);
        sim.referee.clone_from(&self.referee);
        sim.event.clone_from(&self.event);
        sim.camera.clone_from(&self.camera);
    }

    /// Check the applied state against the host's hash.
    pub fn verify(&self, sim: &Simulation) -> bool {
        sim.state_hash() == self.state_hash
    }
}

mod hex_hash {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde::de::Error;

    use crate::core::hash::StateHash;

    pub fn serialize<S: Serializer>(hash: &StateHash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StateHash, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("state hash must be 32 bytes"))
    }
}

// =============================================================================
// ROSTER
// =============================================================================

/// One member of a session as announced by presence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Participant identifier
    pub participant_id: String,
    /// Chosen character
    pub archetype: Archetype,
}

impl RosterEntry {
    /// Create an entry.
    pub fn new(participant_id: impl Into<String>, archetype: Archetype) -> Self {
        Self {
            participant_id: participant_id.into(),
            archetype,
        }
    }
}

// =============================================================================
// RELAY FRAMES
// =============================================================================

/// Whether joining a session may create it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Open a new session; fails if it exists
    Create,
    /// Enter an existing session; fails if it does not exist
    Join,
}

/// Frames a participant sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Subscribe to a session and announce presence.
    Subscribe {
        /// Session identifier
        session_id: String,
        /// Who is joining
        entry: RosterEntry,
        /// Create or join
        mode: JoinMode,
    },
    /// Fan a message out to the other members.
    Publish {
        /// Payload
        message: WireMessage,
    },
    /// Leave the session.
    Leave,
}

/// Frames the relay sends to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayFrame {
    /// Subscription confirmed.
    Subscribed {
        /// Session identifier
        session_id: String,
    },
    /// Current membership, sent on every change.
    Roster {
        /// Members sorted by participant id
        entries: Vec<RosterEntry>,
    },
    /// A message from another member.
    Message {
        /// Sender
        from: String,
        /// Payload
        message: WireMessage,
    },
    /// Request failed.
    Error {
        /// Failure class
        code: ErrorCode,
        /// Human-readable detail
        message: String,
    },
}

/// Relay failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Frame did not parse
    InvalidMessage,
    /// Publish before subscribe
    NotSubscribed,
    /// Join of an unknown session
    SessionNotFound,
    /// Create of an existing session
    SessionExists,
    /// Connection limit reached
    ServerFull,
}

impl ClientFrame {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl RelayFrame {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use crate::game::config::SimConfig;
    use crate::game::tick::tick;

    fn running_sim() -> Simulation {
        let mut sim = Simulation::new(SimConfig::default(), 5);
        let mut roster = BTreeMap::new();
        roster.insert(1, Archetype::Toaster);
        roster.insert(2, Archetype::Galactic);
        sim.apply_roster(&roster);
        sim.start();

        let mut inputs = BTreeMap::new();
        inputs.insert(1, InputVector { fire: true, right: true, ..Default::default() });
        inputs.insert(2, InputVector { fire: true, up: true, ..Default::default() });
        for _ in 0..30 {
            tick(&mut sim, 1.0 / 60.0, &inputs);
        }
        sim
    }

    #[test]
    fn test_input_message_json() {
        let msg = WireMessage::Input {
            slot: 2,
            input: InputVector { left: true, fire: true, ..Default::default() },
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"input\""));

        let parsed = WireMessage::from_json(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_snapshot_carries_owner_slots() {
        let sim = running_sim();
        assert!(!sim.projectiles.is_empty());
        let snapshot = Snapshot::capture(&sim, &[]);
        let json = WireMessage::Snapshot(Box::new(snapshot)).to_json().unwrap();
        assert!(json.contains("\"owner\":{\"player\":1}") || json.contains("\"owner\":{\"player\":2}"));
    }

    #[test]
    fn test_snapshot_applies_and_verifies() {
        let host = running_sim();
        let snapshot = Snapshot::capture(&host, &[]);
        let json = WireMessage::Snapshot(Box::new(snapshot)).to_json().unwrap();

        let WireMessage::Snapshot(received) = WireMessage::from_json(&json).unwrap() else {
            panic!("expected snapshot");
        };

        let mut client = Simulation::new(SimConfig::default(), 777);
        received.apply_to(&mut client);
        assert!(received.verify(&client));
        assert_eq!(client.players, host.players);
        assert_eq!(client.obstacles, host.obstacles);
    }

    #[test]
    fn test_snapshot_apply_is_idempotent() {
        let host = running_sim();
        let snapshot = Snapshot::capture(&host, &[]);

        let mut client = Simulation::new(SimConfig::default(), 3);
        snapshot.apply_to(&mut client);
        let once = client.state_hash();
        snapshot.apply_to(&mut client);
        assert_eq!(client.state_hash(), once);
        assert_eq!(client.projectiles, host.projectiles);
    }

    #[test]
    fn test_bad_hash_rejected() {
        let json = r#"{"type":"subscribed","session_id":"room"}"#;
        assert!(matches!(RelayFrame::from_json(json), Ok(RelayFrame::Subscribed { .. })));

        let sim = running_sim();
        let mut value = serde_json::to_value(Snapshot::capture(&sim, &[])).unwrap();
        value["state_hash"] = serde_json::Value::String("abcd".into());
        assert!(serde_json::from_value::<Snapshot>(value).is_err());
    }

    #[test]
    fn test_relay_frames_json() {
        let frame = ClientFrame::Subscribe {
            session_id: "room-1".into(),
            entry: RosterEntry::new("a-device", Archetype::Pigeon),
            mode: JoinMode::Create,
        };
        let json = frame.to_json().unwrap();
        assert!(json.contains("\"archetype\":\"pigeon\""));
        assert_eq!(ClientFrame::from_json(&json).unwrap(), frame);

        let err = RelayFrame::Error {
            code: ErrorCode::SessionNotFound,
            message: "no such session".into(),
        };
        let json = err.to_json().unwrap();
        assert!(json.contains("session_not_found"));
    }
}
