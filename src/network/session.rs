//! Session Management
//!
//! Drives one participant through a session: subscribe, learn its role from
//! the roster, then once per frame either simulate and broadcast (host),
//! send input and render snapshots (client), or only render (spectator).
//!
//! ```text
//! Connecting ──roster──▶ RoleAssigned(role) ──frame──▶ Active(role)
//!      │                        ▲                          │
//!      │                        └────roster change─────────┘
//!      └──────────────── leave ───────────────▶ Disconnected
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::core::hash::short_hex;
use crate::game::archetype::Archetype;
use crate::game::config::SimConfig;
use crate::game::events::GameEvent;
use crate::game::input::InputVector;
use crate::game::role::{resolve_roles, Role};
use crate::game::state::{MatchPhase, Simulation};
use crate::game::tick::tick;
use crate::network::protocol::{JoinMode, RosterEntry, Snapshot, WireMessage};
use crate::network::transport::{Envelope, Hub, Transport, TransportError};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Subscribed, waiting for the first roster.
    Connecting,
    /// Role known, acted on from the next frame.
    RoleAssigned(Role),
    /// Playing the role.
    Active(Role),
    /// Left the session.
    Disconnected,
}

impl SessionState {
    /// Role currently held, if any.
    pub fn role(&self) -> Option<Role> {
        match self {
            SessionState::RoleAssigned(role) | SessionState::Active(role) => Some(*role),
            SessionState::Connecting | SessionState::Disconnected => None,
        }
    }
}

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Simulation tuning
    pub sim: SimConfig,
    /// Host restarts the round this many seconds after it ends; `None` waits
    /// for [`Session::restart_round`].
    pub round_restart_delay: Option<f32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            round_restart_delay: Some(3.0),
        }
    }
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session was left or the channel closed.
    #[error("Session not active")]
    NotActive,

    /// Only the host may do this.
    #[error("Not the host")]
    NotHost,

    /// Transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// One participant's view of a session.
pub struct Session<T: Transport> {
    session_id: String,
    me: String,
    archetype: Archetype,
    config: SessionConfig,
    transport: T,
    state: SessionState,
    sim: Simulation,
    roster: Vec<RosterEntry>,
    /// Last input heard from each remote slot
    remote_inputs: BTreeMap<u8, InputVector>,
    last_snapshot: Option<Box<Snapshot>>,
    events: Vec<GameEvent>,
    restart_timer: Option<f32>,
}

impl<T: Transport> Session<T> {
    /// Open a new session on the hub.
    pub async fn create<H>(
        hub: &H,
        session_id: &str,
        me: &str,
        archetype: Archetype,
        config: SessionConfig,
    ) -> Result<Self, SessionError>
    where
        H: Hub<Transport = T>,
    {
        Self::open(hub, session_id, me, archetype, config, JoinMode::Create).await
    }

    /// Join an existing session on the hub.
    pub async fn join<H>(
        hub: &H,
        session_id: &str,
        me: &str,
        archetype: Archetype,
        config: SessionConfig,
    ) -> Result<Self, SessionError>
    where
        H: Hub<Transport = T>,
    {
        Self::open(hub, session_id, me, archetype, config, JoinMode::Join).await
    }

    async fn open<H>(
        hub: &H,
        session_id: &str,
        me: &str,
        archetype: Archetype,
        config: SessionConfig,
        mode: JoinMode,
    ) -> Result<Self, SessionError>
    where
        H: Hub<Transport = T>,
    {
        let transport = hub.open(session_id, RosterEntry::new(me, archetype), mode).await?;
        info!(session_id, participant = me, ?mode, "Session opened");
        let mut session = Self::with_transport(session_id, me, archetype, config, transport);
        session.pump();
        Ok(session)
    }

    /// Wrap an already-open subscription.
    pub fn with_transport(
        session_id: &str,
        me: &str,
        archetype: Archetype,
        config: SessionConfig,
        transport: T,
    ) -> Self {
        let sim = Simulation::for_session(config.sim.clone(), session_id);
        Self {
            session_id: session_id.to_string(),
            me: me.to_string(),
            archetype,
            config,
            transport,
            state: SessionState::Connecting,
            sim,
            roster: Vec::new(),
            remote_inputs: BTreeMap::new(),
            last_snapshot: None,
            events: Vec::new(),
            restart_timer: None,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Own participant id.
    pub fn participant_id(&self) -> &str {
        &self.me
    }

    /// Own archetype selection.
    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current role, once assigned.
    pub fn role(&self) -> Option<Role> {
        self.state.role()
    }

    /// Latest known membership.
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// Local simulation (authoritative on the host, a mirror elsewhere).
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Events from the last frame: simulated on the host, received elsewhere.
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    // =========================================================================
    // FRAME
    // =========================================================================

    /// Advance one display frame.
    ///
    /// Returns the state to render. `input` is ignored for spectators.
    pub fn frame(&mut self, dt: f32, input: InputVector) -> Result<&Simulation, SessionError> {
        if self.state == SessionState::Disconnected {
            return Err(SessionError::NotActive);
        }
        if !self.transport.is_open() {
            self.state = SessionState::Disconnected;
            return Err(SessionError::NotActive);
        }

        self.events.clear();
        self.pump();

        let role = match self.state {
            SessionState::Connecting | SessionState::Disconnected => return Ok(&self.sim),
            SessionState::RoleAssigned(role) => {
                self.state = SessionState::Active(role);
                info!(session_id = %self.session_id, %role, "Session active");
                role
            }
            SessionState::Active(role) => role,
        };

        match role {
            Role::Host { slot } => self.host_frame(slot, dt, input)?,
            Role::Client { slot } => {
                self.send(WireMessage::Input { slot, input })?;
                self.apply_snapshot();
            }
            Role::Spectator => self.apply_snapshot(),
        }

        Ok(&self.sim)
    }

    /// Start the next round now (host only).
    pub fn restart_round(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active(Role::Host { .. }) | SessionState::RoleAssigned(Role::Host { .. }) => {
                self.restart_timer = None;
                self.sim.start_round();
                Ok(())
            }
            SessionState::Disconnected => Err(SessionError::NotActive),
            _ => Err(SessionError::NotHost),
        }
    }

    /// Leave the session: stop simulating and release the subscription.
    pub fn leave(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.transport.close();
        self.state = SessionState::Disconnected;
        self.last_snapshot = None;
        self.remote_inputs.clear();
        info!(session_id = %self.session_id, participant = %self.me, "Left session");
    }

    fn host_frame(&mut self, slot: u8, dt: f32, input: InputVector) -> Result<(), SessionError> {
        if self.sim.phase == MatchPhase::Waiting {
            self.sim.start();
        }
        self.tick_restart(dt);

        let mut inputs = self.remote_inputs.clone();
        inputs.insert(slot, input);

        let result = tick(&mut self.sim, dt, &inputs);
        if result.round_over.is_some() {
            self.restart_timer = self.config.round_restart_delay;
        }
        self.events = result.events;

        let snapshot = Snapshot::capture(&self.sim, &self.events);
        self.send(WireMessage::Snapshot(Box::new(snapshot)))
    }

    fn tick_restart(&mut self, dt: f32) {
        let Some(remaining) = self.restart_timer.as_mut() else {
            return;
        };
        *remaining -= self.config.sim.clamp_dt(dt);
        if *remaining <= 0.0 {
            self.restart_timer = None;
            self.sim.start_round();
        }
    }

    /// Publish without retrying. A closed channel ends the session.
    fn send(&mut self, message: WireMessage) -> Result<(), SessionError> {
        match self.transport.publish(message) {
            Ok(()) => Ok(()),
            Err(TransportError::Closed) => {
                self.state = SessionState::Disconnected;
                Err(SessionError::NotActive)
            }
            Err(e) => {
                debug!(session_id = %self.session_id, error = %e, "Publish failed");
                Ok(())
            }
        }
    }

    fn apply_snapshot(&mut self) {
        let Some(snapshot) = self.last_snapshot.take() else {
            return;
        };
        snapshot.apply_to(&mut self.sim);
        if !snapshot.verify(&self.sim) {
            debug!(
                tick = snapshot.tick,
                expected = %short_hex(&snapshot.state_hash),
                actual = %short_hex(&self.sim.state_hash()),
                "Snapshot hash mismatch"
            );
        }
        self.events = snapshot.events;
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    fn pump(&mut self) {
        for envelope in self.transport.drain() {
            match envelope {
                Envelope::Roster(entries) => self.on_roster(entries),
                Envelope::Message { from, message } => self.on_message(&from, message),
            }
        }
    }

    fn on_roster(&mut self, entries: Vec<RosterEntry>) {
        let ids: Vec<&str> = entries.iter().map(|e| e.participant_id.as_str()).collect();
        let roles = resolve_roles(&ids);

        let selections: BTreeMap<u8, Archetype> = roles
            .iter()
            .filter_map(|(id, role)| {
                let slot = role.slot()?;
                let entry = entries.iter().find(|e| &e.participant_id == id)?;
                Some((slot, entry.archetype))
            })
            .collect();
        self.sim.apply_roster(&selections);
        self.remote_inputs.retain(|slot, _| selections.contains_key(slot));

        let mine = roles.iter().find(|(id, _)| id == &self.me).map(|(_, role)| *role);
        self.roster = entries;

        let Some(role) = mine else {
            warn!(session_id = %self.session_id, participant = %self.me, "Not present in roster");
            return;
        };
        if self.state.role() != Some(role) {
            info!(session_id = %self.session_id, participant = %self.me, %role, "Role assigned");
            self.state = SessionState::RoleAssigned(role);
        }
    }

    fn on_message(&mut self, from: &str, message: WireMessage) {
        match message {
            WireMessage::Input { slot, input } => {
                if !matches!(self.state.role(), Some(Role::Host { .. })) {
                    return;
                }
                if self.slot_of(from) != Some(slot) {
                    debug!(from, slot, "Input for a slot the sender does not hold");
                    return;
                }
                self.remote_inputs.insert(slot, input);
            }
            WireMessage::Snapshot(snapshot) => {
                if matches!(self.state.role(), Some(Role::Host { .. })) {
                    debug!(from, "Ignoring snapshot while hosting");
                    return;
                }
                self.last_snapshot = Some(snapshot);
            }
        }
    }

    fn slot_of(&self, participant: &str) -> Option<u8> {
        let ids: Vec<&str> = self.roster.iter().map(|e| e.participant_id.as_str()).collect();
        resolve_roles(&ids)
            .into_iter()
            .find(|(id, _)| id == participant)
            .and_then(|(_, role)| role.slot())
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::GameEventData;
    use crate::network::transport::{LocalHub, LocalTransport};

    const DT: f32 = 1.0 / 60.0;

    async fn pair(hub: &LocalHub) -> (Session<LocalTransport>, Session<LocalTransport>) {
        let host = Session::create(hub, "room", "a-device", Archetype::Austin, SessionConfig::default())
            .await
            .unwrap();
        let client = Session::join(hub, "room", "b-device", Archetype::Brady, SessionConfig::default())
            .await
            .unwrap();
        (host, client)
    }

    fn idle() -> InputVector {
        InputVector::idle()
    }

    #[tokio::test]
    async fn test_roles_follow_roster() {
        let hub = LocalHub::new();
        let (mut host, mut client) = pair(&hub).await;

        assert_eq!(client.state(), SessionState::RoleAssigned(Role::Client { slot: 2 }));

        host.frame(DT, idle()).unwrap();
        client.frame(DT, idle()).unwrap();
        assert_eq!(host.state(), SessionState::Active(Role::Host { slot: 1 }));
        assert_eq!(client.state(), SessionState::Active(Role::Client { slot: 2 }));
        assert_eq!(host.roster().len(), 2);
    }

    #[tokio::test]
    async fn test_join_missing_session() {
        let hub = LocalHub::new();
        let result = Session::join(&hub, "nope", "x", Archetype::Chef, SessionConfig::default()).await;
        assert!(matches!(result, Err(SessionError::Transport(TransportError::SessionNotFound(_)))));
    }

    #[tokio::test]
    async fn test_client_mirrors_host() {
        let hub = LocalHub::new();
        let (mut host, mut client) = pair(&hub).await;

        for _ in 0..5 {
            host.frame(DT, idle()).unwrap();
            client.frame(DT, idle()).unwrap();
        }
        host.frame(DT, idle()).unwrap();
        client.frame(DT, idle()).unwrap();

        let host_sim = host.simulation();
        let client_sim = client.simulation();
        assert_eq!(client_sim.tick, host_sim.tick);
        assert_eq!(client_sim.state_hash(), host_sim.state_hash());
        assert_eq!(client_sim.player(2).unwrap().archetype, Archetype::Brady);
    }

    #[tokio::test]
    async fn test_remote_input_persists() {
        let hub = LocalHub::new();
        let (mut host, mut client) = pair(&hub).await;
        host.frame(DT, idle()).unwrap();
        client.frame(DT, idle()).unwrap();

        host.sim.obstacles.clear();
        let x0 = host.simulation().player(2).unwrap().x;
        let left = InputVector { left: true, ..Default::default() };
        client.frame(DT, left).unwrap();

        // Client goes quiet; its last input keeps applying
        for _ in 0..10 {
            host.frame(DT, idle()).unwrap();
        }
        let x1 = host.simulation().player(2).unwrap().x;
        assert!(x1 < x0 - 50.0);
    }

    #[tokio::test]
    async fn test_client_events_come_from_snapshot() {
        let hub = LocalHub::new();
        let (mut host, mut client) = pair(&hub).await;
        host.frame(DT, idle()).unwrap();
        client.frame(DT, idle()).unwrap();

        host.sim.player_mut(2).unwrap().hp = 0.0;
        host.frame(DT, idle()).unwrap();
        assert!(host.events().iter().any(|e| matches!(e.data, GameEventData::RoundOver { loser: 2, .. })));

        client.frame(DT, idle()).unwrap();
        assert!(client.events().iter().any(|e| matches!(e.data, GameEventData::RoundOver { loser: 2, .. })));
        assert_eq!(client.simulation().phase, MatchPhase::RoundOver { loser: 2 });
    }

    #[tokio::test]
    async fn test_round_restarts_after_delay() {
        let hub = LocalHub::new();
        let config = SessionConfig { round_restart_delay: Some(0.5), ..Default::default() };
        let mut host = Session::create(&hub, "room", "a", Archetype::Austin, config).await.unwrap();
        let _client = Session::join(&hub, "room", "b", Archetype::Brady, SessionConfig::default())
            .await
            .unwrap();

        host.frame(DT, idle()).unwrap();
        host.sim.player_mut(2).unwrap().hp = 0.0;
        host.frame(DT, idle()).unwrap();
        assert!(matches!(host.simulation().phase, MatchPhase::RoundOver { .. }));

        for _ in 0..40 {
            host.frame(DT, idle()).unwrap();
        }
        assert_eq!(host.simulation().phase, MatchPhase::Playing);
        assert_eq!(host.simulation().round, 2);
    }

    #[tokio::test]
    async fn test_spectator_never_sends() {
        let hub = LocalHub::new();
        let mut sessions = Vec::new();
        for id in ["a", "b", "c", "d"] {
            let mode_create = id == "a";
            let s = if mode_create {
                Session::create(&hub, "room", id, Archetype::Austin, SessionConfig::default()).await
            } else {
                Session::join(&hub, "room", id, Archetype::Austin, SessionConfig::default()).await
            };
            sessions.push(s.unwrap());
        }
        let mut watcher = Session::join(&hub, "room", "e", Archetype::Austin, SessionConfig::default())
            .await
            .unwrap();
        assert_eq!(watcher.role(), Some(Role::Spectator));

        sessions[0].frame(DT, idle()).unwrap();
        watcher.frame(DT, InputVector { fire: true, ..Default::default() }).unwrap();
        sessions[0].frame(DT, idle()).unwrap();

        assert!(sessions[0].remote_inputs.is_empty());
        assert_eq!(watcher.simulation().tick, 1);
    }

    #[tokio::test]
    async fn test_roles_recomputed_after_host_leaves() {
        let hub = LocalHub::new();
        let (mut host, mut client) = pair(&hub).await;
        host.frame(DT, idle()).unwrap();
        client.frame(DT, idle()).unwrap();
        host.frame(DT, idle()).unwrap();
        client.frame(DT, idle()).unwrap();
        let mirrored = client.simulation().tick;

        host.leave();
        assert_eq!(host.state(), SessionState::Disconnected);
        assert!(matches!(host.frame(DT, idle()), Err(SessionError::NotActive)));

        // Slot 1 goes to the remaining participant, starting from its mirrored state
        client.frame(DT, idle()).unwrap();
        assert_eq!(client.state(), SessionState::Active(Role::Host { slot: 1 }));
        assert_eq!(client.simulation().tick, mirrored + 1);
        assert_eq!(client.simulation().player(1).unwrap().archetype, Archetype::Brady);
        assert!(!client.simulation().player(2).unwrap().active);
    }

    #[tokio::test]
    async fn test_stalled_client_catches_up_on_roster() {
        let hub = LocalHub::with_capacity(8);
        let mut host = Session::create(&hub, "room", "a", Archetype::Austin, SessionConfig::default())
            .await
            .unwrap();
        let mut client = Session::join(&hub, "room", "c", Archetype::Chef, SessionConfig::default())
            .await
            .unwrap();
        host.frame(DT, idle()).unwrap();
        client.frame(DT, idle()).unwrap();
        assert_eq!(client.role(), Some(Role::Client { slot: 2 }));

        // "b" sorts ahead of "c" and takes slot 2 while the client is not reading
        let _late = Session::join(&hub, "room", "b", Archetype::Brady, SessionConfig::default())
            .await
            .unwrap();
        for _ in 0..60 {
            host.frame(DT, idle()).unwrap();
        }

        client.frame(DT, idle()).unwrap();
        assert_eq!(client.role(), Some(Role::Client { slot: 3 }));
        assert_eq!(client.roster().len(), 3);

        host.sim.obstacles.clear();
        let x0 = host.simulation().player(3).unwrap().x;
        let right = InputVector { right: true, ..Default::default() };
        for _ in 0..30 {
            client.frame(DT, right).unwrap();
            host.frame(DT, idle()).unwrap();
        }
        assert!(host.simulation().player(3).unwrap().x > x0);
    }

    #[tokio::test]
    async fn test_restart_requires_host() {
        let hub = LocalHub::new();
        let (mut host, mut client) = pair(&hub).await;
        assert!(matches!(client.restart_round(), Err(SessionError::NotHost)));
        assert!(host.restart_round().is_ok());
    }
}
