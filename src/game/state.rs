//! Game State Definitions
//!
//! Entities of the arena and the `Simulation` context that owns them. Only
//! the process holding the host role mutates a `Simulation` through `tick`;
//! everyone else overwrites theirs from snapshots.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::core::rect::{Bounded, Rect};
use crate::core::rng::SimRng;
use crate::game::archetype::{Archetype, ProjectileKind};
use crate::game::config::SimConfig;
use crate::game::events::GameEvent;
use crate::game::schedule::Schedule;
use crate::MAX_PLAYERS;

/// Player hitbox width
pub const PLAYER_WIDTH: f32 = 50.0;
/// Player hitbox height
pub const PLAYER_HEIGHT: f32 = 70.0;
/// Maximum stamina
pub const MAX_STAMINA: f32 = 100.0;
/// Maximum ultimate charge
pub const MAX_ULT: f32 = 100.0;
/// XP needed for level 2
pub const BASE_MAX_XP: f32 = 100.0;
/// Seconds a combo stays alive after the last hit
pub const COMBO_WINDOW: f32 = 2.0;
/// Maximum shield charges
pub const MAX_SHIELD: u8 = 3;
/// Floating texts kept alive at once
pub const MAX_TEXTS: usize = 20;
/// Particles kept alive at once
pub const MAX_PARTICLES: usize = 200;
/// Screen shake ceiling
pub const MAX_SHAKE: f32 = 50.0;

// =============================================================================
// PLAYER
// =============================================================================

/// Horizontal facing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Toward negative x
    Left,
    /// Toward positive x
    #[default]
    Right,
}

impl Facing {
    /// +1 for right, -1 for left.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// A fighter occupying one role slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Role slot (1-based)
    pub slot: u8,
    /// Chosen character
    pub archetype: Archetype,
    /// Whether the slot is occupied
    pub active: bool,

    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Height above ground
    pub z: f32,
    /// Knockback velocity x
    pub vx: f32,
    /// Knockback velocity y
    pub vy: f32,
    /// Vertical velocity
    pub vz: f32,
    /// Hitbox width
    pub width: f32,
    /// Hitbox height
    pub height: f32,
    /// Direction shots travel
    pub facing: Facing,

    /// Current HP (not clamped, can go negative)
    pub hp: f32,
    /// Max HP
    pub max_hp: f32,
    /// Damage per regular shot
    pub damage: f32,
    /// Archetype speed multiplier
    pub speed_mult: f32,
    /// Stamina, spent on dash and jump
    pub stamina: f32,
    /// Max stamina
    pub max_stamina: f32,
    /// Shield charges
    pub shield: u8,
    /// Speed buff seconds left
    pub speed_buff: f32,
    /// Rapid-fire buff seconds left
    pub rapid_fire: f32,

    /// Consecutive hits
    pub combo: u32,
    /// Seconds before the combo lapses
    pub combo_timer: f32,
    /// Ultimate charge
    pub ult_charge: f32,
    /// Charge needed for the ultimate
    pub max_ult: f32,
    /// Level
    pub level: u32,
    /// XP toward next level
    pub xp: f32,
    /// XP needed for next level
    pub max_xp: f32,

    /// Shot cooldown seconds left
    pub cooldown: f32,
    /// Dash cooldown seconds left
    pub dash_cooldown: f32,
    /// Dashing (invulnerable)
    pub is_dashing: bool,
    /// Dash seconds left
    pub dash_time: f32,

    /// Stamina was spent this tick, skip regen
    #[serde(skip)]
    pub stamina_spent: bool,
}

impl Player {
    /// Create an inactive player in its slot's spawn position.
    pub fn new(slot: u8, archetype: Archetype, config: &SimConfig) -> Self {
        let (x, y) = spawn_point(slot, config);
        let stats = archetype.stats();
        Self {
            slot,
            archetype,
            active: false,
            x,
            y,
            z: 0.0,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            facing: default_facing(slot),
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            damage: stats.damage,
            speed_mult: stats.speed_mult,
            stamina: MAX_STAMINA,
            max_stamina: MAX_STAMINA,
            shield: 0,
            speed_buff: 0.0,
            rapid_fire: 0.0,
            combo: 0,
            combo_timer: 0.0,
            ult_charge: 0.0,
            max_ult: MAX_ULT,
            level: 1,
            xp: 0.0,
            max_xp: BASE_MAX_XP,
            cooldown: 0.0,
            dash_cooldown: 0.0,
            is_dashing: false,
            dash_time: 0.0,
            stamina_spent: false,
        }
    }

    /// Switch archetype and take its base stats (full HP).
    pub fn apply_archetype(&mut self, archetype: Archetype) {
        let stats = archetype.stats();
        self.archetype = archetype;
        self.max_hp = stats.max_hp;
        self.hp = stats.max_hp;
        self.damage = stats.damage;
        self.speed_mult = stats.speed_mult;
    }

    /// Reset for a new round. Level, XP and ultimate charge carry over.
    pub fn reset_round(&mut self, config: &SimConfig) {
        let (x, y) = spawn_point(self.slot, config);
        self.hp = self.max_hp;
        self.x = x;
        self.y = y;
        self.z = 0.0;
        self.vz = 0.0;
        self.vx = 0.0;
        self.vy = 0.0;
        self.facing = default_facing(self.slot);
        self.cooldown = 0.0;
        self.dash_cooldown = 0.0;
        self.is_dashing = false;
        self.dash_time = 0.0;
        self.combo = 0;
        self.combo_timer = 0.0;
        self.shield = 0;
        self.speed_buff = 0.0;
        self.rapid_fire = 0.0;
        self.stamina = self.max_stamina;
        self.stamina_spent = false;
    }

    /// Back to level 1 with the archetype's base stats.
    pub fn full_reset(&mut self, config: &SimConfig) {
        self.level = 1;
        self.xp = 0.0;
        self.max_xp = BASE_MAX_XP;
        self.ult_charge = 0.0;
        self.apply_archetype(self.archetype);
        self.reset_round(config);
    }

    /// Standing on the ground.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.z <= 0.0 && self.vz == 0.0
    }

    /// Deduct stamina and skip this tick's regen.
    pub fn spend_stamina(&mut self, amount: f32) {
        self.stamina = (self.stamina - amount).max(0.0);
        self.stamina_spent = true;
    }

    /// Add XP and the ultimate charge it feeds.
    ///
    /// Returns true if the player leveled up.
    pub fn gain_xp(&mut self, amount: f32) -> bool {
        self.xp += amount;
        let bonus = if self.combo > 1 {
            1.0 + self.combo as f32 * 0.1
        } else {
            1.0
        };
        self.ult_charge = (self.ult_charge + amount * 3.0 * bonus).min(self.max_ult);

        if self.xp >= self.max_xp {
            self.level_up();
            true
        } else {
            false
        }
    }

    /// Extend the combo chain. Returns the new count.
    pub fn add_combo(&mut self) -> u32 {
        self.combo += 1;
        self.combo_timer = COMBO_WINDOW;
        self.combo
    }

    fn level_up(&mut self) {
        self.level += 1;
        self.xp -= self.max_xp;
        self.max_xp = (self.max_xp * 1.3).floor();
        self.max_hp += 20.0;
        self.hp = self.max_hp;
        self.damage += 5.0;
    }

    /// Ultimate ready to fire.
    #[inline]
    pub fn ult_ready(&self) -> bool {
        self.ult_charge >= self.max_ult
    }

    /// Hitbox center.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Hash snapshot-visible fields.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.slot);
        hasher.update_str(self.archetype.id());
        hasher.update_bool(self.active);
        for v in [self.x, self.y, self.z, self.vx, self.vy, self.vz, self.width, self.height] {
            hasher.update_f32(v);
        }
        hasher.update_bool(self.facing == Facing::Right);
        for v in [
            self.hp, self.max_hp, self.damage, self.speed_mult, self.stamina,
            self.max_stamina, self.speed_buff, self.rapid_fire,
        ] {
            hasher.update_f32(v);
        }
        hasher.update_u8(self.shield);
        hasher.update_u32(self.combo);
        hasher.update_f32(self.combo_timer);
        hasher.update_f32(self.ult_charge);
        hasher.update_f32(self.max_ult);
        hasher.update_u32(self.level);
        hasher.update_f32(self.xp);
        hasher.update_f32(self.max_xp);
        hasher.update_f32(self.cooldown);
        hasher.update_f32(self.dash_cooldown);
        hasher.update_bool(self.is_dashing);
        hasher.update_f32(self.dash_time);
    }
}

impl Bounded for Player {
    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Spawn corner for a slot.
pub fn spawn_point(slot: u8, config: &SimConfig) -> (f32, f32) {
    let left = 100.0;
    let right = config.arena_width - 150.0;
    let mid = config.arena_height / 2.0 - PLAYER_HEIGHT / 2.0;
    match slot {
        1 => (left, mid),
        2 => (right, mid),
        3 => (left, config.arena_height * 0.25),
        _ => (right, config.arena_height * 0.75),
    }
}

/// Odd slots start facing right, even slots left.
pub fn default_facing(slot: u8) -> Facing {
    if slot % 2 == 1 {
        Facing::Right
    } else {
        Facing::Left
    }
}

// =============================================================================
// PROJECTILES
// =============================================================================

/// Who a projectile belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    /// Fired by the player in this slot
    Player(u8),
    /// Spawned by the arena (food rain)
    Environment,
}

impl Owner {
    /// Slot of the firing player.
    #[inline]
    pub fn slot(self) -> Option<u8> {
        match self {
            Owner::Player(slot) => Some(slot),
            Owner::Environment => None,
        }
    }
}

/// A live projectile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Height above ground
    pub z: f32,
    /// Velocity x
    pub vx: f32,
    /// Velocity y
    pub vy: f32,
    /// Hitbox width
    pub width: f32,
    /// Hitbox height
    pub height: f32,
    /// Damage on hit
    pub damage: f32,
    /// Firer
    pub owner: Owner,
    /// Visual class
    pub kind: ProjectileKind,
    /// Survives hits
    pub penetrates: bool,
    /// Seconds left
    pub life: f32,
    /// Slots a penetrating projectile already struck
    #[serde(skip)]
    pub struck: Vec<u8>,
}

impl Projectile {
    /// Hash snapshot-visible fields.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        for v in [self.x, self.y, self.z, self.vx, self.vy, self.width, self.height, self.damage] {
            hasher.update_f32(v);
        }
        hasher.update_u8(self.owner.slot().unwrap_or(0));
        hasher.update_u8(self.kind as u8);
        hasher.update_bool(self.penetrates);
        hasher.update_f32(self.life);
    }
}

impl Bounded for Projectile {
    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

// =============================================================================
// ARENA FIXTURES
// =============================================================================

/// Obstacle type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// Central fountain
    Fountain,
    /// Cafeteria table
    Table,
    /// Metal clutter
    Metal,
    /// Crust ultimate wall
    CrustWall,
}

/// A solid rectangle grounded players cannot walk through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
    /// Type tag
    pub kind: ObstacleKind,
    /// Seconds left for temporary obstacles
    pub ttl: Option<f32>,
}

impl Obstacle {
    /// Permanent obstacle.
    pub fn new(x: f32, y: f32, width: f32, height: f32, kind: ObstacleKind) -> Self {
        Self { x, y, width, height, kind, ttl: None }
    }
}

impl Bounded for Obstacle {
    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Powerup type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    /// Timed movement boost
    Speed,
    /// One shield charge
    Shield,
    /// Timed short shot cooldown
    RapidFire,
}

impl PowerupKind {
    /// All powerup types.
    pub const ALL: [PowerupKind; 3] = [PowerupKind::Speed, PowerupKind::Shield, PowerupKind::RapidFire];
}

/// Pickup lying in the arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Powerup {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
    /// Type
    pub kind: PowerupKind,
}

impl Powerup {
    /// Standard 35×35 pickup.
    pub fn new(x: f32, y: f32, kind: PowerupKind) -> Self {
        Self { x, y, width: 35.0, height: 35.0, kind }
    }
}

impl Bounded for Powerup {
    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

// =============================================================================
// EPHEMERALS
// =============================================================================

/// Shape of a short-lived visual.
#[derive(Clone, Debug, PartialEq)]
pub enum EphemeralKind {
    /// Explosion spark
    Spark,
    /// Dash afterimage
    Trail {
        /// Width
        width: f32,
        /// Height
        height: f32,
    },
    /// Floating text
    Text {
        /// Message
        text: String,
        /// Font size
        size: f32,
    },
}

/// Particle or floating text.
#[derive(Clone, Debug, PartialEq)]
pub struct Ephemeral {
    /// Position x
    pub x: f32,
    /// Position y
    pub y: f32,
    /// Velocity x
    pub vx: f32,
    /// Velocity y
    pub vy: f32,
    /// CSS color
    pub color: &'static str,
    /// Seconds left
    pub life: f32,
    /// Shape
    pub kind: EphemeralKind,
}

// =============================================================================
// REFEREE, EVENTS, CAMERA
// =============================================================================

/// The wandering referee who drops powerups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Referee {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
    /// Wander target x
    pub target_x: f32,
    /// Wander target y
    pub target_y: f32,
    /// Current speed
    pub speed: f32,
    /// Seconds until the next action roll
    pub action_timer: f32,
    /// Speech bubble
    pub message: String,
    /// Seconds the bubble stays up
    pub message_timer: f32,
}

/// Seconds before the referee's first action.
pub const REFEREE_FIRST_ACTION: f32 = 8.0;

impl Referee {
    /// Referee standing at the arena center.
    pub fn new(config: &SimConfig) -> Self {
        let cx = config.arena_width / 2.0;
        let cy = config.arena_height / 2.0;
        Self {
            x: cx,
            y: cy,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            target_x: cx,
            target_y: cy,
            speed: 400.0,
            action_timer: REFEREE_FIRST_ACTION,
            message: String::new(),
            message_timer: 0.0,
        }
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        for v in [self.x, self.y, self.target_x, self.target_y, self.speed, self.action_timer] {
            hasher.update_f32(v);
        }
        hasher.update_str(&self.message);
        hasher.update_f32(self.message_timer);
    }
}

/// Global modifier type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Everyone moves at half speed
    Slow,
    /// Neutral projectiles fall from the top of the view
    Rain,
}

/// The single global event currently running.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveEvent {
    /// Type
    pub kind: EventKind,
    /// Seconds left
    pub remaining: f32,
    /// Seconds until the next rain drop
    pub spawn_timer: f32,
}

/// Logical viewport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Center x
    pub x: f32,
    /// Center y
    pub y: f32,
    /// Zoom factor
    pub zoom: f32,
    /// Screen shake intensity
    pub shake: f32,
}

impl Camera {
    /// Camera centered on the arena at zoom 1.
    pub fn new(config: &SimConfig) -> Self {
        Self {
            x: config.arena_width / 2.0,
            y: config.arena_height / 2.0,
            zoom: 1.0,
            shake: 0.0,
        }
    }
}

// =============================================================================
// MATCH PHASE
// =============================================================================

/// Current phase of the match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum MatchPhase {
    /// Created, not started
    #[default]
    Waiting,
    /// Active gameplay
    Playing,
    /// A player dropped to zero HP
    RoundOver {
        /// Slot that lost
        loser: u8,
    },
}

// =============================================================================
// SIMULATION
// =============================================================================

/// The authoritative simulation context.
///
/// Owns every entity in the arena. Four player slots always exist; roster
/// changes only toggle `active`.
#[derive(Clone, Debug)]
pub struct Simulation {
    /// Tuning
    pub config: SimConfig,
    /// Seed the arena and all randomness derive from
    pub seed: u64,
    /// Seeded RNG
    pub rng: SimRng,
    /// Ticks simulated
    pub tick: u64,
    /// Virtual clock in seconds, advanced by each tick's dt
    pub clock: f64,
    /// Round number
    pub round: u32,
    /// Match phase
    pub phase: MatchPhase,
    /// Player slots 1..=4 at indices 0..4
    pub players: Vec<Player>,
    /// Live projectiles
    pub projectiles: Vec<Projectile>,
    /// Solid obstacles
    pub obstacles: Vec<Obstacle>,
    /// Pickups
    pub powerups: Vec<Powerup>,
    /// Sparks and trails
    pub particles: Vec<Ephemeral>,
    /// Floating texts
    pub texts: Vec<Ephemeral>,
    /// Referee actor
    pub referee: Referee,
    /// Global event
    pub event: Option<ActiveEvent>,
    /// Viewport
    pub camera: Camera,
    /// Deferred ultimate actions
    pub schedule: Schedule,
    /// Events produced by the tick in progress
    pub(crate) pending_events: Vec<GameEvent>,
}

impl Simulation {
    /// Create a simulation with all four slots inactive.
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let players = (1..=MAX_PLAYERS)
            .map(|slot| Player::new(slot, Archetype::default(), &config))
            .collect();
        let referee = Referee::new(&config);
        let camera = Camera::new(&config);

        let mut sim = Self {
            config,
            seed,
            rng: SimRng::new(seed),
            tick: 0,
            clock: 0.0,
            round: 1,
            phase: MatchPhase::Waiting,
            players,
            projectiles: Vec::new(),
            obstacles: Vec::new(),
            powerups: Vec::new(),
            particles: Vec::new(),
            texts: Vec::new(),
            referee,
            event: None,
            camera,
            schedule: Schedule::new(),
            pending_events: Vec::new(),
        };
        sim.build_arena();
        sim
    }

    /// Create a simulation seeded from a session identifier.
    pub fn for_session(config: SimConfig, session_id: &str) -> Self {
        Self::new(config, crate::core::rng::derive_session_seed(session_id))
    }

    /// Lay out the fountain, the four tables and five pieces of clutter.
    fn build_arena(&mut self) {
        let w = self.config.arena_width;
        let h = self.config.arena_height;

        self.obstacles.clear();
        self.obstacles.push(Obstacle::new(w / 2.0 - 35.0, h / 2.0 - 50.0, 70.0, 100.0, ObstacleKind::Fountain));
        for (fx, fy) in [(0.2, 0.3), (0.2, 0.7), (0.8, 0.3), (0.8, 0.7)] {
            self.obstacles.push(Obstacle::new(w * fx, h * fy, 100.0, 120.0, ObstacleKind::Table));
        }
        for _ in 0..5 {
            let x = self.rng.range_f32(300.0, w - 300.0);
            let y = self.rng.range_f32(200.0, h - 200.0);
            let width = self.rng.range_f32(60.0, 110.0);
            let height = self.rng.range_f32(80.0, 120.0);
            self.obstacles.push(Obstacle::new(x, y, width, height, ObstacleKind::Metal));
        }
    }

    /// Player in a slot.
    pub fn player(&self, slot: u8) -> Option<&Player> {
        let idx = slot.checked_sub(1)? as usize;
        self.players.get(idx)
    }

    /// Player in a slot, mutably.
    pub fn player_mut(&mut self, slot: u8) -> Option<&mut Player> {
        let idx = slot.checked_sub(1)? as usize;
        self.players.get_mut(idx)
    }

    /// Occupied slots.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.active)
    }

    /// Push the roster's archetype selections into the player slots.
    ///
    /// Listed slots become active; a newly activated player, or one whose
    /// archetype changed, takes fresh stats and its spawn position. Every
    /// other slot is deactivated.
    pub fn apply_roster(&mut self, selections: &BTreeMap<u8, Archetype>) {
        let config = self.config.clone();
        for player in self.players.iter_mut() {
            match selections.get(&player.slot) {
                Some(&archetype) => {
                    if !player.active || player.archetype != archetype {
                        player.archetype = archetype;
                        player.full_reset(&config);
                        info!(slot = player.slot, archetype = %archetype, "Player slot activated");
                    }
                    player.active = true;
                }
                None => {
                    if player.active {
                        info!(slot = player.slot, "Player slot released");
                    }
                    player.active = false;
                }
            }
        }
    }

    /// Move from `Waiting` into play.
    pub fn start(&mut self) {
        if self.phase == MatchPhase::Waiting {
            self.phase = MatchPhase::Playing;
            info!(round = self.round, "Match started");
        }
    }

    /// Begin the next round. Levels and ultimate charge carry over.
    pub fn start_round(&mut self) {
        if matches!(self.phase, MatchPhase::RoundOver { .. }) {
            self.round += 1;
        }
        let config = self.config.clone();
        for player in self.players.iter_mut() {
            player.reset_round(&config);
        }
        self.clear_field();
        self.phase = MatchPhase::Playing;
        info!(round = self.round, "Round started");
    }

    /// Restart from round 1 with every player back at level 1.
    pub fn reset_match(&mut self) {
        let config = self.config.clone();
        for player in self.players.iter_mut() {
            player.full_reset(&config);
        }
        self.clear_field();
        self.round = 1;
        self.phase = MatchPhase::Playing;
        info!("Match reset");
    }

    fn clear_field(&mut self) {
        self.projectiles.clear();
        self.powerups.clear();
        self.particles.clear();
        self.texts.clear();
        self.obstacles.retain(|o| o.ttl.is_none());
        self.schedule.clear();
        self.event = None;
        self.referee = Referee::new(&self.config);
        self.camera.shake = 0.0;
    }

    /// Queue an event for the tick in progress.
    #[inline]
    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// Add screen shake.
    pub fn shake(&mut self, amount: f32) {
        self.camera.shake = (self.camera.shake + amount).min(MAX_SHAKE);
    }

    /// Spawn a floating text, dropping the oldest past the cap.
    pub fn spawn_text(&mut self, x: f32, y: f32, text: impl Into<String>, color: &'static str, size: f32) {
        if self.texts.len() >= MAX_TEXTS {
            self.texts.remove(0);
        }
        self.texts.push(Ephemeral {
            x,
            y,
            vx: 0.0,
            vy: -60.0,
            color,
            life: 1.0,
            kind: EphemeralKind::Text { text: text.into(), size },
        });
    }

    /// Burst of six sparks.
    pub fn spawn_explosion(&mut self, x: f32, y: f32, color: &'static str) {
        for _ in 0..6 {
            let vx = self.rng.centered() * 500.0;
            let vy = self.rng.centered() * 500.0;
            self.push_particle(Ephemeral {
                x,
                y,
                vx,
                vy,
                color,
                life: 0.3,
                kind: EphemeralKind::Spark,
            });
        }
    }

    /// Add a particle, dropping the oldest past the cap.
    pub fn push_particle(&mut self, particle: Ephemeral) {
        if self.particles.len() >= MAX_PARTICLES {
            self.particles.remove(0);
        }
        self.particles.push(particle);
    }

    /// Hash of everything a snapshot carries.
    pub fn state_hash(&self) -> StateHash {
        compute_state_hash(self.tick, |hasher| {
            hasher.update_u32(self.round);
            match self.phase {
                MatchPhase::Waiting => hasher.update_u8(0),
                MatchPhase::Playing => hasher.update_u8(1),
                MatchPhase::RoundOver { loser } => {
                    hasher.update_u8(2);
                    hasher.update_u8(loser);
                }
            }

            for player in &self.players {
                player.hash_into(hasher);
            }

            hasher.update_u32(self.projectiles.len() as u32);
            for projectile in &self.projectiles {
                projectile.hash_into(hasher);
            }

            hasher.update_u32(self.powerups.len() as u32);
            for powerup in &self.powerups {
                hasher.update_f32(powerup.x);
                hasher.update_f32(powerup.y);
                hasher.update_u8(powerup.kind as u8);
            }

            hasher.update_u32(self.obstacles.len() as u32);
            for obstacle in &self.obstacles {
                hasher.update_f32(obstacle.x);
                hasher.update_f32(obstacle.y);
                hasher.update_f32(obstacle.width);
                hasher.update_f32(obstacle.height);
                hasher.update_u8(obstacle.kind as u8);
                hasher.update_f32(obstacle.ttl.unwrap_or(-1.0));
            }

            self.referee.hash_into(hasher);

            match &self.event {
                Some(event) => {
                    hasher.update_u8(event.kind as u8 + 1);
                    hasher.update_f32(event.remaining);
                    hasher.update_f32(event.spawn_timer);
                }
                None => hasher.update_u8(0),
            }

            hasher.update_f32(self.camera.x);
            hasher.update_f32(self.camera.y);
            hasher.update_f32(self.camera.zoom);
            hasher.update_f32(self.camera.shake);
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
