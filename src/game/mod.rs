//! Game Logic Module
//!
//! Everything the host simulates. Given the same seed and the same per-tick
//! inputs and deltas, the simulation produces the same state.
//!
//! ## Module Structure
//!
//! - `config`: Arena, physics and camera tuning
//! - `archetype`: Character roster, shot profiles, ultimates
//! - `input`: Per-tick input vector
//! - `state`: Simulation context and entities
//! - `movement`: Integration, jumping, obstacle collision
//! - `combat`: Firing, hit resolution, progression, pickups
//! - `ability`: Dash and ultimates
//! - `schedule`: Virtual-clock queue for delayed ultimate stages
//! - `director`: Referee actor and global events
//! - `camera`: Framing, zoom, shake
//! - `events`: Game events for rendering and logging
//! - `tick`: Authoritative simulation loop
//! - `role`: Host/client/spectator election

pub mod config;
pub mod archetype;
pub mod input;
pub mod state;
pub mod movement;
pub mod combat;
pub mod ability;
pub mod schedule;
pub mod director;
pub mod camera;
pub mod events;
pub mod tick;
pub mod role;

// Re-export key types
pub use archetype::Archetype;
pub use config::{SimConfig, WinCondition};
pub use events::{GameEvent, GameEventData};
pub use input::InputVector;
pub use role::{resolve_roles, role_of, Role};
pub use state::{MatchPhase, Owner, Player, Projectile, Simulation};
pub use tick::{tick, TickResult};
