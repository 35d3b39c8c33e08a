//! # Arena Brawl
//!
//! Host-authoritative 2.5D arena brawler: up to four fighters, one referee,
//! projectiles, ultimates and pickups, synchronized by full snapshots over a
//! pub/sub channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ARENA BRAWL                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  ├── rect.rs     - Axis-aligned overlap                      │
//! │  └── hash.rs     - State hashing for snapshot checks         │
//! │                                                              │
//! │  game/           - Simulation (runs on the host only)        │
//! │  ├── state.rs    - Simulation context and entities           │
//! │  ├── tick.rs     - Per-frame orchestration                   │
//! │  ├── movement.rs - Integration and obstacle collision        │
//! │  ├── combat.rs   - Shots, hits, progression, pickups         │
//! │  ├── ability.rs  - Dash and ultimates                        │
//! │  ├── director.rs - Referee and global events                 │
//! │  ├── camera.rs   - Framing and zoom                          │
//! │  └── role.rs     - Host/client/spectator election            │
//! │                                                              │
//! │  network/        - Sessions and transports                   │
//! │  ├── session.rs  - Per-participant state machine             │
//! │  ├── transport.rs- Pub/sub trait, in-process hub             │
//! │  ├── relay.rs    - WebSocket relay server                    │
//! │  ├── ws.rs       - WebSocket client transport                │
//! │  └── protocol.rs - Wire messages and snapshots               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority
//!
//! Exactly one participant, the one with the lowest identifier, runs
//! [`game::tick::tick`]. Everyone else sends input and snaps to the
//! host's latest snapshot. Randomness comes from a seeded PRNG and entity
//! iteration is in slot order, so a host replays identically given the
//! same seed, inputs and frame deltas.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::rng::SimRng;
pub use game::archetype::Archetype;
pub use game::config::SimConfig;
pub use game::input::InputVector;
pub use game::role::Role;
pub use game::state::Simulation;
pub use network::session::{Session, SessionConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal frame rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Player slots per session
pub const MAX_PLAYERS: u8 = 4;
