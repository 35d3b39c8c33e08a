//! Network Module
//!
//! Session plumbing around the simulation: role-driven session state
//! machine, pub/sub transports and the wire format.
//!
//! Nothing here affects simulation results; the host's tick is the only
//! authority.

pub mod protocol;
pub mod transport;
pub mod session;
pub mod relay;
pub mod ws;

pub use protocol::{ClientFrame, JoinMode, RelayFrame, RosterEntry, Snapshot, WireMessage};
pub use transport::{Envelope, Hub, LocalHub, LocalTransport, Transport, TransportError};
pub use session::{Session, SessionConfig, SessionError, SessionState};
pub use relay::{RelayConfig, RelayError, RelayServer};
pub use ws::{WsHub, WsTransport};
