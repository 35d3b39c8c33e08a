//! Role Election
//!
//! Every participant sorts the same roster and reaches the same answer with
//! no coordination: the lowest identifier hosts, the next ones play as
//! clients, anyone beyond the slot count watches.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::MAX_PLAYERS;

/// Role held by a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    /// Runs the authoritative simulation (always slot 1)
    Host {
        /// Slot
        slot: u8,
    },
    /// Sends input, renders snapshots
    Client {
        /// Slot
        slot: u8,
    },
    /// Receive-only observer
    Spectator,
}

impl Role {
    /// Player slot, if the role plays.
    #[inline]
    pub fn slot(&self) -> Option<u8> {
        match self {
            Role::Host { slot } | Role::Client { slot } => Some(*slot),
            Role::Spectator => None,
        }
    }

    /// Check if this is the host role.
    #[inline]
    pub fn is_host(&self) -> bool {
        matches!(self, Role::Host { .. })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host { slot } => write!(f, "host (P{})", slot),
            Role::Client { slot } => write!(f, "client (P{})", slot),
            Role::Spectator => f.write_str("spectator"),
        }
    }
}

/// Assign roles to a roster of participant identifiers.
///
/// The input order does not matter; identifiers are sorted ascending and
/// duplicates collapse. An empty roster yields no assignments.
pub fn resolve_roles<S: AsRef<str>>(participants: &[S]) -> Vec<(String, Role)> {
    let mut ids: Vec<&str> = participants.iter().map(|p| p.as_ref()).collect();
    ids.sort_unstable();
    ids.dedup();

    ids.into_iter()
        .enumerate()
        .map(|(index, id)| {
            let role = match index {
                0 => Role::Host { slot: 1 },
                i if i < MAX_PLAYERS as usize => Role::Client { slot: i as u8 + 1 },
                _ => Role::Spectator,
            };
            (id.to_string(), role)
        })
        .collect()
}

/// Role of one participant within a roster.
pub fn role_of<S: AsRef<str>>(participants: &[S], me: &str) -> Option<Role> {
    resolve_roles(participants)
        .into_iter()
        .find(|(id, _)| id == me)
        .map(|(_, role)| role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_devices() {
        let roles = resolve_roles(&["b-device", "a-device"]);
        assert_eq!(roles[0], ("a-device".to_string(), Role::Host { slot: 1 }));
        assert_eq!(roles[1], ("b-device".to_string(), Role::Client { slot: 2 }));
    }

    #[test]
    fn test_spectators_past_four() {
        let roster = ["e", "d", "c", "b", "a"];
        assert_eq!(role_of(&roster, "d"), Some(Role::Client { slot: 4 }));
        assert_eq!(role_of(&roster, "e"), Some(Role::Spectator));
        assert_eq!(role_of(&roster, "zzz"), None);
    }

    #[test]
    fn test_empty_roster() {
        let empty: [&str; 0] = [];
        assert!(resolve_roles(&empty).is_empty());
    }

    #[test]
    fn test_role_helpers() {
        assert!(Role::Host { slot: 1 }.is_host());
        assert_eq!(Role::Client { slot: 3 }.slot(), Some(3));
        assert_eq!(Role::Spectator.slot(), None);
        assert_eq!(Role::Client { slot: 2 }.to_string(), "client (P2)");
    }

    proptest! {
        #[test]
        fn prop_every_participant_agrees(ids in proptest::collection::vec("[a-z0-9]{1,8}", 1..8), seed in any::<u64>()) {
            let expected = resolve_roles(&ids);

            // Any other participant sees the roster in a different order
            let mut shuffled = ids.clone();
            let mut rng = crate::core::rng::SimRng::new(seed);
            for i in (1..shuffled.len()).rev() {
                let j = rng.next_int(i as u32 + 1) as usize;
                shuffled.swap(i, j);
            }
            prop_assert_eq!(resolve_roles(&shuffled), expected.clone());

            let hosts = expected.iter().filter(|(_, r)| r.is_host()).count();
            prop_assert_eq!(hosts, 1);
        }
    }
}
