//! Game Events
//!
//! Everything notable that happens during a tick. The host hands these to
//! the render collaborator and ships them inside each snapshot.

use serde::{Serialize, Deserialize};

use crate::game::archetype::Ultimate;
use crate::game::state::{EventKind, Owner, PowerupKind};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventData {
    /// A projectile dealt damage
    Hit {
        /// Who fired it
        attacker: Owner,
        /// Slot that took the damage
        target: u8,
        /// Damage dealt
        damage: f32,
        /// Target HP afterwards
        remaining_hp: f32,
    },

    /// A shield charge absorbed a projectile
    Blocked {
        /// Shielded slot
        target: u8,
        /// Charges left
        shield_left: u8,
    },

    /// A dashing player slipped through a projectile
    PerfectEvade {
        /// Evading slot
        target: u8,
    },

    /// Consecutive hits chained
    Combo {
        /// Attacking slot
        slot: u8,
        /// Current chain length
        count: u32,
    },

    /// Combo window lapsed
    ComboLost {
        /// Slot that lost its chain
        slot: u8,
    },

    /// Player reached a new level
    LevelUp {
        /// Slot
        slot: u8,
        /// New level
        level: u32,
    },

    /// Player unleashed an ultimate
    UltimateUsed {
        /// Slot
        slot: u8,
        /// Which ultimate
        ultimate: Ultimate,
    },

    /// Player dashed
    Dashed {
        /// Slot
        slot: u8,
    },

    /// Referee dropped a powerup
    PowerupDropped {
        /// Powerup type
        kind: PowerupKind,
        /// Drop x
        x: f32,
        /// Drop y
        y: f32,
    },

    /// Player picked up a powerup
    PowerupCollected {
        /// Slot
        slot: u8,
        /// Powerup type
        kind: PowerupKind,
    },

    /// Global event began
    EventStarted {
        /// Event type
        kind: EventKind,
        /// Seconds it will last
        duration: f32,
    },

    /// Global event expired
    EventEnded {
        /// Event type
        kind: EventKind,
    },

    /// Round finished
    RoundOver {
        /// Round number
        round: u32,
        /// Slot that dropped to zero HP
        loser: u8,
    },
}

/// A game event stamped with the tick it happened on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Slot the event is about, if any.
    pub fn slot(&self) -> Option<u8> {
        match &self.data {
            GameEventData::Hit { target, .. } => Some(*target),
            GameEventData::Blocked { target, .. } => Some(*target),
            GameEventData::PerfectEvade { target } => Some(*target),
            GameEventData::Combo { slot, .. } => Some(*slot),
            GameEventData::ComboLost { slot } => Some(*slot),
            GameEventData::LevelUp { slot, .. } => Some(*slot),
            GameEventData::UltimateUsed { slot, .. } => Some(*slot),
            GameEventData::Dashed { slot } => Some(*slot),
            GameEventData::PowerupCollected { slot, .. } => Some(*slot),
            GameEventData::RoundOver { loser, .. } => Some(*loser),
            _ => None,
        }
    }

    /// Create hit event.
    pub fn hit(tick: u64, attacker: Owner, target: u8, damage: f32, remaining_hp: f32) -> Self {
        Self::new(tick, GameEventData::Hit { attacker, target, damage, remaining_hp })
    }

    /// Create blocked event.
    pub fn blocked(tick: u64, target: u8, shield_left: u8) -> Self {
        Self::new(tick, GameEventData::Blocked { target, shield_left })
    }

    /// Create perfect evasion event.
    pub fn perfect_evade(tick: u64, target: u8) -> Self {
        Self::new(tick, GameEventData::PerfectEvade { target })
    }

    /// Create level-up event.
    pub fn level_up(tick: u64, slot: u8, level: u32) -> Self {
        Self::new(tick, GameEventData::LevelUp { slot, level })
    }

    /// Create ultimate event.
    pub fn ultimate_used(tick: u64, slot: u8, ultimate: Ultimate) -> Self {
        Self::new(tick, GameEventData::UltimateUsed { slot, ultimate })
    }

    /// Create round-over event.
    pub fn round_over(tick: u64, round: u32, loser: u8) -> Self {
        Self::new(tick, GameEventData::RoundOver { round, loser })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_slot() {
        let event = GameEvent::hit(5, Owner::Player(1), 2, 20.0, 80.0);
        assert_eq!(event.slot(), Some(2));
        assert_eq!(event.tick, 5);

        let event = GameEvent::new(6, GameEventData::EventEnded { kind: EventKind::Rain });
        assert_eq!(event.slot(), None);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = GameEvent::round_over(10, 1, 2);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"round_over\""));
        let back: GameEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
