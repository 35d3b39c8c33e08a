//! Player Input
//!
//! The simulation consumes one flat boolean vector per slot per tick. Device
//! handling (keyboard, touch, gamepad) happens upstream.

use serde::{Serialize, Deserialize};

/// Normalized per-tick input for one player slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputVector {
    /// Move toward negative y
    pub up: bool,
    /// Move toward positive y
    pub down: bool,
    /// Move toward negative x
    pub left: bool,
    /// Move toward positive x
    pub right: bool,
    /// Fire the regular shot
    pub fire: bool,
    /// Dash
    pub dash: bool,
    /// Unleash the ultimate
    pub ult: bool,
    /// Jump
    pub jump: bool,
}

impl InputVector {
    /// Up flag bit
    pub const FLAG_UP: u8 = 0x01;
    /// Down flag bit
    pub const FLAG_DOWN: u8 = 0x02;
    /// Left flag bit
    pub const FLAG_LEFT: u8 = 0x04;
    /// Right flag bit
    pub const FLAG_RIGHT: u8 = 0x08;
    /// Fire flag bit
    pub const FLAG_FIRE: u8 = 0x10;
    /// Dash flag bit
    pub const FLAG_DASH: u8 = 0x20;
    /// Ultimate flag bit
    pub const FLAG_ULT: u8 = 0x40;
    /// Jump flag bit
    pub const FLAG_JUMP: u8 = 0x80;

    /// No buttons held.
    pub const fn idle() -> Self {
        Self {
            up: false,
            down: false,
            left: false,
            right: false,
            fire: false,
            dash: false,
            ult: false,
            jump: false,
        }
    }

    /// Movement direction as (dx, dy), each in {-1, 0, 1}.
    ///
    /// Down wins over up and right wins over left. Diagonals are not
    /// normalized.
    #[inline]
    pub fn direction(&self) -> (f32, f32) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.up {
            dy = -1.0;
        }
        if self.down {
            dy = 1.0;
        }
        if self.left {
            dx = -1.0;
        }
        if self.right {
            dx = 1.0;
        }
        (dx, dy)
    }

    /// Check if no button is held.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.to_bits() == 0
    }

    /// Pack into a single byte.
    pub fn to_bits(&self) -> u8 {
        let mut bits = 0u8;
        if self.up { bits |= Self::FLAG_UP; }
        if self.down { bits |= Self::FLAG_DOWN; }
        if self.left { bits |= Self::FLAG_LEFT; }
        if self.right { bits |= Self::FLAG_RIGHT; }
        if self.fire { bits |= Self::FLAG_FIRE; }
        if self.dash { bits |= Self::FLAG_DASH; }
        if self.ult { bits |= Self::FLAG_ULT; }
        if self.jump { bits |= Self::FLAG_JUMP; }
        bits
    }

    /// Unpack from a single byte.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            up: bits & Self::FLAG_UP != 0,
            down: bits & Self::FLAG_DOWN != 0,
            left: bits & Self::FLAG_LEFT != 0,
            right: bits & Self::FLAG_RIGHT != 0,
            fire: bits & Self::FLAG_FIRE != 0,
            dash: bits & Self::FLAG_DASH != 0,
            ult: bits & Self::FLAG_ULT != 0,
            jump: bits & Self::FLAG_JUMP != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_priority() {
        let input = InputVector { up: true, down: true, left: true, right: true, ..Default::default() };
        assert_eq!(input.direction(), (1.0, 1.0));

        let input = InputVector { up: true, left: true, ..Default::default() };
        assert_eq!(input.direction(), (-1.0, -1.0));

        assert_eq!(InputVector::idle().direction(), (0.0, 0.0));
    }

    #[test]
    fn test_bits() {
        let input = InputVector { fire: true, jump: true, ..Default::default() };
        assert_eq!(input.to_bits(), InputVector::FLAG_FIRE | InputVector::FLAG_JUMP);
        assert_eq!(InputVector::from_bits(input.to_bits()), input);
        assert!(InputVector::from_bits(0).is_idle());
        assert!(!input.is_idle());
    }

    #[test]
    fn test_json_shape() {
        let input = InputVector { right: true, ..Default::default() };
        let json = serde_json::to_string(&input).unwrap();
        assert!(json.contains("\"right\":true"));
        let back: InputVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, input);
    }
}
