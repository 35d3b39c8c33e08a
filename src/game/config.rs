//! Simulation Configuration
//!
//! Arena geometry, physics constants and camera tuning. `Default` gives the
//! standard arena every participant expects; tests tweak individual fields.

use serde::{Serialize, Deserialize};

/// Which players decide the end of a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinCondition {
    /// Round ends when any active player drops to zero HP.
    #[default]
    AnyActivePlayer,
    /// Only slots 1 and 2 are checked (classic two-player rule).
    FirstTwoSlots,
}

/// Simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Arena width in world units
    pub arena_width: f32,
    /// Arena height in world units
    pub arena_height: f32,
    /// Base player speed (units/s)
    pub player_speed: f32,
    /// Base projectile speed (units/s)
    pub projectile_speed: f32,
    /// Seconds between dashes
    pub dash_cooldown: f32,
    /// Seconds a dash lasts (and stays invulnerable)
    pub dash_duration: f32,
    /// Speed multiplier while dashing
    pub dash_multiplier: f32,
    /// Downward acceleration on z (units/s²)
    pub gravity: f32,
    /// Initial upward velocity of a jump
    pub jump_strength: f32,
    /// Speed factor while airborne
    pub airborne_speed_factor: f32,
    /// Height above which obstacles are cleared
    pub jump_over_height: f32,
    /// Height below which powerups can be picked up
    pub pickup_height: f32,
    /// Max z distance for a projectile to connect
    pub hit_z_window: f32,
    /// Logical viewport width
    pub viewport_width: f32,
    /// Logical viewport height
    pub viewport_height: f32,
    /// Minimum camera zoom
    pub min_zoom: f32,
    /// Maximum camera zoom
    pub max_zoom: f32,
    /// Per-tick smoothing of the camera center
    pub camera_smoothing: f32,
    /// Per-tick smoothing of the camera zoom
    pub zoom_smoothing: f32,
    /// Padding added around the players' bounding box
    pub camera_padding: f32,
    /// Largest step a single tick may integrate
    pub max_dt: f32,
    /// Round-over rule
    pub win_condition: WinCondition,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_width: 3000.0,
            arena_height: 2000.0,
            player_speed: 600.0,
            projectile_speed: 1000.0,
            dash_cooldown: 0.8,
            dash_duration: 0.2,
            dash_multiplier: 2.2,
            gravity: 2500.0,
            jump_strength: 900.0,
            airborne_speed_factor: 0.8,
            jump_over_height: 50.0,
            pickup_height: 20.0,
            hit_z_window: 60.0,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            min_zoom: 0.35,
            max_zoom: 1.5,
            camera_smoothing: 0.1,
            zoom_smoothing: 0.05,
            camera_padding: 400.0,
            max_dt: 0.1,
            win_condition: WinCondition::AnyActivePlayer,
        }
    }
}

impl SimConfig {
    /// Clamp a frame delta into `[0, max_dt]`.
    #[inline]
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if dt.is_nan() {
            return 0.0;
        }
        dt.clamp(0.0, self.max_dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_arena() {
        let config = SimConfig::default();
        assert_eq!(config.arena_width, 3000.0);
        assert_eq!(config.arena_height, 2000.0);
        assert_eq!(config.win_condition, WinCondition::AnyActivePlayer);
    }

    #[test]
    fn test_clamp_dt() {
        let config = SimConfig::default();
        assert_eq!(config.clamp_dt(0.5), 0.1);
        assert_eq!(config.clamp_dt(-1.0), 0.0);
        assert_eq!(config.clamp_dt(f32::NAN), 0.0);
        assert!((config.clamp_dt(1.0 / 60.0) - 1.0 / 60.0).abs() < f32::EPSILON);
    }
}
