//! Character Roster
//!
//! Every fighter picks one archetype. The archetype fixes base stats, the
//! shape of the regular shot and the ultimate it unleashes.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

/// Fixed roster of playable characters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    /// Sandwich slinger, the balanced default
    #[default]
    Austin,
    /// Chip thrower
    Brady,
    /// Fast and fragile
    Pigeon,
    /// Heavy hitter
    Chef,
    /// Slow tank
    Fridge,
    /// Glass cannon
    Toaster,
    /// Rocket-boosted brawler
    Mecha,
    /// Wall builder
    Crust,
    /// Cosmic caster
    Galactic,
}

/// Base stats granted by an archetype.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArchetypeStats {
    /// Starting max HP
    pub max_hp: f32,
    /// Damage per regular shot
    pub damage: f32,
    /// Multiplier applied to base movement speed
    pub speed_mult: f32,
}

/// Visual/behavioral class of a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Austin's sandwich
    Sub,
    /// Brady's chip (also used by food rain)
    Chip,
    /// Pigeon's feather
    Feather,
    /// Chef's meatball
    Meatball,
    /// Fridge ice cube
    IceCube,
    /// Toaster toast
    Toast,
    /// Mecha energy bolt
    Bolt,
    /// Crust chunk
    CrustChunk,
    /// Galactic star
    Star,
    /// Chef's oversized ultimate sandwich
    Gargantuan,
    /// Pigeon's flock bird
    Bird,
    /// Mecha slam shockwave
    Shockwave,
}

/// Regular shot profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileProfile {
    /// Projectile class
    pub kind: ProjectileKind,
    /// Hitbox width
    pub width: f32,
    /// Hitbox height
    pub height: f32,
    /// Speed relative to the configured projectile speed
    pub speed_mult: f32,
    /// Seconds before despawn
    pub life: f32,
    /// Seconds between shots
    pub cooldown: f32,
}

/// Archetype-specific ultimate ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ultimate {
    /// Three rounds of three sandwiches
    SubVolley,
    /// Radial burst of twelve chips
    ChipStorm,
    /// Five birds released one after another
    Flock,
    /// One huge penetrating sandwich
    Gargantuan,
    /// Arena-wide slow
    Freeze,
    /// Self-centered toast explosion
    ToastPop,
    /// Launch upward, then slam down with a shockwave
    RocketSlam,
    /// Raise a temporary wall
    CrustWall,
    /// Radial burst of sixteen stars
    Orbital,
}

impl Archetype {
    /// Every archetype, in roster order.
    pub const ALL: [Archetype; 9] = [
        Archetype::Austin,
        Archetype::Brady,
        Archetype::Pigeon,
        Archetype::Chef,
        Archetype::Fridge,
        Archetype::Toaster,
        Archetype::Mecha,
        Archetype::Crust,
        Archetype::Galactic,
    ];

    /// Lowercase identifier used on the wire and in rosters.
    pub fn id(&self) -> &'static str {
        match self {
            Archetype::Austin => "austin",
            Archetype::Brady => "brady",
            Archetype::Pigeon => "pigeon",
            Archetype::Chef => "chef",
            Archetype::Fridge => "fridge",
            Archetype::Toaster => "toaster",
            Archetype::Mecha => "mecha",
            Archetype::Crust => "crust",
            Archetype::Galactic => "galactic",
        }
    }

    /// Base stats.
    pub fn stats(&self) -> ArchetypeStats {
        let (max_hp, damage, speed_mult) = match self {
            Archetype::Austin => (100.0, 20.0, 1.0),
            Archetype::Brady => (90.0, 15.0, 1.1),
            Archetype::Pigeon => (80.0, 10.0, 1.2),
            Archetype::Chef => (150.0, 15.0, 0.8),
            Archetype::Fridge => (200.0, 20.0, 0.6),
            Archetype::Toaster => (70.0, 25.0, 1.3),
            Archetype::Mecha => (120.0, 20.0, 1.0),
            Archetype::Crust => (180.0, 15.0, 0.7),
            Archetype::Galactic => (110.0, 20.0, 1.1),
        };
        ArchetypeStats { max_hp, damage, speed_mult }
    }

    /// Regular shot profile.
    pub fn projectile(&self) -> ProjectileProfile {
        let (kind, width, height, speed_mult, life, cooldown) = match self {
            Archetype::Austin => (ProjectileKind::Sub, 40.0, 20.0, 1.0, 1.5, 0.25),
            Archetype::Brady => (ProjectileKind::Chip, 25.0, 25.0, 1.0, 2.0, 0.25),
            Archetype::Pigeon => (ProjectileKind::Feather, 30.0, 15.0, 1.1, 2.0, 0.2),
            Archetype::Chef => (ProjectileKind::Meatball, 35.0, 35.0, 0.9, 2.0, 0.3),
            Archetype::Fridge => (ProjectileKind::IceCube, 30.0, 30.0, 0.85, 2.0, 0.35),
            Archetype::Toaster => (ProjectileKind::Toast, 35.0, 30.0, 1.0, 1.5, 0.25),
            Archetype::Mecha => (ProjectileKind::Bolt, 45.0, 12.0, 1.3, 1.5, 0.3),
            Archetype::Crust => (ProjectileKind::CrustChunk, 40.0, 40.0, 0.8, 2.0, 0.4),
            Archetype::Galactic => (ProjectileKind::Star, 30.0, 30.0, 1.1, 2.0, 0.25),
        };
        ProjectileProfile { kind, width, height, speed_mult, life, cooldown }
    }

    /// Ultimate ability.
    pub fn ultimate(&self) -> Ultimate {
        match self {
            Archetype::Austin => Ultimate::SubVolley,
            Archetype::Brady => Ultimate::ChipStorm,
            Archetype::Pigeon => Ultimate::Flock,
            Archetype::Chef => Ultimate::Gargantuan,
            Archetype::Fridge => Ultimate::Freeze,
            Archetype::Toaster => Ultimate::ToastPop,
            Archetype::Mecha => Ultimate::RocketSlam,
            Archetype::Crust => Ultimate::CrustWall,
            Archetype::Galactic => Ultimate::Orbital,
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error for an unknown archetype name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown archetype: {0}")]
pub struct UnknownArchetype(pub String);

impl FromStr for Archetype {
    type Err = UnknownArchetype;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Archetype::ALL
            .iter()
            .copied()
            .find(|a| a.id() == lower)
            .ok_or(UnknownArchetype(s.to_string()))
    }
}
