//! Environment Director
//!
//! The referee wanders the arena, speeding up as the fighters run low, and
//! every so often drops a powerup and maybe kicks off a global event. The
//! active event (area slow, food rain) is ticked here too.

use tracing::info;

use crate::game::archetype::ProjectileKind;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::state::{ActiveEvent, EventKind, Owner, Powerup, PowerupKind, Projectile, Simulation};

/// Referee speed at full health
pub const REFEREE_BASE_SPEED: f32 = 400.0;
/// Chance an action roll drops a powerup
pub const DROP_CHANCE: f32 = 0.6;
/// Chance a drop also starts food rain
pub const EVENT_CHANCE: f32 = 0.3;
/// Food rain duration
pub const RAIN_SECS: f32 = 5.0;
/// Seconds between rain drops
pub const RAIN_INTERVAL: f32 = 0.2;
/// Damage per rain drop
pub const RAIN_DAMAGE: f32 = 10.0;

/// Start a global event, replacing whatever was running.
pub fn start_event(sim: &mut Simulation, kind: EventKind, duration: f32) {
    sim.event = Some(ActiveEvent {
        kind,
        remaining: duration,
        spawn_timer: 0.0,
    });
    sim.emit(GameEvent::new(sim.tick, GameEventData::EventStarted { kind, duration }));
    info!(?kind, duration, "Global event started");
}

/// Tick the active event: rain spawns, then expiry.
pub fn update_event(sim: &mut Simulation, dt: f32) {
    let Some(mut event) = sim.event.take() else {
        return;
    };

    if event.kind == EventKind::Rain {
        event.spawn_timer -= dt;
        if event.spawn_timer <= 0.0 {
            event.spawn_timer = RAIN_INTERVAL;
            spawn_rain_drop(sim);
        }
    }

    event.remaining -= dt;
    if event.remaining <= 0.0 {
        sim.emit(GameEvent::new(sim.tick, GameEventData::EventEnded { kind: event.kind }));
        info!(kind = ?event.kind, "Global event ended");
    } else {
        sim.event = Some(event);
    }
}

/// Neutral projectile falling from just above the visible area.
fn spawn_rain_drop(sim: &mut Simulation) {
    let view_w = sim.config.viewport_width / sim.camera.zoom;
    let view_h = sim.config.viewport_height / sim.camera.zoom;
    let x = sim.camera.x - view_w / 2.0 + sim.rng.next_f32() * view_w;
    let y = sim.camera.y - view_h / 2.0 - 50.0;

    sim.projectiles.push(Projectile {
        x,
        y,
        z: 0.0,
        vx: 0.0,
        vy: 400.0,
        width: 30.0,
        height: 30.0,
        damage: RAIN_DAMAGE,
        owner: Owner::Environment,
        kind: ProjectileKind::Chip,
        penetrates: false,
        life: 3.0,
        struck: Vec::new(),
    });
}

/// Sum of current HP over sum of max HP across active players.
pub fn health_ratio(sim: &Simulation) -> f32 {
    let (hp, max) = sim
        .active_players()
        .fold((0.0, 0.0), |(hp, max), p| (hp + p.hp.max(0.0), max + p.max_hp));
    if max <= 0.0 {
        1.0
    } else {
        (hp / max).clamp(0.0, 1.0)
    }
}

/// Move the referee and roll its periodic action.
pub fn update_referee(sim: &mut Simulation, dt: f32) {
    let ratio = health_ratio(sim);
    let w = sim.config.arena_width;
    let h = sim.config.arena_height;

    let referee = &mut sim.referee;
    referee.speed = REFEREE_BASE_SPEED * (2.0 - ratio);
    referee.action_timer -= dt;

    let dx = referee.target_x - referee.x;
    let dy = referee.target_y - referee.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist > 10.0 {
        let step = (referee.speed * dt).min(dist);
        referee.x += dx / dist * step;
        referee.y += dy / dist * step;
    } else {
        referee.target_x = sim.rng.range_f32(100.0, w - 100.0);
        referee.target_y = sim.rng.range_f32(100.0, h - 100.0);
    }

    if referee.message_timer > 0.0 {
        referee.message_timer -= dt;
        if referee.message_timer <= 0.0 {
            referee.message.clear();
        }
    }

    if sim.referee.action_timer <= 0.0 {
        sim.referee.action_timer = sim.rng.range_f32(12.0, 27.0);
        if sim.rng.chance(DROP_CHANCE) {
            spawn_powerup(sim);
            if sim.rng.chance(EVENT_CHANCE) {
                let (x, y) = (sim.referee.x, sim.referee.y);
                start_event(sim, EventKind::Rain, RAIN_SECS);
                sim.spawn_text(x, y - 60.0, "FOOD RAIN!", "#FF4500", 50.0);
            }
        }
    }
}

/// Drop a random powerup at the referee's feet.
pub fn spawn_powerup(sim: &mut Simulation) {
    let kind = sim
        .rng
        .choose(&PowerupKind::ALL)
        .copied()
        .unwrap_or(PowerupKind::Speed);
    let (x, y) = (sim.referee.x, sim.referee.y);

    sim.powerups.push(Powerup::new(x, y, kind));
    sim.referee.message = "DROPPING!".to_string();
    sim.referee.message_timer = 0.8;
    sim.emit(GameEvent::new(sim.tick, GameEventData::PowerupDropped { kind, x, y }));
}
