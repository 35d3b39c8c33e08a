//! Authoritative Simulation Tick
//!
//! One call advances the arena by one frame. Only the host runs this.

use std::collections::BTreeMap;

use tracing::info;
#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::game::ability::{activate_ultimate, run_deferred, try_dash, update_temporary_obstacles};
use crate::game::camera::{decay_shake, update_camera};
use crate::game::combat::{check_round_over, collect_powerups, fire, update_projectiles, update_timers};
use crate::game::director::{update_event, update_referee};
use crate::game::events::GameEvent;
use crate::game::input::InputVector;
use crate::game::movement::{move_player, try_jump};
use crate::game::state::{Ephemeral, MatchPhase, Simulation};
use crate::MAX_PLAYERS;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Slot that lost, if the round ended this tick
    pub round_over: Option<u8>,
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `sim` - The simulation (will be mutated)
/// * `dt` - Frame delta in seconds, clamped to the configured ceiling
/// * `inputs` - Input per slot; a missing slot counts as no input
///
/// Nothing advances outside `MatchPhase::Playing`.
pub fn tick(sim: &mut Simulation, dt: f32, inputs: &BTreeMap<u8, InputVector>) -> TickResult {
    if sim.phase != MatchPhase::Playing {
        return TickResult::default();
    }
    let dt = sim.config.clamp_dt(dt);

    // 0. Advance counters
    sim.tick += 1;
    sim.clock += dt as f64;
    for player in sim.players.iter_mut() {
        player.stamina_spent = false;
    }

    // 1. Camera
    decay_shake(&mut sim.camera);
    update_camera(&mut sim.camera, sim.players.iter(), &sim.config);

    // 2. Global event and referee
    update_event(sim, dt);
    update_referee(sim, dt);

    // 3. Deferred ultimate stages
    for action in sim.schedule.drain_due(sim.clock) {
        run_deferred(sim, &action);
    }

    // 4. Player inputs and movement (slot order)
    apply_inputs(sim, dt, inputs);

    // 5. Cooldowns, buffs, combos
    update_timers(sim, dt);

    // 6. Projectiles and hits
    update_projectiles(sim, dt);

    // 7. Pickups
    collect_powerups(sim);

    // 8. Temporary obstacles and visuals
    update_temporary_obstacles(sim, dt);
    update_ephemerals(&mut sim.particles, dt);
    update_ephemerals(&mut sim.texts, dt);

    // 9. Round over
    let round_over = check_round_over(sim);
    if let Some(loser) = round_over {
        sim.phase = MatchPhase::RoundOver { loser };
        sim.emit(GameEvent::round_over(sim.tick, sim.round, loser));
        info!(round = sim.round, loser, tick = sim.tick, "Round over");
    }

    #[cfg(feature = "debug-tracing")]
    trace!(
        tick = sim.tick,
        projectiles = sim.projectiles.len(),
        events = sim.pending_events.len(),
        "Tick complete"
    );

    TickResult {
        events: std::mem::take(&mut sim.pending_events),
        round_over,
    }
}

/// Apply each slot's input: fire, dash, ultimate, jump, then move.
fn apply_inputs(sim: &mut Simulation, dt: f32, inputs: &BTreeMap<u8, InputVector>) {
    for slot in 1..=MAX_PLAYERS {
        if !sim.player(slot).is_some_and(|p| p.active) {
            continue;
        }
        let input = inputs.get(&slot).copied().unwrap_or_default();
        let (dx, dy) = input.direction();

        if input.fire {
            fire(sim, slot);
        }
        if input.dash {
            try_dash(sim, slot);
        }
        if input.ult {
            activate_ultimate(sim, slot);
        }

        let event = sim.event.as_ref().map(|e| e.kind);
        let config = &sim.config;
        let obstacles = &sim.obstacles;
        let Some(player) = sim.players.get_mut(slot as usize - 1) else {
            continue;
        };
        if input.jump {
            try_jump(player, config);
        }
        move_player(player, dx, dy, dt, obstacles, event, config);
    }
}

/// Integrate and expire particles or texts.
fn update_ephemerals(items: &mut Vec<Ephemeral>, dt: f32) {
    for item in items.iter_mut() {
        item.x += item.vx * dt;
        item.y += item.vy * dt;
        item.life -= dt;
    }
    items.retain(|item| item.life > 0.0);
}

// =============================================================================
// TESTS
// =============================================================================
