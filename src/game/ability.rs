//! Dash and Ultimates
//!
//! Each archetype carries one ultimate. Multi-stage ultimates queue their
//! later stages on the simulation schedule instead of blocking.

use tracing::info;

use crate::game::archetype::{ProjectileKind, Ultimate};
use crate::game::director::start_event;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::schedule::{DeferredKind, ScheduledAction};
use crate::game::state::{
    EventKind, Facing, Obstacle, ObstacleKind, Owner, Player, Projectile, Simulation,
};

/// Stamina consumed by a dash
pub const DASH_COST: f32 = 20.0;
/// Stamina required to start a dash (strictly more than)
pub const DASH_MIN_STAMINA: f32 = 20.0;
/// Freeze slow duration
pub const FREEZE_SECS: f32 = 3.0;
/// Birds in a flock
pub const FLOCK_SIZE: u32 = 5;
/// Seconds between flock birds
pub const FLOCK_INTERVAL: f64 = 0.1;
/// Rounds in a sandwich volley
pub const VOLLEY_ROUNDS: u32 = 3;
/// Seconds between volley rounds
pub const VOLLEY_INTERVAL: f64 = 0.15;
/// Seconds between rocket launch and slam
pub const SLAM_DELAY: f64 = 0.6;
/// Crust wall lifetime
pub const WALL_SECS: f32 = 6.0;

// =============================================================================
// DASH
// =============================================================================

/// Start a dash.
///
/// Needs the dash off cooldown, no dash in progress and stamina above 20.
pub fn try_dash(sim: &mut Simulation, slot: u8) -> Option<GameEvent> {
    let duration = sim.config.dash_duration;
    let cooldown = sim.config.dash_cooldown;
    let player = sim.player_mut(slot)?;
    if !player.active
        || player.is_dashing
        || player.dash_cooldown > 0.0
        || player.stamina <= DASH_MIN_STAMINA
    {
        return None;
    }

    player.is_dashing = true;
    player.dash_time = duration;
    player.dash_cooldown = cooldown;
    player.spend_stamina(DASH_COST);
    let (x, y) = (player.x, player.y - player.z);

    sim.spawn_text(x, y, "DASH!", "#FFF", 20.0);
    let event = GameEvent::new(sim.tick, GameEventData::Dashed { slot });
    sim.emit(event.clone());
    Some(event)
}

// =============================================================================
// ULTIMATES
// =============================================================================

/// Unleash a player's ultimate.
/// Returns an event if the ultimate was charged and fired.
pub fn activate_ultimate(sim: &mut Simulation, slot: u8) -> Option<GameEvent> {
    let (ultimate, x, y, z) = {
        let player = sim.player_mut(slot)?;
        if !player.active || !player.ult_ready() {
            return None;
        }
        player.ult_charge = 0.0;
        (player.archetype.ultimate(), player.x, player.y, player.z)
    };

    sim.spawn_text(x, y - z - 80.0, "ULTIMATE!", "#FF00FF", 60.0);
    sim.shake(20.0);

    match ultimate {
        Ultimate::SubVolley => {
            sub_volley_round(sim, slot);
            for round in 1..VOLLEY_ROUNDS {
                queue(sim, slot, round as f64 * VOLLEY_INTERVAL, DeferredKind::SubVolleyRound);
            }
        }
        Ultimate::ChipStorm => radial_burst(sim, slot, ProjectileKind::Chip, 12, 900.0, 1.2, 1.0),
        Ultimate::Flock => {
            flock_bird(sim, slot);
            for i in 1..FLOCK_SIZE {
                queue(sim, slot, i as f64 * FLOCK_INTERVAL, DeferredKind::FlockBird);
            }
        }
        Ultimate::Gargantuan => gargantuan(sim, slot),
        Ultimate::Freeze => {
            let (cx, cy) = (sim.camera.x, sim.camera.y);
            start_event(sim, EventKind::Slow, FREEZE_SECS);
            sim.spawn_text(cx, cy, "FREEZE!", "#00FFFF", 80.0);
        }
        Ultimate::ToastPop => toast_pop(sim, slot),
        Ultimate::RocketSlam => {
            let launch = sim.config.jump_strength * 1.5;
            if let Some(player) = sim.player_mut(slot) {
                player.vz = launch;
            }
            queue(sim, slot, SLAM_DELAY, DeferredKind::RocketSlam);
        }
        Ultimate::CrustWall => crust_wall(sim, slot),
        Ultimate::Orbital => radial_burst(sim, slot, ProjectileKind::Star, 16, 800.0, 1.5, 1.0),
    }

    info!(slot, ?ultimate, "Ultimate unleashed");
    let event = GameEvent::ultimate_used(sim.tick, slot, ultimate);
    sim.emit(event.clone());
    Some(event)
}

/// Run a deferred stage that came due.
///
/// Stages from an earlier round, or whose owner left, are dropped.
pub fn run_deferred(sim: &mut Simulation, action: &ScheduledAction) {
    if action.round != sim.round {
        return;
    }
    if !sim.player(action.owner).is_some_and(|p| p.active) {
        return;
    }
    match action.kind {
        DeferredKind::FlockBird => flock_bird(sim, action.owner),
        DeferredKind::SubVolleyRound => sub_volley_round(sim, action.owner),
        DeferredKind::RocketSlam => rocket_slam(sim, action.owner),
    }
}

fn queue(sim: &mut Simulation, slot: u8, delay: f64, kind: DeferredKind) {
    let due = sim.clock + delay;
    let round = sim.round;
    sim.schedule.push(due, slot, round, kind);
}

/// Projectile template owned by `player`.
fn shot(player: &Player, kind: ProjectileKind, width: f32, height: f32, damage: f32, life: f32) -> Projectile {
    let (cx, cy) = player.center();
    Projectile {
        x: cx - width / 2.0,
        y: cy - height / 2.0 - player.z,
        z: player.z,
        vx: 0.0,
        vy: 0.0,
        width,
        height,
        damage,
        owner: Owner::Player(player.slot),
        kind,
        penetrates: false,
        life,
        struck: Vec::new(),
    }
}

/// Left edge for a projectile launched from the player's facing side.
fn muzzle_x(player: &Player, width: f32) -> f32 {
    match player.facing {
        Facing::Right => player.x + player.width,
        Facing::Left => player.x - width,
    }
}

fn sub_volley_round(sim: &mut Simulation, slot: u8) {
    let speed = sim.config.projectile_speed * 1.2;
    let Some(player) = sim.player(slot) else {
        return;
    };
    let sign = player.facing.sign();
    let mut batch = Vec::with_capacity(3);
    for spread in [-200.0, 0.0, 200.0] {
        let mut p = shot(player, ProjectileKind::Sub, 40.0, 20.0, player.damage, 1.5);
        p.x = muzzle_x(player, 40.0);
        p.vx = speed * sign;
        p.vy = spread;
        batch.push(p);
    }
    sim.projectiles.extend(batch);
}

fn flock_bird(sim: &mut Simulation, slot: u8) {
    let jitter_y = sim.rng.next_f32();
    let jitter_vy = sim.rng.centered();
    let Some(player) = sim.player(slot) else {
        return;
    };
    let mut p = shot(player, ProjectileKind::Bird, 30.0, 30.0, 20.0, 2.0);
    p.x = muzzle_x(player, 30.0);
    p.y = player.y + jitter_y * player.height - player.z;
    p.vx = 1200.0 * player.facing.sign();
    p.vy = jitter_vy * 400.0;
    sim.projectiles.push(p);
}

fn gargantuan(sim: &mut Simulation, slot: u8) {
    let Some(player) = sim.player(slot) else {
        return;
    };
    let mut p = shot(player, ProjectileKind::Gargantuan, 180.0, 100.0, 80.0, 3.0);
    p.x = muzzle_x(player, 180.0);
    p.vx = 1500.0 * player.facing.sign();
    p.penetrates = true;
    sim.projectiles.push(p);
}

fn radial_burst(
    sim: &mut Simulation,
    slot: u8,
    kind: ProjectileKind,
    count: u32,
    speed: f32,
    life: f32,
    damage_mult: f32,
) {
    let Some(player) = sim.player(slot) else {
        return;
    };
    let template = shot(player, kind, 30.0, 30.0, player.damage * damage_mult, life);
    let burst: Vec<Projectile> = (0..count)
        .map(|i| {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            let mut p = template.clone();
            p.vx = angle.cos() * speed;
            p.vy = angle.sin() * speed;
            p
        })
        .collect();
    sim.projectiles.extend(burst);
}

fn toast_pop(sim: &mut Simulation, slot: u8) {
    let Some(player) = sim.player(slot) else {
        return;
    };
    let template = shot(player, ProjectileKind::Toast, 40.0, 40.0, 45.0, 1.0);
    let (cx, cy) = player.center();

    sim.shake(40.0);
    sim.spawn_explosion(cx, cy, "#FFA500");
    for _ in 0..8 {
        let mut p = template.clone();
        p.vx = sim.rng.centered() * 1500.0;
        p.vy = sim.rng.centered() * 1500.0;
        sim.projectiles.push(p);
    }
}

fn rocket_slam(sim: &mut Simulation, slot: u8) {
    let slam_speed = sim.config.jump_strength * 2.0;
    let Some(player) = sim.player_mut(slot) else {
        return;
    };
    if player.z > 0.0 {
        player.vz = -slam_speed;
    }
    let (cx, _) = player.center();
    let ground_y = player.y + player.height - 40.0;
    let damage = player.damage * 2.0;

    for dir in [-1.0f32, 1.0] {
        let p = Projectile {
            x: if dir > 0.0 { cx } else { cx - 120.0 },
            y: ground_y,
            z: 0.0,
            vx: 900.0 * dir,
            vy: 0.0,
            width: 120.0,
            height: 40.0,
            damage,
            owner: Owner::Player(slot),
            kind: ProjectileKind::Shockwave,
            penetrates: true,
            life: 0.6,
            struck: Vec::new(),
        };
        sim.projectiles.push(p);
    }
    sim.shake(30.0);
    sim.spawn_explosion(cx, ground_y, "#FF6A00");
}

fn crust_wall(sim: &mut Simulation, slot: u8) {
    let Some(player) = sim.player(slot) else {
        return;
    };
    let (width, height, gap) = (40.0, 160.0, 40.0);
    let x = match player.facing {
        Facing::Right => player.x + player.width + gap,
        Facing::Left => player.x - gap - width,
    };
    let x = x.clamp(0.0, sim.config.arena_width - width);
    let y = (player.y + player.height / 2.0 - height / 2.0).clamp(0.0, sim.config.arena_height - height);

    sim.obstacles.push(Obstacle {
        x,
        y,
        width,
        height,
        kind: ObstacleKind::CrustWall,
        ttl: Some(WALL_SECS),
    });
}

/// Count down temporary obstacles and remove expired ones.
pub fn update_temporary_obstacles(sim: &mut Simulation, dt: f32) {
    for obstacle in sim.obstacles.iter_mut() {
        if let Some(ttl) = obstacle.ttl.as_mut() {
            *ttl -= dt;
        }
    }
    sim.obstacles.retain(|o| o.ttl.map_or(true, |t| t > 0.0));
}

// =============================================================================
// TESTS
// =============================================================================
