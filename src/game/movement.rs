//! Movement and Collision
//!
//! Per-player integration: knockback decay, stamina regen, the jump arc,
//! planar movement clamped to the arena, and axis-separated sliding along
//! obstacles for grounded players.

use crate::core::rect::{Bounded, Rect};
use crate::game::config::SimConfig;
use crate::game::state::{EventKind, Facing, Obstacle, Player};

/// Stamina consumed by a jump
pub const JUMP_COST: f32 = 20.0;
/// Stamina regenerated per second
pub const STAMINA_REGEN: f32 = 10.0;
/// Knockback retained each tick
pub const KNOCKBACK_DECAY: f32 = 0.9;
/// Speed multiplier while the speed buff runs
pub const SPEED_BUFF_MULT: f32 = 1.5;
/// Speed multiplier during the Slow event
pub const SLOW_EVENT_MULT: f32 = 0.5;

/// Start a jump if grounded with enough stamina.
pub fn try_jump(player: &mut Player, config: &SimConfig) -> bool {
    if !player.is_grounded() || player.stamina < JUMP_COST {
        return false;
    }
    player.vz = config.jump_strength;
    player.spend_stamina(JUMP_COST);
    true
}

/// Effective planar speed for this tick.
pub fn effective_speed(player: &Player, event: Option<EventKind>, config: &SimConfig) -> f32 {
    let mut speed = config.player_speed * player.speed_mult;
    if player.is_dashing {
        speed *= config.dash_multiplier;
    }
    if event == Some(EventKind::Slow) {
        speed *= SLOW_EVENT_MULT;
    }
    if player.speed_buff > 0.0 {
        speed *= SPEED_BUFF_MULT;
    }
    if player.z > 0.0 {
        speed *= config.airborne_speed_factor;
    }
    speed
}

/// Advance one player by `dt`.
///
/// `dx`/`dy` are the input direction components in {-1, 0, 1}.
pub fn move_player(
    player: &mut Player,
    dx: f32,
    dy: f32,
    dt: f32,
    obstacles: &[Obstacle],
    event: Option<EventKind>,
    config: &SimConfig,
) {
    player.vx *= KNOCKBACK_DECAY;
    player.vy *= KNOCKBACK_DECAY;

    if !player.stamina_spent && player.stamina < player.max_stamina {
        player.stamina = (player.stamina + STAMINA_REGEN * dt).min(player.max_stamina);
    }

    // Jump arc
    if player.z > 0.0 || player.vz != 0.0 {
        player.vz -= config.gravity * dt;
        player.z += player.vz * dt;
        if player.z <= 0.0 {
            player.z = 0.0;
            player.vz = 0.0;
        }
    }

    if dx > 0.0 {
        player.facing = Facing::Right;
    } else if dx < 0.0 {
        player.facing = Facing::Left;
    }

    let speed = effective_speed(player, event, config);
    let max_x = config.arena_width - player.width;
    let max_y = config.arena_height - player.height;
    let next_x = (player.x + dx * speed * dt + player.vx * dt).clamp(0.0, max_x);
    let next_y = (player.y + dy * speed * dt + player.vy * dt).clamp(0.0, max_y);

    if player.z > config.jump_over_height {
        player.x = next_x;
        player.y = next_y;
        return;
    }

    let hitbox = player.bounds();
    if !blocked(&hitbox, &hitbox.at(next_x, next_y), obstacles) {
        player.x = next_x;
        player.y = next_y;
        return;
    }

    // Slide along whichever axis is free
    if !blocked(&hitbox, &hitbox.at(next_x, player.y), obstacles) {
        player.x = next_x;
    }
    if !blocked(&hitbox, &hitbox.at(player.x, next_y), obstacles) {
        player.y = next_y;
    }
}

/// Obstacles the player already stands inside never hold it in place.
fn blocked(start: &Rect, rect: &Rect, obstacles: &[Obstacle]) -> bool {
    obstacles
        .iter()
        .map(|o| o.bounds())
        .any(|b| !start.overlaps(&b) && rect.overlaps(&b))
}
