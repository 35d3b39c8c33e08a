//! Combat Resolution
//!
//! Regular shots, projectile flight, hit resolution (dash evasion, shields,
//! damage), XP/combo bookkeeping, powerup pickup and the round-over check.

use tracing::{debug, info};

use crate::core::rect::Bounded;
use crate::game::archetype::ProjectileKind;
use crate::game::config::WinCondition;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::state::{
    Ephemeral, EphemeralKind, Facing, Owner, PowerupKind, Projectile, Simulation, MAX_SHIELD,
};
use crate::MAX_PLAYERS;

/// XP the firer earns per damaging hit
pub const HIT_XP: f32 = 20.0;
/// XP a dashing player earns for slipping through a shot
pub const PERFECT_XP: f32 = 20.0;
/// Shot cooldown while rapid fire runs
pub const RAPID_FIRE_COOLDOWN: f32 = 0.125;
/// Speed buff duration
pub const SPEED_BUFF_SECS: f32 = 5.0;
/// Rapid-fire buff duration
pub const RAPID_FIRE_SECS: f32 = 3.0;
/// Knockback speed applied to a damaged player
pub const KNOCKBACK_IMPULSE: f32 = 250.0;

// =============================================================================
// FIRING
// =============================================================================

/// Fire the slot's regular shot toward its facing.
///
/// Returns false if the slot is inactive or still cooling down.
pub fn fire(sim: &mut Simulation, slot: u8) -> bool {
    let base_speed = sim.config.projectile_speed;
    let Some(player) = sim.player_mut(slot) else {
        return false;
    };
    if !player.active || player.cooldown > 0.0 {
        return false;
    }

    let profile = player.archetype.projectile();
    player.cooldown = if player.rapid_fire > 0.0 {
        RAPID_FIRE_COOLDOWN
    } else {
        profile.cooldown
    };

    let x = match player.facing {
        Facing::Right => player.x + player.width,
        Facing::Left => player.x - profile.width,
    };
    let projectile = Projectile {
        x,
        y: player.y + player.height / 2.0 - profile.height / 2.0 - player.z,
        z: player.z,
        vx: base_speed * profile.speed_mult * player.facing.sign(),
        vy: 0.0,
        width: profile.width,
        height: profile.height,
        damage: player.damage,
        owner: Owner::Player(slot),
        kind: profile.kind,
        penetrates: false,
        life: profile.life,
        struck: Vec::new(),
    };
    sim.projectiles.push(projectile);
    true
}

// =============================================================================
// PROJECTILES
// =============================================================================

/// Move projectiles, cull expired ones and resolve hits.
pub fn update_projectiles(sim: &mut Simulation, dt: f32) {
    let width = sim.config.arena_width;
    let height = sim.config.arena_height;

    for p in sim.projectiles.iter_mut() {
        p.x += p.vx * dt;
        p.y += p.vy * dt;
        p.life -= dt;
    }
    sim.projectiles.retain(|p| {
        p.life > 0.0 && p.x >= 0.0 && p.x <= width && p.y <= height && p.y + p.height >= -100.0
    });

    let mut i = 0;
    while i < sim.projectiles.len() {
        let mut consumed = false;
        for slot in 1..=MAX_PLAYERS {
            if !connects(sim, i, slot) {
                continue;
            }
            resolve_hit(sim, i, slot);
            if sim.projectiles[i].penetrates {
                sim.projectiles[i].struck.push(slot);
            } else {
                sim.projectiles.remove(i);
                consumed = true;
                break;
            }
        }
        if !consumed {
            i += 1;
        }
    }
}

/// Check whether projectile `i` connects with `slot` this tick.
fn connects(sim: &Simulation, i: usize, slot: u8) -> bool {
    let (Some(projectile), Some(target)) = (sim.projectiles.get(i), sim.player(slot)) else {
        return false;
    };
    if !target.active || projectile.owner == Owner::Player(slot) || projectile.struck.contains(&slot) {
        return false;
    }
    projectile.overlaps(target) && (projectile.z - target.z).abs() < sim.config.hit_z_window
}

/// Resolve one qualifying hit: dash evasion, then shield, then damage.
pub fn resolve_hit(sim: &mut Simulation, i: usize, slot: u8) {
    let tick = sim.tick;
    let Some(projectile) = sim.projectiles.get(i) else {
        return;
    };
    let (damage, owner, kind) = (projectile.damage, projectile.owner, projectile.kind);
    let (px, py, pvx, pvy) = (projectile.x, projectile.y, projectile.vx, projectile.vy);

    let Some(target) = sim.player_mut(slot) else {
        return;
    };
    let (tx, ty) = (target.x, target.y - target.z);

    if target.is_dashing {
        let leveled = target.gain_xp(PERFECT_XP);
        sim.spawn_text(tx, ty - 20.0, "PERFECT!", "#00FF00", 30.0);
        sim.emit(GameEvent::perfect_evade(tick, slot));
        if leveled {
            announce_level_up(sim, slot);
        }
        return;
    }

    if target.shield > 0 {
        target.shield -= 1;
        let shield_left = target.shield;
        sim.spawn_text(tx, ty, "BLOCKED!", "#00FFFF", 30.0);
        sim.spawn_explosion(px, py, "#00FFFF");
        sim.emit(GameEvent::blocked(tick, slot, shield_left));
        return;
    }

    target.hp -= damage;
    let speed = (pvx * pvx + pvy * pvy).sqrt();
    if speed > 0.0 {
        target.vx += pvx / speed * KNOCKBACK_IMPULSE;
        target.vy += pvy / speed * KNOCKBACK_IMPULSE;
    }
    let remaining_hp = target.hp;
    sim.emit(GameEvent::hit(tick, owner, slot, damage, remaining_hp));
    debug!(target = slot, damage, remaining_hp, "Projectile hit");

    if let Owner::Player(attacker_slot) = owner {
        if let Some(attacker) = sim.player_mut(attacker_slot) {
            let leveled = attacker.gain_xp(HIT_XP);
            let count = attacker.add_combo();
            let (ax, ay) = (attacker.x, attacker.y - attacker.z);
            if count > 1 {
                sim.spawn_text(ax, ay - 40.0, format!("{}x COMBO!", count), "#FFFF00", 20.0 + count as f32 * 2.0);
                sim.emit(GameEvent::new(tick, GameEventData::Combo { slot: attacker_slot, count }));
            }
            if leveled {
                announce_level_up(sim, attacker_slot);
            }
        }
    }

    let color = match kind {
        ProjectileKind::Sub => "#D2691E",
        _ => "#FFD700",
    };
    sim.spawn_text(tx, ty, format!("-{}", damage.floor()), "#FF4500", 35.0);
    sim.spawn_explosion(px, py, color);
    sim.shake(5.0);
}

fn announce_level_up(sim: &mut Simulation, slot: u8) {
    let Some(player) = sim.player(slot) else {
        return;
    };
    let (x, y, level) = (player.x, player.y - player.z, player.level);
    sim.spawn_text(x, y - 60.0, "LEVEL UP!", "#FFD700", 40.0);
    sim.emit(GameEvent::level_up(sim.tick, slot, level));
    info!(slot, level, "Level up");
}

// =============================================================================
// TIMERS
// =============================================================================

/// Count down cooldowns, dash windows, buffs and combo windows.
pub fn update_timers(sim: &mut Simulation, dt: f32) {
    let tick = sim.tick;
    for idx in 0..sim.players.len() {
        let player = &mut sim.players[idx];
        if !player.active {
            continue;
        }
        let slot = player.slot;

        if player.cooldown > 0.0 {
            player.cooldown -= dt;
        }
        if player.dash_cooldown > 0.0 {
            player.dash_cooldown -= dt;
        }
        let mut trail = None;
        if player.is_dashing {
            player.dash_time -= dt;
            if player.dash_time <= 0.0 {
                player.is_dashing = false;
            }
            if sim.rng.chance(0.5) {
                trail = Some((player.x, player.y - player.z, player.width, player.height));
            }
        }
        if player.speed_buff > 0.0 {
            player.speed_buff -= dt;
        }
        if player.rapid_fire > 0.0 {
            player.rapid_fire -= dt;
        }

        let mut combo_lost = None;
        if player.combo_timer > 0.0 {
            player.combo_timer -= dt;
            if player.combo_timer <= 0.0 {
                player.combo = 0;
                combo_lost = Some((player.x, player.y - player.z));
            }
        }

        if let Some((x, y, width, height)) = trail {
            sim.push_particle(Ephemeral {
                x,
                y,
                vx: 0.0,
                vy: 0.0,
                color: "rgba(255,255,255,0.3)",
                life: 0.2,
                kind: EphemeralKind::Trail { width, height },
            });
        }
        if let Some((x, y)) = combo_lost {
            sim.spawn_text(x, y - 40.0, "COMBO LOST", "#CCC", 20.0);
            sim.emit(GameEvent::new(tick, GameEventData::ComboLost { slot }));
        }
    }
}

// =============================================================================
// POWERUPS
// =============================================================================

/// Hand each powerup to the first grounded player touching it.
pub fn collect_powerups(sim: &mut Simulation) {
    let tick = sim.tick;
    let pickup_height = sim.config.pickup_height;

    let mut i = 0;
    while i < sim.powerups.len() {
        let powerup = sim.powerups[i].clone();
        let taker = sim
            .players
            .iter()
            .find(|p| p.active && p.z < pickup_height && p.overlaps(&powerup))
            .map(|p| p.slot);

        let Some(slot) = taker else {
            i += 1;
            continue;
        };
        sim.powerups.remove(i);

        let Some(player) = sim.player_mut(slot) else {
            continue;
        };
        let (label, color) = match powerup.kind {
            PowerupKind::Speed => {
                player.speed_buff = SPEED_BUFF_SECS;
                ("SPEED UP!", "#FFFF00")
            }
            PowerupKind::Shield => {
                player.shield = (player.shield + 1).min(MAX_SHIELD);
                ("SHIELD!", "#00FFFF")
            }
            PowerupKind::RapidFire => {
                player.rapid_fire = RAPID_FIRE_SECS;
                ("RAPID FIRE!", "#FF4500")
            }
        };
        let (x, y) = (player.x, player.y);
        sim.spawn_text(x, y, label, color, 30.0);
        sim.emit(GameEvent::new(tick, GameEventData::PowerupCollected { slot, kind: powerup.kind }));
    }
}

// =============================================================================
// ROUND OVER
// =============================================================================

/// Slot whose HP dropped to zero, under the configured win condition.
pub fn check_round_over(sim: &Simulation) -> Option<u8> {
    let tracked = |slot: u8| match sim.config.win_condition {
        WinCondition::AnyActivePlayer => true,
        WinCondition::FirstTwoSlots => slot <= 2,
    };
    sim.active_players()
        .filter(|p| tracked(p.slot))
        .find(|p| p.hp <= 0.0)
        .map(|p| p.slot)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use crate::game::archetype::Archetype;
    use crate::game::config::SimConfig;
    use crate::game::state::Powerup;

    fn duel() -> Simulation {
        let mut sim = Simulation::new(SimConfig::default(), 7);
        let mut roster = BTreeMap::new();
        roster.insert(1, Archetype::Austin);
        roster.insert(2, Archetype::Brady);
        sim.apply_roster(&roster);
        sim.obstacles.clear();
        sim.start();
        sim
    }

    /// A projectile from slot 1 sitting on top of slot 2.
    fn shot_on_target(sim: &Simulation, penetrates: bool) -> Projectile {
        let target = sim.player(2).unwrap();
        Projectile {
            x: target.x + 5.0,
            y: target.y + 20.0,
            z: 0.0,
            vx: 1000.0,
            vy: 0.0,
            width: 40.0,
            height: 20.0,
            damage: 20.0,
            owner: Owner::Player(1),
            kind: ProjectileKind::Sub,
            penetrates,
            life: 1.0,
            struck: Vec::new(),
        }
    }

    #[test]
    fn test_fire_respects_cooldown() {
        let mut sim = duel();
        assert!(fire(&mut sim, 1));
        assert!(!fire(&mut sim, 1));
        assert_eq!(sim.projectiles.len(), 1);

        let shot = &sim.projectiles[0];
        assert_eq!(shot.owner, Owner::Player(1));
        assert!(shot.vx > 0.0);
        assert_eq!(shot.x, 150.0);
    }

    #[test]
    fn test_fire_left_facing() {
        let mut sim = duel();
        assert!(fire(&mut sim, 2));
        let shot = &sim.projectiles[0];
        let p2 = sim.player(2).unwrap();
        assert!(shot.vx < 0.0);
        assert_eq!(shot.x, p2.x - shot.width);
    }

    #[test]
    fn test_rapid_fire_cooldown() {
        let mut sim = duel();
        sim.player_mut(1).unwrap().rapid_fire = 1.0;
        fire(&mut sim, 1);
        assert_eq!(sim.player(1).unwrap().cooldown, RAPID_FIRE_COOLDOWN);
    }

    #[test]
    fn test_inactive_slot_cannot_fire() {
        let mut sim = duel();
        assert!(!fire(&mut sim, 3));
        assert!(!fire(&mut sim, 9));
    }

    #[test]
    fn test_damage_hit() {
        let mut sim = duel();
        let shot = shot_on_target(&sim, false);
        sim.projectiles.push(shot);
        update_projectiles(&mut sim, 0.0);

        assert!(sim.projectiles.is_empty());
        assert_eq!(sim.player(2).unwrap().hp, 70.0);
        let attacker = sim.player(1).unwrap();
        assert_eq!(attacker.combo, 1);
        assert_eq!(attacker.ult_charge, 60.0);
        assert_eq!(attacker.xp, 20.0);
    }

    #[test]
    fn test_dash_evades_even_with_shield() {
        let mut sim = duel();
        {
            let target = sim.player_mut(2).unwrap();
            target.is_dashing = true;
            target.shield = 2;
        }
        let shot = shot_on_target(&sim, false);
        sim.projectiles.push(shot);
        update_projectiles(&mut sim, 0.0);

        let target = sim.player(2).unwrap();
        assert_eq!(target.hp, target.max_hp);
        assert_eq!(target.shield, 2);
        assert_eq!(target.ult_charge, 60.0);
        assert!(sim.projectiles.is_empty());
        assert_eq!(sim.player(1).unwrap().combo, 0);
    }

    #[test]
    fn test_shield_blocks_one_hit() {
        let mut sim = duel();
        sim.player_mut(2).unwrap().shield = 2;
        let shot = shot_on_target(&sim, false);
        sim.projectiles.push(shot);
        update_projectiles(&mut sim, 0.0);

        let target = sim.player(2).unwrap();
        assert_eq!(target.hp, target.max_hp);
        assert_eq!(target.shield, 1);
        assert!(sim.pending_events.iter().any(|e| matches!(e.data, GameEventData::Blocked { .. })));
    }

    #[test]
    fn test_penetrating_survives_and_hits_once() {
        let mut sim = duel();
        let shot = shot_on_target(&sim, true);
        sim.projectiles.push(shot);
        update_projectiles(&mut sim, 0.0);
        assert_eq!(sim.projectiles.len(), 1);
        assert_eq!(sim.player(2).unwrap().hp, 70.0);

        // Still overlapping next tick, no second hit
        update_projectiles(&mut sim, 0.0);
        assert_eq!(sim.projectiles.len(), 1);
        assert_eq!(sim.player(2).unwrap().hp, 70.0);
    }

    #[test]
    fn test_penetrating_hits_every_target_in_path() {
        let mut sim = duel();
        let mut roster = BTreeMap::new();
        roster.insert(1, Archetype::Austin);
        roster.insert(2, Archetype::Brady);
        roster.insert(3, Archetype::Fridge);
        sim.apply_roster(&roster);
        let (x, y) = {
            let p2 = sim.player(2).unwrap();
            (p2.x, p2.y)
        };
        let p3 = sim.player_mut(3).unwrap();
        p3.x = x + 10.0;
        p3.y = y;

        let mut shot = shot_on_target(&sim, true);
        shot.kind = ProjectileKind::Shockwave;
        sim.projectiles.push(shot);
        update_projectiles(&mut sim, 0.0);

        let hp2 = sim.player(2).unwrap().hp;
        let hp3 = sim.player(3).unwrap().hp;
        assert!(hp2 < sim.player(2).unwrap().max_hp);
        assert!(hp3 < sim.player(3).unwrap().max_hp);
        assert_eq!(sim.projectiles.len(), 1);
        assert_eq!(sim.projectiles[0].struck, vec![2, 3]);
        assert_eq!(sim.player(1).unwrap().combo, 2);

        update_projectiles(&mut sim, 0.0);
        assert_eq!(sim.player(2).unwrap().hp, hp2);
        assert_eq!(sim.player(3).unwrap().hp, hp3);
    }

    #[test]
    fn test_z_window_misses() {
        let mut sim = duel();
        let mut shot = shot_on_target(&sim, false);
        shot.z = 80.0;
        sim.projectiles.push(shot);
        update_projectiles(&mut sim, 0.0);
        assert_eq!(sim.projectiles.len(), 1);
        assert_eq!(sim.player(2).unwrap().hp, 90.0);
    }

    #[test]
    fn test_no_self_hit() {
        let mut sim = duel();
        let mut shot = shot_on_target(&sim, false);
        shot.owner = Owner::Player(2);
        sim.projectiles.push(shot);
        update_projectiles(&mut sim, 0.0);
        assert_eq!(sim.projectiles.len(), 1);
        assert_eq!(sim.player(2).unwrap().hp, 90.0);
    }

    #[test]
    fn test_environment_hits_anyone() {
        let mut sim = duel();
        let mut shot = shot_on_target(&sim, false);
        shot.owner = Owner::Environment;
        shot.damage = 10.0;
        sim.projectiles.push(shot);
        update_projectiles(&mut sim, 0.0);
        assert!(sim.projectiles.is_empty());
        assert_eq!(sim.player(2).unwrap().hp, 80.0);
        assert_eq!(sim.player(1).unwrap().ult_charge, 0.0);
    }

    #[test]
    fn test_out_of_bounds_culled() {
        let mut sim = duel();
        let mut shot = shot_on_target(&sim, false);
        shot.x = 2990.0;
        shot.y = 100.0;
        sim.projectiles.push(shot);
        update_projectiles(&mut sim, 0.1);
        assert!(sim.projectiles.is_empty());
    }

    #[test]
    fn test_combo_decays_once() {
        let mut sim = duel();
        sim.player_mut(1).unwrap().add_combo();
        update_timers(&mut sim, 1.0);
        assert_eq!(sim.player(1).unwrap().combo, 1);
        update_timers(&mut sim, 1.1);
        assert_eq!(sim.player(1).unwrap().combo, 0);
        update_timers(&mut sim, 1.0);

        let lost = sim
            .pending_events
            .iter()
            .filter(|e| matches!(e.data, GameEventData::ComboLost { slot: 1 }))
            .count();
        assert_eq!(lost, 1);
    }

    #[test]
    fn test_shield_powerup_pickup() {
        let mut sim = duel();
        {
            let p = sim.player_mut(1).unwrap();
            p.x = 490.0;
            p.y = 490.0;
        }
        sim.powerups.push(Powerup::new(500.0, 500.0, PowerupKind::Shield));
        collect_powerups(&mut sim);
        assert_eq!(sim.player(1).unwrap().shield, 1);
        assert!(sim.powerups.is_empty());
    }

    #[test]
    fn test_airborne_player_skips_powerup() {
        let mut sim = duel();
        {
            let p = sim.player_mut(1).unwrap();
            p.x = 490.0;
            p.y = 490.0;
            p.z = 30.0;
        }
        sim.powerups.push(Powerup::new(500.0, 500.0, PowerupKind::Speed));
        collect_powerups(&mut sim);
        assert_eq!(sim.powerups.len(), 1);
        assert_eq!(sim.player(1).unwrap().speed_buff, 0.0);
    }

    #[test]
    fn test_round_over_conditions() {
        let mut sim = duel();
        let mut roster = BTreeMap::new();
        roster.insert(1, Archetype::Austin);
        roster.insert(2, Archetype::Brady);
        roster.insert(3, Archetype::Chef);
        sim.apply_roster(&roster);

        assert_eq!(check_round_over(&sim), None);
        sim.player_mut(3).unwrap().hp = 0.0;
        assert_eq!(check_round_over(&sim), Some(3));

        sim.config.win_condition = WinCondition::FirstTwoSlots;
        assert_eq!(check_round_over(&sim), None);
        sim.player_mut(2).unwrap().hp = -5.0;
        assert_eq!(check_round_over(&sim), Some(2));
    }
}
