//! Camera Framing
//!
//! Keeps every active player in view. Zoom and center ease toward their
//! targets by a fixed fraction per tick, then the center is clamped so the
//! view never shows past the arena edge.

use crate::game::config::SimConfig;
use crate::game::state::{Camera, Player};

/// Shake retained each tick
pub const SHAKE_DECAY: f32 = 0.9;
/// Shake below this snaps to zero
pub const SHAKE_FLOOR: f32 = 0.5;

/// Decay screen shake by one tick.
pub fn decay_shake(camera: &mut Camera) {
    if camera.shake > 0.0 {
        camera.shake *= SHAKE_DECAY;
    }
    if camera.shake < SHAKE_FLOOR {
        camera.shake = 0.0;
    }
}

/// Target center and zoom framing the given players.
///
/// Returns `None` when nobody is active.
pub fn framing_target<'a>(
    players: impl IntoIterator<Item = &'a Player>,
    config: &SimConfig,
) -> Option<(f32, f32, f32)> {
    let mut bounds: Option<(f32, f32, f32, f32)> = None;
    let mut centers: Option<(f32, f32, f32, f32)> = None;

    for p in players.into_iter().filter(|p| p.active) {
        let (cx, cy) = p.center();
        bounds = Some(match bounds {
            None => (p.x, p.y, p.x, p.y),
            Some((x0, y0, x1, y1)) => (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        });
        centers = Some(match centers {
            None => (cx, cy, cx, cy),
            Some((x0, y0, x1, y1)) => (x0.min(cx), y0.min(cy), x1.max(cx), y1.max(cy)),
        });
    }

    let (bx0, by0, bx1, by1) = bounds?;
    let (cx0, cy0, cx1, cy1) = centers?;

    let span_x = (bx1 - bx0) + config.camera_padding;
    let span_y = (by1 - by0) + config.camera_padding;
    let zoom = (config.viewport_width / span_x)
        .min(config.viewport_height / span_y)
        .clamp(config.min_zoom, config.max_zoom);

    Some(((cx0 + cx1) / 2.0, (cy0 + cy1) / 2.0, zoom))
}

/// Ease the camera toward the players and clamp it to the arena.
pub fn update_camera<'a>(
    camera: &mut Camera,
    players: impl IntoIterator<Item = &'a Player>,
    config: &SimConfig,
) {
    if let Some((tx, ty, tz)) = framing_target(players, config) {
        camera.zoom += (tz - camera.zoom) * config.zoom_smoothing;
        camera.x += (tx - camera.x) * config.camera_smoothing;
        camera.y += (ty - camera.y) * config.camera_smoothing;
    }
    clamp_to_arena(camera, config);
}

/// Keep the visible area inside the arena; center it when it is wider.
pub fn clamp_to_arena(camera: &mut Camera, config: &SimConfig) {
    camera.zoom = camera.zoom.clamp(config.min_zoom, config.max_zoom);
    let view_w = config.viewport_width / camera.zoom;
    let view_h = config.viewport_height / camera.zoom;

    camera.x = clamp_axis(camera.x, view_w, config.arena_width);
    camera.y = clamp_axis(camera.y, view_h, config.arena_height);
}

fn clamp_axis(center: f32, view: f32, extent: f32) -> f32 {
    if view >= extent {
        extent / 2.0
    } else {
        center.clamp(view / 2.0, extent - view / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::Archetype;

    fn player(slot: u8, x: f32, y: f32) -> Player {
        let config = SimConfig::default();
        let mut p = Player::new(slot, Archetype::Austin, &config);
        p.x = x;
        p.y = y;
        p.active = true;
        p
    }

    #[test]
    fn test_framing_two_players() {
        let config = SimConfig::default();
        let players = [player(1, 1000.0, 1000.0), player(2, 1400.0, 1000.0)];
        let (x, y, zoom) = framing_target(players.iter(), &config).unwrap();
        assert_eq!(x, 1225.0);
        assert_eq!(y, 1035.0);
        // min(1280 / 800, 720 / 400) = 1.6, clamped to 1.5
        assert_eq!(zoom, 1.5);
    }

    #[test]
    fn test_framing_ignores_inactive() {
        let config = SimConfig::default();
        let mut far = player(2, 2900.0, 1900.0);
        far.active = false;
        let players = [player(1, 1000.0, 1000.0), far];
        let (x, _, _) = framing_target(players.iter(), &config).unwrap();
        assert_eq!(x, 1025.0);

        let none: [Player; 0] = [];
        assert!(framing_target(none.iter(), &config).is_none());
    }

    #[test]
    fn test_zoom_out_clamped() {
        let config = SimConfig::default();
        let players = [player(1, 0.0, 0.0), player(2, 2950.0, 1930.0)];
        let (_, _, zoom) = framing_target(players.iter(), &config).unwrap();
        assert_eq!(zoom, config.min_zoom);
    }

    #[test]
    fn test_smoothing_is_partial() {
        let config = SimConfig::default();
        let mut camera = Camera::new(&config);
        let players = [player(1, 1000.0, 1000.0), player(2, 1400.0, 1000.0)];
        update_camera(&mut camera, players.iter(), &config);
        // 1500 + (1225 - 1500) * 0.1
        assert!((camera.x - 1472.5).abs() < 1e-3);
        assert!((camera.zoom - 1.025).abs() < 1e-4);
    }

    #[test]
    fn test_clamped_inside_arena() {
        let config = SimConfig::default();
        let mut camera = Camera::new(&config);
        camera.x = 0.0;
        camera.y = 0.0;
        camera.zoom = 1.0;
        clamp_to_arena(&mut camera, &config);
        assert_eq!(camera.x, 640.0);
        assert_eq!(camera.y, 360.0);

        camera.zoom = 0.35;
        clamp_to_arena(&mut camera, &config);
        // 1280 / 0.35 is wider than the arena
        assert_eq!(camera.x, 1500.0);
    }

    #[test]
    fn test_shake_decay() {
        let config = SimConfig::default();
        let mut camera = Camera::new(&config);
        camera.shake = 10.0;
        decay_shake(&mut camera);
        assert!((camera.shake - 9.0).abs() < 1e-5);
        camera.shake = 0.52;
        decay_shake(&mut camera);
        assert_eq!(camera.shake, 0.0);
    }
}
