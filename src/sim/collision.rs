//! Collision tests for projectiles
//!
//! The target is a circle whose collision radius is a shrunk copy of the
//! visual radius, so the art can be drawn larger than what actually counts.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{BASE_H, BASE_W};

/// Circular target region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub center: Vec2,
    /// Radius the target is drawn with
    pub visual_radius: f32,
    /// Multiplier applied to the visual radius for collisions (clamped to 0..=1)
    pub shrink: f32,
}

impl Default for Hitbox {
    fn default() -> Self {
        Self {
            center: Vec2::new(1466.0, 600.0),
            visual_radius: 75.0,
            shrink: 1.0,
        }
    }
}

impl Hitbox {
    /// Radius used for hit tests
    #[inline]
    pub fn collision_radius(&self) -> f32 {
        self.visual_radius.max(0.0) * self.shrink.clamp(0.0, 1.0)
    }
}

/// Result of a projectile/target check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    pub hit: bool,
    /// Distance from the projectile to the hitbox center
    pub distance: f32,
}

impl CollisionResult {
    pub fn miss(distance: f32) -> Self {
        Self {
            hit: false,
            distance,
        }
    }
}

/// Point-vs-circle test, inclusive of the boundary
pub fn projectile_hitbox_collision(pos: Vec2, hitbox: &Hitbox) -> CollisionResult {
    let distance = pos.distance(hitbox.center);
    if distance <= hitbox.collision_radius() {
        CollisionResult {
            hit: true,
            distance,
        }
    } else {
        CollisionResult::miss(distance)
    }
}

/// Whether a point has left the world by more than `margin` on any side
pub fn out_of_bounds(pos: Vec2, margin: f32) -> bool {
    pos.x < -margin || pos.x > BASE_W + margin || pos.y < -margin || pos.y > BASE_H + margin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_on_boundary() {
        let hb = Hitbox {
            center: Vec2::new(100.0, 100.0),
            visual_radius: 50.0,
            shrink: 0.5,
        };
        assert!(projectile_hitbox_collision(Vec2::new(125.0, 100.0), &hb).hit);
        assert!(!projectile_hitbox_collision(Vec2::new(126.0, 100.0), &hb).hit);
    }

    #[test]
    fn test_shrink_never_grows_radius() {
        let hb = Hitbox {
            center: Vec2::ZERO,
            visual_radius: 50.0,
            shrink: 1.5,
        };
        assert_eq!(hb.collision_radius(), 50.0);
    }

    #[test]
    fn test_out_of_bounds_margin() {
        assert!(!out_of_bounds(Vec2::new(-100.0, 500.0), 120.0));
        assert!(out_of_bounds(Vec2::new(-121.0, 500.0), 120.0));
        assert!(out_of_bounds(Vec2::new(500.0, BASE_H + 121.0), 120.0));
        assert!(!out_of_bounds(Vec2::new(BASE_W + 120.0, 0.0), 120.0));
    }
}
