//! Thrown projectiles: spawn, integration, impact classification

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{Hitbox, out_of_bounds, projectile_hitbox_collision};
use super::enemy::{EnemyEffect, EnemyFsm};
use super::gesture::ThrowGesture;
use super::wind::WindField;
use crate::consts::{DIRECTION_EPSILON, MIN_SPAWN_SPEED};
use crate::frame_scale;

/// Projectile physics and target placement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileSettings {
    /// Downward acceleration (px/frame²)
    pub gravity: f32,
    /// Where throws leave the thrower's hand
    pub throw_origin: Vec2,
    pub hitbox: Hitbox,
    /// Distance beyond the world edges before a projectile is dropped
    pub bounds_margin: f32,
    /// How long a stuck projectile stays visible (ms)
    pub linger_ms: f64,
}

impl Default for ProjectileSettings {
    fn default() -> Self {
        Self {
            gravity: 0.5,
            throw_origin: Vec2::new(430.0, 507.0),
            hitbox: Hitbox::default(),
            bounds_margin: 120.0,
            linger_ms: 600.0,
        }
    }
}

/// A single thrown projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub pos: Vec2,
    /// Velocity (px/frame)
    pub vel: Vec2,
    /// Facing angle from velocity (radians)
    pub angle: f32,
    pub active: bool,
    /// Hit the target and is lingering in place
    pub stuck: bool,
    pub impact_speed: f32,
    /// When it got stuck (ms)
    pub stick_at: f64,
}

/// Impact classification against the level threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactStrength {
    /// At or above the threshold; makes progress
    Strong,
    /// Below the threshold; feedback only
    Weak,
}

/// Emitted when a projectile reaches the hitbox
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactEvent {
    pub projectile_id: u32,
    pub pos: Vec2,
    pub impact_speed: f32,
    pub strength: ImpactStrength,
    /// `impact_speed / threshold`, for the power meter
    pub power: f32,
    /// Whether the enemy counted this hit
    pub registered: bool,
    /// Enemy side effects triggered by the hit
    pub enemy_effects: &'static [EnemyEffect],
}

/// Owns all projectiles in flight
#[derive(Debug, Clone)]
pub struct ProjectileSim {
    settings: ProjectileSettings,
    projectiles: Vec<Projectile>,
    impact_threshold: f32,
    next_id: u32,
}

impl ProjectileSim {
    pub fn new(settings: ProjectileSettings) -> Self {
        Self {
            settings,
            projectiles: Vec::new(),
            impact_threshold: 50.0,
            next_id: 1,
        }
    }

    pub fn settings(&self) -> &ProjectileSettings {
        &self.settings
    }

    pub fn impact_threshold(&self) -> f32 {
        self.impact_threshold
    }

    pub fn set_impact_threshold(&mut self, threshold: f32) {
        self.impact_threshold = threshold.max(0.0);
    }

    /// Active projectiles (spawn order)
    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter().filter(|p| p.active)
    }

    pub fn active_count(&self) -> usize {
        self.projectiles().count()
    }

    /// Spawn a projectile from `origin` toward `aim` at `throw_speed`.
    ///
    /// Falls back to `fallback_dir`, then to +X, when the aim is degenerate, so
    /// the velocity is never zero.
    pub fn spawn(&mut self, origin: Vec2, aim: Vec2, throw_speed: f32, fallback_dir: Vec2) -> u32 {
        let dir = [aim - origin, fallback_dir]
            .into_iter()
            .find(|d| d.is_finite() && d.length() >= DIRECTION_EPSILON)
            .map(Vec2::normalize)
            .unwrap_or(Vec2::X);

        let speed = if throw_speed.is_finite() {
            throw_speed.abs().max(MIN_SPAWN_SPEED)
        } else {
            MIN_SPAWN_SPEED
        };
        let vel = dir * speed;

        let id = self.next_id;
        self.next_id += 1;
        self.projectiles.push(Projectile {
            id,
            pos: origin,
            vel,
            angle: vel.y.atan2(vel.x),
            active: true,
            stuck: false,
            impact_speed: 0.0,
            stick_at: 0.0,
        });
        id
    }

    /// Spawn from the configured hand position. Without an aim point the
    /// throw heads for the hitbox center.
    pub fn throw(&mut self, aim: Option<Vec2>, gesture: &ThrowGesture) -> u32 {
        let origin = self.settings.throw_origin;
        let aim = aim.unwrap_or(self.settings.hitbox.center);
        self.spawn(origin, aim, gesture.throw_speed, gesture.direction)
    }

    /// Integrate all projectiles and resolve impacts against the enemy.
    pub fn advance(
        &mut self,
        dt: f32,
        now: f64,
        wind: &WindField,
        enemy: &mut EnemyFsm,
    ) -> Vec<ImpactEvent> {
        self.projectiles.retain(|p| p.active);

        let fs = frame_scale(dt);
        let mut impacts = Vec::new();

        for i in 0..self.projectiles.len() {
            if !self.projectiles[i].active {
                continue;
            }

            let p = &mut self.projectiles[i];
            if p.stuck {
                if now - p.stick_at > self.settings.linger_ms {
                    p.active = false;
                }
                continue;
            }

            p.vel.y += self.settings.gravity * fs;
            p.vel.x += wind.applied_force_at(p.pos.y) * fs;
            p.pos += p.vel * fs;
            p.angle = p.vel.y.atan2(p.vel.x);

            if projectile_hitbox_collision(p.pos, &self.settings.hitbox).hit {
                let impact_speed = p.vel.length();
                let strength = if impact_speed >= self.impact_threshold {
                    ImpactStrength::Strong
                } else {
                    ImpactStrength::Weak
                };
                p.impact_speed = impact_speed;
                p.stuck = true;
                p.vel = Vec2::ZERO;
                p.stick_at = now;

                let mut event = ImpactEvent {
                    projectile_id: p.id,
                    pos: p.pos,
                    impact_speed,
                    strength,
                    power: if self.impact_threshold > 0.0 {
                        impact_speed / self.impact_threshold
                    } else {
                        1.0
                    },
                    registered: false,
                    enemy_effects: &[],
                };

                if strength == ImpactStrength::Strong {
                    if let Some(effects) = enemy.register_hit() {
                        event.registered = true;
                        event.enemy_effects = effects;
                        // Nothing else in the air may land during the step animation
                        for (j, other) in self.projectiles.iter_mut().enumerate() {
                            if j != i {
                                other.active = false;
                            }
                        }
                    }
                }

                log::debug!(
                    "Impact #{} speed {:.1} ({:?}, registered: {})",
                    event.projectile_id,
                    impact_speed,
                    strength,
                    event.registered
                );
                impacts.push(event);
                continue;
            }

            if out_of_bounds(p.pos, self.settings.bounds_margin) {
                p.active = false;
            }
        }

        self.projectiles.retain(|p| p.active);
        impacts
    }

    /// Force-deactivate everything in flight or lingering
    pub fn deactivate_all(&mut self) {
        for p in &mut self.projectiles {
            p.active = false;
        }
    }

    /// Drop all projectiles immediately
    pub fn clear(&mut self) {
        self.projectiles.clear();
    }
}
