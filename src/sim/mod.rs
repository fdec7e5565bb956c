//! Simulation module
//!
//! All gameplay logic lives here. Nothing in this module renders or plays
//! sound:
//! - Time comes in as explicit `now` (ms) and `dt` (s) arguments
//! - Randomness is seeded
//! - Audio is requested through returned commands

pub mod collision;
pub mod enemy;
pub mod gesture;
pub mod level;
pub mod projectile;
pub mod state;
pub mod tick;
pub mod wind;

pub use collision::{CollisionResult, Hitbox, projectile_hitbox_collision};
pub use enemy::{EnemyEffect, EnemyEvent, EnemyFsm, EnemyPhase, EnemySettings, EnemyState};
pub use gesture::{GestureSample, GestureSettings, GestureTracker, ThrowGesture};
pub use level::{ImpactThreshold, LevelConfig, default_levels};
pub use projectile::{ImpactEvent, ImpactStrength, Projectile, ProjectileSettings, ProjectileSim};
pub use state::{GamePhase, GameSession, LevelEndReason, Snapshot};
pub use tick::{GameFlow, TickInput};
pub use wind::{WindField, WindProfile, WindSettings};
