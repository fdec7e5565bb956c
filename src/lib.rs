//! Bill Ball - a swipe-to-throw arcade mini-game core
//!
//! Core modules:
//! - `sim`: Simulation (gesture, wind, projectiles, enemy FSM, game flow)
//! - `audio`: Layered audio mixer driven by simulation events
//! - `settings`: Data-driven tuning, loadable from JSON
//! - `platform`: Clock abstraction
//! - `game`: Composed context that pumps one frame at a time

pub mod audio;
pub mod game;
pub mod platform;
pub mod settings;
pub mod sim;

pub use audio::{AudioCommand, AudioMixer, Clip, ClipHandle};
pub use game::Game;
pub use settings::{Settings, SettingsError};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed design resolution all world coordinates live in
    pub const BASE_W: f32 = 1920.0;
    pub const BASE_H: f32 = 1080.0;

    /// Largest frame delta the simulation will integrate (seconds)
    pub const MAX_DT: f32 = 1.0 / 30.0;

    /// Physics constants are tuned per 60 Hz frame
    pub const REFERENCE_FPS: f32 = 60.0;

    /// Floor for any spawned projectile speed (px/frame)
    pub const MIN_SPAWN_SPEED: f32 = 0.1;

    /// Aim/gesture vectors shorter than this are treated as degenerate
    pub const DIRECTION_EPSILON: f32 = 1e-3;
}

/// Scale factor converting a delta in seconds to 60 Hz frames
#[inline]
pub fn frame_scale(dt: f32) -> f32 {
    dt * consts::REFERENCE_FPS
}

/// Linearly remap `v` from `[a0, a1]` to `[b0, b1]`, clamping to the output range.
///
/// A degenerate input range maps everything to `b0`.
pub fn map_range(v: f32, a0: f32, a1: f32, b0: f32, b1: f32) -> f32 {
    let denom = a1 - a0;
    let t = if denom == 0.0 { 0.0 } else { (v - a0) / denom };
    b0 + (b1 - b0) * t.clamp(0.0, 1.0)
}

/// Letterboxed viewport: uniform scale of the design resolution into a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset: Vec2,
    pub scale: f32,
}

impl Viewport {
    /// Fit the design resolution into a window, centred
    pub fn fit(window: Vec2) -> Self {
        let scale = (window.x / consts::BASE_W).min(window.y / consts::BASE_H);
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let size = Vec2::new(consts::BASE_W, consts::BASE_H) * scale;
        Self {
            offset: (window - size) / 2.0,
            scale,
        }
    }

    /// Identity mapping (window matches the design resolution)
    pub fn identity() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
        }
    }

    /// Convert a screen-space point to world (design) space
    #[inline]
    pub fn screen_to_world(&self, point: Vec2) -> Vec2 {
        (point - self.offset) / self.scale
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}
