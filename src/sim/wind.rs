//! Procedural wind with gust scheduling
//!
//! The force is a fractal Perlin sum over (noise time, world height). Whether
//! it actually pushes anything is decided by a separate on/off gust scheduler,
//! which keeps the wind bursty instead of constant.

use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::frame_scale;

/// Deadline used while the gust flag is under manual control (ms)
pub const MANUAL_GUST_HOLD_MS: f64 = 999_999.0;

/// Wind tuning shared by all levels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindSettings {
    /// Master switch for the physical wind
    pub enabled: bool,
    /// Noise time advanced per 60 Hz frame
    pub time_scale: f64,
    /// Noise coordinate per world pixel of height
    pub height_scale: f64,
    /// Number of fractal octaves
    pub octaves: u32,
    /// Run the on/off gust scheduler (otherwise wind is steady)
    pub gusts: bool,
    /// Gust-on duration range (ms)
    pub gust_on_ms: [f64; 2],
    /// Gust-off duration range (ms)
    pub gust_off_ms: [f64; 2],
    /// Rate the visual intensity chases the gust flag (1/s)
    pub visual_fade_rate: f32,
}

impl Default for WindSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            time_scale: 0.005,
            height_scale: 0.002,
            octaves: 4,
            gusts: true,
            gust_on_ms: [1400.0, 3000.0],
            gust_off_ms: [1500.0, 2000.0],
            visual_fade_rate: 20.0,
        }
    }
}

/// Per-level wind strength
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindProfile {
    pub power: f32,
    pub bias: f32,
    pub gain: f32,
}

impl Default for WindProfile {
    fn default() -> Self {
        Self {
            power: 2.5,
            bias: -0.8,
            gain: 1.0,
        }
    }
}

/// Wind force generator and gust scheduler
#[derive(Debug, Clone)]
pub struct WindField {
    settings: WindSettings,
    profile: WindProfile,
    noise: Perlin,
    rng: Pcg32,
    noise_t: f64,
    gust_active: bool,
    next_toggle_at: f64,
    on_range: [f64; 2],
    off_range: [f64; 2],
    visual: f32,
}

impl WindField {
    pub fn new(settings: WindSettings, seed: u64) -> Self {
        let on_range = settings.gust_on_ms;
        let off_range = settings.gust_off_ms;
        Self {
            gust_active: !settings.gusts,
            settings,
            profile: WindProfile::default(),
            noise: Perlin::new(seed as u32),
            rng: Pcg32::seed_from_u64(seed),
            noise_t: 0.0,
            next_toggle_at: 0.0,
            on_range,
            off_range,
            visual: 0.0,
        }
    }

    /// Load a level's wind strength and reset the gust ranges to the configured ones
    pub fn apply_level(&mut self, profile: WindProfile) {
        self.profile = profile;
        self.on_range = self.settings.gust_on_ms;
        self.off_range = self.settings.gust_off_ms;
    }

    pub fn profile(&self) -> WindProfile {
        self.profile
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Whether a gust window is open
    pub fn gust_active(&self) -> bool {
        self.gust_active
    }

    /// Timestamp of the next scheduled gust toggle (ms)
    pub fn next_toggle_at(&self) -> f64 {
        self.next_toggle_at
    }

    /// Smoothed 0..1 intensity for overlays; no effect on physics
    pub fn visual_intensity(&self) -> f32 {
        self.visual
    }

    pub fn noise_time(&self) -> f64 {
        self.noise_t
    }

    /// Fractal noise in `[0, 1]` at the given noise coordinates
    fn fbm(&self, x: f64, y: f64) -> f64 {
        let octaves = self.settings.octaves.max(1);
        let mut value = 0.0;
        let mut total = 0.0;
        let mut amp = 0.5;
        let mut freq = 1.0;
        for _ in 0..octaves {
            // Perlin is roughly [-1, 1]; shift into [0, 1]
            let n = (self.noise.get([x * freq, y * freq]) + 1.0) * 0.5;
            value += amp * n.clamp(0.0, 1.0);
            total += amp;
            amp *= 0.5;
            freq *= 2.0;
        }
        value / total
    }

    /// Raw noise in `[-1, 1]` at a world height for the current noise time
    pub fn raw_at(&self, world_y: f32) -> f32 {
        let n = self.fbm(self.noise_t, world_y as f64 * self.settings.height_scale);
        (n * 2.0 - 1.0) as f32
    }

    /// Wind value at a world height, ignoring the gust flag
    pub fn force_at(&self, world_y: f32) -> f32 {
        (self.raw_at(world_y) + self.profile.bias) * self.profile.power * self.profile.gain
    }

    /// Force actually applied to a body: zero unless enabled and a gust is open
    pub fn applied_force_at(&self, world_y: f32) -> f32 {
        if self.settings.enabled && self.gust_active {
            self.force_at(world_y)
        } else {
            0.0
        }
    }

    /// Run the gust scheduler and smooth the visual intensity.
    ///
    /// Returns the new flag value when a toggle happened this tick.
    pub fn update_gusts(&mut self, now: f64, dt: f32) -> Option<bool> {
        let mut toggled = None;
        if self.settings.gusts && now >= self.next_toggle_at {
            self.gust_active = !self.gust_active;
            let range = if self.gust_active {
                self.on_range
            } else {
                self.off_range
            };
            self.next_toggle_at = now + self.draw_duration(range);
            log::debug!(
                "Gust {} until {:.0}ms",
                if self.gust_active { "on" } else { "off" },
                self.next_toggle_at
            );
            toggled = Some(self.gust_active);
        }

        let target = if self.settings.enabled && self.gust_active {
            1.0
        } else {
            0.0
        };
        let k = (self.settings.visual_fade_rate * dt).clamp(0.0, 1.0);
        self.visual += (target - self.visual) * k;

        toggled
    }

    /// Advance noise time by one frame delta
    pub fn advance_noise(&mut self, dt: f32) {
        self.noise_t += self.settings.time_scale * frame_scale(dt) as f64;
    }

    /// Flip the gust flag by hand and suspend the scheduler
    pub fn toggle_manual(&mut self, now: f64) -> bool {
        self.gust_active = !self.gust_active;
        self.next_toggle_at = now + MANUAL_GUST_HOLD_MS;
        self.gust_active
    }

    /// Hand the flag back to the scheduler, keeping its current value for a fresh duration
    pub fn resume_schedule(&mut self, now: f64) {
        let range = if self.gust_active {
            self.on_range
        } else {
            self.off_range
        };
        self.next_toggle_at = now + self.draw_duration(range);
    }

    fn draw_duration(&mut self, range: [f64; 2]) -> f64 {
        let lo = range[0].min(range[1]);
        let hi = range[0].max(range[1]);
        if hi <= lo {
            lo
        } else {
            self.rng.random_range(lo..=hi)
        }
    }
}
