//! Hold-and-swipe gesture tracking
//!
//! While the pointer is held, samples are kept for a short trailing window.
//! On release the speed across that window becomes the throw speed.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{Viewport, map_range};

/// Lower bound on the trailing sample window
pub const MIN_WINDOW_MS: f64 = 60.0;

/// Minimum elapsed time used when computing gesture speed
const MIN_ELAPSED_MS: f64 = 1.0;

/// A pointer sample in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureSample {
    /// Timestamp (ms)
    pub t: f64,
    pub pos: Vec2,
}

/// Gesture and throw tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    /// Trailing window the speed is measured over (ms)
    pub window_ms: f64,
    /// Gesture speed (px/s) that maps to the minimum throw
    pub speed_min: f32,
    /// Gesture speed (px/s) that maps to the maximum throw
    pub speed_max: f32,
    /// Slowest throw (px/frame)
    pub throw_min: f32,
    /// Fastest throw (px/frame)
    pub throw_max: f32,
    /// Releases closer than this to the previous throw are ignored (ms)
    pub cooldown_ms: f64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            window_ms: 140.0,
            speed_min: 800.0,
            speed_max: 9000.0,
            throw_min: 8.0,
            throw_max: 71.0,
            cooldown_ms: 160.0,
        }
    }
}

impl GestureSettings {
    /// Map a gesture speed (px/s) to a throw speed (px/frame), clamped to the throw range
    pub fn throw_speed(&self, gesture_speed: f32) -> f32 {
        let speed = map_range(
            gesture_speed,
            self.speed_min,
            self.speed_max,
            self.throw_min,
            self.throw_max,
        );
        speed.clamp(self.throw_min.min(self.throw_max), self.throw_max.max(self.throw_min))
    }
}

/// Result of a completed gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowGesture {
    /// Raw gesture speed (px/s)
    pub gesture_speed: f32,
    /// Mapped throw speed (px/frame)
    pub throw_speed: f32,
    /// First-to-last displacement of the window (may be zero)
    pub direction: Vec2,
}

/// Records pointer samples during a hold
#[derive(Debug, Clone)]
pub struct GestureTracker {
    settings: GestureSettings,
    samples: VecDeque<GestureSample>,
    holding: bool,
}

impl GestureTracker {
    pub fn new(settings: GestureSettings) -> Self {
        Self {
            settings,
            samples: VecDeque::with_capacity(32),
            holding: false,
        }
    }

    pub fn settings(&self) -> &GestureSettings {
        &self.settings
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    /// Samples currently in the window (oldest first)
    pub fn samples(&self) -> impl Iterator<Item = &GestureSample> {
        self.samples.iter()
    }

    /// Begin a hold: clears the buffer and records the press point
    pub fn on_hold_start(&mut self, now: f64, screen: Vec2, viewport: &Viewport) {
        self.samples.clear();
        self.holding = true;
        self.push(now, viewport.screen_to_world(screen));
    }

    /// Record a pointer sample while holding
    pub fn on_sample(&mut self, now: f64, screen: Vec2, viewport: &Viewport) {
        if !self.holding {
            return;
        }
        self.push(now, viewport.screen_to_world(screen));
    }

    /// End the hold and derive the throw. Returns `None` if no hold was active.
    pub fn on_hold_end(&mut self) -> Option<ThrowGesture> {
        if !self.holding {
            return None;
        }
        self.holding = false;

        let gesture_speed = self.gesture_speed();
        Some(ThrowGesture {
            gesture_speed,
            throw_speed: self.settings.throw_speed(gesture_speed),
            direction: self.direction(),
        })
    }

    /// Drop the current hold without throwing
    pub fn abort(&mut self) {
        self.holding = false;
        self.samples.clear();
    }

    /// Speed between the first and last sample of the window (px/s)
    pub fn gesture_speed(&self) -> f32 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }
        let elapsed_secs = (last.t - first.t).max(MIN_ELAPSED_MS) / 1000.0;
        (last.pos.distance(first.pos) as f64 / elapsed_secs) as f32
    }

    /// Displacement from the first to the last sample
    pub fn direction(&self) -> Vec2 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => last.pos - first.pos,
            _ => Vec2::ZERO,
        }
    }

    fn push(&mut self, now: f64, pos: Vec2) {
        self.samples.push_back(GestureSample { t: now, pos });
        let cutoff = now - self.settings.window_ms.max(MIN_WINDOW_MS);
        while self.samples.len() > 1 && self.samples.front().is_some_and(|s| s.t < cutoff) {
            self.samples.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tracker() -> GestureTracker {
        GestureTracker::new(GestureSettings::default())
    }

    #[test]
    fn test_single_sample_is_minimum_throw() {
        let mut g = tracker();
        g.on_hold_start(0.0, Vec2::new(100.0, 100.0), &Viewport::identity());
        let throw = g.on_hold_end().unwrap();
        assert_eq!(throw.gesture_speed, 0.0);
        assert_eq!(throw.throw_speed, 8.0);
        assert_eq!(throw.direction, Vec2::ZERO);
    }

    #[test]
    fn test_release_without_hold() {
        let mut g = tracker();
        assert!(!g.is_holding());
        assert!(g.on_hold_end().is_none());
    }

    #[test]
    fn test_hold_lifecycle() {
        let mut g = tracker();
        let vp = Viewport::identity();
        g.on_hold_start(0.0, Vec2::ZERO, &vp);
        assert!(g.is_holding());
        g.on_hold_end();
        assert!(!g.is_holding());

        g.on_hold_start(10.0, Vec2::ZERO, &vp);
        g.abort();
        assert!(!g.is_holding());
        assert_eq!(g.samples().count(), 0);
    }

    #[test]
    fn test_window_evicts_old_samples() {
        let mut g = tracker();
        let vp = Viewport::identity();
        g.on_hold_start(0.0, Vec2::ZERO, &vp);
        for i in 1..=20 {
            g.on_sample(i as f64 * 16.0, Vec2::new(i as f32 * 10.0, 0.0), &vp);
        }
        let first = g.samples().next().unwrap().t;
        assert!(320.0 - first <= 140.0);
        // 16ms steps at 10px each = 625 px/s regardless of the window
        assert!((g.gesture_speed() - 625.0).abs() < 1.0);
    }

    #[test]
    fn test_fast_swipe_is_max_throw() {
        let mut g = tracker();
        let vp = Viewport::identity();
        g.on_hold_start(0.0, Vec2::ZERO, &vp);
        g.on_sample(50.0, Vec2::new(1000.0, 0.0), &vp);
        let throw = g.on_hold_end().unwrap();
        assert!((throw.gesture_speed - 20_000.0).abs() < 1.0);
        assert_eq!(throw.throw_speed, 71.0);
        assert_eq!(throw.direction, Vec2::new(1000.0, 0.0));
    }

    #[test]
    fn test_same_timestamp_uses_min_elapsed() {
        let mut g = tracker();
        let vp = Viewport::identity();
        g.on_hold_start(10.0, Vec2::ZERO, &vp);
        g.on_sample(10.0, Vec2::new(3.0, 4.0), &vp);
        // 5 px over the 1 ms floor
        assert!((g.gesture_speed() - 5000.0).abs() < 1e-3);
    }

    #[test]
    fn test_samples_mapped_through_viewport() {
        let mut g = tracker();
        let vp = Viewport::fit(Vec2::new(960.0, 540.0));
        g.on_hold_start(0.0, Vec2::new(10.0, 10.0), &vp);
        assert_eq!(g.samples().next().unwrap().pos, Vec2::new(20.0, 20.0));
    }

    #[test]
    fn test_samples_ignored_when_not_holding() {
        let mut g = tracker();
        g.on_sample(0.0, Vec2::ZERO, &Viewport::identity());
        assert_eq!(g.samples().count(), 0);
    }

    proptest! {
        #[test]
        fn prop_throw_speed_clamped_and_monotonic(a in 0.0f32..20_000.0, b in 0.0f32..20_000.0) {
            let s = GestureSettings::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let t_lo = s.throw_speed(lo);
            let t_hi = s.throw_speed(hi);
            prop_assert!(t_lo <= t_hi);
            prop_assert!(t_lo >= s.throw_min && t_hi <= s.throw_max);
            if hi <= s.speed_min {
                prop_assert_eq!(t_hi, s.throw_min);
            }
            if lo >= s.speed_max {
                prop_assert_eq!(t_lo, s.throw_max);
            }
        }
    }
}
