//! Per-level configuration

use serde::{Deserialize, Serialize};

use super::wind::WindProfile;

/// Shortest allowed level (seconds)
pub const MIN_LEVEL_SECS: f32 = 5.0;

/// How the strong/weak impact threshold is chosen for a level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImpactThreshold {
    /// Absolute impact speed (px/frame)
    Fixed(f32),
    /// Fraction of the fastest possible throw, rounded to a whole speed
    FractionOfMax(f32),
}

impl ImpactThreshold {
    /// Resolve to an absolute speed given the maximum throw speed
    pub fn resolve(&self, throw_max: f32) -> f32 {
        match *self {
            ImpactThreshold::Fixed(v) => v.max(0.0),
            ImpactThreshold::FractionOfMax(pct) => (throw_max * pct).round().max(0.0),
        }
    }
}

/// Immutable parameters of one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    pub duration_sec: f32,
    /// Strong hits needed to defeat the enemy
    pub required_hits: u32,
    pub wind: WindProfile,
    /// Total distance the enemy sinks when defeated (px)
    pub enemy_drop: f32,
    pub impact: ImpactThreshold,
}

impl LevelConfig {
    /// Level length in milliseconds, floored at [`MIN_LEVEL_SECS`]
    pub fn duration_ms(&self) -> f64 {
        self.duration_sec.max(MIN_LEVEL_SECS) as f64 * 1000.0
    }

    /// Required hits, floored at 1
    pub fn required_hits(&self) -> u32 {
        self.required_hits.max(1)
    }
}

/// The stock three-level ladder: shorter timers, stronger headwind
pub fn default_levels() -> Vec<LevelConfig> {
    let level = |n: u32, secs: f32, power: f32, bias: f32, gain: f32, pct: f32| LevelConfig {
        name: format!("Level {n}"),
        duration_sec: secs,
        required_hits: 3,
        wind: WindProfile { power, bias, gain },
        enemy_drop: 180.0,
        impact: ImpactThreshold::FractionOfMax(pct),
    };
    vec![
        level(1, 60.0, 1.7, -0.9, 1.0, 0.90),
        level(2, 30.0, 1.9, -1.5, 1.1, 1.0),
        level(3, 10.0, 2.5, -1.9, 1.2, 1.005),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_resolution() {
        assert_eq!(ImpactThreshold::Fixed(42.0).resolve(71.0), 42.0);
        assert_eq!(ImpactThreshold::FractionOfMax(0.9).resolve(71.0), 64.0);
        assert_eq!(ImpactThreshold::FractionOfMax(1.005).resolve(71.0), 71.0);
    }

    #[test]
    fn test_floors() {
        let mut l = default_levels().remove(2);
        l.duration_sec = 1.0;
        l.required_hits = 0;
        assert_eq!(l.duration_ms(), 5000.0);
        assert_eq!(l.required_hits(), 1);
    }

    #[test]
    fn test_threshold_json_shape() {
        let json = serde_json::to_string(&ImpactThreshold::FractionOfMax(0.5)).unwrap();
        assert_eq!(json, r#"{"kind":"fraction_of_max","value":0.5}"#);
        let back: ImpactThreshold = serde_json::from_str(r#"{"kind":"fixed","value":12.0}"#).unwrap();
        assert_eq!(back, ImpactThreshold::Fixed(12.0));
    }

    #[test]
    fn test_default_ladder() {
        let levels = default_levels();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0].duration_ms(), 60_000.0);
        assert_eq!(levels[2].duration_ms(), 10_000.0);
        assert!(levels.windows(2).all(|w| w[1].wind.power > w[0].wind.power));
    }
}
