//! Session state and the read-only render snapshot

use serde::{Deserialize, Serialize};

use super::enemy::EnemyState;
use super::projectile::Projectile;

/// Top-level phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen
    #[default]
    Menu,
    /// Pre-game form handled outside the core; waits for a proceed signal
    Gate,
    /// A level is running
    Play,
    /// Level over, waiting for next/retry
    LevelEnd,
}

/// Why a level ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelEndReason {
    /// Timer ran out with the enemy still standing
    TimesUp,
    /// Enemy reached `Down`
    Complete,
}

/// Mutable session data, owned by the game flow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameSession {
    pub phase: GamePhase,
    pub level_index: usize,
    /// Strong hits registered on the current enemy
    pub hits: u32,
    /// When the current level started, shifted forward by paused time (ms)
    pub level_start_at: f64,
    pub last_completed: Option<usize>,
    pub end_reason: Option<LevelEndReason>,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub level_index: usize,
    pub level_count: usize,
    pub hits: u32,
    pub required_hits: u32,
    /// Level time left (ms); frozen while paused or after the level ends
    pub remaining_ms: f64,
    pub projectiles: Vec<Projectile>,
    pub enemy: EnemyState,
    /// Smoothed gust intensity for overlays
    pub wind_visual: f32,
    /// Wind value at mid-screen height
    pub wind_value: f32,
    pub gust_active: bool,
    pub tutorial: bool,
    pub paused: bool,
    pub end_reason: Option<LevelEndReason>,
    pub last_completed: Option<usize>,
    /// Power-bar fill of the most recent impact
    pub last_impact_power: Option<f32>,
}
