//! Multi-hit enemy state machine
//!
//! ```text
//! Idle --hit--> StepDown --reached--> Rise --reached--> Idle
//! Idle --final hit--> FinalDown --reached--> Down
//! ```
//!
//! Hits only count in `Idle`. Every other phase is hit-blind so a burst of
//! throws cannot skip the step animation.

use serde::{Deserialize, Serialize};

/// Enemy animation speeds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySettings {
    /// Descend speed (px/s)
    pub down_speed: f32,
    /// Ascend speed (px/s)
    pub up_speed: f32,
}

impl Default for EnemySettings {
    fn default() -> Self {
        Self {
            down_speed: 420.0,
            up_speed: 520.0,
        }
    }
}

/// Finite state of the enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnemyPhase {
    /// Up and ready; the only phase that accepts hits
    #[default]
    Idle,
    /// Sinking to a partial offset after a non-final hit
    StepDown,
    /// Returning to the top
    Rise,
    /// Sinking all the way after the final hit
    FinalDown,
    /// Defeated; terminal for the level
    Down,
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyEvent {
    Hit { final_hit: bool },
    ReachedTarget,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyEffect {
    /// Entered `StepDown`
    Almost,
    /// Entered `FinalDown`
    Splash,
    /// Reached `Down`; the level is complete
    Defeated,
}

const NO_EFFECTS: &[EnemyEffect] = &[];
const ALMOST: &[EnemyEffect] = &[EnemyEffect::Almost];
const SPLASH: &[EnemyEffect] = &[EnemyEffect::Splash];
const DEFEATED: &[EnemyEffect] = &[EnemyEffect::Defeated];

/// Pure transition function
pub fn transition(phase: EnemyPhase, event: EnemyEvent) -> (EnemyPhase, &'static [EnemyEffect]) {
    use EnemyEvent::*;
    use EnemyPhase::*;

    match (phase, event) {
        (Idle, Hit { final_hit: false }) => (StepDown, ALMOST),
        (Idle, Hit { final_hit: true }) => (FinalDown, SPLASH),
        (StepDown, ReachedTarget) => (Rise, NO_EFFECTS),
        (Rise, ReachedTarget) => (Idle, NO_EFFECTS),
        (FinalDown, ReachedTarget) => (Down, DEFEATED),
        (StepDown | Rise | FinalDown | Down, Hit { .. }) => (phase, NO_EFFECTS),
        (Idle | Down, ReachedTarget) => (phase, NO_EFFECTS),
    }
}

/// Observable enemy state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnemyState {
    /// Current downward offset from the top (px)
    pub offset: f32,
    /// Offset being animated toward (px)
    pub target_offset: f32,
    pub phase: EnemyPhase,
    pub hits_landed: u32,
}

/// The enemy and its hit gate
#[derive(Debug, Clone)]
pub struct EnemyFsm {
    settings: EnemySettings,
    state: EnemyState,
    required_hits: u32,
    drop_px: f32,
    completion_signaled: bool,
}

impl EnemyFsm {
    pub fn new(settings: EnemySettings) -> Self {
        Self {
            settings,
            state: EnemyState::default(),
            required_hits: 1,
            drop_px: 180.0,
            completion_signaled: false,
        }
    }

    /// Reset for a new level
    pub fn reset(&mut self, required_hits: u32, drop_px: f32) {
        self.required_hits = required_hits.max(1);
        self.drop_px = drop_px.max(0.0);
        self.state = EnemyState::default();
        self.completion_signaled = false;
    }

    pub fn state(&self) -> &EnemyState {
        &self.state
    }

    pub fn phase(&self) -> EnemyPhase {
        self.state.phase
    }

    pub fn hits_landed(&self) -> u32 {
        self.state.hits_landed
    }

    pub fn required_hits(&self) -> u32 {
        self.required_hits
    }

    pub fn accepts_hits(&self) -> bool {
        self.state.phase == EnemyPhase::Idle
    }

    pub fn is_down(&self) -> bool {
        self.state.phase == EnemyPhase::Down
    }

    /// Offset gained per non-final hit
    pub fn step_px(&self) -> f32 {
        self.drop_px / self.required_hits.max(1) as f32
    }

    /// Register a strong hit. Returns `None` (and changes nothing) outside `Idle`.
    pub fn register_hit(&mut self) -> Option<&'static [EnemyEffect]> {
        if !self.accepts_hits() {
            return None;
        }
        let hits = self.state.hits_landed + 1;
        let final_hit = hits >= self.required_hits;
        let (next, effects) = transition(self.state.phase, EnemyEvent::Hit { final_hit });

        self.state.hits_landed = hits;
        self.state.phase = next;
        self.state.target_offset = if final_hit {
            self.drop_px
        } else {
            (self.step_px() * hits as f32).min(self.drop_px - 1.0).max(0.0)
        };
        log::debug!(
            "Enemy hit {}/{} -> {:?}",
            hits,
            self.required_hits,
            self.state.phase
        );
        Some(effects)
    }

    /// Animate toward the current target. Returns effects of any transition taken.
    pub fn update(&mut self, dt: f32) -> &'static [EnemyEffect] {
        let speed = match self.state.phase {
            EnemyPhase::StepDown | EnemyPhase::FinalDown => self.settings.down_speed,
            EnemyPhase::Rise => self.settings.up_speed,
            EnemyPhase::Idle | EnemyPhase::Down => return NO_EFFECTS,
        };

        let delta = self.state.target_offset - self.state.offset;
        let travel = speed.max(0.0) * dt;
        if delta.abs() > travel {
            self.state.offset += travel.copysign(delta);
            return NO_EFFECTS;
        }

        self.state.offset = self.state.target_offset;
        let (next, effects) = transition(self.state.phase, EnemyEvent::ReachedTarget);
        self.state.phase = next;
        if next == EnemyPhase::Rise {
            self.state.target_offset = 0.0;
        }

        if effects.contains(&EnemyEffect::Defeated) {
            if self.completion_signaled {
                return NO_EFFECTS;
            }
            self.completion_signaled = true;
        }
        effects
    }
}
