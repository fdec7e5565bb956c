//! Per-frame game flow
//!
//! `GameFlow` owns every simulation component and advances them in a fixed
//! order each frame. It never touches audio directly: transitions and impacts
//! queue [`AudioCommand`]s that the caller drains and hands to the mixer.

use glam::Vec2;

use super::enemy::{EnemyEffect, EnemyFsm};
use super::gesture::{GestureTracker, ThrowGesture};
use super::level::LevelConfig;
use super::projectile::{ImpactEvent, ImpactStrength, ProjectileSim};
use super::state::{GamePhase, GameSession, LevelEndReason, Snapshot};
use super::wind::WindField;
use crate::Viewport;
use crate::audio::{AudioCommand, Clip};
use crate::consts::BASE_H;
use crate::settings::Settings;

/// Input for a single frame. Pointer positions are in screen space.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Menu start button
    pub start: bool,
    /// External gate finished; begin the first level
    pub gate_proceed: bool,
    /// Level-end overlay: continue
    pub next: bool,
    /// Level-end overlay: retry
    pub restart: bool,
    /// Pointer went down
    pub hold_start: bool,
    /// Pointer went up
    pub hold_end: bool,
    /// Current pointer position, if known
    pub pointer: Option<Vec2>,
    /// Pause toggle
    pub pause: bool,
    /// Flip the gust flag by hand (debug)
    pub toggle_wind: bool,
}

impl TickInput {
    /// Whether this frame carries a user gesture (unlocks audio)
    pub fn any_press(&self) -> bool {
        self.start || self.gate_proceed || self.next || self.restart || self.hold_start
    }
}

/// Menu → gate → play → level-end state machine and its components
#[derive(Debug)]
pub struct GameFlow {
    settings: Settings,
    session: GameSession,
    viewport: Viewport,
    wind: WindField,
    gesture: GestureTracker,
    projectiles: ProjectileSim,
    enemy: EnemyFsm,
    /// Tutorial overlay up; play is frozen until the next press
    tutorial: bool,
    tutorial_seen: Vec<usize>,
    paused: bool,
    /// When the level timer stopped counting (tutorial, pause, level end)
    frozen_at: Option<f64>,
    /// Gust flag is under manual control until the next level starts
    manual_wind: bool,
    last_throw_at: Option<f64>,
    last_impact_power: Option<f32>,
    /// Wind loop state last requested from the mixer
    wind_loop_on: bool,
    audio: Vec<AudioCommand>,
}

impl GameFlow {
    pub fn new(settings: Settings) -> Self {
        let wind = WindField::new(settings.wind.clone(), settings.seed);
        let gesture = GestureTracker::new(settings.gesture.clone());
        let projectiles = ProjectileSim::new(settings.projectile.clone());
        let enemy = EnemyFsm::new(settings.enemy.clone());
        Self {
            settings,
            session: GameSession::default(),
            viewport: Viewport::default(),
            wind,
            gesture,
            projectiles,
            enemy,
            tutorial: false,
            tutorial_seen: Vec::new(),
            paused: false,
            frozen_at: None,
            manual_wind: false,
            last_throw_at: None,
            last_impact_power: None,
            wind_loop_on: false,
            audio: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn phase(&self) -> GamePhase {
        self.session.phase
    }

    pub fn wind(&self) -> &WindField {
        &self.wind
    }

    pub fn gesture(&self) -> &GestureTracker {
        &self.gesture
    }

    pub fn projectiles(&self) -> &ProjectileSim {
        &self.projectiles
    }

    pub fn enemy(&self) -> &EnemyFsm {
        &self.enemy
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tutorial_active(&self) -> bool {
        self.tutorial
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Config of the current level
    pub fn level(&self) -> Option<&LevelConfig> {
        self.settings.levels.get(self.session.level_index)
    }

    /// Whether the wind loop should currently be audible
    pub fn wind_loop_wanted(&self) -> bool {
        self.session.phase == GamePhase::Play
            && !self.paused
            && self.wind.is_enabled()
            && self.wind.gust_active()
    }

    /// Level time left (ms). Frozen while paused, in the tutorial, or after the level ends.
    pub fn remaining_ms(&self, now: f64) -> f64 {
        let Some(level) = self.level() else {
            return 0.0;
        };
        let at = self.frozen_at.unwrap_or(now);
        (level.duration_ms() - (at - self.session.level_start_at)).max(0.0)
    }

    /// Take queued audio commands in emission order
    pub fn drain_audio(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.audio)
    }

    /// Advance one frame and return the audio it produced
    pub fn tick(&mut self, input: &TickInput, now: f64, dt: f32) -> Vec<AudioCommand> {
        if input.any_press() {
            self.audio.push(AudioCommand::Unlock);
        }

        match self.session.phase {
            GamePhase::Menu => {
                if input.start {
                    self.audio.push(AudioCommand::Sfx(Clip::Button));
                    if self.settings.flow.gate_enabled {
                        log::info!("Menu -> gate");
                        self.session.phase = GamePhase::Gate;
                    } else {
                        self.start_level(0, now);
                    }
                }
            }
            GamePhase::Gate => {
                if input.gate_proceed {
                    self.start_level(0, now);
                }
            }
            GamePhase::Play => self.play_frame(input, now, dt),
            GamePhase::LevelEnd => {
                if input.next {
                    self.audio.push(AudioCommand::Sfx(Clip::Button));
                    self.next_screen(now);
                } else if input.restart {
                    self.audio.push(AudioCommand::Sfx(Clip::Button));
                    self.restart_level(now);
                }
            }
        }

        self.sync_wind_loop();
        self.drain_audio()
    }

    /// Ask for the wind loop to start or stop when its wanted state changes
    fn sync_wind_loop(&mut self) {
        let on = self.wind_loop_wanted();
        if on != self.wind_loop_on {
            self.wind_loop_on = on;
            self.audio.push(AudioCommand::SyncLoop {
                clip: Clip::Wind,
                on,
            });
        }
    }

    fn play_frame(&mut self, input: &TickInput, now: f64, dt: f32) {
        if input.pause {
            self.toggle_pause(now);
        }
        if self.paused {
            return;
        }

        if self.tutorial {
            if input.hold_start {
                self.dismiss_tutorial(now);
            }
            return;
        }

        if input.toggle_wind {
            let on = self.wind.toggle_manual(now);
            self.manual_wind = true;
            log::info!("Gusts manually {}", if on { "on" } else { "off" });
        }

        // Gesture sampling comes before the release so the last pointer
        // position is part of the window
        if input.hold_start {
            if let Some(p) = input.pointer {
                self.gesture.on_hold_start(now, p, &self.viewport);
            }
        } else if let Some(p) = input.pointer {
            self.gesture.on_sample(now, p, &self.viewport);
        }
        if input.hold_end {
            if let Some(p) = input.pointer {
                self.gesture.on_sample(now, p, &self.viewport);
            }
            let aim = self.gesture.samples().last().map(|s| s.pos);
            if let Some(throw) = self.gesture.on_hold_end() {
                self.release(throw, aim, now);
            }
        }

        self.wind.update_gusts(now, dt);

        let impacts = self
            .projectiles
            .advance(dt, now, &self.wind, &mut self.enemy);
        for impact in &impacts {
            self.on_impact(impact);
        }

        let effects = self.enemy.update(dt);
        self.on_enemy_effects(effects, now);

        if self.session.phase == GamePhase::Play && self.remaining_ms(now) <= 0.0 {
            self.end_level(LevelEndReason::TimesUp, now);
        }

        self.wind.advance_noise(dt);
    }

    /// Spawn a projectile for a finished gesture, subject to the throw cooldown
    fn release(&mut self, throw: ThrowGesture, aim: Option<Vec2>, now: f64) {
        let cooldown = self.settings.gesture.cooldown_ms;
        if self.last_throw_at.is_some_and(|t| now - t < cooldown) {
            log::debug!("Throw discarded (cooldown)");
            return;
        }
        self.last_throw_at = Some(now);
        self.audio.push(AudioCommand::Sfx(Clip::BallThrow));
        let id = self.projectiles.throw(aim, &throw);
        log::debug!(
            "Throw #{} gesture {:.0}px/s -> {:.1}px/frame",
            id,
            throw.gesture_speed,
            throw.throw_speed
        );
    }

    fn on_impact(&mut self, impact: &ImpactEvent) {
        self.last_impact_power = Some(impact.power);
        let cue = match impact.strength {
            ImpactStrength::Strong => Clip::Success,
            ImpactStrength::Weak => Clip::Fail,
        };
        self.audio.push(AudioCommand::Sfx(cue));
        if impact.registered {
            self.session.hits = self.enemy.hits_landed();
        }
        for effect in impact.enemy_effects {
            match effect {
                EnemyEffect::Almost => self.audio.push(AudioCommand::Sfx(Clip::Almost)),
                EnemyEffect::Splash => self.audio.push(AudioCommand::Sfx(Clip::Splash)),
                EnemyEffect::Defeated => {}
            }
        }
    }

    fn on_enemy_effects(&mut self, effects: &[EnemyEffect], now: f64) {
        if effects.contains(&EnemyEffect::Defeated) {
            self.end_level(LevelEndReason::Complete, now);
        }
    }

    /// Return to the title screen
    pub fn go_to_menu(&mut self) {
        self.reset_to_menu();
        self.audio.push(AudioCommand::Music(Clip::MainMusic));
    }

    fn reset_to_menu(&mut self) {
        log::info!("-> menu");
        self.session = GameSession::default();
        self.projectiles.clear();
        self.gesture.abort();
        self.tutorial = false;
        self.paused = false;
        self.frozen_at = None;
    }

    /// Enter PLAY on the given level, starting the main theme
    pub fn start_level(&mut self, index: usize, now: f64) {
        self.enter_level(index, now);
        self.audio.push(AudioCommand::Music(Clip::MainMusic));
    }

    fn enter_level(&mut self, index: usize, now: f64) {
        let Some(level) = self.settings.levels.get(index).cloned() else {
            log::warn!("No level {index}, returning to menu");
            self.reset_to_menu();
            return;
        };

        self.session.phase = GamePhase::Play;
        self.session.level_index = index;
        self.session.hits = 0;
        self.session.level_start_at = now;
        self.session.end_reason = None;

        self.wind.apply_level(level.wind);
        if self.manual_wind {
            self.wind.resume_schedule(now);
            self.manual_wind = false;
        }
        self.projectiles.clear();
        self.projectiles
            .set_impact_threshold(level.impact.resolve(self.settings.gesture.throw_max));
        self.enemy.reset(level.required_hits(), level.enemy_drop);
        self.gesture.abort();
        self.last_throw_at = None;
        self.last_impact_power = None;
        self.paused = false;
        self.frozen_at = None;

        self.tutorial = self.settings.flow.tutorial_levels.contains(&index)
            && !self.tutorial_seen.contains(&index);
        if self.tutorial {
            self.tutorial_seen.push(index);
            self.frozen_at = Some(now);
        }

        log::info!(
            "Level {} '{}' started: {}s, {} hits, threshold {:.0}",
            index + 1,
            level.name,
            level.duration_ms() / 1000.0,
            level.required_hits(),
            self.projectiles.impact_threshold()
        );
    }

    /// Leave PLAY. Returns false (and does nothing) unless a level is running.
    pub fn end_level(&mut self, reason: LevelEndReason, now: f64) -> bool {
        if self.session.phase != GamePhase::Play {
            return false;
        }
        self.session.phase = GamePhase::LevelEnd;
        self.session.end_reason = Some(reason);
        if self.frozen_at.is_none() {
            self.frozen_at = Some(now);
        }
        self.paused = false;
        self.tutorial = false;
        self.projectiles.deactivate_all();
        self.gesture.abort();

        if reason == LevelEndReason::Complete {
            self.session.last_completed = Some(self.session.level_index);
            self.audio.push(AudioCommand::Crossfade(Clip::LevelComplete));
        }
        log::info!(
            "Level {} ended: {:?}",
            self.session.level_index + 1,
            reason
        );
        true
    }

    /// Continue from the level-end overlay: next level, or the menu after the last
    pub fn next_screen(&mut self, now: f64) {
        if self.session.phase != GamePhase::LevelEnd {
            return;
        }
        self.audio.push(AudioCommand::Crossfade(Clip::MainMusic));
        let next = self.session.level_index + 1;
        if next < self.settings.levels.len() {
            self.enter_level(next, now);
        } else {
            let last_completed = self.session.last_completed;
            self.reset_to_menu();
            self.session.last_completed = last_completed;
        }
    }

    /// Replay the current level from the level-end overlay
    pub fn restart_level(&mut self, now: f64) {
        if self.session.phase != GamePhase::LevelEnd {
            return;
        }
        self.audio.push(AudioCommand::Crossfade(Clip::MainMusic));
        self.enter_level(self.session.level_index, now);
    }

    fn toggle_pause(&mut self, now: f64) {
        self.paused = !self.paused;
        if self.paused {
            self.gesture.abort();
            if self.frozen_at.is_none() {
                self.frozen_at = Some(now);
            }
        } else {
            self.thaw(now);
        }
        log::info!("{}", if self.paused { "Paused" } else { "Resumed" });
    }

    fn dismiss_tutorial(&mut self, now: f64) {
        self.tutorial = false;
        self.thaw(now);
        log::info!("Tutorial dismissed");
    }

    /// Resume the level timer once nothing is holding it
    fn thaw(&mut self, now: f64) {
        if self.paused || self.tutorial {
            return;
        }
        if let Some(at) = self.frozen_at.take() {
            self.session.level_start_at += now - at;
        }
    }

    /// Read-only view for rendering
    pub fn snapshot(&self, now: f64) -> Snapshot {
        Snapshot {
            phase: self.session.phase,
            level_index: self.session.level_index,
            level_count: self.settings.levels.len(),
            hits: self.session.hits,
            required_hits: self.enemy.required_hits(),
            remaining_ms: self.remaining_ms(now),
            projectiles: self.projectiles.projectiles().cloned().collect(),
            enemy: *self.enemy.state(),
            wind_visual: self.wind.visual_intensity(),
            wind_value: if self.wind.is_enabled() {
                self.wind.force_at(BASE_H / 2.0)
            } else {
                0.0
            },
            gust_active: self.wind.gust_active(),
            tutorial: self.tutorial,
            paused: self.paused,
            end_reason: self.session.end_reason,
            last_completed: self.session.last_completed,
            last_impact_power: self.last_impact_power,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::Hitbox;
    use crate::sim::level::ImpactThreshold;
    use crate::sim::wind::WindProfile;

    const DT: f32 = 1.0 / 60.0;
    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn settings() -> Settings {
        let mut s = Settings::default();
        s.flow.gate_enabled = false;
        s.flow.tutorial_levels.clear();
        s
    }

    /// Still air, no gravity, target straight ahead of the hand
    fn shooting_range(required_hits: u32) -> Settings {
        let mut s = settings();
        s.wind.enabled = false;
        s.projectile.gravity = 0.0;
        s.projectile.throw_origin = Vec2::new(100.0, 500.0);
        s.projectile.hitbox = Hitbox {
            center: Vec2::new(500.0, 500.0),
            visual_radius: 40.0,
            shrink: 1.0,
        };
        s.levels = vec![LevelConfig {
            name: "Range".into(),
            duration_sec: 60.0,
            required_hits,
            wind: WindProfile::default(),
            enemy_drop: 180.0,
            impact: ImpactThreshold::Fixed(0.0),
        }];
        s
    }

    fn tap_at(p: Vec2) -> TickInput {
        TickInput {
            hold_start: true,
            hold_end: true,
            pointer: Some(p),
            ..Default::default()
        }
    }

    /// Run idle frames from `start` until `pred` holds, collecting audio
    fn run_until(
        flow: &mut GameFlow,
        start: f64,
        frames: usize,
        pred: impl Fn(&GameFlow) -> bool,
    ) -> (f64, Vec<AudioCommand>) {
        let mut now = start;
        let mut audio = Vec::new();
        for _ in 0..frames {
            now += FRAME_MS;
            audio.extend(flow.tick(&TickInput::default(), now, DT));
            if pred(flow) {
                break;
            }
        }
        (now, audio)
    }

    #[test]
    fn test_menu_to_play_through_gate() {
        let mut s = settings();
        s.flow.gate_enabled = true;
        let mut flow = GameFlow::new(s);
        assert_eq!(flow.phase(), GamePhase::Menu);

        let audio = flow.tick(
            &TickInput {
                start: true,
                ..Default::default()
            },
            0.0,
            DT,
        );
        assert_eq!(flow.phase(), GamePhase::Gate);
        assert_eq!(audio, vec![AudioCommand::Unlock, AudioCommand::Sfx(Clip::Button)]);

        let audio = flow.tick(
            &TickInput {
                gate_proceed: true,
                ..Default::default()
            },
            100.0,
            DT,
        );
        assert_eq!(flow.phase(), GamePhase::Play);
        assert_eq!(flow.session().level_index, 0);
        assert!(audio.contains(&AudioCommand::Music(Clip::MainMusic)));
    }

    #[test]
    fn test_gate_disabled_skips_gate() {
        let mut flow = GameFlow::new(settings());
        flow.tick(
            &TickInput {
                start: true,
                ..Default::default()
            },
            0.0,
            DT,
        );
        assert_eq!(flow.phase(), GamePhase::Play);
    }

    #[test]
    fn test_timer_fires_at_duration_not_before() {
        let mut flow = GameFlow::new(settings());
        // Third stock level is 10 s
        flow.start_level(2, 0.0);
        flow.drain_audio();

        flow.tick(&TickInput::default(), 9_999.0, DT);
        assert_eq!(flow.phase(), GamePhase::Play);
        assert!(flow.remaining_ms(9_999.0) > 0.0);

        flow.tick(&TickInput::default(), 10_000.0, DT);
        assert_eq!(flow.phase(), GamePhase::LevelEnd);
        assert_eq!(flow.session().end_reason, Some(LevelEndReason::TimesUp));
        assert_eq!(flow.session().last_completed, None);
    }

    #[test]
    fn test_end_level_idempotent() {
        let mut flow = GameFlow::new(settings());
        flow.start_level(0, 0.0);
        flow.drain_audio();

        assert!(flow.end_level(LevelEndReason::Complete, 500.0));
        assert!(!flow.end_level(LevelEndReason::Complete, 600.0));
        assert!(!flow.end_level(LevelEndReason::TimesUp, 700.0));

        let audio = flow.drain_audio();
        assert_eq!(audio, vec![AudioCommand::Crossfade(Clip::LevelComplete)]);
        assert_eq!(flow.session().end_reason, Some(LevelEndReason::Complete));
        assert_eq!(flow.session().last_completed, Some(0));
    }

    #[test]
    fn test_end_level_outside_play_is_noop() {
        let mut flow = GameFlow::new(settings());
        assert!(!flow.end_level(LevelEndReason::Complete, 0.0));
        assert_eq!(flow.phase(), GamePhase::Menu);
    }

    #[test]
    fn test_throw_hits_and_completes_level() {
        let mut flow = GameFlow::new(shooting_range(1));
        flow.start_level(0, 0.0);
        flow.drain_audio();

        let audio = flow.tick(&tap_at(Vec2::new(500.0, 500.0)), 0.0, DT);
        assert_eq!(audio, vec![AudioCommand::Unlock, AudioCommand::Sfx(Clip::BallThrow)]);
        assert_eq!(flow.projectiles().active_count(), 1);

        let (_, audio) = run_until(&mut flow, 0.0, 300, |f| f.phase() != GamePhase::Play);
        assert_eq!(flow.phase(), GamePhase::LevelEnd);
        assert_eq!(flow.session().end_reason, Some(LevelEndReason::Complete));
        assert_eq!(flow.session().hits, 1);
        assert_eq!(flow.projectiles().active_count(), 0);

        let success = audio.iter().position(|c| *c == AudioCommand::Sfx(Clip::Success));
        let splash = audio.iter().position(|c| *c == AudioCommand::Sfx(Clip::Splash));
        let fade = audio
            .iter()
            .position(|c| *c == AudioCommand::Crossfade(Clip::LevelComplete));
        assert!(success.is_some() && splash.is_some() && fade.is_some());
        assert!(success < splash && splash < fade);
    }

    #[test]
    fn test_three_hits_step_the_enemy() {
        let mut flow = GameFlow::new(shooting_range(3));
        flow.start_level(0, 0.0);
        let mut now = 0.0;
        let mut almost = 0;

        for hit in 1..=2 {
            flow.tick(&tap_at(Vec2::new(500.0, 500.0)), now, DT);
            let (t, audio) = run_until(&mut flow, now, 600, |f| {
                f.enemy().hits_landed() == hit
                    && f.enemy().accepts_hits()
                    && f.projectiles().active_count() == 0
            });
            now = t;
            almost += audio
                .iter()
                .filter(|c| **c == AudioCommand::Sfx(Clip::Almost))
                .count();
            assert_eq!(flow.phase(), GamePhase::Play);
        }
        assert_eq!(almost, 2);
        assert_eq!(flow.session().hits, 2);

        flow.tick(&tap_at(Vec2::new(500.0, 500.0)), now, DT);
        run_until(&mut flow, now, 600, |f| f.phase() != GamePhase::Play);
        assert_eq!(flow.session().end_reason, Some(LevelEndReason::Complete));
        assert_eq!(flow.session().hits, 3);
    }

    #[test]
    fn test_throw_cooldown() {
        let mut flow = GameFlow::new(shooting_range(3));
        flow.start_level(0, 0.0);
        flow.drain_audio();

        let p = Vec2::new(500.0, 500.0);
        let mut throws = 0;
        for now in [0.0, 100.0, 300.0] {
            throws += flow
                .tick(&tap_at(p), now, DT)
                .iter()
                .filter(|c| **c == AudioCommand::Sfx(Clip::BallThrow))
                .count();
        }
        assert_eq!(throws, 2);
    }

    #[test]
    fn test_tutorial_freezes_timer_until_press() {
        let mut s = settings();
        s.flow.tutorial_levels = vec![0];
        let mut flow = GameFlow::new(s);
        flow.start_level(0, 0.0);
        assert!(flow.tutorial_active());

        flow.tick(&TickInput::default(), 5_000.0, DT);
        assert_eq!(flow.remaining_ms(5_000.0), 60_000.0);

        // First press only dismisses; no throw
        let audio = flow.tick(&tap_at(Vec2::new(900.0, 400.0)), 5_000.0, DT);
        assert!(!flow.tutorial_active());
        assert!(!audio.contains(&AudioCommand::Sfx(Clip::BallThrow)));
        assert_eq!(flow.remaining_ms(6_000.0), 59_000.0);

        // Only shown on the first visit
        flow.end_level(LevelEndReason::TimesUp, 7_000.0);
        flow.restart_level(8_000.0);
        assert!(!flow.tutorial_active());
    }

    #[test]
    fn test_pause_does_not_count() {
        let mut flow = GameFlow::new(settings());
        flow.start_level(2, 0.0);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };

        flow.tick(&pause, 2_000.0, DT);
        assert!(flow.is_paused());
        flow.tick(&TickInput::default(), 20_000.0, DT);
        assert_eq!(flow.phase(), GamePhase::Play);
        assert_eq!(flow.remaining_ms(20_000.0), 8_000.0);

        flow.tick(&pause, 30_000.0, DT);
        assert!(!flow.is_paused());
        assert_eq!(flow.remaining_ms(31_000.0), 7_000.0);
    }

    #[test]
    fn test_next_screen_advances_then_returns_to_menu() {
        let mut flow = GameFlow::new(settings());
        flow.start_level(0, 0.0);
        flow.end_level(LevelEndReason::Complete, 1.0);
        flow.drain_audio();

        let audio = flow.tick(
            &TickInput {
                next: true,
                ..Default::default()
            },
            2.0,
            DT,
        );
        assert_eq!(
            audio,
            vec![
                AudioCommand::Unlock,
                AudioCommand::Sfx(Clip::Button),
                AudioCommand::Crossfade(Clip::MainMusic),
            ]
        );
        assert_eq!(flow.phase(), GamePhase::Play);
        assert_eq!(flow.session().level_index, 1);
        assert_eq!(flow.session().last_completed, Some(0));

        flow.start_level(2, 3.0);
        flow.end_level(LevelEndReason::Complete, 4.0);
        flow.next_screen(5.0);
        assert_eq!(flow.phase(), GamePhase::Menu);
        assert_eq!(flow.session().last_completed, Some(2));
    }

    #[test]
    fn test_restart_resets_level() {
        let mut flow = GameFlow::new(shooting_range(3));
        flow.start_level(0, 0.0);
        flow.tick(&tap_at(Vec2::new(500.0, 500.0)), 0.0, DT);
        flow.end_level(LevelEndReason::TimesUp, 10.0);
        assert_eq!(flow.projectiles().active_count(), 0);

        flow.restart_level(20.0);
        assert_eq!(flow.phase(), GamePhase::Play);
        assert_eq!(flow.session().hits, 0);
        assert_eq!(flow.session().level_start_at, 20.0);
        assert_eq!(flow.remaining_ms(20.0), 60_000.0);
    }

    #[test]
    fn test_impact_threshold_applied_per_level() {
        let mut flow = GameFlow::new(settings());
        flow.start_level(0, 0.0);
        assert_eq!(flow.projectiles().impact_threshold(), 64.0);
        flow.start_level(1, 0.0);
        assert_eq!(flow.projectiles().impact_threshold(), 71.0);
    }

    #[test]
    fn test_manual_wind_toggle() {
        let mut flow = GameFlow::new(settings());
        flow.start_level(0, 0.0);
        flow.tick(&TickInput::default(), 0.0, DT);
        let before = flow.wind().gust_active();

        flow.tick(
            &TickInput {
                toggle_wind: true,
                ..Default::default()
            },
            16.0,
            DT,
        );
        assert_ne!(flow.wind().gust_active(), before);
        // Scheduler is held off
        flow.tick(&TickInput::default(), 50_000.0, DT);
        assert_ne!(flow.wind().gust_active(), before);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut flow = GameFlow::new(shooting_range(3));
        flow.start_level(0, 1_000.0);
        flow.tick(&tap_at(Vec2::new(500.0, 500.0)), 1_000.0, DT);
        let snap = flow.snapshot(3_000.0);
        assert_eq!(snap.phase, GamePhase::Play);
        assert_eq!(snap.level_count, 1);
        assert_eq!(snap.required_hits, 3);
        assert_eq!(snap.remaining_ms, 58_000.0);
        assert_eq!(snap.projectiles.len(), 1);
        assert_eq!(snap.wind_value, 0.0);
    }

    #[test]
    fn test_snapshot_wind_value_ignores_gust_flag() {
        let mut flow = GameFlow::new(settings());
        flow.start_level(0, 0.0);
        assert!(!flow.wind().gust_active());
        let snap = flow.snapshot(0.0);
        assert_eq!(snap.wind_value, flow.wind().force_at(BASE_H / 2.0));
        assert!(snap.wind_value != 0.0);
    }

    #[test]
    fn test_gust_toggles_drive_wind_loop() {
        let mut flow = GameFlow::new(settings());
        flow.start_level(0, 0.0);
        flow.drain_audio();

        // First play frame opens a gust at the zero deadline
        let audio = flow.tick(&TickInput::default(), 16.0, DT);
        assert!(flow.wind().gust_active());
        assert_eq!(
            audio,
            vec![AudioCommand::SyncLoop {
                clip: Clip::Wind,
                on: true
            }]
        );
        // Only changes are reported
        assert!(flow.tick(&TickInput::default(), 32.0, DT).is_empty());

        let deadline = flow.wind().next_toggle_at();
        let audio = flow.tick(&TickInput::default(), deadline, DT);
        assert!(!flow.wind().gust_active());
        assert_eq!(
            audio,
            vec![AudioCommand::SyncLoop {
                clip: Clip::Wind,
                on: false
            }]
        );
    }

    #[test]
    fn test_level_end_stops_wind_loop() {
        let mut flow = GameFlow::new(settings());
        flow.start_level(0, 0.0);
        flow.tick(&TickInput::default(), 16.0, DT);
        flow.end_level(LevelEndReason::TimesUp, 20.0);
        let audio = flow.tick(&TickInput::default(), 32.0, DT);
        assert!(audio.contains(&AudioCommand::SyncLoop {
            clip: Clip::Wind,
            on: false
        }));
    }

    #[test]
    fn test_missing_level_returns_to_menu() {
        let mut flow = GameFlow::new(settings());
        flow.start_level(99, 0.0);
        assert_eq!(flow.phase(), GamePhase::Menu);
    }
}
