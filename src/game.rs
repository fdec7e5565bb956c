//! Composed game context
//!
//! Ties the simulation to the mixer: one [`Game::frame`] call per displayed
//! frame advances the flow, plays whatever it asked for (the wind loop
//! included) and fires due fade-out stops.

use glam::Vec2;

use crate::Viewport;
use crate::audio::{AudioMixer, Clip, ClipHandle};
use crate::consts::MAX_DT;
use crate::settings::Settings;
use crate::sim::{GameFlow, Snapshot, TickInput};

/// Simulation plus audio
#[derive(Debug)]
pub struct Game<H: ClipHandle> {
    flow: GameFlow,
    mixer: AudioMixer<H>,
    last_frame_at: Option<f64>,
}

impl<H: ClipHandle> Game<H> {
    /// Build a game in the menu. The main theme is requested on the first frame.
    pub fn new(settings: Settings, handles: impl IntoIterator<Item = (Clip, H)>) -> Self {
        let settings = settings.sanitized();
        let mixer = AudioMixer::with_handles(settings.audio.clone(), handles);
        let mut flow = GameFlow::new(settings);
        flow.go_to_menu();
        Self {
            flow,
            mixer,
            last_frame_at: None,
        }
    }

    pub fn flow(&self) -> &GameFlow {
        &self.flow
    }

    pub fn flow_mut(&mut self) -> &mut GameFlow {
        &mut self.flow
    }

    pub fn mixer(&self) -> &AudioMixer<H> {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut AudioMixer<H> {
        &mut self.mixer
    }

    /// Refit the viewport to a new window size
    pub fn resize(&mut self, window: Vec2) {
        self.flow.set_viewport(Viewport::fit(window));
    }

    /// Frame delta in seconds, clamped to [`MAX_DT`]
    fn frame_dt(&self, now: f64) -> f32 {
        match self.last_frame_at {
            Some(last) => (((now - last) / 1000.0) as f32).clamp(0.0, MAX_DT),
            None => 0.0,
        }
    }

    /// Advance one displayed frame
    pub fn frame(&mut self, input: &TickInput, now: f64) {
        let dt = self.frame_dt(now);
        self.last_frame_at = Some(now);

        for command in self.flow.tick(input, now, dt) {
            log::trace!("audio {:?}", command);
            self.mixer.apply(command, now);
        }
        self.mixer.update(now);
    }

    pub fn snapshot(&self, now: f64) -> Snapshot {
        self.flow.snapshot(now)
    }
}
