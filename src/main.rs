//! Bill Ball headless runner
//!
//! Plays a scripted session against the simulation with logging audio
//! handles, then prints the final snapshot as JSON. Pass a settings file as
//! the first argument to override the defaults.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use bill_ball::audio::{Clip, ClipHandle};
    use bill_ball::consts::{BASE_H, BASE_W};
    use bill_ball::platform::{Clock, ManualClock};
    use bill_ball::sim::{GamePhase, TickInput};
    use bill_ball::{Game, Settings};
    use glam::Vec2;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Clip handle that only logs what it is asked to do
    #[derive(Debug)]
    pub struct LogClip {
        clip: Clip,
        playing: bool,
        looping: bool,
    }

    impl LogClip {
        fn new(clip: Clip) -> Self {
            Self {
                clip,
                playing: false,
                looping: false,
            }
        }
    }

    impl ClipHandle for LogClip {
        fn play(&mut self) {
            self.playing = true;
            log::info!("[audio] play {:?}{}", self.clip, if self.looping { " (loop)" } else { "" });
        }

        fn stop(&mut self) {
            if self.playing {
                log::info!("[audio] stop {:?}", self.clip);
            }
            self.playing = false;
        }

        fn set_volume(&mut self, volume: f32, ramp_secs: f32) {
            log::debug!("[audio] {:?} -> {:.3} over {:.2}s", self.clip, volume, ramp_secs);
        }

        fn set_loop(&mut self, looping: bool) {
            self.looping = looping;
        }

        fn is_playing(&self) -> bool {
            // One-shots end on their own; only loops are still audible later
            self.playing && self.looping
        }
    }

    struct Session {
        game: Game<LogClip>,
        clock: ManualClock,
    }

    impl Session {
        fn step(&mut self, input: TickInput) {
            self.clock.advance(FRAME_MS);
            self.game.frame(&input, self.clock.now_ms());
        }

        fn idle(&mut self, frames: usize) {
            for _ in 0..frames {
                self.step(TickInput::default());
            }
        }

        fn press(&mut self, input: TickInput) {
            self.step(input);
            self.idle(1);
        }

        /// A quick swipe ending on `target`
        fn swipe(&mut self, target: Vec2) {
            let from = target - Vec2::new(500.0, 0.0);
            self.step(TickInput {
                hold_start: true,
                pointer: Some(from),
                ..Default::default()
            });
            for i in 1..6 {
                self.step(TickInput {
                    pointer: Some(from.lerp(target, i as f32 / 6.0)),
                    ..Default::default()
                });
            }
            self.step(TickInput {
                hold_end: true,
                pointer: Some(target),
                ..Default::default()
            });
        }
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        env_logger::init();
        log::info!("Bill Ball (headless) starting...");

        let settings = match std::env::args().nth(1) {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        let aim = settings.projectile.hitbox.center - Vec2::new(0.0, 110.0);

        let handles = Clip::ALL.into_iter().map(|c| (c, LogClip::new(c)));
        let mut game = Game::new(settings, handles);
        game.resize(Vec2::new(BASE_W, BASE_H));
        let mut session = Session {
            game,
            clock: ManualClock::default(),
        };

        session.idle(30);
        session.press(TickInput {
            start: true,
            ..Default::default()
        });
        if session.game.flow().phase() == GamePhase::Gate {
            session.press(TickInput {
                gate_proceed: true,
                ..Default::default()
            });
        }
        if session.game.flow().tutorial_active() {
            session.press(TickInput {
                hold_start: true,
                ..Default::default()
            });
        }

        // Keep throwing until the level ends either way
        while session.game.flow().phase() == GamePhase::Play {
            session.swipe(aim);
            session.idle(45);
        }

        let snapshot = session.game.snapshot(session.clock.now_ms());
        log::info!(
            "Level {} over: {:?}, {} / {} hits",
            snapshot.level_index + 1,
            snapshot.end_reason,
            snapshot.hits,
            snapshot.required_hits
        );
        session.idle(60);
        println!("{}", serde_json::to_string_pretty(&session.game.snapshot(session.clock.now_ms()))?);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    headless::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser shell drives `bill_ball::Game` directly
}
