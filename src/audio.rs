//! Layered audio mixer
//!
//! Clips are a closed set mapped to backend handles at startup. Volume for a
//! channel is always derived from master × category × per-clip, never set
//! directly by callers. Fades are ramps run by the backend; "stop after fade"
//! is a scheduled event drained by [`AudioMixer::update`], so a later start of
//! the same clip can cancel it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Grace after a loop fade-out before the hard stop (ms)
pub const LOOP_STOP_GRACE_MS: f64 = 10.0;
/// Grace after a crossfade before the outgoing track is stopped (ms)
pub const CROSSFADE_STOP_GRACE_MS: f64 = 20.0;
/// Ramp used when re-leveling music that is already playing (s)
const RELEVEL_RAMP_SECS: f32 = 0.2;
/// Ramp used when re-applying the volume formula (s)
const APPLY_RAMP_SECS: f32 = 0.05;

/// Every clip the game knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Clip {
    /// Projectile released
    BallThrow,
    /// Gust loop
    Wind,
    /// Menu and in-game theme (loops)
    MainMusic,
    /// Level complete sting (one-shot)
    LevelComplete,
    /// Weak impact
    Fail,
    /// Enemy knocked partway down
    Almost,
    /// Enemy knocked all the way down
    Splash,
    /// UI click
    Button,
    /// Strong impact
    Success,
}

impl Clip {
    pub const COUNT: usize = 9;

    pub const ALL: [Clip; Clip::COUNT] = [
        Clip::BallThrow,
        Clip::Wind,
        Clip::MainMusic,
        Clip::LevelComplete,
        Clip::Fail,
        Clip::Almost,
        Clip::Splash,
        Clip::Button,
        Clip::Success,
    ];

    /// Mixer bus this clip belongs to
    pub fn category(self) -> Category {
        match self {
            Clip::MainMusic | Clip::LevelComplete => Category::Music,
            _ => Category::Sfx,
        }
    }

    /// Minimum spacing between two one-shot triggers (ms)
    pub fn throttle_ms(self) -> f64 {
        match self {
            Clip::Button => 120.0,
            _ => 60.0,
        }
    }

    /// Music clips that loop; the rest play once
    pub fn loops_as_music(self) -> bool {
        self == Clip::MainMusic
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Volume bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Music,
    Sfx,
}

/// What the mixer needs from a decoded clip
pub trait ClipHandle {
    fn play(&mut self);
    fn stop(&mut self);
    /// Set volume, ramping linearly over `ramp_secs` (0 = instant)
    fn set_volume(&mut self, volume: f32, ramp_secs: f32);
    fn set_loop(&mut self, looping: bool);
    fn is_playing(&self) -> bool;
}

/// Fade timings (ms)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeSettings {
    pub loop_in_ms: f64,
    pub loop_out_ms: f64,
    pub crossfade_ms: f64,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            loop_in_ms: 300.0,
            loop_out_ms: 300.0,
            crossfade_ms: 600.0,
        }
    }
}

/// Mixer levels and policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub master: f32,
    pub music: f32,
    pub sfx: f32,
    /// Per-clip multipliers (missing = 1.0)
    pub per_clip: BTreeMap<Clip, f32>,
    pub fades: FadeSettings,
    /// Keep everything silent until the first user gesture unlocks audio
    pub mute_on_start: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        let per_clip = BTreeMap::from([
            (Clip::BallThrow, 1.0),
            (Clip::Wind, 0.5),
            (Clip::MainMusic, 0.5),
            (Clip::LevelComplete, 1.0),
            (Clip::Fail, 0.6),
            (Clip::Almost, 0.5),
            (Clip::Splash, 0.8),
            (Clip::Button, 0.8),
            (Clip::Success, 1.0),
        ]);
        Self {
            master: 0.9,
            music: 0.5,
            sfx: 0.9,
            per_clip,
            fades: FadeSettings::default(),
            mute_on_start: false,
        }
    }
}

impl AudioSettings {
    fn category_volume(&self, category: Category) -> f32 {
        match category {
            Category::Music => self.music,
            Category::Sfx => self.sfx,
        }
    }
}

/// Requests from the simulation, applied in order by the mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCommand {
    /// First user gesture seen
    Unlock,
    /// Throttled one-shot
    Sfx(Clip),
    /// Start/stop a loop only when the observed flag changes
    SyncLoop { clip: Clip, on: bool },
    /// Start music, crossfading if something else is current
    Music(Clip),
    Crossfade(Clip),
}

/// One mixer channel
#[derive(Debug)]
struct Channel<H> {
    handle: H,
    looping: bool,
    /// Last volume target handed to the backend
    volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScheduledStop {
    clip: Clip,
    at: f64,
}

/// The mixer
#[derive(Debug)]
pub struct AudioMixer<H: ClipHandle> {
    settings: AudioSettings,
    channels: [Option<Channel<H>>; Clip::COUNT],
    last_sfx_at: [Option<f64>; Clip::COUNT],
    loop_flags: [bool; Clip::COUNT],
    current_music: Option<Clip>,
    unlocked: bool,
    pending_stops: Vec<ScheduledStop>,
}

impl<H: ClipHandle> AudioMixer<H> {
    pub fn new(settings: AudioSettings) -> Self {
        Self {
            settings,
            channels: std::array::from_fn(|_| None),
            last_sfx_at: [None; Clip::COUNT],
            loop_flags: [false; Clip::COUNT],
            current_music: None,
            unlocked: false,
            pending_stops: Vec::new(),
        }
    }

    /// Build a mixer from loaded handles. Clips without a handle stay silent.
    pub fn with_handles(settings: AudioSettings, handles: impl IntoIterator<Item = (Clip, H)>) -> Self {
        let mut mixer = Self::new(settings);
        for (clip, handle) in handles {
            mixer.insert(clip, handle);
        }
        for clip in Clip::ALL {
            if mixer.channels[clip.index()].is_none() {
                log::warn!("No audio handle for {:?} - clip disabled", clip);
            }
        }
        mixer
    }

    /// Attach (or replace) the handle for a clip
    pub fn insert(&mut self, clip: Clip, handle: H) {
        let volume = self.effective_volume(clip);
        self.channels[clip.index()] = Some(Channel {
            handle,
            looping: false,
            volume,
        });
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Swap in new levels and re-apply them to every channel
    pub fn set_settings(&mut self, settings: AudioSettings) {
        self.settings = settings;
        self.apply_volumes();
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn current_music(&self) -> Option<Clip> {
        self.current_music
    }

    pub fn handle(&self, clip: Clip) -> Option<&H> {
        self.channels[clip.index()].as_ref().map(|c| &c.handle)
    }

    /// Last volume target for a clip's channel
    pub fn channel_volume(&self, clip: Clip) -> Option<f32> {
        self.channels[clip.index()].as_ref().map(|c| c.volume)
    }

    pub fn is_looping(&self, clip: Clip) -> bool {
        self.channels[clip.index()]
            .as_ref()
            .is_some_and(|c| c.looping)
    }

    pub fn has_pending_stop(&self, clip: Clip) -> bool {
        self.pending_stops.iter().any(|s| s.clip == clip)
    }

    /// master × category × per-clip × mute, clamped to `[0, 1]`
    pub fn effective_volume(&self, clip: Clip) -> f32 {
        let s = &self.settings;
        let per = s.per_clip.get(&clip).copied().unwrap_or(1.0);
        let muted = if s.mute_on_start && !self.unlocked {
            0.0
        } else {
            1.0
        };
        (s.master * s.category_volume(clip.category()) * per * muted).clamp(0.0, 1.0)
    }

    /// Re-apply the volume formula to every channel that is not fading out
    pub fn apply_volumes(&mut self) {
        for clip in Clip::ALL {
            if self.has_pending_stop(clip) {
                continue;
            }
            let vol = self.effective_volume(clip);
            if let Some(ch) = self.channels[clip.index()].as_mut() {
                ch.handle.set_volume(vol, APPLY_RAMP_SECS);
                ch.volume = vol;
            }
        }
    }

    /// Mark audio as unlocked by a user gesture and re-apply volumes.
    ///
    /// Later calls change nothing, so a press never cuts a running fade short.
    /// Returns true the first time.
    pub fn unlock(&mut self) -> bool {
        if self.unlocked {
            return false;
        }
        log::info!("Audio unlocked");
        self.unlocked = true;
        self.apply_volumes();
        true
    }

    /// Restart a one-shot from the beginning unless it fired too recently.
    ///
    /// Returns whether playback was triggered.
    pub fn play_sfx(&mut self, clip: Clip, now: f64) -> bool {
        if self.channels[clip.index()].is_none() {
            return false;
        }
        if let Some(last) = self.last_sfx_at[clip.index()] {
            if now - last < clip.throttle_ms() {
                log::debug!("{:?} throttled", clip);
                return false;
            }
        }
        self.last_sfx_at[clip.index()] = Some(now);
        self.cancel_stop(clip);

        let vol = self.effective_volume(clip);
        let Some(ch) = self.channels[clip.index()].as_mut() else {
            return false;
        };
        ch.handle.stop();
        ch.handle.set_volume(vol, 0.0);
        ch.handle.play();
        ch.volume = vol;
        true
    }

    /// Start a loop at silence and fade it in; a loop already playing is just faded back up
    pub fn play_loop(&mut self, clip: Clip) {
        let fade_secs = (self.settings.fades.loop_in_ms / 1000.0) as f32;
        let target = self.effective_volume(clip);
        self.cancel_stop(clip);
        let Some(ch) = self.channels[clip.index()].as_mut() else {
            return;
        };
        if !ch.handle.is_playing() {
            ch.handle.set_loop(true);
            ch.looping = true;
            ch.handle.set_volume(0.0, 0.0);
            ch.handle.play();
        }
        ch.handle.set_volume(target, fade_secs);
        ch.volume = target;
    }

    /// Fade a loop out and schedule the hard stop for after the fade
    pub fn stop_loop(&mut self, clip: Clip, now: f64) {
        let fade_ms = self.settings.fades.loop_out_ms.max(0.0);
        let Some(ch) = self.channels[clip.index()].as_mut() else {
            return;
        };
        ch.handle.set_volume(0.0, (fade_ms / 1000.0) as f32);
        ch.volume = 0.0;
        self.schedule_stop(clip, now + fade_ms + LOOP_STOP_GRACE_MS);
    }

    /// Start or stop a loop to follow an external flag. Only acts on changes.
    pub fn sync_loop(&mut self, clip: Clip, on: bool, now: f64) -> bool {
        if self.loop_flags[clip.index()] == on {
            return false;
        }
        self.loop_flags[clip.index()] = on;
        if on {
            self.play_loop(clip);
        } else {
            self.stop_loop(clip, now);
        }
        true
    }

    /// Start music. Same track re-levels; a different track crossfades.
    pub fn play_music(&mut self, clip: Clip, now: f64) {
        let Some(ch) = self.channels[clip.index()].as_ref() else {
            return;
        };
        let playing = ch.handle.is_playing();

        match self.current_music {
            Some(current) if current == clip && playing => {
                self.relevel(clip);
                return;
            }
            Some(current) if current != clip => {
                self.crossfade_to(clip, now);
                return;
            }
            _ => {}
        }

        let vol = self.effective_volume(clip);
        self.cancel_stop(clip);
        if let Some(ch) = self.channels[clip.index()].as_mut() {
            ch.handle.stop();
            ch.handle.set_loop(clip.loops_as_music());
            ch.looping = clip.loops_as_music();
            ch.handle.set_volume(vol, 0.0);
            ch.handle.play();
            ch.volume = vol;
        }
        log::info!("Music: {:?}", clip);
        self.current_music = Some(clip);
    }

    /// Ramp the incoming track up while the current one ramps out and stops.
    ///
    /// The current-music pointer moves immediately, so chained calls fade
    /// from whatever was most recently requested.
    pub fn crossfade_to(&mut self, clip: Clip, now: f64) {
        if self.channels[clip.index()].is_none() {
            return;
        }
        let ms = if self.settings.fades.crossfade_ms > 0.0 {
            self.settings.fades.crossfade_ms
        } else {
            FadeSettings::default().crossfade_ms
        };
        let secs = (ms / 1000.0) as f32;
        let from = self.current_music.filter(|&c| c != clip);

        let to_vol = self.effective_volume(clip);
        self.cancel_stop(clip);
        if let Some(to) = self.channels[clip.index()].as_mut() {
            to.handle.set_loop(clip.loops_as_music());
            to.looping = clip.loops_as_music();
            if !to.handle.is_playing() {
                to.handle.set_volume(0.0, 0.0);
                to.handle.play();
            }
            to.handle.set_volume(to_vol, secs);
            to.volume = to_vol;
        }

        if let Some(from_clip) = from {
            let mut fading = false;
            if let Some(ch) = self.channels[from_clip.index()].as_mut() {
                if ch.handle.is_playing() {
                    ch.handle.set_volume(0.0, secs);
                    ch.volume = 0.0;
                    fading = true;
                }
            }
            if fading {
                self.schedule_stop(from_clip, now + ms + CROSSFADE_STOP_GRACE_MS);
            }
        }

        log::info!("Crossfade: {:?} -> {:?}", from, clip);
        self.current_music = Some(clip);
    }

    /// Execute any scheduled stops that are due. Returns how many fired.
    pub fn update(&mut self, now: f64) -> usize {
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_stops)
            .into_iter()
            .partition(|s| s.at <= now);
        self.pending_stops = pending;
        for stop in &due {
            if let Some(ch) = self.channels[stop.clip.index()].as_mut() {
                if ch.handle.is_playing() {
                    ch.handle.stop();
                }
            }
        }
        due.len()
    }

    /// Apply a simulation command
    pub fn apply(&mut self, command: AudioCommand, now: f64) {
        match command {
            AudioCommand::Unlock => {
                self.unlock();
            }
            AudioCommand::Sfx(clip) => {
                self.play_sfx(clip, now);
            }
            AudioCommand::SyncLoop { clip, on } => {
                self.sync_loop(clip, on, now);
            }
            AudioCommand::Music(clip) => self.play_music(clip, now),
            AudioCommand::Crossfade(clip) => self.crossfade_to(clip, now),
        }
    }

    fn relevel(&mut self, clip: Clip) {
        let vol = self.effective_volume(clip);
        if let Some(ch) = self.channels[clip.index()].as_mut() {
            ch.handle.set_volume(vol, RELEVEL_RAMP_SECS);
            ch.volume = vol;
        }
    }

    /// Replace any pending stop for `clip`
    fn schedule_stop(&mut self, clip: Clip, at: f64) {
        self.cancel_stop(clip);
        self.pending_stops.push(ScheduledStop { clip, at });
    }

    fn cancel_stop(&mut self, clip: Clip) {
        self.pending_stops.retain(|s| s.clip != clip);
    }
}
