use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cli::Args;
use crate::looper::{LooperControls, LooperMeter};

/// Fastest playback in either direction
pub const MAX_SPEED: f32 = 2.0;

/// Map the pitch knob to a signed playback speed.
///
/// Centre is stopped, fully left is `-MAX_SPEED` (reverse), fully right is
/// `+MAX_SPEED`.
pub fn playback_speed_from_knob(value: f32) -> f32 {
    let value = value.clamp(0.0, 1.0);
    if value < 0.5 {
        -(1.0 - 2.0 * value) * MAX_SPEED
    } else {
        (2.0 * value - 1.0) * MAX_SPEED
    }
}

/// The four front-panel knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Knob {
    LoopStart,
    LoopLength,
    Pitch,
    WetDry,
}

impl Knob {
    pub const ALL: [Knob; 4] = [Knob::LoopStart, Knob::LoopLength, Knob::Pitch, Knob::WetDry];

    pub fn label(&self) -> &'static str {
        match self {
            Knob::LoopStart => "Start",
            Knob::LoopLength => "Length",
            Knob::Pitch => "Pitch",
            Knob::WetDry => "Mix",
        }
    }

    pub fn next(&self) -> Knob {
        match self {
            Knob::LoopStart => Knob::LoopLength,
            Knob::LoopLength => Knob::Pitch,
            Knob::Pitch => Knob::WetDry,
            Knob::WetDry => Knob::LoopStart,
        }
    }
}

/// Normalized knob positions plus the record switch
#[derive(Debug, Clone, PartialEq)]
pub struct Knobs {
    pub loop_start: f32,
    pub loop_length: f32,
    pub pitch: f32,
    pub wet_dry: f32,
    pub record: bool,
}

impl Default for Knobs {
    fn default() -> Self {
        Self {
            loop_start: 0.0,
            loop_length: 1.0,
            pitch: 0.75,
            wet_dry: 0.5,
            record: false,
        }
    }
}

impl Knobs {
    pub fn from_args(args: &Args) -> Self {
        Self {
            loop_start: args.loop_start,
            loop_length: args.loop_length,
            pitch: args.pitch,
            wet_dry: args.mix,
            record: false,
        }
    }

    pub fn get(&self, knob: Knob) -> f32 {
        match knob {
            Knob::LoopStart => self.loop_start,
            Knob::LoopLength => self.loop_length,
            Knob::Pitch => self.pitch,
            Knob::WetDry => self.wet_dry,
        }
    }

    /// Set a knob, clamped to its travel
    pub fn set(&mut self, knob: Knob, value: f32) {
        let value = if value.is_nan() { self.get(knob) } else { value.clamp(0.0, 1.0) };
        match knob {
            Knob::LoopStart => self.loop_start = value,
            Knob::LoopLength => self.loop_length = value,
            Knob::Pitch => self.pitch = value,
            Knob::WetDry => self.wet_dry = value,
        }
    }

    /// Turn a knob by `delta`
    pub fn nudge(&mut self, knob: Knob, delta: f32) {
        self.set(knob, self.get(knob) + delta);
    }

    pub fn toggle_record(&mut self) {
        self.record = !self.record;
    }

    pub fn playback_speed(&self) -> f32 {
        playback_speed_from_knob(self.pitch)
    }

    /// Translate knob positions into looper parameters
    pub fn apply(&self, controls: &LooperControls) {
        controls.set_loop(self.loop_start, self.loop_length);
        controls.set_recording(self.record);
        controls.set_playback_speed(self.playback_speed());
        controls.set_wet_dry_mix(self.wet_dry);
    }
}

/// Shared application state
pub struct AppState {
    /// Knob positions (modifiable via TUI)
    knobs: RwLock<Knobs>,
    /// Parameters handed to the audio thread
    pub controls: Arc<LooperControls>,
    /// Transport state coming back from the audio thread
    pub meter: Arc<LooperMeter>,
    /// Shutdown flag
    should_quit: AtomicBool,
}

impl AppState {
    pub fn new(knobs: Knobs) -> Arc<Self> {
        let controls = Arc::new(LooperControls::new());
        knobs.apply(&controls);

        Arc::new(Self {
            knobs: RwLock::new(knobs),
            controls,
            meter: Arc::new(LooperMeter::new()),
            should_quit: AtomicBool::new(false),
        })
    }

    pub fn knobs(&self) -> Knobs {
        self.knobs.read().clone()
    }

    /// Change the knobs and forward the result to the looper
    pub fn update_knobs(&self, update: impl FnOnce(&mut Knobs)) {
        let mut knobs = self.knobs.write();
        update(&mut knobs);
        knobs.apply(&self.controls);
    }

    /// Signal shutdown
    pub fn quit(&self) {
        self.should_quit.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown requested
    pub fn is_quitting(&self) -> bool {
        self.should_quit.load(Ordering::SeqCst)
    }
}
