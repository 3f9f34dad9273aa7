use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use super::LooperState;

/// An `f32` stored as its bit pattern so it can be shared without locks
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Parameters requested by the control context.
///
/// Every field is an independent scalar. The audio context loads a
/// [`ControlSnapshot`] once per control tick and feeds it to the engine
/// setters itself, so a racing write costs at most one stale tick.
#[derive(Debug)]
pub struct LooperControls {
    loop_start: AtomicF32,
    loop_length: AtomicF32,
    loop_set: AtomicBool,
    recording: AtomicBool,
    playback_speed: AtomicF32,
    wet_dry: AtomicF32,
}

/// One consistent-enough read of [`LooperControls`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    /// Normalized (start, length); `None` until a loop has been requested
    pub loop_window: Option<(f32, f32)>,
    pub recording: bool,
    pub playback_speed: f32,
    pub wet_dry: f32,
}

impl LooperControls {
    pub fn new() -> Self {
        Self {
            loop_start: AtomicF32::new(0.0),
            loop_length: AtomicF32::new(1.0),
            loop_set: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            playback_speed: AtomicF32::new(1.0),
            wet_dry: AtomicF32::new(0.5),
        }
    }

    pub fn set_loop(&self, start: f32, length: f32) {
        self.loop_start.store(start);
        self.loop_length.store(length);
        self.loop_set.store(true, Ordering::Release);
    }

    pub fn set_recording(&self, on: bool) {
        self.recording.store(on, Ordering::Relaxed);
    }

    pub fn set_playback_speed(&self, speed: f32) {
        self.playback_speed.store(speed);
    }

    pub fn set_wet_dry_mix(&self, wet_dry: f32) {
        self.wet_dry.store(wet_dry);
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        let loop_window = self
            .loop_set
            .load(Ordering::Acquire)
            .then(|| (self.loop_start.load(), self.loop_length.load()));

        ControlSnapshot {
            loop_window,
            recording: self.recording.load(Ordering::Relaxed),
            playback_speed: self.playback_speed.load(),
            wet_dry: self.wet_dry.load(),
        }
    }
}

impl Default for LooperControls {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport state published by the audio context for display.
///
/// Written once per control tick, read by the UI at frame rate.
#[derive(Debug)]
pub struct LooperMeter {
    buffer_length: AtomicU32,
    loop_start: AtomicF32,
    loop_length: AtomicF32,
    play_head: AtomicF32,
    rec_envelope: AtomicF32,
    recording: AtomicBool,
    empty: AtomicBool,
    peak: AtomicF32,
    underruns: AtomicU64,
    stream_errors: AtomicU64,
}

/// What the UI needs to draw the loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterReading {
    pub buffer_length: u32,
    pub loop_start: f32,
    pub loop_length: f32,
    pub play_head: f32,
    /// Punch envelope position, 0.0 to 1.0
    pub rec_envelope: f32,
    pub recording: bool,
    pub empty: bool,
    /// Largest absolute output sample since the previous publish
    pub peak: f32,
}

impl MeterReading {
    /// Loop start as a fraction of the buffer
    pub fn loop_start_fraction(&self) -> f32 {
        if self.buffer_length == 0 {
            return 0.0;
        }
        self.loop_start / self.buffer_length as f32
    }

    /// Loop length as a fraction of the buffer
    pub fn loop_length_fraction(&self) -> f32 {
        if self.buffer_length == 0 {
            return 0.0;
        }
        (self.loop_length / self.buffer_length as f32).min(1.0)
    }

    /// Play head progress through the loop window
    pub fn progress(&self) -> f32 {
        if self.loop_length <= 0.0 {
            return 0.0;
        }
        (self.play_head / self.loop_length).clamp(0.0, 1.0)
    }
}

impl LooperMeter {
    pub fn new() -> Self {
        Self {
            buffer_length: AtomicU32::new(0),
            loop_start: AtomicF32::new(0.0),
            loop_length: AtomicF32::new(0.0),
            play_head: AtomicF32::new(0.0),
            rec_envelope: AtomicF32::new(0.0),
            recording: AtomicBool::new(false),
            empty: AtomicBool::new(true),
            peak: AtomicF32::new(0.0),
            underruns: AtomicU64::new(0),
            stream_errors: AtomicU64::new(0),
        }
    }

    /// Publish one engine's state along with the recent output peak
    pub fn publish(&self, buffer_length: usize, state: &LooperState, peak: f32) {
        self.buffer_length
            .store(u32::try_from(buffer_length).unwrap_or(u32::MAX), Ordering::Relaxed);
        self.loop_start.store(state.loop_start);
        self.loop_length.store(state.loop_length);
        self.play_head.store(state.play_head_pos);
        self.rec_envelope.store(state.rec_env_pos / super::FADE_LENGTH);
        self.recording.store(state.is_recording, Ordering::Relaxed);
        self.empty.store(state.is_empty, Ordering::Relaxed);
        self.peak.store(peak);
    }

    pub fn read(&self) -> MeterReading {
        MeterReading {
            buffer_length: self.buffer_length.load(Ordering::Relaxed),
            loop_start: self.loop_start.load(),
            loop_length: self.loop_length.load(),
            play_head: self.play_head.load(),
            rec_envelope: self.rec_envelope.load(),
            recording: self.recording.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            peak: self.peak.load(),
        }
    }

    /// Count input frames that arrived too late and were replaced by silence
    pub fn add_underruns(&self, count: u64) {
        self.underruns.fetch_add(count, Ordering::Relaxed);
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Called from the input device's error callback
    pub fn add_stream_error(&self) {
        self.stream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_errors(&self) -> u64 {
        self.stream_errors.load(Ordering::Relaxed)
    }
}

impl Default for LooperMeter {
    fn default() -> Self {
        Self::new()
    }
}
