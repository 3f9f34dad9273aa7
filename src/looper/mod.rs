mod controls;
mod engine;
mod stereo;

pub use controls::{ControlSnapshot, LooperControls, LooperMeter, MeterReading};
pub use engine::{LooperEngine, LooperState};
pub use stereo::StereoLooper;

/// Width of the loop-boundary crossfade and the punch in/out ramp (samples)
pub const FADE_LENGTH: f32 = 600.0;

/// Shortest loop window: a full fade in followed by a full fade out
pub const MIN_LOOP_LENGTH: f32 = 2.0 * FADE_LENGTH;

/// Audio frames between control snapshots (1 ms at 48 kHz)
pub const CONTROL_INTERVAL: usize = 48;
