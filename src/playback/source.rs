use std::sync::Arc;
use std::time::Duration;

use rodio::source::UniformSourceIterator;
use rodio::cpal::FromSample;
use rodio::{Sample, Source};

use crate::audio::{CHANNELS, SAMPLE_RATE};
use crate::looper::{LooperControls, LooperMeter, StereoLooper, CONTROL_INTERVAL};

/// Runs an input signal through the stereo looper, one frame at a time.
///
/// The input is converted to the looper's fixed rate and layout first so
/// that fade lengths always mean the same amount of time. Controls are
/// picked up and the meter refreshed once every [`CONTROL_INTERVAL`] frames.
pub struct LooperSource<S>
where
    S: Source,
    S::Item: Sample,
{
    input: UniformSourceIterator<S, f32>,
    looper: StereoLooper,
    controls: Arc<LooperControls>,
    meter: Arc<LooperMeter>,
    /// Frames left until the next control tick
    until_tick: usize,
    /// Right sample of the current frame, waiting to be yielded
    pending_right: Option<f32>,
    peak: f32,
}

impl<S> LooperSource<S>
where
    S: Source,
    S::Item: Sample,
{
    pub fn new(
        input: S,
        looper: StereoLooper,
        controls: Arc<LooperControls>,
        meter: Arc<LooperMeter>,
    ) -> Self {
        Self {
            input: UniformSourceIterator::new(input, CHANNELS, SAMPLE_RATE),
            looper,
            controls,
            meter,
            until_tick: 0,
            pending_right: None,
            peak: 0.0,
        }
    }

    fn control_tick(&mut self) {
        let snapshot = self.controls.snapshot();
        self.looper.apply(&snapshot);
        self.meter
            .publish(self.looper.len(), &self.looper.state(), self.peak);
        self.peak = 0.0;
        self.until_tick = CONTROL_INTERVAL;
    }
}

impl<S> Iterator for LooperSource<S>
where
    S: Source,
    S::Item: Sample,
    f32: FromSample<S::Item>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if let Some(right) = self.pending_right.take() {
            return Some(right);
        }

        if self.until_tick == 0 {
            self.control_tick();
        }
        self.until_tick -= 1;

        let left = self.input.next()?;
        let right = self.input.next().unwrap_or(0.0);

        let (left, right) = self.looper.process(left, right);
        self.peak = self.peak.max(left.abs()).max(right.abs());
        self.pending_right = Some(right);

        Some(left)
    }
}

impl<S> Source for LooperSource<S>
where
    S: Source,
    S::Item: Sample,
    f32: FromSample<S::Item>,
{
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
