use std::sync::Arc;
use std::time::Duration;

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use rodio::cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rodio::cpal::{self, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig, StreamError};
use rodio::Source;
use tracing::{debug, info, instrument, warn};

use crate::error::AudioError;
use crate::looper::LooperMeter;

/// Capture ring capacity in milliseconds; newer input is dropped beyond this
const RING_MILLIS: usize = 100;

/// Largest input backlog the reader keeps; anything older is skipped
const MAX_BACKLOG_MILLIS: usize = 20;

/// Names of the available audio input devices
pub fn list_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices
            .enumerate()
            .map(|(index, device)| device.name().unwrap_or_else(|_| format!("Input {}", index)))
            .collect(),
        Err(e) => {
            warn!(error = %e, "Failed to enumerate input devices");
            Vec::new()
        }
    }
}

/// Live capture from an input device.
///
/// Owns the device stream; capture stops when this is dropped. The
/// matching [`LiveInput`] is the consuming end that the looper reads from.
pub struct InputCapture {
    _stream: Stream,
    device_name: String,
}

impl InputCapture {
    /// Open `device_name` (or the default input) and start capturing
    #[instrument(skip(meter))]
    pub fn open(device_name: Option<&str>, meter: Arc<LooperMeter>) -> Result<(Self, LiveInput), AudioError> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| AudioError::InputDevice(e.to_string()))?
                .find(|d| d.name().ok().as_deref() == Some(name))
                .ok_or_else(|| AudioError::InputDeviceNotFound(name.to_string()))?,
            None => host.default_input_device().ok_or(AudioError::NoInputDevice)?,
        };
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::InputDevice(format!("{}: {}", name, e)))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();

        info!(
            device = %name,
            channels = config.channels,
            sample_rate = config.sample_rate.0,
            format = ?sample_format,
            "Opening audio input"
        );

        let capacity = (config.sample_rate.0 as usize * RING_MILLIS / 1000).max(1) * config.channels as usize;
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, producer, Arc::clone(&meter))?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, producer, Arc::clone(&meter))?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, producer, Arc::clone(&meter))?,
            format => return Err(AudioError::UnsupportedFormat(format.to_string())),
        };
        stream
            .play()
            .map_err(|e| AudioError::InputStream(e.to_string()))?;

        debug!(capacity, "Input capture running");

        let input = LiveInput::new(consumer, config.channels, config.sample_rate.0, meter);
        Ok((
            Self {
                _stream: stream,
                device_name: name,
            },
            input,
        ))
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: HeapProducer<f32>,
    meter: Arc<LooperMeter>,
) -> Result<Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks_exact(channels) {
                    // Whole frames only, so the reader never loses channel alignment
                    if producer.free_len() < channels {
                        break;
                    }
                    for &sample in frame {
                        let _ = producer.push(f32::from_sample(sample));
                    }
                }
            },
            stream_error_handler(meter),
            None,
        )
        .map_err(|e| AudioError::InputStream(e.to_string()))
}

fn stream_error_handler(meter: Arc<LooperMeter>) -> impl FnMut(StreamError) + Send + 'static {
    move |err| {
        warn!(error = %err, "Input stream error");
        meter.add_stream_error();
    }
}

/// Reading end of a live capture, usable as a sample source.
///
/// Never ends. When the device has not delivered a whole frame yet a silent
/// frame is produced and counted as an underrun. A backlog longer than
/// [`MAX_BACKLOG_MILLIS`] (e.g. input that ran before output started) is
/// skipped so that the newest frames are the ones heard.
pub struct LiveInput {
    consumer: HeapConsumer<f32>,
    channels: u16,
    sample_rate: u32,
    meter: Arc<LooperMeter>,
    /// Backlog limit in samples, a whole number of frames
    max_backlog: usize,
    channel: usize,
    frame_ready: bool,
}

impl LiveInput {
    pub fn new(consumer: HeapConsumer<f32>, channels: u16, sample_rate: u32, meter: Arc<LooperMeter>) -> Self {
        let channels = channels.max(1);
        let max_backlog = (sample_rate as usize * MAX_BACKLOG_MILLIS / 1000).max(1) * channels as usize;
        Self {
            consumer,
            channels,
            sample_rate,
            meter,
            max_backlog,
            channel: 0,
            frame_ready: false,
        }
    }
}

impl Iterator for LiveInput {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.channel == 0 {
            let backlog = self.consumer.len();
            if backlog > self.max_backlog {
                let excess = backlog - self.max_backlog;
                self.consumer.skip(excess - excess % self.channels as usize);
            }
            self.frame_ready = self.consumer.len() >= self.channels as usize;
            if !self.frame_ready {
                self.meter.add_underruns(1);
            }
        }

        let sample = if self.frame_ready {
            self.consumer.pop().unwrap_or(0.0)
        } else {
            0.0
        };

        self.channel = (self.channel + 1) % self.channels as usize;
        Some(sample)
    }
}

impl Source for LiveInput {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
