use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, info, instrument, warn};

use crate::error::PlaybackError;

/// Audio device information
#[derive(Debug, Clone)]
pub struct AudioDevice {
    pub name: String,
    pub index: usize,
}

/// Get list of available audio output devices
pub fn list_audio_devices() -> Vec<AudioDevice> {
    let host = rodio::cpal::default_host();
    let mut devices = Vec::new();

    match host.output_devices() {
        Ok(output_devices) => {
            for (index, device) in output_devices.enumerate() {
                let name = device.name().unwrap_or_else(|_| format!("Device {}", index));
                devices.push(AudioDevice { name, index });
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to enumerate audio devices");
        }
    }

    if devices.is_empty() {
        devices.push(AudioDevice {
            name: "Default".to_string(),
            index: 0,
        });
    }

    devices
}

/// Output side of the looper: one device stream and one sink
pub struct PlaybackEngine {
    /// Keep the stream alive (dropping it stops audio)
    _stream: OutputStream,
    /// Handle for creating sinks
    _stream_handle: OutputStreamHandle,
    /// Audio sink for playback control
    sink: Sink,
    device_name: String,
}

impl PlaybackEngine {
    /// Open the output device at `device_index`, or the default output
    #[instrument]
    pub fn with_device(device_index: Option<usize>) -> Result<Self, PlaybackError> {
        info!("Initializing audio output");

        let host = rodio::cpal::default_host();

        let selected = device_index.and_then(|index| {
            let device = host.output_devices().ok()?.nth(index);
            if device.is_none() {
                warn!(index, "Device index out of range, using default");
            }
            device
        });

        let opened = selected.and_then(|device| {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            match OutputStream::try_from_device(&device) {
                Ok((stream, handle)) => {
                    info!(device = %name, "Using selected audio device");
                    Some((stream, handle, name))
                }
                Err(e) => {
                    warn!(error = %e, "Failed to open selected device, using default");
                    None
                }
            }
        });

        let (stream, stream_handle, device_name) = match opened {
            Some(opened) => opened,
            None => {
                let (stream, handle) = OutputStream::try_default()
                    .map_err(|e| PlaybackError::Device(format!("Failed to open audio device: {}", e)))?;
                let name = host
                    .default_output_device()
                    .and_then(|d| d.name().ok())
                    .unwrap_or_else(|| "Default".to_string());
                (stream, handle, name)
            }
        };

        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| PlaybackError::Device(format!("Failed to create audio sink: {}", e)))?;

        debug!(device = %device_name, "Audio output initialized");

        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
            sink,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Replace whatever is playing with `source`
    #[instrument(skip(self, source))]
    pub fn play<S>(&mut self, source: S)
    where
        S: Source<Item = f32> + Send + 'static,
    {
        info!(
            channels = source.channels(),
            sample_rate = source.sample_rate(),
            "Starting playback"
        );

        self.sink.clear();
        self.sink.append(source);

        // clear() leaves the sink paused
        self.sink.play();
    }

    /// Check if audio is currently playing
    pub fn is_playing(&self) -> bool {
        !self.sink.empty() && !self.sink.is_paused()
    }

    /// Stop playback
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        info!("Stopping playback");
        self.sink.clear();
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        debug!("Dropping playback engine");
        self.stop();
    }
}
