use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "tapeloop")]
#[command(about = "Fixed-latency stereo looper with variable-speed playback")]
#[command(version)]
pub struct Args {
    // Audio I/O
    /// Capture from this input device (by name)
    #[arg(long)]
    pub input_device: Option<String>,

    /// Play through this output device (index from --list-devices)
    #[arg(long)]
    pub output_device: Option<usize>,

    /// List audio devices and exit
    #[arg(long)]
    pub list_devices: bool,

    // Looper
    /// Loop memory per channel (seconds)
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u32).range(1..=60))]
    pub buffer_seconds: u32,

    /// Initial loop start knob (0.0-1.0)
    #[arg(long, default_value = "0.0", value_parser = parse_knob)]
    pub loop_start: f32,

    /// Initial loop length knob (0.0-1.0)
    #[arg(long, default_value = "1.0", value_parser = parse_knob)]
    pub loop_length: f32,

    /// Initial pitch knob (0.0 = 2x reverse, 0.5 = stopped, 1.0 = 2x forward)
    #[arg(long, default_value = "0.75", value_parser = parse_knob)]
    pub pitch: f32,

    /// Initial wet/dry mix knob (0.0 = dry, 1.0 = wet)
    #[arg(long, default_value = "0.5", value_parser = parse_knob)]
    pub mix: f32,

    // Debug
    /// Write logs here instead of the cache directory
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse a normalized knob position
fn parse_knob(value: &str) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (0.0..=1.0).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("{} is outside 0.0-1.0", parsed))
    }
}
