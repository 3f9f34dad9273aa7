mod app;
mod audio;
mod cli;
mod error;
mod looper;
mod playback;
mod tui;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::app::{AppState, Knobs};
use crate::audio::{list_input_devices, InputCapture, LoopBuffers, SAMPLE_RATE};
use crate::cli::Args;
use crate::error::{Result, TapeloopError};
use crate::playback::{list_audio_devices, LooperSource, PlaybackEngine};
use crate::tui::TuiApp;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        print_devices();
        return Ok(());
    }

    // The terminal belongs to the TUI, so logs go to a file
    let log_path = init_tracing(args.verbose, args.log_file.as_deref())?;

    info!(log = %log_path.display(), "tapeloop v{} starting", env!("CARGO_PKG_VERSION"));

    // Create shared application state
    let state = AppState::new(Knobs::from_args(&args));

    // Set up graceful shutdown
    let shutdown_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Received Ctrl-C, shutting down...");
        shutdown_state.quit();
    });

    // Run the application
    if let Err(e) = run(state, args).await {
        error!("Application error: {}", e);
        return Err(e);
    }

    info!("tapeloop shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber writing to `log_file` or the cache directory
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<PathBuf> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let path = log_file.map(Path::to_path_buf).unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tapeloop")
            .join("tapeloop.log")
    });

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            TapeloopError::Config(format!("cannot create log directory {}: {}", parent.display(), e))
        })?;
    }
    let file = File::create(&path)
        .map_err(|e| TapeloopError::Config(format!("cannot open log file {}: {}", path.display(), e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    Ok(path)
}

fn print_devices() {
    println!("Output devices:");
    for device in list_audio_devices() {
        println!("  {}: {}", device.index, device.name);
    }

    println!("Input devices:");
    for name in list_input_devices() {
        println!("  {}", name);
    }
}

/// Main application loop
async fn run(state: Arc<AppState>, args: Args) -> Result<()> {
    let knobs = state.knobs();
    info!(
        input_device = ?args.input_device,
        output_device = ?args.output_device,
        buffer_seconds = args.buffer_seconds,
        loop_start = knobs.loop_start,
        loop_length = knobs.loop_length,
        speed = knobs.playback_speed(),
        mix = knobs.wet_dry,
        "Starting session"
    );

    // Loop memory is allocated once and handed to the audio thread
    let buffers = LoopBuffers::allocate(args.buffer_seconds, SAMPLE_RATE);
    info!(frames = buffers.frames(), "Allocated loop buffers");
    let looper = buffers.into_looper();

    // Capture runs until `capture` is dropped at the end of this function
    let (capture, input) = InputCapture::open(args.input_device.as_deref(), Arc::clone(&state.meter))?;

    let source = LooperSource::new(
        input,
        looper,
        Arc::clone(&state.controls),
        Arc::clone(&state.meter),
    );

    let mut playback = PlaybackEngine::with_device(args.output_device)?;
    playback.play(source);

    let route = format!("{} -> {}", capture.device_name(), playback.device_name());
    let mut tui = TuiApp::new(Arc::clone(&state), args.buffer_seconds, route)?;

    info!("TUI started - press 'q' to quit");

    let mut reported_underruns = 0;
    let mut reported_stream_errors = 0;
    let mut output_stopped = false;

    // Main event loop
    loop {
        // Handle TUI input
        let should_quit = tui.handle_input()?;
        if should_quit || state.is_quitting() {
            break;
        }

        let underruns = state.meter.underruns();
        if underruns > reported_underruns {
            warn!(
                new = underruns - reported_underruns,
                total = underruns,
                "Input underrun, silence inserted"
            );
            reported_underruns = underruns;
        }

        let stream_errors = state.meter.stream_errors();
        if stream_errors > reported_stream_errors {
            warn!(
                new = stream_errors - reported_stream_errors,
                total = stream_errors,
                "Input stream errors"
            );
            tui.set_error(format!("Input stream error ({} total, see log)", stream_errors));
            reported_stream_errors = stream_errors;
        }

        if !output_stopped && !playback.is_playing() {
            warn!("Playback stopped unexpectedly");
            tui.set_error("Audio output stopped".to_string());
            output_stopped = true;
        }

        tui.draw()?;

        // Small delay to prevent busy loop
        tokio::time::sleep(tokio::time::Duration::from_millis(16)).await; // ~60 FPS
    }

    // Clean shutdown
    playback.stop();
    tui.cleanup();

    Ok(())
}
