use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum TapeloopError {
    #[error("Audio input error: {0}")]
    Audio(#[from] AudioError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("TUI error: {0}")]
    Tui(#[from] TuiError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Audio input errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Input device not found: {0}")]
    InputDeviceNotFound(String),

    #[error("Input device error: {0}")]
    InputDevice(String),

    #[error("Input stream error: {0}")]
    InputStream(String),

    #[error("Unsupported input sample format: {0}")]
    UnsupportedFormat(String),
}

/// Playback errors
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Audio device error: {0}")]
    Device(String),
}

/// TUI errors
#[derive(Error, Debug)]
pub enum TuiError {
    #[error("Terminal IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tapeloop operations
pub type Result<T> = std::result::Result<T, TapeloopError>;
