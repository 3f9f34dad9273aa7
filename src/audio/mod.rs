mod buffer;
mod capture;

pub use buffer::{LoopBuffers, CHANNELS, SAMPLE_RATE};
pub use capture::{list_input_devices, InputCapture, LiveInput};
