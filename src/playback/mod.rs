mod engine;
mod source;

pub use engine::{list_audio_devices, PlaybackEngine};
pub use source::LooperSource;
