use crate::looper::StereoLooper;

/// Fixed processing rate; fade and minimum loop lengths are counted at this rate
pub const SAMPLE_RATE: u32 = 48_000;

/// Number of audio channels (stereo)
pub const CHANNELS: u16 = 2;

/// Per-channel loop memory, allocated once up front
pub struct LoopBuffers {
    pub left: Box<[f32]>,
    pub right: Box<[f32]>,
}

impl LoopBuffers {
    /// Allocate `seconds` of audio per channel at `sample_rate`
    pub fn allocate(seconds: u32, sample_rate: u32) -> Self {
        let frames = (seconds as usize * sample_rate as usize).max(1);
        Self {
            left: vec![0.0; frames].into_boxed_slice(),
            right: vec![0.0; frames].into_boxed_slice(),
        }
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    /// Hand both buffers to a stereo looper for the rest of its life
    pub fn into_looper(self) -> StereoLooper {
        StereoLooper::new(self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_sizes_each_channel() {
        let buffers = LoopBuffers::allocate(2, SAMPLE_RATE);
        assert_eq!(buffers.frames(), 96_000);
        assert_eq!(buffers.right.len(), 96_000);

        let looper = buffers.into_looper();
        assert_eq!(looper.len(), 96_000);
    }
}
