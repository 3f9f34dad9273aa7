use super::{ControlSnapshot, LooperEngine, LooperState};

/// Left and right loopers driven by one set of controls.
///
/// Each channel owns its own buffer; nothing recorded on one side leaks
/// into the other.
pub struct StereoLooper<B = Box<[f32]>> {
    left: LooperEngine<B>,
    right: LooperEngine<B>,
}

impl<B> StereoLooper<B>
where
    B: AsRef<[f32]> + AsMut<[f32]>,
{
    pub fn new(left: B, right: B) -> Self {
        Self {
            left: LooperEngine::new(left),
            right: LooperEngine::new(right),
        }
    }

    /// Apply a control snapshot to both channels
    pub fn apply(&mut self, controls: &ControlSnapshot) {
        for engine in [&mut self.left, &mut self.right] {
            if let Some((start, length)) = controls.loop_window {
                engine.set_loop(start, length);
            }
            engine.set_recording(controls.recording);
            engine.set_playback_speed(controls.playback_speed);
            engine.set_wet_dry_mix(controls.wet_dry);
        }
    }

    /// Process one stereo frame
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        (self.left.process(left), self.right.process(right))
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Both channels see identical controls, so the left state stands in for the pair
    pub fn state(&self) -> LooperState {
        self.left.state()
    }

    #[allow(dead_code)]
    pub fn left(&self) -> &LooperEngine<B> {
        &self.left
    }

    #[allow(dead_code)]
    pub fn right(&self) -> &LooperEngine<B> {
        &self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(recording: bool, wet_dry: f32) -> ControlSnapshot {
        ControlSnapshot {
            loop_window: Some((0.0, 0.5)),
            recording,
            playback_speed: 1.0,
            wet_dry,
        }
    }

    #[test]
    fn test_channels_do_not_cross_talk() {
        let mut left = vec![0.0f32; 4800];
        let mut right = vec![0.0f32; 4800];
        {
            let mut looper = StereoLooper::new(left.as_mut_slice(), right.as_mut_slice());
            looper.apply(&snapshot(true, 0.5));
            for _ in 0..2000 {
                looper.process(0.6, 0.0);
            }
        }

        assert!(left.iter().any(|&s| s > 0.0));
        assert!(right.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_apply_reaches_both_engines() {
        let mut looper = StereoLooper::new(
            vec![0.0; 9600].into_boxed_slice(),
            vec![0.0; 9600].into_boxed_slice(),
        );
        looper.apply(&ControlSnapshot {
            loop_window: Some((0.5, 0.25)),
            recording: false,
            playback_speed: -0.5,
            wet_dry: 0.2,
        });

        for state in [looper.left().state(), looper.right().state()] {
            assert_eq!(state.loop_length, 2400.0);
            assert_eq!(state.playback_speed, -0.5);
            assert_eq!(state.wet_dry, 0.2);
            assert!(!state.is_recording);
        }
        assert_eq!(looper.len(), 9600);
    }

    #[test]
    fn test_missing_loop_window_keeps_default() {
        let mut looper = StereoLooper::new(
            vec![0.0; 9600].into_boxed_slice(),
            vec![0.0; 9600].into_boxed_slice(),
        );
        looper.apply(&ControlSnapshot {
            loop_window: None,
            ..snapshot(false, 0.5)
        });

        let state = looper.state();
        assert!(!state.is_loop_set);
        assert_eq!(state.loop_length, 9600.0);
    }

    #[test]
    fn test_dry_frame_passes_through() {
        let mut looper = StereoLooper::new(
            vec![0.0; 4800].into_boxed_slice(),
            vec![0.0; 4800].into_boxed_slice(),
        );
        looper.apply(&snapshot(false, 0.0));
        assert_eq!(looper.process(0.3, -0.4), (0.3, -0.4));
    }
}
