use super::{FADE_LENGTH, MIN_LOOP_LENGTH};

/// Snapshot of an engine's transport and loop state
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LooperState {
    pub loop_start: f32,
    pub loop_length: f32,
    pub pending_loop_start: f32,
    pub pending_loop_length: f32,
    pub play_head_pos: f32,
    pub rec_head: f32,
    pub rec_env_pos: f32,
    pub playback_speed: f32,
    pub wet_dry: f32,
    pub is_recording: bool,
    pub is_empty: bool,
    pub is_loop_set: bool,
}

/// Single-channel looper over a fixed circular buffer.
///
/// The buffer is anything that derefs to a mutable `f32` slice: an owned
/// `Box<[f32]>` or a `&mut [f32]` borrowed from a caller-managed arena.
/// Its length is fixed for the engine's lifetime.
///
/// Setters are cheap scalar writes meant for control rate; [`process`](Self::process)
/// runs once per audio frame and never allocates.
pub struct LooperEngine<B = Box<[f32]>> {
    buffer: B,
    buffer_length: usize,

    loop_start: f32,
    loop_length: f32,
    pending_loop_start: f32,
    pending_loop_length: f32,

    play_head_pos: f32,
    rec_head: f32,

    rec_env_pos: f32,
    /// Punch envelope direction: +1 ramping in, -1 ramping out, 0 idle
    rec_env_inc: i8,
    is_empty: bool,
    is_loop_set: bool,

    /// Signed: negative plays in reverse
    playback_speed: f32,
    wet_dry: f32,
}

impl<B> LooperEngine<B>
where
    B: AsRef<[f32]> + AsMut<[f32]>,
{
    /// Bind an engine to `buffer`, zero-filling it.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    pub fn new(buffer: B) -> Self {
        let buffer_length = buffer.as_ref().len();
        assert!(buffer_length > 0, "looper buffer must not be empty");

        let mut engine = Self {
            buffer,
            buffer_length,
            loop_start: 0.0,
            loop_length: 0.0,
            pending_loop_start: 0.0,
            pending_loop_length: 0.0,
            play_head_pos: 0.0,
            rec_head: 0.0,
            rec_env_pos: 0.0,
            rec_env_inc: 0,
            is_empty: true,
            is_loop_set: false,
            playback_speed: 1.0,
            wet_dry: 0.5,
        };
        engine.reset();
        engine
    }

    /// Clear the buffer and return every head and envelope to rest.
    ///
    /// Until the next `set_loop` the whole buffer is the loop window.
    pub fn reset(&mut self) {
        self.buffer.as_mut().fill(0.0);

        let full = (self.buffer_length as f32).max(MIN_LOOP_LENGTH);
        self.loop_start = 0.0;
        self.loop_length = full;
        self.pending_loop_start = 0.0;
        self.pending_loop_length = full;

        self.play_head_pos = 0.0;
        self.rec_head = 0.0;
        self.rec_env_pos = 0.0;
        self.rec_env_inc = 0;
        self.is_empty = true;
        self.is_loop_set = false;
    }

    /// Number of samples in the buffer
    pub fn len(&self) -> usize {
        self.buffer_length
    }

    /// Read-only view of the recorded material
    #[allow(dead_code)]
    pub fn buffer(&self) -> &[f32] {
        self.buffer.as_ref()
    }

    /// Whether nothing has ever been recorded since the last reset
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn state(&self) -> LooperState {
        LooperState {
            loop_start: self.loop_start,
            loop_length: self.loop_length,
            pending_loop_start: self.pending_loop_start,
            pending_loop_length: self.pending_loop_length,
            play_head_pos: self.play_head_pos,
            rec_head: self.rec_head,
            rec_env_pos: self.rec_env_pos,
            playback_speed: self.playback_speed,
            wet_dry: self.wet_dry,
            is_recording: self.rec_env_inc > 0,
            is_empty: self.is_empty,
            is_loop_set: self.is_loop_set,
        }
    }

    /// Request a new loop window from normalized start and length (0.0 to 1.0).
    ///
    /// The first call takes effect immediately. After that the window is
    /// only pending until the play head next crosses a loop boundary.
    pub fn set_loop(&mut self, start: f32, length: f32) {
        if start.is_nan() || length.is_nan() {
            return;
        }
        let start = start.clamp(0.0, 1.0);
        let length = length.clamp(0.0, 1.0);

        self.pending_loop_start = start * (self.buffer_length as f32 - 1.0);
        self.pending_loop_length = MIN_LOOP_LENGTH.max(length * self.buffer_length as f32);

        if !self.is_loop_set {
            self.loop_start = self.pending_loop_start;
            self.loop_length = self.pending_loop_length;
            self.is_loop_set = true;
        }
    }

    /// Punch in (`true`) or out (`false`).
    ///
    /// Punching in moves the record head under the current play position.
    pub fn set_recording(&mut self, on: bool) {
        if on && self.rec_env_inc <= 0 {
            self.rec_head = (self.loop_start + self.play_head_pos).rem_euclid(self.buffer_length as f32);
            self.is_empty = false;
        }
        self.rec_env_inc = if on { 1 } else { -1 };
    }

    /// Set playback rate; the sign selects direction.
    ///
    /// Magnitude is limited to 2.0. Slow speeds near zero are allowed.
    pub fn set_playback_speed(&mut self, speed: f32) {
        if speed.is_nan() {
            return;
        }
        self.playback_speed = speed.clamp(-2.0, 2.0);
    }

    /// 0.0 is fully dry input, 1.0 is fully wet loop playback
    pub fn set_wet_dry_mix(&mut self, wet_dry: f32) {
        if wet_dry.is_nan() {
            return;
        }
        self.wet_dry = wet_dry.clamp(0.0, 1.0);
    }

    /// Process one input sample and return one output sample.
    pub fn process(&mut self, input: f32) -> f32 {
        let playback = self.read_playback() * self.loop_fade();
        let output = input * (1.0 - self.wet_dry) + playback * self.wet_dry;

        self.advance_envelope();

        // Recording is disabled at both extremes of the mix control
        if self.rec_env_pos > 0.0 && self.wet_dry > 0.0 && self.wet_dry < 1.0 {
            self.overdub(input, playback);
        }

        self.advance_play_head();

        output
    }

    /// Linear fade at both ends of the loop window
    fn loop_fade(&self) -> f32 {
        if self.play_head_pos < FADE_LENGTH {
            self.play_head_pos / FADE_LENGTH
        } else if self.play_head_pos >= self.loop_length - FADE_LENGTH {
            (self.loop_length - self.play_head_pos) / FADE_LENGTH
        } else {
            1.0
        }
    }

    /// Linearly interpolated read at the play head
    fn read_playback(&self) -> f32 {
        let length = self.buffer_length as f32;
        let mut pos = (self.loop_start + self.play_head_pos).rem_euclid(length);
        // rem_euclid can round up to exactly `length` for tiny negatives
        if pos >= length {
            pos -= length;
        }

        let idx0 = pos as usize % self.buffer_length;
        let idx1 = (idx0 + 1) % self.buffer_length;
        let frac = pos.fract();

        let buffer = self.buffer.as_ref();
        buffer[idx0] * (1.0 - frac) + buffer[idx1] * frac
    }

    fn advance_envelope(&mut self) {
        if (self.rec_env_inc > 0 && self.rec_env_pos < FADE_LENGTH)
            || (self.rec_env_inc < 0 && self.rec_env_pos > 0.0)
        {
            self.rec_env_pos = (self.rec_env_pos + f32::from(self.rec_env_inc)).clamp(0.0, FADE_LENGTH);
        }
    }

    fn overdub(&mut self, input: f32, playback: f32) {
        let rec_attenuation = self.rec_env_pos / FADE_LENGTH;
        let mixed = (input * (1.0 - self.wet_dry) + playback * self.wet_dry).clamp(-1.0, 1.0);

        let idx = self.rec_head as usize % self.buffer_length;
        let cell = &mut self.buffer.as_mut()[idx];
        *cell = mixed * rec_attenuation + *cell * (1.0 - rec_attenuation);

        self.rec_head += 1.0;
        if self.rec_head >= self.buffer_length as f32 {
            self.rec_head -= self.buffer_length as f32;
        }
        self.is_empty = false;
    }

    fn advance_play_head(&mut self) {
        self.play_head_pos += self.playback_speed;
        if self.play_head_pos >= self.loop_length || self.play_head_pos < 0.0 {
            self.loop_start = self.pending_loop_start;
            self.loop_length = self.pending_loop_length;

            self.play_head_pos %= self.loop_length;
            if self.play_head_pos < 0.0 {
                self.play_head_pos += self.loop_length;
            }
            if self.play_head_pos >= self.loop_length {
                self.play_head_pos = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const BUFFER_LEN: usize = 48_000;

    fn engine() -> LooperEngine {
        LooperEngine::new(vec![0.0; BUFFER_LEN].into_boxed_slice())
    }

    fn run(engine: &mut LooperEngine, input: f32, frames: usize) {
        for _ in 0..frames {
            engine.process(input);
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_new_zero_fills_buffer() {
        let mut storage = vec![0.7f32; 2048];
        let engine = LooperEngine::new(storage.as_mut_slice());

        assert!(engine.buffer().iter().all(|&s| s == 0.0));
        assert!(engine.is_empty());
        assert_eq!(engine.len(), 2048);
        assert!(!engine.state().is_loop_set);
    }

    #[test]
    #[should_panic]
    fn test_empty_buffer_panics() {
        let _ = LooperEngine::new(Vec::<f32>::new().into_boxed_slice());
    }

    #[test]
    fn test_first_set_loop_latches_immediately() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);

        let state = engine.state();
        assert_eq!(state.loop_start, 0.0);
        assert_eq!(state.loop_length, 4800.0);
        assert!(state.is_loop_set);
    }

    #[test]
    fn test_set_loop_enforces_minimum_length() {
        let mut engine = engine();
        engine.set_loop(0.5, 0.0);

        let state = engine.state();
        assert_eq!(state.loop_length, MIN_LOOP_LENGTH);
        assert!(approx(state.loop_start, 0.5 * (BUFFER_LEN as f32 - 1.0)));
    }

    #[test]
    fn test_pending_loop_latches_at_boundary() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);
        engine.set_loop(0.0, 0.2);

        assert_eq!(engine.state().pending_loop_length, 9600.0);

        for frame in 0..4799 {
            engine.process(0.0);
            assert_eq!(engine.state().loop_length, 4800.0, "latched early at frame {}", frame);
        }

        // The advance past 4799 is the wrap sample
        engine.process(0.0);
        let state = engine.state();
        assert_eq!(state.loop_length, 9600.0);
        // Reduced modulo the new length
        assert_eq!(state.play_head_pos, 4800.0);
    }

    #[test]
    fn test_zero_speed_keeps_pending_window_pending() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);
        engine.set_playback_speed(0.0);
        engine.set_loop(0.5, 0.3);

        run(&mut engine, 0.3, 100_000);

        let state = engine.state();
        assert_eq!(state.loop_start, 0.0);
        assert_eq!(state.loop_length, 4800.0);
        assert!((state.pending_loop_length - 14_400.0).abs() < 0.01);
        assert_eq!(state.play_head_pos, 0.0);
    }

    #[test]
    fn test_loop_fade_shape() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);

        let mut fade_at = |pos: f32| {
            engine.play_head_pos = pos;
            engine.loop_fade()
        };

        assert_eq!(fade_at(0.0), 0.0);
        assert!(approx(fade_at(300.0), 0.5));
        assert_eq!(fade_at(600.0), 1.0);
        assert_eq!(fade_at(2400.0), 1.0);
        assert_eq!(fade_at(4199.0), 1.0);
        assert_eq!(fade_at(4200.0), 1.0);
        assert!(approx(fade_at(4500.0), 0.5));
        assert!(approx(fade_at(4799.0), 1.0 / 600.0));
        assert_eq!(fade_at(4800.0), 0.0);
    }

    #[test]
    fn test_punch_envelope_ramps_and_saturates() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);
        engine.set_recording(true);

        for frame in 1..=700 {
            engine.process(0.1);
            let env = engine.state().rec_env_pos;
            let expected = (frame as f32).min(FADE_LENGTH);
            assert_eq!(env, expected, "punch-in frame {}", frame);
        }

        engine.set_recording(false);
        for frame in 1..=700 {
            engine.process(0.1);
            let env = engine.state().rec_env_pos;
            let expected = (FADE_LENGTH - frame as f32).max(0.0);
            assert_eq!(env, expected, "punch-out frame {}", frame);
        }
    }

    #[test]
    fn test_recording_rising_edge_resyncs_record_head() {
        let mut engine = engine();
        engine.set_loop(0.25, 0.1);
        run(&mut engine, 0.0, 1000);

        engine.set_recording(true);
        let state = engine.state();
        assert!(!state.is_empty);
        assert!(state.is_recording);
        assert!(approx(state.rec_head, state.loop_start + 1000.0));

        // Holding the switch on is not a new edge
        run(&mut engine, 0.0, 10);
        let rec_head = engine.state().rec_head;
        engine.set_recording(true);
        assert_eq!(engine.state().rec_head, rec_head);
    }

    #[test]
    fn test_punch_in_during_punch_out_resyncs_record_head() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);
        engine.set_wet_dry_mix(0.5);
        engine.set_playback_speed(0.5);

        engine.set_recording(true);
        run(&mut engine, 0.3, 300);
        engine.set_recording(false);
        run(&mut engine, 0.3, 100);

        // Still fading out, and the record head has drifted from the play head
        let before = engine.state();
        assert!(before.rec_env_pos > 0.0);
        assert!(!approx(before.rec_head, before.loop_start + before.play_head_pos));

        engine.set_recording(true);
        let after = engine.state();
        assert!(approx(after.rec_head, after.loop_start + after.play_head_pos));
        assert!(approx(after.rec_head, 200.0));
    }

    #[test]
    fn test_record_head_ignores_playback_speed() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);
        engine.set_playback_speed(-1.5);
        engine.set_recording(true);

        run(&mut engine, 0.2, 250);
        assert_eq!(engine.state().rec_head, 250.0);
    }

    #[test]
    fn test_recorded_signal_plays_back() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.05); // 2400 samples
        engine.set_wet_dry_mix(0.5);
        engine.set_recording(true);
        run(&mut engine, 0.8, 1200);

        engine.set_recording(false);
        engine.set_wet_dry_mix(1.0);
        engine.set_playback_speed(1.0);

        // Finish the lap and get past the loop-start fade
        run(&mut engine, 0.0, 1200 + 600);

        for frame in 0..600 {
            let out = engine.process(0.0);
            assert!((out - 0.4).abs() < 1e-4, "frame {}: {}", frame, out);
        }
    }

    #[test]
    fn test_no_recording_at_mix_extremes() {
        for mix in [0.0, 1.0] {
            let mut storage = vec![0.0f32; 8192];
            {
                let mut engine = LooperEngine::new(storage.as_mut_slice());
                engine.set_loop(0.0, 0.5);
                engine.set_wet_dry_mix(mix);
                engine.set_recording(true);
                run_slice(&mut engine, 0.9, 5000);
            }
            assert!(storage.iter().all(|&s| s == 0.0), "buffer written at mix {}", mix);
        }
    }

    fn run_slice(engine: &mut LooperEngine<&mut [f32]>, input: f32, frames: usize) {
        for _ in 0..frames {
            engine.process(input);
        }
    }

    #[test]
    fn test_dry_mix_passes_input_through() {
        let mut engine = engine();
        engine.set_wet_dry_mix(0.0);
        for i in 0..100 {
            let input = (i as f32 * 0.1).sin();
            assert_eq!(engine.process(input), input);
        }
    }

    #[test]
    fn test_reverse_playback_wraps_to_loop_end() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);
        engine.set_playback_speed(-1.0);

        engine.process(0.0);
        assert_eq!(engine.state().play_head_pos, 4799.0);

        engine.process(0.0);
        assert_eq!(engine.state().play_head_pos, 4798.0);
    }

    #[test]
    fn test_playback_wraps_around_buffer_end() {
        let mut engine = LooperEngine::new(vec![0.0; 4000].into_boxed_slice());
        engine.set_loop(1.0, 0.5); // starts on the last cell
        engine.buffer[3999] = 0.5;
        engine.buffer[0] = 1.0;

        engine.play_head_pos = 0.5;
        assert!(approx(engine.read_playback(), 0.75));
    }

    #[test]
    fn test_fractional_read_interpolates() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);
        engine.buffer[1000] = 0.2;
        engine.buffer[1001] = 0.6;

        engine.play_head_pos = 1000.25;
        assert!(approx(engine.read_playback(), 0.3));
    }

    #[test]
    fn test_setters_clamp() {
        let mut engine = engine();

        engine.set_playback_speed(5.0);
        assert_eq!(engine.state().playback_speed, 2.0);
        engine.set_playback_speed(-3.0);
        assert_eq!(engine.state().playback_speed, -2.0);
        // Slow speeds are not pushed out to 0.5
        engine.set_playback_speed(0.1);
        assert_eq!(engine.state().playback_speed, 0.1);
        engine.set_playback_speed(f32::NAN);
        assert_eq!(engine.state().playback_speed, 0.1);

        engine.set_wet_dry_mix(1.5);
        assert_eq!(engine.state().wet_dry, 1.0);
        engine.set_wet_dry_mix(-0.2);
        assert_eq!(engine.state().wet_dry, 0.0);
    }

    #[test]
    fn test_reset_discards_loop_contents() {
        let mut engine = engine();
        engine.set_loop(0.0, 0.1);
        engine.set_recording(true);
        run(&mut engine, 0.5, 2000);
        assert!(engine.buffer().iter().any(|&s| s != 0.0));

        engine.reset();
        let state = engine.state();
        assert!(engine.buffer().iter().all(|&s| s == 0.0));
        assert!(state.is_empty);
        assert!(!state.is_loop_set);
        assert_eq!(state.play_head_pos, 0.0);
        assert_eq!(state.rec_env_pos, 0.0);
    }

    #[test]
    fn test_output_stays_bounded_under_random_control() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut engine = LooperEngine::new(vec![0.0; 9000].into_boxed_slice());

        for frame in 0..200_000 {
            if frame % 48 == 0 {
                engine.set_loop(rng.gen(), rng.gen());
                engine.set_playback_speed(rng.gen_range(-3.0..3.0));
                engine.set_wet_dry_mix(rng.gen_range(-0.5..1.5));
                engine.set_recording(rng.gen_bool(0.6));
            }

            let out = engine.process(rng.gen_range(-1.0..=1.0));
            assert!(out.is_finite());
            assert!(out.abs() <= 1.0 + 1e-5, "frame {}: {}", frame, out);

            let state = engine.state();
            assert!(state.play_head_pos >= 0.0 && state.play_head_pos < state.loop_length);
            assert!(state.rec_env_pos >= 0.0 && state.rec_env_pos <= FADE_LENGTH);
        }
        assert!(engine.buffer().iter().all(|s| s.abs() <= 1.0 + 1e-5));
    }
}
