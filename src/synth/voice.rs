use crate::dsp::oscillator::{midi_note_to_freq, phase_increment, wrap_phase};
use crate::params::FmPatch;

/// Gain applied to incoming velocity so a full-velocity four-voice chord
/// still sums comfortably below clipping.
const VELOCITY_GAIN: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Available for allocation
    Active,    // Playing, envelopes in attack/decay/sustain
    Releasing, // Key released, envelopes in release phase
}

/// One two-operator FM voice: a modulator sine perturbs the carrier's phase.
///
/// The voice owns its note state (phases, elapsed clocks, captured envelope
/// levels) but reads timbre from the shared [`FmPatch`] every sample, so a
/// control-side parameter change applies uniformly to sounding and future
/// notes.
pub struct FmVoice {
    note: u8,
    level: f32,
    state: VoiceState,
    age: u64,

    carrier_phase: f32,
    carrier_inc: f32,
    mod_phase: f32,

    // Elapsed time clocks, in seconds. f64 so hour-long sessions don't lose
    // per-sample resolution.
    t_on: f64,
    t_off: f64,

    // Envelope levels from the last pre-release sample. Release decays from
    // these, so letting go mid-attack cannot jump.
    carrier_level: f32,
    mod_level: f32,
}

impl FmVoice {
    pub fn new() -> Self {
        Self {
            note: 0,
            level: 0.0,
            state: VoiceState::Free,
            age: 0,
            carrier_phase: 0.0,
            carrier_inc: 0.0,
            mod_phase: 0.0,
            t_on: 0.0,
            t_off: 0.0,
            carrier_level: 0.0,
            mod_level: 0.0,
        }
    }

    /// Bind this voice to a note and restart it from silence. The `age`
    /// stamp orders voices for the stealing policy.
    pub fn start(&mut self, note: u8, velocity: f32, age: u64, sample_rate: f32) {
        self.note = note;
        self.level = velocity.clamp(0.0, 1.0) * VELOCITY_GAIN;
        self.state = VoiceState::Active;
        self.age = age;
        self.carrier_phase = 0.0;
        self.mod_phase = 0.0;
        self.carrier_inc = phase_increment(midi_note_to_freq(note), sample_rate);
        self.t_on = 0.0;
        self.t_off = 0.0;
        self.carrier_level = 0.0;
        self.mod_level = 0.0;
    }

    /// Note-off. With `allow_tail_off` the voice rides its release envelope
    /// out; without it the voice is silenced on the spot.
    pub fn release(&mut self, allow_tail_off: bool) {
        match self.state {
            VoiceState::Free => {}
            VoiceState::Active if allow_tail_off => {
                self.state = VoiceState::Releasing;
                self.t_off = 0.0;
            }
            VoiceState::Releasing if allow_tail_off => {} // already on its way out
            _ => self.free(),
        }
    }

    /// Produce one sample and advance all per-voice state.
    ///
    /// Modulator first: its enveloped sine is added to the carrier phase
    /// (the modulator amplitude is the modulation index), then the carrier
    /// is read and both phases advance. A releasing voice frees itself once
    /// the carrier release time has elapsed.
    pub fn render_sample(&mut self, patch: &FmPatch, sample_rate: f32) -> f32 {
        if self.state == VoiceState::Free {
            return 0.0;
        }

        let releasing = self.state == VoiceState::Releasing;
        let t_on = self.t_on as f32;
        let t_off = self.t_off as f32;

        let mod_env = patch
            .modulator
            .adsr
            .evaluate(t_on, t_off, releasing, self.mod_level);
        let carrier_env = patch
            .carrier
            .adsr
            .evaluate(t_on, t_off, releasing, self.carrier_level);
        if !releasing {
            self.mod_level = mod_env;
            self.carrier_level = carrier_env;
        }

        let mod_sample = self.mod_phase.sin() * mod_env * patch.modulator.amplitude;
        self.mod_phase = wrap_phase(self.mod_phase + self.carrier_inc * patch.mod_freq_ratio);

        let out = (self.carrier_phase + mod_sample).sin()
            * carrier_env
            * patch.carrier.amplitude
            * self.level;
        self.carrier_phase = wrap_phase(self.carrier_phase + self.carrier_inc);

        let dt = 1.0 / sample_rate as f64;
        self.t_on += dt;
        if releasing {
            self.t_off += dt;
            if patch.carrier.adsr.release_finished(self.t_off as f32) {
                self.free();
            }
        }

        out
    }

    pub fn free(&mut self) {
        self.state = VoiceState::Free;
        self.note = 0;
        self.level = 0.0;
        self.carrier_inc = 0.0;
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_active(&self) -> bool {
        !self.is_free()
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    /// Seconds spent in the release phase so far. Used by the stealing
    /// policy to pick the releasing voice closest to completion.
    pub fn release_elapsed(&self) -> f32 {
        self.t_off as f32
    }
}

impl Default for FmVoice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{FmPatch, OperatorParams};

    const SAMPLE_RATE: f32 = 48_000.0;

    fn sine_patch() -> FmPatch {
        // Carrier only, instant attack, full sustain: a pure sine.
        FmPatch::new(
            OperatorParams::new(1.0, 0.0, 0.01, 1.0, 0.05),
            OperatorParams::new(0.0, 0.0, 0.01, 1.0, 0.05),
            1.0,
        )
    }

    #[test]
    fn renders_pure_sine_without_modulation() {
        let patch = sine_patch();
        let mut voice = FmVoice::new();
        voice.start(69, 1.0, 0, SAMPLE_RATE);

        let freq = 440.0;
        for n in 0..256 {
            let expected =
                (std::f32::consts::TAU * freq * n as f32 / SAMPLE_RATE).sin() * 0.15;
            let actual = voice.render_sample(&patch, SAMPLE_RATE);
            assert!(
                (actual - expected).abs() < 1e-4,
                "sample {n}: expected {expected}, got {actual}"
            );
        }
    }

    #[test]
    fn modulation_produces_sidebands() {
        // Not a spectral test, just: a nonzero modulator must change the
        // waveform relative to the pure carrier.
        let pure = sine_patch();
        let mut fm = sine_patch();
        fm.modulator.amplitude = 2.0;

        let mut a = FmVoice::new();
        let mut b = FmVoice::new();
        a.start(60, 1.0, 0, SAMPLE_RATE);
        b.start(60, 1.0, 0, SAMPLE_RATE);

        let mut diverged = false;
        for _ in 0..512 {
            let pa = a.render_sample(&pure, SAMPLE_RATE);
            let pb = b.render_sample(&fm, SAMPLE_RATE);
            if (pa - pb).abs() > 1e-3 {
                diverged = true;
            }
        }
        assert!(diverged);
    }

    #[test]
    fn tail_off_runs_release_then_frees() {
        let patch = sine_patch(); // 50ms carrier release
        let mut voice = FmVoice::new();
        voice.start(69, 1.0, 0, SAMPLE_RATE);
        for _ in 0..100 {
            voice.render_sample(&patch, SAMPLE_RATE);
        }

        voice.release(true);
        assert_eq!(voice.state(), VoiceState::Releasing);

        let release_samples = (0.05 * SAMPLE_RATE) as usize;
        for _ in 0..release_samples + 2 {
            voice.render_sample(&patch, SAMPLE_RATE);
        }
        assert!(voice.is_free(), "voice should free itself after release");
    }

    #[test]
    fn hard_stop_silences_immediately() {
        let patch = sine_patch();
        let mut voice = FmVoice::new();
        voice.start(69, 1.0, 0, SAMPLE_RATE);
        voice.render_sample(&patch, SAMPLE_RATE);

        voice.release(false);
        assert!(voice.is_free());
        assert_eq!(voice.render_sample(&patch, SAMPLE_RATE), 0.0);
    }

    #[test]
    fn release_starts_from_interrupted_attack_level() {
        // Long attack, release after 25% of it: output must shrink from the
        // interrupted level, not leap to sustain first.
        let patch = FmPatch::new(
            OperatorParams::new(1.0, 0.4, 0.1, 0.9, 0.1),
            OperatorParams::new(0.0, 0.4, 0.1, 0.9, 0.1),
            1.0,
        );
        let mut voice = FmVoice::new();
        voice.start(69, 1.0, 0, SAMPLE_RATE);
        let attack_quarter = (0.1 * SAMPLE_RATE) as usize;
        let mut peak_before: f32 = 0.0;
        for _ in 0..attack_quarter {
            peak_before = peak_before.max(voice.render_sample(&patch, SAMPLE_RATE).abs());
        }
        voice.release(true);
        let mut peak_after: f32 = 0.0;
        for _ in 0..attack_quarter {
            peak_after = peak_after.max(voice.render_sample(&patch, SAMPLE_RATE).abs());
        }
        assert!(peak_after <= peak_before + 1e-4);
        assert!(peak_after > 0.0, "tail-off should still sound");
    }

    #[test]
    fn out_of_range_velocity_is_clamped() {
        let mut voice = FmVoice::new();
        voice.start(69, 7.0, 0, SAMPLE_RATE);
        let patch = sine_patch();
        for _ in 0..64 {
            assert!(voice.render_sample(&patch, SAMPLE_RATE).abs() <= 0.15 + 1e-6);
        }
    }
}
