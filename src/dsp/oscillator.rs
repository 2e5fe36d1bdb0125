use std::f32::consts::TAU;

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69, equal temperament.
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Per-sample phase increment, in radians, for a tone at `frequency` Hz.
#[inline]
pub fn phase_increment(frequency: f32, sample_rate: f32) -> f32 {
    TAU * frequency / sample_rate
}

/// Wrap an accumulated phase back into [0, 2π).
///
/// Phase accumulators drift out of precision if allowed to grow without
/// bound over very long-held notes, so voices wrap after every advance.
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    if phase < TAU {
        phase
    } else if phase < 2.0 * TAU {
        phase - TAU
    } else {
        // A modulator running at a high ratio can step more than a full
        // cycle per sample.
        phase.rem_euclid(TAU)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concert_a_is_440() {
        assert!((midi_note_to_freq(69) - 440.0).abs() < 1e-3);
    }

    #[test]
    fn octaves_double() {
        let a4 = midi_note_to_freq(69);
        let a5 = midi_note_to_freq(81);
        assert!((a5 - 2.0 * a4).abs() < 1e-2);
    }

    #[test]
    fn increment_completes_cycle_in_one_period() {
        let sample_rate = 48_000.0;
        let inc = phase_increment(440.0, sample_rate);
        let samples_per_cycle = sample_rate / 440.0;
        assert!((inc * samples_per_cycle - TAU).abs() < 1e-3);
    }

    #[test]
    fn wrap_keeps_phase_in_range() {
        let mut phase = 0.0;
        let inc = phase_increment(12_000.0, 48_000.0);
        for _ in 0..100_000 {
            phase = wrap_phase(phase + inc);
            assert!((0.0..TAU).contains(&phase));
        }
    }
}
