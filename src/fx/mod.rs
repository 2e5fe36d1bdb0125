//! Delay-line modulation effects: delay, chorus, flanger.
//!
//! One block-based processor dispatching on a closed [`EffectKind`] enum.
//! All three algorithms share the same plumbing: a [`DelayLine`] per output
//! channel and, for the modulated effects, an LFO sweeping the read tap.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::f32::consts::TAU;

use crate::dsp::delay::DelayLine;
use crate::dsp::oscillator::wrap_phase;
use crate::params::EffectParams;
use crate::{MAX_CHANNELS, MAX_DELAY_TIME};

/// Which effect the block applies. A closed enum dispatched by `match`;
/// there is no string-typed selector to typo.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectKind {
    #[default]
    None,
    Delay,
    Chorus,
    Flanger,
}

/// The flanger's static tap sits at the base delay; its swept tap is
/// centered this factor further out.
const FLANGER_TAP_RATIO: f32 = 1.125;

/*
Per-sample algorithms (x = input, y = output, w = wet/dry):

  Delay     d = read(delay_time)               feedback loop through the line
            push(x + feedback * d)
            y = (1-w)x + wd

  Chorus    d = read(delay_time + depth * sin(lfo))   swept tap, no feedback
            push(x)
            y = (1-w)x + wd

  Flanger   t = read(delay_time)                       static comb
              + read(1.125 * delay_time + depth * sin(lfo))   swept comb
            push(x + feedback * t)
            y = (1-w)x + wt

All reads are interpolated - the swept taps land between samples, and
truncating them would zipper. The LFO phase is shared: every channel
replays the same trajectory for a block, and the advance is committed once
at the end, so channel 0 and channel 1 stay phase-locked.
*/

pub struct ModFx {
    lines: [DelayLine; MAX_CHANNELS],
    lfo_phase: f32,
}

impl ModFx {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            lines: std::array::from_fn(|_| DelayLine::with_capacity(line_capacity(sample_rate))),
            lfo_phase: 0.0,
        }
    }

    /// Resize the delay lines for a new sample rate. Allocates; control
    /// context only.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.lines =
            std::array::from_fn(|_| DelayLine::with_capacity(line_capacity(sample_rate)));
        self.lfo_phase = 0.0;
    }

    /// Zero all delay history and rewind the LFO. Invoked on every effect
    /// type or parameter change so stale samples cannot click through.
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
        self.lfo_phase = 0.0;
    }

    /// Process a multichannel block in place.
    ///
    /// Channels beyond [`MAX_CHANNELS`] have no delay line and pass dry.
    /// `EffectKind::None` and a zero base delay both leave the buffer and
    /// the lines untouched.
    pub fn process(
        &mut self,
        channels: &mut [&mut [f32]],
        params: &EffectParams,
        sample_rate: f32,
    ) {
        if params.kind == EffectKind::None || params.delay_time <= 0.0 {
            return;
        }

        let base = params.delay_time * sample_rate;
        let depth = params.lfo_depth * sample_rate;
        let phase_inc = TAU * params.lfo_rate / sample_rate;
        let dry = 1.0 - params.wet_dry;
        let wet = params.wet_dry;
        let num_samples = channels.iter().map(|c| c.len()).max().unwrap_or(0);

        match params.kind {
            EffectKind::Delay => {
                for (channel, line) in channels.iter_mut().zip(self.lines.iter_mut()) {
                    for sample in channel.iter_mut() {
                        let input = *sample;
                        let delayed = line.read_interpolated(base);
                        line.push(input + params.feedback * delayed);
                        *sample = dry * input + wet * delayed;
                    }
                }
            }
            EffectKind::Chorus => {
                for (channel, line) in channels.iter_mut().zip(self.lines.iter_mut()) {
                    let mut phase = self.lfo_phase;
                    for sample in channel.iter_mut() {
                        let input = *sample;
                        let delayed = line.read_interpolated(base + depth * phase.sin());
                        line.push(input);
                        *sample = dry * input + wet * delayed;
                        phase = wrap_phase(phase + phase_inc);
                    }
                }
            }
            EffectKind::Flanger => {
                let swept_base = base * FLANGER_TAP_RATIO;
                for (channel, line) in channels.iter_mut().zip(self.lines.iter_mut()) {
                    let mut phase = self.lfo_phase;
                    for sample in channel.iter_mut() {
                        let input = *sample;
                        let static_tap = line.read_interpolated(base);
                        let swept_tap =
                            line.read_interpolated(swept_base + depth * phase.sin());
                        let tap = static_tap + swept_tap;
                        line.push(input + params.feedback * tap);
                        *sample = dry * input + wet * tap;
                        phase = wrap_phase(phase + phase_inc);
                    }
                }
            }
            EffectKind::None => unreachable!(),
        }

        self.lfo_phase = wrap_phase(self.lfo_phase + phase_inc * num_samples as f32);
    }
}

fn line_capacity(sample_rate: f32) -> usize {
    (MAX_DELAY_TIME * sample_rate).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn process_mono(fx: &mut ModFx, samples: &mut [f32], params: &EffectParams) {
        let mut channels: [&mut [f32]; 1] = [samples];
        fx.process(&mut channels, params, SAMPLE_RATE);
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut v = vec![0.0; len];
        v[0] = 1.0;
        v
    }

    #[test]
    fn none_is_passthrough() {
        let mut fx = ModFx::new(SAMPLE_RATE);
        let mut buf: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        let original = buf.clone();
        process_mono(&mut fx, &mut buf, &EffectParams::default());
        assert_eq!(buf, original);
    }

    #[test]
    fn delay_echoes_after_exact_delay() {
        let mut fx = ModFx::new(SAMPLE_RATE);
        let delay_samples = 100;
        let mut params = EffectParams::delay();
        params.delay_time = delay_samples as f32 / SAMPLE_RATE;
        params.feedback = 0.0;
        params.wet_dry = 1.0;

        let mut buf = impulse(256);
        process_mono(&mut fx, &mut buf, &params);

        assert!((buf[delay_samples] - 1.0).abs() < 1e-6);
        for (i, &s) in buf.iter().enumerate() {
            if i != delay_samples {
                assert!(s.abs() < 1e-6, "unexpected output {s} at {i}");
            }
        }
    }

    #[test]
    fn delay_feedback_repeats_and_decays() {
        let mut fx = ModFx::new(SAMPLE_RATE);
        let delay_samples = 50;
        let mut params = EffectParams::delay();
        params.delay_time = delay_samples as f32 / SAMPLE_RATE;
        params.feedback = 0.5;
        params.wet_dry = 1.0;

        let mut buf = impulse(256);
        process_mono(&mut fx, &mut buf, &params);

        assert!((buf[delay_samples] - 1.0).abs() < 1e-6);
        assert!((buf[2 * delay_samples] - 0.5).abs() < 1e-6);
        assert!((buf[3 * delay_samples] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn chorus_without_depth_is_a_plain_delayed_tap() {
        let mut fx = ModFx::new(SAMPLE_RATE);
        let delay_samples = 80;
        let mut params = EffectParams::chorus();
        params.delay_time = delay_samples as f32 / SAMPLE_RATE;
        params.lfo_depth = 0.0;
        params.wet_dry = 1.0;

        let mut buf = impulse(200);
        process_mono(&mut fx, &mut buf, &params);
        assert!((buf[delay_samples] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn chorus_excursion_stays_within_depth() {
        // Feed a linear ramp: with wet = 1 the output IS the delayed ramp,
        // so the instantaneous delay can be recovered per sample and checked
        // against the depth * sample_rate bound.
        let mut fx = ModFx::new(SAMPLE_RATE);
        let mut params = EffectParams::chorus();
        params.delay_time = 200.0 / SAMPLE_RATE;
        params.lfo_rate = 35.0; // ~3 full sweeps over the 4096-sample block
        params.lfo_depth = 50.0 / SAMPLE_RATE;
        params.wet_dry = 1.0;

        let len = 4096;
        let mut buf: Vec<f32> = (0..len).map(|i| i as f32).collect();
        process_mono(&mut fx, &mut buf, &params);

        for i in 600..len {
            let measured_delay = i as f32 - buf[i];
            assert!(
                (measured_delay - 200.0).abs() <= 50.0 + 1.0,
                "delay {measured_delay} outside excursion bound at {i}"
            );
        }
    }

    #[test]
    fn flanger_excursion_stays_within_depth() {
        // Same ramp trick as the chorus test, adjusted for the dual tap:
        // with wet = 1 and no feedback the output is the sum of two delayed
        // ramps, so 2i - buf[i] recovers static + swept delay. The static
        // tap is fixed, so any excess over the two bases is the LFO sweep.
        let mut fx = ModFx::new(SAMPLE_RATE);
        let mut params = EffectParams::flanger();
        params.delay_time = 200.0 / SAMPLE_RATE;
        params.lfo_rate = 35.0;
        params.lfo_depth = 50.0 / SAMPLE_RATE;
        params.feedback = 0.0;
        params.wet_dry = 1.0;

        let len = 4096;
        let mut buf: Vec<f32> = (0..len).map(|i| i as f32).collect();
        process_mono(&mut fx, &mut buf, &params);

        let both_bases = 200.0 + 200.0 * FLANGER_TAP_RATIO;
        for i in 600..len {
            let measured = 2.0 * i as f32 - buf[i];
            assert!(
                (measured - both_bases).abs() <= 50.0 + 1.0,
                "swept tap {measured} outside excursion bound at {i}"
            );
        }
    }

    #[test]
    fn flanger_produces_static_and_swept_taps() {
        let mut fx = ModFx::new(SAMPLE_RATE);
        // 64 samples base, 72 samples for the swept tap at 1.125x.
        let mut params = EffectParams::flanger();
        params.delay_time = 64.0 / SAMPLE_RATE;
        params.lfo_depth = 0.0;
        params.feedback = 0.0;
        params.wet_dry = 1.0;

        let mut buf = impulse(200);
        process_mono(&mut fx, &mut buf, &params);

        assert!((buf[64] - 1.0).abs() < 1e-5, "static tap missing");
        assert!((buf[72] - 1.0).abs() < 1e-5, "swept tap missing");
    }

    #[test]
    fn reset_silences_stored_history() {
        let mut fx = ModFx::new(SAMPLE_RATE);
        let mut params = EffectParams::delay();
        params.delay_time = 32.0 / SAMPLE_RATE;
        params.wet_dry = 1.0;

        let mut buf = impulse(16);
        process_mono(&mut fx, &mut buf, &params);
        fx.reset();

        let mut tail = vec![0.0; 128];
        process_mono(&mut fx, &mut tail, &params);
        assert!(tail.iter().all(|s| s.abs() < 1e-9));
    }

    #[test]
    fn extra_channels_pass_dry() {
        let mut fx = ModFx::new(SAMPLE_RATE);
        let mut params = EffectParams::delay();
        params.delay_time = 10.0 / SAMPLE_RATE;
        params.wet_dry = 1.0;

        let mut a = impulse(64);
        let mut b = impulse(64);
        let mut c = impulse(64);
        let expected_c = c.clone();
        let mut channels: [&mut [f32]; 3] = [&mut a, &mut b, &mut c];
        fx.process(&mut channels, &params, SAMPLE_RATE);

        assert!(a[10] > 0.9);
        assert!(b[10] > 0.9);
        assert_eq!(c, expected_c, "third channel has no line and stays dry");
    }

    #[test]
    fn stereo_channels_share_lfo_trajectory() {
        let mut fx = ModFx::new(SAMPLE_RATE);
        let mut params = EffectParams::chorus();
        params.delay_time = 100.0 / SAMPLE_RATE;
        params.lfo_rate = 3.0;
        params.lfo_depth = 20.0 / SAMPLE_RATE;
        params.wet_dry = 1.0;

        let input: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut left = input.clone();
        let mut right = input;
        let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
        fx.process(&mut channels, &params, SAMPLE_RATE);

        assert_eq!(left, right, "identical input must stay identical");
    }
}
