#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
ADSR Envelope Evaluation
========================

This module computes a normalized [0, 1] amplitude curve from elapsed time
and ADSR parameters. Each FM voice evaluates two of these per sample: one
for the carrier operator, one for the modulator.

Vocabulary
----------

  t_on        Seconds since the gate went high (note-on).

  t_off       Seconds since the gate went low. Meaningless until the voice
              enters its release phase.

  level_at_release
              The envelope value captured at the instant release began.
              Release always decays from HERE, not from the sustain level -
              releasing halfway through the attack must not jump.

The Shape
---------

  Level
    1.0 ┐     ╱╲
        │    ╱  `-.________
    S   │   ╱              `.
        │  ╱                 `-.
    0.0 └─╱─────────────────────`──→ Time
        Attack Decay  Sustain  Release

The attack is a linear ramp from 0 to 1. Decay and release are exponential:
acoustic sounds die away exponentially, and an exponential release matches
the decay curve perceptually no matter where release cuts in.

The Curve Constant
------------------

A pure exponential never reaches its target, so we pick the time constant
such that the curve lands within 0.1% of the target at the phase's nominal
duration, then snap to the target:

    value(t) = target + (start - target) * exp(-K * t / duration)

with K = ln(1000) ~= 6.9078. At t = duration the residue is exactly
start/1000, below anything audible. The snap keeps sustain exact and lets
the voice pool reclaim released voices at a precise time.

Unlike the per-sample incremental form, evaluation here is a pure function
of elapsed time. That makes the contract trivially testable and keeps the
voice free to carry its own clock.
*/

/// Exponential curve constant: ln(1000), so each phase lands within 0.1% of
/// its target at its nominal duration.
const CURVE_K: f32 = 6.907_755;

/// Attack/decay/sustain/release parameters for one operator.
///
/// Times are in seconds, sustain is a level in [0, 1]. Constructors clamp,
/// so a value that made it into an `AdsrParams` is always render-safe.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self::new(0.01, 0.1, 0.7, 0.3)
    }
}

impl AdsrParams {
    /// Build a parameter set, clamping out-of-range input: negative or NaN
    /// times become 0, sustain is clamped into [0, 1].
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: clamp_time(attack),
            decay: clamp_time(decay),
            sustain: if sustain.is_nan() { 0.0 } else { sustain.clamp(0.0, 1.0) },
            release: clamp_time(release),
        }
    }

    /// Evaluate the envelope at a point in time.
    ///
    /// Pre-release (`releasing == false`) the value depends only on `t_on`:
    /// linear attack ramp, exponential decay toward `sustain`, then sustain
    /// hold. During release the value depends only on `t_off` and decays
    /// exponentially from `level_at_release`, pinned to 0 once
    /// `t_off >= release`.
    ///
    /// The result is always in [0, 1].
    pub fn evaluate(&self, t_on: f32, t_off: f32, releasing: bool, level_at_release: f32) -> f32 {
        let value = if releasing {
            if self.release <= 0.0 || t_off >= self.release {
                0.0
            } else {
                level_at_release * (-CURVE_K * t_off / self.release).exp()
            }
        } else if t_on < self.attack {
            // attack > 0 here: t_on >= 0 and t_on < attack
            t_on / self.attack
        } else if self.decay > 0.0 && t_on - self.attack < self.decay {
            self.sustain + (1.0 - self.sustain) * (-CURVE_K * (t_on - self.attack) / self.decay).exp()
        } else {
            self.sustain
        };

        debug_assert!((0.0..=1.0).contains(&value));
        value
    }

    /// True once a release that began `t_off` seconds ago has fully decayed.
    pub fn release_finished(&self, t_off: f32) -> bool {
        t_off >= self.release
    }
}

fn clamp_time(seconds: f32) -> f32 {
    if seconds.is_nan() {
        0.0
    } else {
        seconds.max(0.0)
    }
}
