//! Parameter structs shared between the control surface and the render path.
//!
//! Everything here is small, `Copy`, and clamped at construction or through
//! its setters, so a parameter snapshot that reaches the audio thread is
//! always render-safe: no NaN, no negative time, no out-of-range mix value.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fx::EffectKind;
use crate::MAX_DELAY_TIME;

pub use crate::dsp::envelope::AdsrParams;

/// Amplitude and envelope for one FM operator.
///
/// Amplitude range is 0 to 5, front-panel style. For the
/// modulator operator the amplitude doubles as the modulation index - it
/// scales how far the carrier phase is pushed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatorParams {
    pub amplitude: f32,
    pub adsr: AdsrParams,
}

impl OperatorParams {
    pub fn new(amplitude: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            amplitude: clamp_or(amplitude, 0.0, 5.0, 0.0),
            adsr: AdsrParams::new(attack, decay, sustain, release),
        }
    }
}

/// The complete timbre description: carrier, modulator, and the frequency
/// ratio between them (modulator frequency = carrier frequency × ratio).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FmPatch {
    pub carrier: OperatorParams,
    pub modulator: OperatorParams,
    pub mod_freq_ratio: f32,
}

impl FmPatch {
    pub fn new(carrier: OperatorParams, modulator: OperatorParams, mod_freq_ratio: f32) -> Self {
        Self {
            carrier,
            modulator,
            mod_freq_ratio: clamp_or(mod_freq_ratio, 0.1, 10.0, 1.0),
        }
    }

    pub fn set_carrier(&mut self, amplitude: f32, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.carrier = OperatorParams::new(amplitude, attack, decay, sustain, release);
    }

    pub fn set_modulator(
        &mut self,
        amplitude: f32,
        freq_ratio: f32,
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    ) {
        self.modulator = OperatorParams::new(amplitude, attack, decay, sustain, release);
        self.mod_freq_ratio = clamp_or(freq_ratio, 0.1, 10.0, 1.0);
    }
}

impl Default for FmPatch {
    fn default() -> Self {
        Preset::Default.patch()
    }
}

/// Parameters for the delay-line effect block.
///
/// `lfo_depth` is the delay excursion in seconds (a musically useful range
/// tops out around 2 ms), so the modulated tap swings ±`lfo_depth × sample_rate`
/// samples around the base delay.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParams {
    pub kind: EffectKind,
    pub delay_time: f32,
    pub feedback: f32,
    pub wet_dry: f32,
    pub lfo_rate: f32,
    pub lfo_depth: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            kind: EffectKind::None,
            delay_time: 0.0,
            feedback: 0.0,
            wet_dry: 0.0,
            lfo_rate: 0.0,
            lfo_depth: 0.0,
        }
    }
}

impl EffectParams {
    /// Front-panel defaults for a plain feedback delay.
    pub fn delay() -> Self {
        Self {
            kind: EffectKind::Delay,
            delay_time: 0.3,
            feedback: 0.5,
            wet_dry: 0.5,
            lfo_rate: 0.0,
            lfo_depth: 0.0,
        }
    }

    /// Front-panel defaults for chorus: ~100 ms base delay, gentle LFO.
    pub fn chorus() -> Self {
        Self {
            kind: EffectKind::Chorus,
            delay_time: 0.1,
            feedback: 0.0,
            wet_dry: 0.5,
            lfo_rate: 2.0,
            lfo_depth: 0.0005,
        }
    }

    /// Front-panel defaults for flanger: short base delay, slow sweep.
    pub fn flanger() -> Self {
        Self {
            kind: EffectKind::Flanger,
            delay_time: 0.02,
            feedback: 0.0,
            wet_dry: 0.5,
            lfo_rate: 0.4,
            lfo_depth: 0.001,
        }
    }

    pub fn for_kind(kind: EffectKind) -> Self {
        match kind {
            EffectKind::None => Self::default(),
            EffectKind::Delay => Self::delay(),
            EffectKind::Chorus => Self::chorus(),
            EffectKind::Flanger => Self::flanger(),
        }
    }

    pub fn set_delay_time(&mut self, seconds: f32) {
        self.delay_time = clamp_or(seconds, 0.0, MAX_DELAY_TIME, 0.0);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = clamp_or(feedback, 0.0, 1.0, 0.0);
    }

    pub fn set_wet_dry(&mut self, mix: f32) {
        self.wet_dry = clamp_or(mix, 0.0, 1.0, 0.0);
    }

    pub fn set_lfo_rate(&mut self, hz: f32) {
        self.lfo_rate = clamp_or(hz, 0.0, 20.0, 0.0);
    }

    pub fn set_lfo_depth(&mut self, seconds: f32) {
        // Depth can never push the modulated tap negative past the base
        // delay bound; the effect clamps the final read anyway.
        self.lfo_depth = clamp_or(seconds, 0.0, 0.1, 0.0);
    }
}

/// Named factory patches, one bulk `FmPatch` each. Loading one is a plain
/// parameter set, not new logic.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Default,
    Brass,
    Bell,
    ElectricPiano,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Default,
        Preset::Brass,
        Preset::Bell,
        Preset::ElectricPiano,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Default => "Default",
            Preset::Brass => "Brass",
            Preset::Bell => "Bell",
            Preset::ElectricPiano => "Electric Piano",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn patch(&self) -> FmPatch {
        match self {
            // Plain sine with a rounded envelope; modulator silent.
            Preset::Default => FmPatch::new(
                OperatorParams::new(1.0, 0.01, 0.1, 0.8, 0.2),
                OperatorParams::new(0.0, 0.01, 0.1, 1.0, 0.2),
                1.0,
            ),
            // 1:1 ratio with a swelling modulator gives the brassy rasp.
            Preset::Brass => FmPatch::new(
                OperatorParams::new(1.0, 0.05, 0.2, 0.8, 0.15),
                OperatorParams::new(4.0, 0.08, 0.3, 0.6, 0.15),
                1.0,
            ),
            // Inharmonic 3.5 ratio, no sustain, long decay tails.
            Preset::Bell => FmPatch::new(
                OperatorParams::new(1.0, 0.0, 1.2, 0.0, 1.0),
                OperatorParams::new(3.0, 0.0, 0.8, 0.0, 0.8),
                3.5,
            ),
            // Fast-decaying modulator for the "tine" transient.
            Preset::ElectricPiano => FmPatch::new(
                OperatorParams::new(1.0, 0.0, 0.8, 0.3, 0.3),
                OperatorParams::new(2.0, 0.0, 0.25, 0.1, 0.2),
                1.0,
            ),
        }
    }
}

fn clamp_or(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(lo, hi)
    }
}
