//! Low-level DSP primitives for the FM engine.
//!
//! These components are allocation-free and realtime-safe once constructed,
//! making them safe to embed directly inside voice structs and the effect
//! block. They stay focused on the signal-processing math; the `synth` and
//! `fx` layers handle orchestration.

/// Time-domain circular delay line with interpolated reads.
pub mod delay;
/// Attack/decay/sustain/release envelope evaluation.
pub mod envelope;
/// MIDI pitch and phase-accumulator math.
pub mod oscillator;

pub use delay::DelayLine;
pub use envelope::AdsrParams;
