//! Realtime-safe polyphonic FM synthesis with delay-based modulation
//! effects.
//!
//! A four-voice two-operator FM generator ([`SynthEngine`]) feeding a
//! delay/chorus/flanger effect block. The render path never allocates,
//! locks, or panics; all parameter input is clamped at the setter boundary.
//! With the `rtrb` feature (default) a [`SynthController`] drives the engine
//! from another thread over a lock-free queue.

pub mod dsp; // Allocation-free DSP primitives
pub mod engine; // Top-level synthesis engine
pub mod fx; // Delay-line modulation effects
pub mod params; // Parameter structs, clamping, presets
pub mod synth; // Voice management and polyphony

pub use engine::{PrepareError, SynthEngine};
#[cfg(feature = "rtrb")]
pub use engine::SynthController;
pub use fx::EffectKind;
pub use params::{AdsrParams, EffectParams, FmPatch, OperatorParams, Preset};

/// Largest block a single `render_block` call will process.
pub const MAX_BLOCK_SIZE: usize = 2048;

/// Longest delay the effect block can be asked for, in seconds. Delay-line
/// capacity is fixed at prepare time from this bound.
pub const MAX_DELAY_TIME: f32 = 2.0;

/// Fixed polyphony of the voice pool.
pub const NUM_VOICES: usize = 4;

/// Channel count the effect block owns delay lines for. Output buffers with
/// more channels get the dry mono mix on the extras.
pub const MAX_CHANNELS: usize = 2;
