use thiserror::Error;

use crate::fx::{EffectKind, ModFx};
use crate::params::{EffectParams, FmPatch, Preset};
#[cfg(feature = "rtrb")]
use crate::synth::message::SynthMessage;
use crate::synth::pool::VoicePool;
use crate::MAX_BLOCK_SIZE;

/*
Synthesis Engine
================

Top-level orchestration: note events and parameter snapshots go in, filled
sample blocks come out. Per block the order is fixed:

  1. Drain pending control messages (events stay time-ordered and are never
     reordered across blocks; effect resets ride the same queue, so they
     can't race an in-progress render).
  2. Sum the voice pool into the mono scratch buffer.
  3. Copy the mono mix to every output channel.
  4. Run the modulation effect over the channels in place.

`render_block` allocates nothing, takes no locks, and performs no I/O - the
audio callback owns a hard deadline. Everything that allocates (delay lines,
the scratch buffer) happens in `prepare`.

The engine can be driven two ways: directly through its methods when caller
and renderer share a thread, or through a `SynthController` connected by an
SPSC ring buffer when a control surface lives on another thread.
*/

#[derive(Debug, Error, PartialEq)]
pub enum PrepareError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),
    #[error("block size must be between 1 and {MAX_BLOCK_SIZE}, got {0}")]
    InvalidBlockSize(usize),
}

pub struct SynthEngine {
    sample_rate: f32,
    pool: VoicePool,
    fx: ModFx,
    patch: FmPatch,
    effect: EffectParams,
    scratch: Vec<f32>,
    #[cfg(feature = "rtrb")]
    rx: Option<rtrb::Consumer<SynthMessage>>,
}

impl SynthEngine {
    /// Engine at a default 48 kHz; call [`prepare`](Self::prepare) to match
    /// the actual device rate before rendering.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            pool: VoicePool::new(sample_rate),
            fx: ModFx::new(sample_rate),
            patch: FmPatch::default(),
            effect: EffectParams::default(),
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            #[cfg(feature = "rtrb")]
            rx: None,
        }
    }

    /// Engine plus a control-thread handle, joined by a lock-free SPSC ring
    /// buffer holding up to `capacity` pending messages.
    #[cfg(feature = "rtrb")]
    pub fn with_controller(capacity: usize) -> (SynthController, Self) {
        let (tx, rx) = rtrb::RingBuffer::new(capacity);
        let mut engine = Self::new();
        engine.rx = Some(rx);
        (SynthController { tx }, engine)
    }

    /// Size buffers for a sample rate and maximum block size, and reset all
    /// voice and effect state. Must succeed before rendering.
    pub fn prepare(&mut self, sample_rate: f32, max_block: usize) -> Result<(), PrepareError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(PrepareError::InvalidSampleRate(sample_rate));
        }
        if max_block == 0 || max_block > MAX_BLOCK_SIZE {
            return Err(PrepareError::InvalidBlockSize(max_block));
        }

        self.sample_rate = sample_rate;
        self.pool.prepare(sample_rate);
        self.fx.prepare(sample_rate);
        self.scratch = vec![0.0; max_block];
        Ok(())
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn note_on(&mut self, note: u8, velocity: f32) {
        self.pool.note_on(note, velocity);
    }

    pub fn note_off(&mut self, note: u8, allow_tail_off: bool) {
        self.pool.note_off(note, allow_tail_off);
    }

    pub fn all_notes_off(&mut self) {
        self.pool.all_notes_off();
    }

    pub fn active_voices(&self) -> usize {
        self.pool.active_voices()
    }

    // -- Timbre --------------------------------------------------------

    /// Bulk patch replacement; applies to sounding and future notes alike.
    pub fn set_patch(&mut self, patch: FmPatch) {
        self.patch = patch;
    }

    pub fn load_preset(&mut self, preset: Preset) {
        self.patch = preset.patch();
    }

    pub fn set_carrier(&mut self, amplitude: f32, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.patch.set_carrier(amplitude, attack, decay, sustain, release);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_modulator(
        &mut self,
        amplitude: f32,
        freq_ratio: f32,
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    ) {
        self.patch
            .set_modulator(amplitude, freq_ratio, attack, decay, sustain, release);
    }

    pub fn patch(&self) -> &FmPatch {
        &self.patch
    }

    // -- Effect --------------------------------------------------------
    // Every effect mutation resets the delay lines: stale history read
    // under new parameters is an audible click.

    pub fn set_effect(&mut self, kind: EffectKind) {
        self.effect.kind = kind;
        self.fx.reset();
    }

    pub fn set_effect_params(&mut self, params: EffectParams) {
        self.effect = params;
        self.fx.reset();
    }

    pub fn set_delay_time(&mut self, seconds: f32) {
        self.effect.set_delay_time(seconds);
        self.fx.reset();
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.effect.set_feedback(feedback);
        self.fx.reset();
    }

    pub fn set_wet_dry(&mut self, mix: f32) {
        self.effect.set_wet_dry(mix);
        self.fx.reset();
    }

    pub fn set_lfo_rate(&mut self, hz: f32) {
        self.effect.set_lfo_rate(hz);
        self.fx.reset();
    }

    pub fn set_lfo_depth(&mut self, seconds: f32) {
        self.effect.set_lfo_depth(seconds);
        self.fx.reset();
    }

    pub fn effect(&self) -> &EffectParams {
        &self.effect
    }

    // -- Rendering -----------------------------------------------------

    /// Fill a multichannel block. The generator is mono; every channel gets
    /// an identical copy before the effect runs. Samples beyond the
    /// prepared maximum block size are zero-filled.
    pub fn render_block(&mut self, channels: &mut [&mut [f32]]) {
        self.drain_messages();

        if channels.is_empty() {
            return;
        }
        let num_samples = channels
            .iter()
            .map(|c| c.len())
            .min()
            .unwrap_or(0)
            .min(self.scratch.len());

        let mix = &mut self.scratch[..num_samples];
        mix.fill(0.0);
        self.pool.render(mix, &self.patch);

        for channel in channels.iter_mut() {
            for (i, sample) in channel.iter_mut().enumerate() {
                *sample = if i < num_samples { mix[i] } else { 0.0 };
            }
        }

        self.fx.process(channels, &self.effect, self.sample_rate);
    }

    #[cfg(feature = "rtrb")]
    fn drain_messages(&mut self) {
        let mut rx = self.rx.take();
        if let Some(rx) = &mut rx {
            while let Ok(msg) = rx.pop() {
                self.apply(msg);
            }
        }
        self.rx = rx;
    }

    #[cfg(not(feature = "rtrb"))]
    fn drain_messages(&mut self) {}

    #[cfg(feature = "rtrb")]
    fn apply(&mut self, msg: SynthMessage) {
        match msg {
            SynthMessage::NoteOn { note, velocity } => self.note_on(note, velocity),
            SynthMessage::NoteOff { note, tail_off } => self.note_off(note, tail_off),
            SynthMessage::AllNotesOff => self.all_notes_off(),
            SynthMessage::SetPatch(patch) => self.set_patch(patch),
            SynthMessage::SetEffect(params) => self.set_effect_params(params),
        }
    }
}

impl Default for SynthEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Control-surface handle: the producer half of the engine's message queue.
///
/// Methods never block. If the ring buffer is full the message is dropped
/// and `false` is returned; size the queue for the densest expected event
/// burst.
#[cfg(feature = "rtrb")]
pub struct SynthController {
    tx: rtrb::Producer<SynthMessage>,
}

#[cfg(feature = "rtrb")]
impl SynthController {
    pub fn note_on(&mut self, note: u8, velocity: f32) -> bool {
        self.send(SynthMessage::NoteOn { note, velocity })
    }

    pub fn note_off(&mut self, note: u8, tail_off: bool) -> bool {
        self.send(SynthMessage::NoteOff { note, tail_off })
    }

    pub fn all_notes_off(&mut self) -> bool {
        self.send(SynthMessage::AllNotesOff)
    }

    pub fn set_patch(&mut self, patch: FmPatch) -> bool {
        self.send(SynthMessage::SetPatch(patch))
    }

    pub fn load_preset(&mut self, preset: Preset) -> bool {
        self.send(SynthMessage::SetPatch(preset.patch()))
    }

    pub fn set_effect(&mut self, params: EffectParams) -> bool {
        self.send(SynthMessage::SetEffect(params))
    }

    fn send(&mut self, msg: SynthMessage) -> bool {
        self.tx.push(msg).is_ok()
    }
}
