use crate::params::{EffectParams, FmPatch};

/// Control-thread to audio-thread messages.
///
/// Every variant is `Copy` and is written into the ring buffer as a whole,
/// so the audio thread always sees a fully-written value: a parameter change
/// is a snapshot, never a torn partial update. Effect changes travel through
/// the same queue as note events, which both keeps events time-ordered and
/// serializes delay-line resets with rendering.
#[derive(Debug, Copy, Clone)]
pub enum SynthMessage {
    NoteOn { note: u8, velocity: f32 },
    NoteOff { note: u8, tail_off: bool },
    AllNotesOff,
    SetPatch(FmPatch),
    SetEffect(EffectParams),
}
