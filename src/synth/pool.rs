use crate::params::FmPatch;
use crate::synth::voice::{FmVoice, VoiceState};
use crate::NUM_VOICES;

/*
Voice Pool
==========

A fixed set of FM voices plus the allocation logic that maps note events
onto them. Invariant: at most one voice is bound to a given note number at
any time; the binding clears when the voice frees itself.

Allocation order on note-on:

  1. A voice already bound to the incoming note is retriggered in place.
     This is what keeps the one-voice-per-note invariant - a repeated note
     can never fork into two bindings.
  2. Otherwise the first Free voice by index.
  3. Otherwise steal the Releasing voice closest to finishing its tail
     (largest elapsed release time - release duration is shared, so that is
     the voice with the least audible remainder).
  4. Otherwise steal the longest-sounding Active voice (smallest age stamp).

Ties resolve to the lowest index. A new note is never dropped.
*/

pub struct VoicePool {
    voices: [FmVoice; NUM_VOICES],
    sample_rate: f32,
    next_age: u64,
}

impl VoicePool {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            voices: std::array::from_fn(|_| FmVoice::new()),
            sample_rate,
            next_age: 0,
        }
    }

    /// Re-point the pool at a new sample rate and silence everything.
    /// Phase increments bake the rate in at note-on, so sounding voices
    /// cannot survive a rate change.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for voice in &mut self.voices {
            voice.free();
        }
    }

    /// Start a note. Out-of-range note numbers are ignored.
    pub fn note_on(&mut self, note: u8, velocity: f32) {
        if note > 127 {
            return;
        }
        let age = self.next_age;
        self.next_age += 1;
        let sample_rate = self.sample_rate;
        if let Some(voice) = self.allocate(note) {
            voice.start(note, velocity, age, sample_rate);
        }
    }

    /// Release the voice bound to `note`, if any. Unbound notes are a no-op.
    pub fn note_off(&mut self, note: u8, allow_tail_off: bool) {
        if let Some(voice) = self.voice_for_note(note) {
            voice.release(allow_tail_off);
        }
    }

    /// Release every sounding voice (tails allowed).
    pub fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            if voice.state() == VoiceState::Active {
                voice.release(true);
            }
        }
    }

    /// Additively render all sounding voices into `out`. The caller zeroes
    /// the buffer; the pool only accumulates.
    pub fn render(&mut self, out: &mut [f32], patch: &FmPatch) {
        for voice in &mut self.voices {
            if voice.is_active() {
                for sample in out.iter_mut() {
                    *sample += voice.render_sample(patch, self.sample_rate);
                }
            }
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn is_note_sounding(&self, note: u8) -> bool {
        self.voices
            .iter()
            .any(|v| v.is_active() && v.note() == note)
    }

    fn allocate(&mut self, note: u8) -> Option<&mut FmVoice> {
        // Retrigger an existing binding rather than creating a second one.
        if let Some(idx) = self
            .voices
            .iter()
            .position(|v| v.is_active() && v.note() == note)
        {
            return Some(&mut self.voices[idx]);
        }

        if let Some(idx) = self.voices.iter().position(|v| v.is_free()) {
            return Some(&mut self.voices[idx]);
        }

        // Steal the releasing voice closest to completion.
        let steal = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.state() == VoiceState::Releasing)
            .max_by(|(_, a), (_, b)| {
                a.release_elapsed()
                    .partial_cmp(&b.release_elapsed())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(idx, _)| idx);
        if let Some(idx) = steal {
            return Some(&mut self.voices[idx]);
        }

        // All voices are actively sounding: steal the oldest note.
        let oldest = self
            .voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.age())
            .map(|(idx, _)| idx);
        oldest.map(move |idx| &mut self.voices[idx])
    }

    fn voice_for_note(&mut self, note: u8) -> Option<&mut FmVoice> {
        self.voices
            .iter_mut()
            .find(|v| v.is_active() && v.note() == note)
    }
}
