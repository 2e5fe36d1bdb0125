// Purpose: voice management and polyphony.
// This layer maps note events onto a fixed pool of FM voices.

pub mod message;
pub mod pool;
pub mod voice;

pub use message::SynthMessage;
pub use pool::VoicePool;
pub use voice::{FmVoice, VoiceState};
