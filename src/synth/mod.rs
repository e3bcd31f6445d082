// Purpose: Voice engine, polyphony and the realtime/control thread split
// This layer sits above the DSP primitives and owns whole notes

pub mod allocator;
pub mod message;
pub mod modulation;
pub mod params;
pub mod poly;
pub mod program;
pub mod voice;

pub use allocator::PolyphonyManager;
pub use message::{EventSender, MessageReceiver, SynthMessage, VoiceEvent};
pub use params::{default_patch, Source, SourceParam, VoiceParam};
#[cfg(feature = "rtrb")]
pub use poly::{RtSynth, SynthHandle};
pub use poly::Synth;
pub use program::Program;
pub use voice::Voice;
