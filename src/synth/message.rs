use std::collections::VecDeque;
use std::sync::Arc;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::dsp::{mso::MsoTable, pad::PadTable};
use crate::synth::params::VoiceParam;

/// Control messages for the audio thread.
#[derive(Debug, Clone)]
pub enum SynthMessage {
    NoteOn { program: usize, note: u8 },
    NoteOff { program: usize, note: u8 },
    AllNotesOff { program: usize },
    /// Applied to every voice of the program.
    SetParam { program: usize, param: VoiceParam },
    SetMsoTable { program: usize, table: Arc<MsoTable> },
    SetPadTable { program: usize, table: Arc<PadTable> },
}

/// Notifications from the audio thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    /// The voice went silent after note-off, or a new note took it over.
    VoiceEnded { program: usize, voice: usize, note: u8 },
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for VecDeque<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.pop_front()
    }
}

pub trait EventSender {
    /// Returns false if the event could not be delivered.
    fn push(&mut self, event: VoiceEvent) -> bool;
}

#[cfg(feature = "rtrb")]
impl EventSender for Producer<VoiceEvent> {
    fn push(&mut self, event: VoiceEvent) -> bool {
        Producer::push(self, event).is_ok()
    }
}

impl EventSender for Vec<VoiceEvent> {
    fn push(&mut self, event: VoiceEvent) -> bool {
        Vec::push(self, event);
        true
    }
}
