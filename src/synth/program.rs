use std::sync::Arc;

use crate::config::EngineConfig;
use crate::dsp::{mso::MsoTable, pad::PadTable, pitch::midi_note_to_freq};
use crate::synth::{
    allocator::PolyphonyManager,
    message::{EventSender, VoiceEvent},
    params::{default_patch, VoiceParam},
    voice::Voice,
};

/// One patch slot: its shared wavetables, its voices and the slot
/// bookkeeping that maps notes onto them.
pub struct Program {
    index: usize,
    mso_table: Arc<MsoTable>,
    pad_table: Arc<PadTable>,
    voices: Vec<Voice>,
    polyphony: PolyphonyManager,
}

impl Program {
    /// Voices start with `default_patch` applied.
    pub fn new(
        index: usize,
        config: &EngineConfig,
        mso_table: Arc<MsoTable>,
        pad_table: Arc<PadTable>,
    ) -> Self {
        let voices = (0..config.polyphony)
            .map(|id| Voice::new(id, config, Arc::clone(&mso_table), Arc::clone(&pad_table)))
            .collect();

        let mut program = Self {
            index,
            mso_table,
            pad_table,
            voices,
            polyphony: PolyphonyManager::new(config.polyphony),
        };
        for param in default_patch() {
            program.apply(param);
        }
        program
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Start `note` on a voice. A voice taken from another note reports
    /// that note as ended through `events`. Returns the number of events
    /// that could not be delivered.
    pub fn note_on<E: EventSender>(&mut self, note: u8, events: &mut E) -> usize {
        let Some(allocation) = self.polyphony.allocate(note) else {
            return 0;
        };
        let mut dropped = 0;
        if let Some(previous) = allocation.previous.filter(|previous| *previous != note) {
            let event = VoiceEvent::VoiceEnded {
                program: self.index,
                voice: allocation.slot,
                note: previous,
            };
            if !events.push(event) {
                dropped += 1;
            }
        }
        let voice = &mut self.voices[allocation.slot];
        voice.set_in_use(true);
        voice.set_frequency(midi_note_to_freq(note));
        voice.note_on();
        dropped
    }

    pub fn note_off(&mut self, note: u8) {
        if let Some(slot) = self.polyphony.release(note) {
            self.voices[slot].note_off();
        }
    }

    pub fn all_notes_off(&mut self) {
        for slot in self.polyphony.release_all() {
            self.voices[slot].note_off();
        }
    }

    /// Apply a parameter change to every voice.
    pub fn apply(&mut self, param: VoiceParam) {
        for voice in &mut self.voices {
            voice.apply(param);
        }
    }

    /// Returns the previous table.
    pub fn set_mso_table(&mut self, table: Arc<MsoTable>) -> Arc<MsoTable> {
        for voice in &mut self.voices {
            voice.set_mso_table(Arc::clone(&table));
        }
        std::mem::replace(&mut self.mso_table, table)
    }

    /// Returns the previous table.
    pub fn set_pad_table(&mut self, table: Arc<PadTable>) -> Arc<PadTable> {
        for voice in &mut self.voices {
            voice.set_pad_table(Arc::clone(&table));
        }
        std::mem::replace(&mut self.pad_table, table)
    }

    pub fn mso_table(&self) -> &Arc<MsoTable> {
        &self.mso_table
    }

    pub fn pad_table(&self) -> &Arc<PadTable> {
        &self.pad_table
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn polyphony(&self) -> &PolyphonyManager {
        &self.polyphony
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Add every sounding voice into the buffers. Voices that end free their
    /// slot and are reported through `events`. Returns the number of events
    /// that could not be delivered.
    pub fn render<E: EventSender>(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        events: &mut E,
    ) -> usize {
        let mut dropped = 0;
        for (slot, voice) in self.voices.iter_mut().enumerate() {
            if !voice.is_active() {
                continue;
            }
            if voice.process(left, right) {
                voice.set_in_use(false);
                if let Some(note) = self.polyphony.free(slot) {
                    let event = VoiceEvent::VoiceEnded {
                        program: self.index,
                        voice: slot,
                        note,
                    };
                    if !events.push(event) {
                        dropped += 1;
                    }
                }
            }
        }
        dropped
    }
}
