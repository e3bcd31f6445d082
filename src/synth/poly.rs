use std::sync::Arc;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::EngineConfig;
use crate::dsp::{
    mso::MsoTable,
    pad::{generate, PadParams, PadTable},
};
use crate::synth::{
    message::{EventSender, MessageReceiver, SynthMessage},
    program::Program,
};
#[cfg(feature = "rtrb")]
use crate::{
    error::{Result, SynthError},
    synth::{message::VoiceEvent, params::VoiceParam},
};
use crate::MAX_BLOCK_SIZE;

/*
Threads
=======

    control thread                         audio thread
    ──────────────                         ────────────
    SynthHandle ── SynthMessage ring ──→   Synth::render_block
                ←─ VoiceEvent ring ─────     └─ Program × N
                                                  └─ Voice × polyphony

The audio thread never allocates, locks or frees. New wavetables are built
by the handle and sent over as `Arc`s; the audio thread only clones and drops
references. The handle keeps its own reference to every table it has handed
out and releases it in `collect_garbage` once it holds the last one, so the
actual deallocation always happens on the control thread.
*/

pub const MESSAGE_CAPACITY: usize = 1024;
pub const EVENT_CAPACITY: usize = 1024;

/// The real-time half: owns every program and renders them block by block.
pub struct Synth<R: MessageReceiver, E: EventSender> {
    config: EngineConfig,
    programs: Vec<Program>,
    rx: R,
    tx: E,
    dropped_events: u64,
    frame_counter: u64,
}

impl<R: MessageReceiver, E: EventSender> Synth<R, E> {
    /// Every program starts with a pure sine MSO table and a default PAD
    /// table. Generates the PAD table, so call it off the audio thread.
    pub fn new(config: EngineConfig, rx: R, tx: E) -> Self {
        let mso = Arc::new(MsoTable::sine());
        let pad = generate(&PadParams::default(), config.sample_rate);
        Self::with_tables(config, rx, tx, mso, pad)
    }

    pub fn with_tables(
        config: EngineConfig,
        rx: R,
        tx: E,
        mso: Arc<MsoTable>,
        pad: Arc<PadTable>,
    ) -> Self {
        let programs = (0..config.programs)
            .map(|index| Program::new(index, &config, Arc::clone(&mso), Arc::clone(&pad)))
            .collect();

        Self {
            config,
            programs,
            rx,
            tx,
            dropped_events: 0,
            frame_counter: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn program(&self, index: usize) -> Option<&Program> {
        self.programs.get(index)
    }

    /// Voice events lost because the event queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame_counter
    }

    /// Drain pending messages, then overwrite `left` and `right` with the
    /// sum of every program.
    pub fn render_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        debug_assert!(left.len() <= MAX_BLOCK_SIZE);

        while let Some(msg) = self.rx.pop() {
            self.handle(msg);
        }

        left.fill(0.0);
        right.fill(0.0);
        for program in &mut self.programs {
            self.dropped_events += program.render(left, right, &mut self.tx) as u64;
        }

        self.frame_counter += left.len() as u64;
    }

    fn handle(&mut self, msg: SynthMessage) {
        let index = match &msg {
            SynthMessage::NoteOn { program, .. }
            | SynthMessage::NoteOff { program, .. }
            | SynthMessage::AllNotesOff { program }
            | SynthMessage::SetParam { program, .. }
            | SynthMessage::SetMsoTable { program, .. }
            | SynthMessage::SetPadTable { program, .. } => *program,
        };
        // Unknown programs were rejected by the sender.
        let Some(program) = self.programs.get_mut(index) else {
            return;
        };

        match msg {
            SynthMessage::NoteOn { note, .. } => {
                self.dropped_events += program.note_on(note, &mut self.tx) as u64;
            }
            SynthMessage::NoteOff { note, .. } => program.note_off(note),
            SynthMessage::AllNotesOff { .. } => program.all_notes_off(),
            SynthMessage::SetParam { param, .. } => program.apply(param),
            SynthMessage::SetMsoTable { table, .. } => {
                program.set_mso_table(table);
            }
            SynthMessage::SetPadTable { table, .. } => {
                program.set_pad_table(table);
            }
        }
    }
}

/// The audio-thread half created by `SynthHandle::new`.
#[cfg(feature = "rtrb")]
pub type RtSynth = Synth<Consumer<SynthMessage>, Producer<VoiceEvent>>;

/// The control-thread half: sends messages, builds tables, collects events.
#[cfg(feature = "rtrb")]
pub struct SynthHandle {
    config: EngineConfig,
    tx: Producer<SynthMessage>,
    rx: Consumer<VoiceEvent>,
    mso_tables: Vec<Arc<MsoTable>>,
    pad_tables: Vec<Arc<PadTable>>,
}

#[cfg(feature = "rtrb")]
impl SynthHandle {
    pub fn new(config: EngineConfig) -> (Self, RtSynth) {
        let (msg_tx, msg_rx) = RingBuffer::new(MESSAGE_CAPACITY);
        let (event_tx, event_rx) = RingBuffer::new(EVENT_CAPACITY);

        let mso = Arc::new(MsoTable::sine());
        let pad = generate(&PadParams::default(), config.sample_rate);
        let synth = Synth::with_tables(
            config,
            msg_rx,
            event_tx,
            Arc::clone(&mso),
            Arc::clone(&pad),
        );

        log::info!(
            "synth ready: {} program(s) × {} voices at {} Hz",
            config.programs,
            config.polyphony,
            config.sample_rate
        );

        let handle = Self {
            config,
            tx: msg_tx,
            rx: event_rx,
            mso_tables: vec![mso],
            pad_tables: vec![pad],
        };
        (handle, synth)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn send(&mut self, msg: SynthMessage) -> Result<()> {
        self.tx.push(msg).map_err(|_| {
            log::warn!("synth message queue full, message dropped");
            SynthError::QueueFull
        })
    }

    fn check_program(&self, program: usize) -> Result<()> {
        if program < self.config.programs {
            Ok(())
        } else {
            Err(SynthError::NoSuchProgram(program))
        }
    }

    pub fn note_on(&mut self, program: usize, note: u8) -> Result<()> {
        self.check_program(program)?;
        self.send(SynthMessage::NoteOn { program, note })
    }

    pub fn note_off(&mut self, program: usize, note: u8) -> Result<()> {
        self.check_program(program)?;
        self.send(SynthMessage::NoteOff { program, note })
    }

    pub fn all_notes_off(&mut self, program: usize) -> Result<()> {
        self.check_program(program)?;
        self.send(SynthMessage::AllNotesOff { program })
    }

    pub fn set_param(&mut self, program: usize, param: VoiceParam) -> Result<()> {
        self.check_program(program)?;
        self.send(SynthMessage::SetParam { program, param })
    }

    /// Build a morphed table and hand it to the program.
    pub fn set_mso_table(
        &mut self,
        program: usize,
        points: [usize; 6],
        symmetry: f32,
    ) -> Result<()> {
        self.check_program(program)?;
        let table = Arc::new(MsoTable::new(points, symmetry)?);
        self.mso_tables.push(Arc::clone(&table));
        self.send(SynthMessage::SetMsoTable { program, table })
    }

    /// Generate a PAD table and hand it to the program. Blocks while the
    /// table is computed.
    pub fn set_pad_table(&mut self, program: usize, params: &PadParams) -> Result<()> {
        self.check_program(program)?;
        let table = generate(params, self.config.sample_rate);
        self.pad_tables.push(Arc::clone(&table));
        self.send(SynthMessage::SetPadTable { program, table })
    }

    pub fn poll_event(&mut self) -> Option<VoiceEvent> {
        self.rx.pop().ok()
    }

    /// Free every table the audio thread no longer references. Returns the
    /// number of tables freed.
    pub fn collect_garbage(&mut self) -> usize {
        let before = self.mso_tables.len() + self.pad_tables.len();
        self.mso_tables.retain(|t| Arc::strong_count(t) > 1);
        self.pad_tables.retain(|t| Arc::strong_count(t) > 1);
        let freed = before - self.mso_tables.len() - self.pad_tables.len();
        if freed > 0 {
            log::debug!("freed {freed} retired wavetable(s)");
        }
        freed
    }

    /// Tables still held on behalf of the audio thread.
    pub fn live_tables(&self) -> usize {
        self.mso_tables.len() + self.pad_tables.len()
    }
}
