//! Terminal UI: keyboard input, scope and status

mod spectrum;
mod status;
mod waveform;

use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;

use adjsynth_dsp::{
    dsp::{mso::MSO_DEFAULT_POINTS, pad::PadParams},
    error::Result as SynthResult,
    synth::{Source, SourceParam, SynthHandle, VoiceEvent, VoiceParam},
};

use super::keyboard::Keyboard;
use spectrum::{render_spectrum, SpectrumAnalyzer};
use status::{render_status, AudioStats, StatusInfo};
use waveform::render_waveform;

/// Audio visualization buffer size
const VIS_BUFFER_SIZE: usize = 1024;

const PROGRAM: usize = 0;

/// Breakpoint sets cycled by the morph key, starting from the pure sine.
const MSO_MORPHS: [[usize; 6]; 4] = [
    MSO_DEFAULT_POINTS,
    [256, 768, 1024, 1025, 1280, 1792],
    [64, 960, 1024, 1088, 1984, 2040],
    [400, 420, 1200, 1300, 1700, 1720],
];

pub struct UiApp {
    handle: SynthHandle,
    scope_rx: Consumer<f32>,
    audio_buffer: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    keyboard: Keyboard,
    enabled: [bool; Source::COUNT],
    mso_morph: usize,
    pad_seed: u64,
    voices_ended: u64,
    message: String,
    sample_rate: f32,
    should_quit: bool,
}

impl UiApp {
    pub fn new(handle: SynthHandle, scope_rx: Consumer<f32>, sample_rate: f32) -> Self {
        let mut enabled = [false; Source::COUNT];
        // The default patch plays oscillator 1.
        enabled[Source::Osc1.index()] = true;

        Self {
            handle,
            scope_rx,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            spectrum: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, sample_rate),
            keyboard: Keyboard::new(),
            enabled,
            mso_morph: 0,
            pad_seed: PadParams::default().seed,
            voices_ended: 0,
            message: String::new(),
            sample_rate,
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.poll_synth();
            self.release_expired(Instant::now());

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        let _ = self.handle.all_notes_off(PROGRAM);
        Ok(())
    }

    fn poll_audio(&mut self) {
        let available = self.scope_rx.slots();
        if available == 0 {
            return;
        }
        if let Ok(chunk) = self.scope_rx.read_chunk(available) {
            let (first, second) = chunk.as_slices();
            self.audio_buffer.extend_from_slice(first);
            self.audio_buffer.extend_from_slice(second);
            chunk.commit_all();
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(..excess);
        }
        self.spectrum.update(&self.audio_buffer);
    }

    fn poll_synth(&mut self) {
        while let Some(VoiceEvent::VoiceEnded { .. }) = self.handle.poll_event() {
            self.voices_ended += 1;
        }
        self.handle.collect_garbage();
    }

    fn release_expired(&mut self, now: Instant) {
        for note in self.keyboard.expired(now) {
            let result = self.handle.note_off(PROGRAM, note);
            self.report(result);
        }
    }

    fn report(&mut self, result: SynthResult<()>) {
        if let Err(err) = result {
            log::warn!("{err}");
            self.message = err.to_string();
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Char(' ') => {
                self.keyboard.clear();
                let result = self.handle.all_notes_off(PROGRAM);
                self.report(result);
            }
            KeyCode::Char('z') => self.keyboard.octave_down(),
            KeyCode::Char('x') => self.keyboard.octave_up(),
            KeyCode::Char(c @ '1'..='6') => {
                let index = c as usize - '1' as usize;
                self.toggle_source(Source::ALL[index]);
            }
            KeyCode::Char('[') => self.next_morph(),
            KeyCode::Char(']') => self.regenerate_pad(),
            KeyCode::Char(c) => {
                if let Some(note) = self.keyboard.note(c) {
                    if self.keyboard.press(note, Instant::now()) {
                        let result = self.handle.note_on(PROGRAM, note);
                        self.report(result);
                    }
                }
            }
            _ => {}
        }
    }

    fn toggle_source(&mut self, source: Source) {
        let on = !self.enabled[source.index()];
        self.enabled[source.index()] = on;
        let level = if on { 70 } else { 0 };
        let params = [
            SourceParam::Enabled(on),
            SourceParam::Send1(level),
            SourceParam::Send2(level),
        ];
        for param in params {
            let result = self
                .handle
                .set_param(PROGRAM, VoiceParam::Source { source, param });
            self.report(result);
        }
    }

    fn next_morph(&mut self) {
        self.mso_morph = (self.mso_morph + 1) % MSO_MORPHS.len();
        let result = self
            .handle
            .set_mso_table(PROGRAM, MSO_MORPHS[self.mso_morph], 0.5);
        self.report(result);
    }

    fn regenerate_pad(&mut self) {
        self.pad_seed = self.pad_seed.wrapping_add(1);
        let params = PadParams {
            seed: self.pad_seed,
            ..PadParams::default()
        };
        let started = Instant::now();
        let result = self.handle.set_pad_table(PROGRAM, &params);
        if result.is_ok() {
            self.message = format!("PAD table {} in {:?}", self.pad_seed, started.elapsed());
        }
        self.report(result);
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),  // Status
                Constraint::Min(8),     // Waveform
                Constraint::Length(10), // Spectrum
                Constraint::Length(1),  // Help bar
            ])
            .split(frame.area());

        let info = StatusInfo {
            sample_rate: self.sample_rate,
            octave: self.keyboard.octave(),
            held: self.keyboard.held(),
            voices_ended: self.voices_ended,
            enabled: self.enabled,
            mso_morph: self.mso_morph,
            message: &self.message,
        };
        render_status(frame, chunks[0], &info, &AudioStats::from_buffer(&self.audio_buffer));
        render_waveform(frame, chunks[1], &self.audio_buffer);
        render_spectrum(frame, chunks[2], self.spectrum.data());

        let help = Paragraph::new(
            " [a-;] Play  [z/x] Octave  [1-6] Sources  [[] Morph  []] New PAD  [Space] Stop  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
