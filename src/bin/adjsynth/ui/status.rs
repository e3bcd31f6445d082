//! Status bar: engine, keyboard and level readout

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use adjsynth_dsp::synth::Source;

/// Audio statistics for display
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub struct StatusInfo<'a> {
    pub sample_rate: f32,
    pub octave: i8,
    pub held: usize,
    pub voices_ended: u64,
    pub enabled: [bool; Source::COUNT],
    pub mso_morph: usize,
    pub message: &'a str,
}

fn source_label(source: Source) -> &'static str {
    match source {
        Source::Osc1 => "1 OSC1",
        Source::Osc2 => "2 OSC2",
        Source::Noise => "3 NOISE",
        Source::Karplus => "4 STRING",
        Source::Mso => "5 MSO",
        Source::Pad => "6 PAD",
    }
}

pub fn render_status(frame: &mut Frame, area: Rect, info: &StatusInfo, stats: &AudioStats) {
    let block = Block::default().title(" adjsynth ").borders(Borders::ALL);

    let engine = Line::from(vec![
        Span::styled(
            format!(" {:.1}kHz  ", info.sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Octave {}  ", info.octave),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("Held {}  Ended {}  ", info.held, info.voices_ended),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Morph {}  ", info.mso_morph),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}  ", stats.peak, stats.rms),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(info.message.to_string(), Style::default().fg(Color::Yellow)),
    ]);

    let sources: Vec<Span> = Source::ALL
        .iter()
        .map(|&source| {
            let color = if info.enabled[source.index()] {
                Color::Green
            } else {
                Color::DarkGray
            };
            Span::styled(
                format!(" {} ", source_label(source)),
                Style::default().fg(color),
            )
        })
        .collect();

    let paragraph = Paragraph::new(vec![engine, Line::from(sources)]).block(block);
    frame.render_widget(paragraph, area);
}
