//! Spectrum of the mono output
//!
//! The FFT bins are grouped into log-spaced bands; each band shows the
//! loudest bin it covers, with a slow fall so peaks stay readable.

use std::sync::Arc;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

const BANDS: usize = 64;
const FLOOR_DB: f64 = -100.0;
/// dB a band may fall per update.
const FALL_DB: f64 = 3.0;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// First FFT bin of each band, plus one closing edge.
    edges: Vec<usize>,
    /// (log10 of band centre in Hz, level in dB)
    bands: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    pub fn new(len: usize, sample_rate: f32) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(len);
        let window = (0..len)
            .map(|i| {
                let x = i as f32 / len.saturating_sub(1).max(1) as f32;
                0.5 - 0.5 * (std::f32::consts::TAU * x).cos()
            })
            .collect();

        let half = (len / 2).max(2);
        let bin_hz = sample_rate as f64 / len as f64;
        let low = 20.0f64.log10();
        let high = (sample_rate as f64 / 2.0).min(20_000.0).log10();

        let edges: Vec<usize> = (0..=BANDS)
            .map(|b| {
                let hz = 10f64.powf(low + (high - low) * b as f64 / BANDS as f64);
                ((hz / bin_hz) as usize).clamp(1, half - 1)
            })
            .collect();
        let bands = (0..BANDS)
            .map(|b| (low + (high - low) * (b as f64 + 0.5) / BANDS as f64, FLOOR_DB))
            .collect();

        Self {
            fft,
            window,
            scratch: vec![Complex::new(0.0, 0.0); len],
            edges,
            bands,
        }
    }

    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }

        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = (self.window.len() as f32 / 2.0).powi(2);
        for (band, edge) in self.bands.iter_mut().zip(self.edges.windows(2)) {
            // Narrow low bands may share a bin with their neighbour.
            let end = edge[1].max(edge[0] + 1);
            let power = self.scratch[edge[0]..end]
                .iter()
                .map(|c| c.norm_sqr() / norm)
                .fold(1e-12f32, f32::max);
            let db = (10.0 * (power as f64).log10()).max(FLOOR_DB);
            band.1 = db.max(band.1 - FALL_DB);
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.bands
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, bands: &[(f64, f64)]) {
    let block = Block::default().title(" Spectrum ").borders(Borders::ALL);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(bands);

    let (low, high) = bands
        .first()
        .zip(bands.last())
        .map_or((1.0, 4.3), |(a, b)| (a.0, b.0));

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([low, high])
                .labels(vec!["20", "200", "2k", "20k"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, 0.0])
                .labels(vec!["-100", "-50", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
