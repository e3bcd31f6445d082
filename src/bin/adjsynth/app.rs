//! Audio device setup and the realtime callback

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;

use adjsynth_dsp::{
    dsp::{amp::AmpParam, filter::FilterParam},
    synth::{
        modulation::{EnvSelector, ModParam},
        Source, SynthHandle, VoiceParam,
    },
    EngineConfig, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE,
};

use super::ui::UiApp;

/// Scope samples buffered between the audio and UI threads.
const SCOPE_CAPACITY: usize = 16_384;

/// Main application builder
pub struct Adjsynth {
    polyphony: usize,
}

impl Adjsynth {
    pub fn new() -> Self {
        Self { polyphony: 16 }
    }

    pub fn polyphony(mut self, voices: usize) -> Self {
        self.polyphony = voices;
        self
    }

    /// Open the default output device and run the UI until the user quits.
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let device_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let engine = EngineConfig::new(device_rate, DEFAULT_BLOCK_SIZE).with_polyphony(self.polyphony);
        if engine.sample_rate != device_rate {
            log::warn!(
                "device runs at {device_rate} Hz, engine at {} Hz: pitch will be off",
                engine.sample_rate
            );
        }

        let (mut handle, mut synth) = SynthHandle::new(engine);
        setup_patch(&mut handle).wrap_err("failed to send the startup patch")?;

        let (mut scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_CAPACITY);
        let block = engine.block_size;
        let mut left = vec![0.0f32; MAX_BLOCK_SIZE];
        let mut right = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(block);
                    let l = &mut left[..frames];
                    let r = &mut right[..frames];
                    synth.render_block(l, r);

                    let out = &mut data[frames_written * channels..][..frames * channels];
                    for (i, frame) in out.chunks_exact_mut(channels).enumerate() {
                        let mono = 0.5 * (l[i] + r[i]);
                        if channels == 1 {
                            frame[0] = mono;
                        } else {
                            for (ch, sample) in frame.iter_mut().enumerate() {
                                *sample = if ch % 2 == 0 { l[i] } else { r[i] };
                            }
                        }
                        // The scope is best effort.
                        let _ = scope_tx.push(mono);
                    }

                    frames_written += frames;
                }
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        )?;
        stream.play()?;

        let mut terminal = ratatui::init();
        let result = UiApp::new(handle, scope_rx, engine.sample_rate).run(&mut terminal);
        ratatui::restore();
        result
    }
}

impl Default for Adjsynth {
    fn default() -> Self {
        Self::new()
    }
}

/// Every amplitude follows ADSR 1, the two channels are spread a little.
fn setup_patch(handle: &mut SynthHandle) -> adjsynth_dsp::error::Result<()> {
    for target in Source::ALL.iter().filter_map(|s| s.amp_target()) {
        handle.set_param(
            0,
            VoiceParam::Modulation {
                target,
                param: ModParam::Env(EnvSelector::Adsr(1)),
            },
        )?;
        handle.set_param(
            0,
            VoiceParam::Modulation {
                target,
                param: ModParam::EnvDepth(100),
            },
        )?;
    }

    let params = [
        VoiceParam::Filter2(FilterParam::Frequency(100)),
        VoiceParam::Amp(AmpParam::Gain2(100)),
        VoiceParam::Amp(AmpParam::Pan1(35)),
        VoiceParam::Amp(AmpParam::Pan2(65)),
    ];
    for param in params {
        handle.set_param(0, param)?;
    }
    Ok(())
}
