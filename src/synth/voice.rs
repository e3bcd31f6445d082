use std::sync::Arc;

use crate::config::{EngineConfig, PwmModulationMode};
use crate::dsp::{
    amp::Amp,
    distortion::Distortion,
    envelope::Adsr,
    filter::SVFilter,
    karplus::KarplusString,
    lfo::Lfo,
    mso::{MorphedSineOsc, MsoTable},
    noise::Noise,
    oscillator::Oscillator,
    pad::{PadReader, PadTable},
    pitch::clamp_frequency,
};
use crate::synth::modulation::{
    modulated_symmetry, number_to_index, ModSlot, ModSources, ModTarget,
};
use crate::synth::params::{Source, SourceBus, VoiceParam};
use crate::{CONTROL_SUB_SAMPLING, NUM_OF_ADSRS, NUM_OF_LFOS};

/*
Voice
=====

One note's complete signal path. A voice owns one of every generator, two
filters with their distortion units, the stereo amp, five LFOs and five
ADSRs. It is created once per polyphony slot and reused for note after note.

    osc1 ─┐                   ┌─→ filter 1 → dist 1 ─┐
    osc2 ─┤                   │                      │
    noise ┤ × amp mod × send ─┤                      ├─→ amp ─→ (L, R)
    ks ───┤                   │                      │
    mso ──┤                   └─→ filter 2 → dist 2 ─┘
    pad ──┘  (tap A → bus 1, tap B → bus 2)

Two rates
---------

Control rate, every CONTROL_SUB_SAMPLING samples (`tick_control`):
  - advance LFOs and ADSRs
  - evaluate every modulation slot
  - retune the pitched sources, move PWM, set filter and pan modulation
  - set new amplitude targets
  - check whether the voice has gone silent

Audio rate, every sample (`render_sample`):
  - step each amplitude factor one sample closer to its target, so a jump
    between two control ticks is spread over the whole control period and
    never clicks
  - run the enabled sources and sum them into the two busses
  - filter, distort, pan

Lifecycle
---------

  in_use                 the polyphony manager has handed the voice a note
  active                 the voice produces sound
  waits_for_not_active   note-off has arrived, waiting for silence

After note-off, every control tick asks: has every enabled source either an
envelope level below 0.05 or both sends below 0.05, and has the string lost
its energy? If so the sources fade to zero over one control period and the
voice rings out:

  Playing ──silent──► Ringing ──settled──► inactive
                         │
                         └──too long──► Fading ──output at 0──► inactive

A resonant filter keeps ringing after its input stops, so the voice keeps
rendering until both filters have settled and the output of the last control
period stayed under TAIL_OUTPUT_FLOOR. Only then does it go inactive, with
its filter state cleared. A tail that is still audible after MAX_TAIL_SECONDS
is faded out over TAIL_FADE_SAMPLES instead. `tick_control` returns true
once, on the tick the voice goes inactive.
*/

const SILENT_ENV_LEVEL: f32 = 0.05;
const SILENT_SEND_LEVEL: f32 = 0.05;
const SILENT_STRING_ENERGY: f32 = 5.0e-6;

const TAIL_STATE_FLOOR: f32 = 1.0e-5;
const TAIL_OUTPUT_FLOOR: f32 = 1.0e-4;
const MAX_TAIL_SECONDS: f32 = 10.0;
const TAIL_FADE_SAMPLES: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Playing,
    /// Sources faded out, the filters may still ring.
    Ringing { ticks: usize },
    /// The tail outlived MAX_TAIL_SECONDS, the output ramps down.
    Fading,
}

/// Linear per-sample ramp towards a control-rate target.
#[derive(Debug, Clone, Copy, Default)]
struct Ramp {
    current: f32,
    target: f32,
    step: f32,
    remaining: usize,
}

impl Ramp {
    fn at(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    fn set_target(&mut self, target: f32) {
        self.set_target_over(target, CONTROL_SUB_SAMPLING);
    }

    fn set_target_over(&mut self, target: f32, samples: usize) {
        let samples = samples.max(1);
        self.target = target;
        self.step = (target - self.current) / samples as f32;
        self.remaining = samples;
    }

    fn is_at(&self, value: f32) -> bool {
        self.remaining == 0 && self.current == value
    }

    #[inline]
    fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = if self.remaining == 0 {
                self.target
            } else {
                self.current + self.step
            };
        }
        self.current
    }
}

#[inline]
fn send(bus: &mut [f32; 2], source: &SourceBus, sample: f32) {
    bus[0] += sample * source.send_1;
    bus[1] += sample * source.send_2;
}

pub struct Voice {
    id: usize,
    control_rate: f32,
    pwm_mode: PwmModulationMode,

    frequency: f32,
    in_use: bool,
    active: bool,
    waits_for_not_active: bool,
    ending: Ending,
    max_tail_ticks: usize,
    // Loudest output sample since the last control tick while ringing.
    tail_peak: f32,
    sub_sample: usize,

    osc1: Oscillator,
    osc2: Oscillator,
    noise: Noise,
    karplus: KarplusString,
    mso: MorphedSineOsc,
    pad: PadReader,
    filters: [SVFilter; 2],
    distortions: [Distortion; 2],
    amp: Amp,
    lfos: [Lfo; NUM_OF_LFOS],
    adsrs: [Adsr; NUM_OF_ADSRS],

    buses: [SourceBus; Source::COUNT],
    slots: [ModSlot; ModTarget::COUNT],
    gains: [Ramp; Source::COUNT],
    output_gain: Ramp,
    env_levels: [f32; Source::COUNT],
    // osc1, osc2, mso, pad
    freq_mod: [f32; 4],
    filter_mod: [f32; 2],
    pan_mod: [f32; 2],
}

impl Voice {
    pub fn new(
        id: usize,
        config: &EngineConfig,
        mso_table: Arc<MsoTable>,
        pad_table: Arc<PadTable>,
    ) -> Self {
        let sample_rate = config.sample_rate;
        let control_rate = config.control_rate();
        let interval = config.control_interval();

        let mut gains = [Ramp::default(); Source::COUNT];
        gains[Source::Karplus.index()] = Ramp::at(1.0);

        Self {
            id,
            control_rate,
            pwm_mode: config.pwm_modulation,
            frequency: 440.0,
            in_use: false,
            active: false,
            waits_for_not_active: false,
            ending: Ending::Playing,
            max_tail_ticks: (MAX_TAIL_SECONDS * control_rate) as usize,
            tail_peak: 0.0,
            sub_sample: 0,
            osc1: Oscillator::new(sample_rate),
            osc2: Oscillator::new(sample_rate),
            noise: Noise::new(),
            karplus: KarplusString::new(sample_rate),
            mso: MorphedSineOsc::new(sample_rate, mso_table),
            pad: PadReader::new(sample_rate, pad_table),
            filters: std::array::from_fn(|_| SVFilter::new(sample_rate)),
            distortions: std::array::from_fn(|_| Distortion::new()),
            amp: Amp::new(),
            lfos: std::array::from_fn(|_| Lfo::new(control_rate)),
            adsrs: std::array::from_fn(|_| Adsr::new(interval)),
            buses: [SourceBus::default(); Source::COUNT],
            slots: [ModSlot::default(); ModTarget::COUNT],
            gains,
            output_gain: Ramp::at(1.0),
            env_levels: [1.0; Source::COUNT],
            freq_mod: [0.0; 4],
            filter_mod: [0.0; 2],
            pan_mod: [0.0; 2],
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn apply(&mut self, param: VoiceParam) {
        match param {
            VoiceParam::Source { source, param } => self.buses[source.index()].apply(param),
            VoiceParam::Osc1(p) => self.osc1.apply(p),
            VoiceParam::Osc2(p) => self.osc2.apply(p),
            VoiceParam::Noise(p) => self.noise.apply(p),
            VoiceParam::Karplus(p) => self.karplus.apply(p),
            VoiceParam::Mso(p) => self.mso.apply(p),
            VoiceParam::Pad(p) => self.pad.apply(p),
            VoiceParam::Filter1(p) => self.filters[0].apply(p),
            VoiceParam::Filter2(p) => self.filters[1].apply(p),
            VoiceParam::Distortion1(p) => self.distortions[0].apply(p),
            VoiceParam::Distortion2(p) => self.distortions[1].apply(p),
            VoiceParam::Amp(p) => self.amp.apply(p),
            VoiceParam::Lfo { number, param } => {
                if let Some(index) = number_to_index(number, NUM_OF_LFOS) {
                    self.lfos[index].apply(param);
                }
            }
            VoiceParam::Adsr { number, param } => {
                if let Some(index) = number_to_index(number, NUM_OF_ADSRS) {
                    self.adsrs[index].apply(param);
                }
            }
            VoiceParam::Modulation { target, param } => self.slots[target.index()].apply(param),
        }
    }

    /// Swap the shared MSO table, returning the previous one.
    pub fn set_mso_table(&mut self, table: Arc<MsoTable>) -> Arc<MsoTable> {
        self.mso.set_table(table)
    }

    /// Swap the shared PAD table, returning the previous one.
    pub fn set_pad_table(&mut self, table: Arc<PadTable>) -> Arc<PadTable> {
        self.pad.set_table(table)
    }

    /// Base pitch of the voice. The string picks it up at the next pluck.
    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency = clamp_frequency(hz);
        self.karplus.set_frequency(self.frequency);
        for filter in &mut self.filters {
            filter.set_note_frequency(self.frequency);
        }
        self.retune();
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    fn retune(&mut self) {
        let base = self.frequency;
        let [osc1, osc2, mso, pad] = self.freq_mod;
        self.osc1.set_frequency(self.osc1.detune().apply(base, osc1));
        self.osc2.set_frequency(self.osc2.detune().apply(base, osc2));
        self.mso.set_frequency(self.mso.detune().apply(base, mso));
        self.pad.set_frequency(self.pad.detune().apply(base, pad));
    }

    pub fn note_on(&mut self) {
        self.active = true;
        self.waits_for_not_active = false;
        self.sub_sample = 0;
        if self.ending != Ending::Playing {
            self.ending = Ending::Playing;
            self.output_gain.set_target(1.0);
        }

        for adsr in &mut self.adsrs {
            adsr.note_on();
        }
        self.karplus.pluck();
        self.gains[Source::Karplus.index()] = Ramp::at(1.0);
    }

    pub fn note_off(&mut self) {
        if !self.active {
            return;
        }
        self.waits_for_not_active = true;
        for adsr in &mut self.adsrs {
            adsr.note_off();
        }
        self.karplus.release();
    }

    /// Advance the modulation sources one control tick and recompute every
    /// modulation value. Returns true on the tick the voice ends.
    pub fn tick_control(&mut self) -> bool {
        if !self.active {
            return false;
        }
        match self.ending {
            Ending::Playing => {}
            Ending::Ringing { ticks } => {
                if self.has_settled() {
                    return self.finish();
                }
                if ticks >= self.max_tail_ticks {
                    self.ending = Ending::Fading;
                    self.output_gain.set_target_over(0.0, TAIL_FADE_SAMPLES);
                } else {
                    self.ending = Ending::Ringing { ticks: ticks + 1 };
                }
                self.tail_peak = 0.0;
                return false;
            }
            Ending::Fading => {
                if self.output_gain.is_at(0.0) {
                    return self.finish();
                }
                return false;
            }
        }

        let mut sources = ModSources {
            control_rate: self.control_rate,
            ..ModSources::default()
        };
        for (out, lfo) in sources.lfo.iter_mut().zip(self.lfos.iter_mut()) {
            *out = lfo.tick();
        }
        for (i, adsr) in self.adsrs.iter_mut().enumerate() {
            sources.adsr[i] = adsr.tick();
            sources.adsr_ticks[i] = adsr.ticks_since_note_on();
        }

        let values: [f32; ModTarget::COUNT] =
            std::array::from_fn(|i| self.slots[i].additive(&sources));
        let value = |target: ModTarget| values[target.index()];

        self.freq_mod = [
            value(ModTarget::Osc1Freq),
            value(ModTarget::Osc2Freq),
            value(ModTarget::MsoFreq),
            value(ModTarget::PadFreq),
        ];
        self.retune();

        let mode = self.pwm_mode;
        let osc1_pwm = self.osc1.pwm_percent();
        self.osc1
            .set_symmetry(modulated_symmetry(osc1_pwm, value(ModTarget::Osc1Pwm), mode));
        let osc2_pwm = self.osc2.pwm_percent();
        self.osc2
            .set_symmetry(modulated_symmetry(osc2_pwm, value(ModTarget::Osc2Pwm), mode));
        let mso_pwm = self.mso.pwm_percent();
        self.mso
            .set_symmetry(modulated_symmetry(mso_pwm, value(ModTarget::MsoPwm), mode));

        self.filter_mod = [value(ModTarget::Filter1Freq), value(ModTarget::Filter2Freq)];
        self.pan_mod = [value(ModTarget::Amp1Pan), value(ModTarget::Amp2Pan)];

        for source in Source::ALL {
            if let Some(target) = source.amp_target() {
                let modulation = self.slots[target.index()].amplitude(&sources);
                self.env_levels[source.index()] = modulation.env;
                self.gains[source.index()].set_target(modulation.factor());
            }
        }

        if self.waits_for_not_active && self.is_silent() {
            self.waits_for_not_active = false;
            self.ending = Ending::Ringing { ticks: 0 };
            self.tail_peak = 0.0;
            for gain in &mut self.gains {
                gain.set_target(0.0);
            }
        }
        false
    }

    /// True once the filters have rung out and the last control period
    /// stayed below the output floor.
    fn has_settled(&self) -> bool {
        self.tail_peak < TAIL_OUTPUT_FLOOR
            && self.filters.iter().all(|f| f.is_settled(TAIL_STATE_FLOOR))
    }

    fn finish(&mut self) -> bool {
        self.active = false;
        self.ending = Ending::Playing;
        self.output_gain = Ramp::at(1.0);
        self.tail_peak = 0.0;
        for filter in &mut self.filters {
            filter.clear();
        }
        true
    }

    /// True while the sources are silent and the filters ring out.
    pub fn is_ringing_out(&self) -> bool {
        self.active && self.ending != Ending::Playing
    }

    /// True when nothing enabled in the voice can still be heard.
    pub fn is_silent(&self) -> bool {
        let sources_quiet = Source::ALL
            .iter()
            .filter(|source| **source != Source::Karplus)
            .all(|source| {
                let bus = &self.buses[source.index()];
                !bus.enabled
                    || self.env_levels[source.index()] < SILENT_ENV_LEVEL
                    || (bus.send_1 < SILENT_SEND_LEVEL && bus.send_2 < SILENT_SEND_LEVEL)
            });

        let string = &self.buses[Source::Karplus.index()];
        let string_quiet = !string.enabled || self.karplus.energy() < SILENT_STRING_ENERGY;

        sources_quiet && string_quiet
    }

    /// One stereo sample.
    pub fn render_sample(&mut self) -> (f32, f32) {
        if !self.active {
            return (0.0, 0.0);
        }

        let mut gain = [0.0f32; Source::COUNT];
        for (g, ramp) in gain.iter_mut().zip(self.gains.iter_mut()) {
            *g = ramp.next();
        }

        let mut bus = [0.0f32; 2];
        let buses = &self.buses;

        let osc1_on = buses[Source::Osc1.index()].enabled;
        let sync = self.osc2.hard_sync();
        if osc1_on || sync {
            let sample = self.osc1.next_sample();
            if sync && self.osc1.cycle_restarted() {
                self.osc2.sync();
            }
            if osc1_on {
                let i = Source::Osc1.index();
                send(&mut bus, &buses[i], sample * gain[i]);
            }
        }

        let i = Source::Osc2.index();
        if buses[i].enabled {
            send(&mut bus, &buses[i], self.osc2.next_sample() * gain[i]);
        }

        let i = Source::Noise.index();
        if buses[i].enabled {
            send(&mut bus, &buses[i], self.noise.next_sample() * gain[i]);
        }

        let i = Source::Karplus.index();
        if buses[i].enabled {
            send(&mut bus, &buses[i], self.karplus.next_sample() * gain[i]);
        }

        let i = Source::Mso.index();
        if buses[i].enabled {
            send(&mut bus, &buses[i], self.mso.next_sample() * gain[i]);
        }

        let i = Source::Pad.index();
        if buses[i].enabled {
            let (a, b) = self.pad.next_sample();
            bus[0] += a * gain[i] * buses[i].send_1;
            bus[1] += b * gain[i] * buses[i].send_2;
        }

        let mut channel = [0.0f32; 2];
        for (ch, out) in channel.iter_mut().enumerate() {
            let filtered = self.filters[ch].process(bus[ch], self.filter_mod[ch]);
            *out = self.distortions[ch].process(filtered);
        }

        let (left, right) = self
            .amp
            .process(channel[0], channel[1], self.pan_mod[0], self.pan_mod[1]);
        let out = self.output_gain.next();
        let (left, right) = (left * out, right * out);
        if self.ending != Ending::Playing {
            self.tail_peak = self.tail_peak.max(left.abs()).max(right.abs());
        }
        (left, right)
    }

    /// Add one block of the voice into `left` and `right`, ticking the
    /// control rate as it goes. Returns true if the voice ended in this
    /// block.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) -> bool {
        debug_assert_eq!(left.len(), right.len());
        let mut ended = false;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            if self.sub_sample == 0 {
                ended |= self.tick_control();
            }
            self.sub_sample = (self.sub_sample + 1) % CONTROL_SUB_SAMPLING;
            if !self.active {
                break;
            }
            let (a, b) = self.render_sample();
            *l += a;
            *r += b;
        }
        ended
    }

    pub fn set_in_use(&mut self, in_use: bool) {
        self.in_use = in_use;
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn waits_for_not_active(&self) -> bool {
        self.waits_for_not_active
    }

    /// ADSR 1..=5.
    pub fn adsr(&self, number: u8) -> Option<&Adsr> {
        number_to_index(number, NUM_OF_ADSRS).map(|index| &self.adsrs[index])
    }

    pub fn karplus(&self) -> &KarplusString {
        &self.karplus
    }

    pub fn mso_table(&self) -> &Arc<MsoTable> {
        self.mso.table()
    }

    pub fn pad_table(&self) -> &Arc<PadTable> {
        self.pad.table()
    }
}
