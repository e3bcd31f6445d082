#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
ADSR Envelope Implementation
============================

The envelope is a control-rate modulation source: it is advanced once per
control tick (every CONTROL_SUB_SAMPLING audio samples), not once per sample.
Each voice owns five of them and routes them to any modulation target.

Vocabulary
----------

  output      The envelope's current value (0.0 to 1.0).

  stage       Which phase of the envelope we're in. Seven stages, see below.

  interval    Seconds between two control ticks. Converts stage times into
              per-tick steps.

  step        How much `output` changes per tick:

                  attack   interval / attack_time
                  decay    interval / decay_time * (1 - sustain)
                  release  interval / release_time * start_level

              The release step is scaled by the level the release started
              from, so a release always takes `release_time` no matter where
              it begins.

  held        Whether the key is still down. Decides what happens after a
              forced release.


The State Machine
-----------------

    Idle ──note_on──→ Attack ──(≥1)──→ Decay ──(≤S)──→ Sustain
                        │                 │               │
                    note_off          note_off        note_off
                        ↓                 ↓               ↓
                  ForceRelease       OffRelease        Release
                        │                 │               │
                  (0, held) → Attack      └─────(≤0)──────┴──→ Idle
                  (0, released) → Idle

A note-on that arrives while the envelope still has output does not jump back
to zero (that would click). It enters ForceRelease, a fast ramp to zero over
FORCE_RELEASE_TIME, and re-enters Attack from there if the key is still held.

OffRelease differs from Release only in where it starts: from the level the
decay had reached rather than from the sustain level.
*/

pub const ATTACK_MIN_TIME: f32 = 0.005;
pub const ATTACK_MAX_TIME: f32 = 5.0;
pub const DECAY_MIN_TIME: f32 = 0.002;
pub const DECAY_MAX_TIME: f32 = 5.0;
pub const RELEASE_MIN_TIME: f32 = 0.08;
pub const RELEASE_MAX_TIME: f32 = 10.0;
pub const FORCE_RELEASE_TIME: f32 = 0.01;

/// Output at or below this counts as silent for retrigger decisions.
const SILENT_LEVEL: f32 = 1.0e-4;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
    ForceRelease,
    OffRelease,
}

/// Settable envelope parameters, all in the 0-100 domain.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdsrParam {
    Attack(u8),
    Decay(u8),
    Sustain(u8),
    Release(u8),
    Send1(u8),
    Send2(u8),
}

#[derive(Debug, Clone)]
pub struct Adsr {
    // Shape, in physical units
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,
    interval: f32,

    send_1: f32,
    send_2: f32,

    // Runtime state
    stage: EnvelopeState,
    output: f32,
    held: bool,
    ticks_since_note_on: u32,

    // Level the current release or force-release started from
    release_start_level: f32,
}

fn percent(value: u8) -> f32 {
    value.min(100) as f32 / 100.0
}

impl Adsr {
    /// Envelope advanced every `interval` seconds, with a neutral default
    /// shape.
    pub fn new(interval: f32) -> Self {
        Self::adsr(interval, 0.01, 0.1, 0.7, 0.3)
    }

    pub fn adsr(interval: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack_time: attack.max(ATTACK_MIN_TIME),
            decay_time: decay.max(DECAY_MIN_TIME),
            sustain_level: sustain.clamp(0.0, 1.0),
            release_time: release.max(RELEASE_MIN_TIME),
            interval,

            send_1: 1.0,
            send_2: 1.0,

            stage: EnvelopeState::Idle,
            output: 0.0,
            held: false,
            ticks_since_note_on: 0,
            release_start_level: 0.0,
        }
    }

    pub fn apply(&mut self, param: AdsrParam) {
        match param {
            AdsrParam::Attack(v) => self.set_attack_percent(v),
            AdsrParam::Decay(v) => self.set_decay_percent(v),
            AdsrParam::Sustain(v) => self.set_sustain_percent(v),
            AdsrParam::Release(v) => self.set_release_percent(v),
            AdsrParam::Send1(v) => self.send_1 = percent(v),
            AdsrParam::Send2(v) => self.send_2 = percent(v),
        }
    }

    pub fn set_attack_percent(&mut self, value: u8) {
        self.set_attack_time(percent(value) * ATTACK_MAX_TIME);
    }

    pub fn set_decay_percent(&mut self, value: u8) {
        self.set_decay_time(percent(value) * DECAY_MAX_TIME);
    }

    pub fn set_sustain_percent(&mut self, value: u8) {
        self.sustain_level = percent(value);
    }

    pub fn set_release_percent(&mut self, value: u8) {
        self.set_release_time(percent(value) * RELEASE_MAX_TIME);
    }

    pub fn set_attack_time(&mut self, seconds: f32) {
        self.attack_time = seconds.clamp(ATTACK_MIN_TIME, ATTACK_MAX_TIME);
    }

    pub fn set_decay_time(&mut self, seconds: f32) {
        self.decay_time = seconds.clamp(DECAY_MIN_TIME, DECAY_MAX_TIME);
    }

    pub fn set_release_time(&mut self, seconds: f32) {
        self.release_time = seconds.clamp(RELEASE_MIN_TIME, RELEASE_MAX_TIME);
    }

    pub fn attack_time(&self) -> f32 {
        self.attack_time
    }

    pub fn decay_time(&self) -> f32 {
        self.decay_time
    }

    pub fn sustain_level(&self) -> f32 {
        self.sustain_level
    }

    pub fn release_time(&self) -> f32 {
        self.release_time
    }

    /// Key down.
    pub fn note_on(&mut self) {
        self.held = true;
        self.ticks_since_note_on = 0;

        match self.stage {
            EnvelopeState::ForceRelease => {
                // Already ramping down; the held flag re-enters Attack at zero.
            }
            _ if self.output <= SILENT_LEVEL => {
                self.output = 0.0;
                self.stage = EnvelopeState::Attack;
            }
            _ => self.enter_force_release(),
        }
    }

    /// Key up.
    pub fn note_off(&mut self) {
        self.held = false;

        match self.stage {
            EnvelopeState::Attack => self.enter_force_release(),
            EnvelopeState::Decay => {
                self.release_start_level = self.output;
                self.stage = EnvelopeState::OffRelease;
            }
            EnvelopeState::Sustain => {
                self.release_start_level = self.output;
                self.stage = EnvelopeState::Release;
            }
            EnvelopeState::Idle
            | EnvelopeState::Release
            | EnvelopeState::ForceRelease
            | EnvelopeState::OffRelease => {}
        }
    }

    fn enter_force_release(&mut self) {
        self.release_start_level = self.output;
        self.stage = EnvelopeState::ForceRelease;
    }

    /// Advance one control tick and return the new output.
    pub fn tick(&mut self) -> f32 {
        if !matches!(self.stage, EnvelopeState::Idle) {
            self.ticks_since_note_on = self.ticks_since_note_on.saturating_add(1);
        }

        match self.stage {
            EnvelopeState::Idle => {
                self.output = 0.0;
            }

            EnvelopeState::Attack => {
                self.output += self.interval / self.attack_time;
                if self.output >= 1.0 {
                    self.output = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                let step = self.interval / self.decay_time * (1.0 - self.sustain_level);
                self.output -= step;
                if self.output <= self.sustain_level {
                    self.output = self.sustain_level;
                    self.stage = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.output = self.sustain_level;
            }

            EnvelopeState::Release | EnvelopeState::OffRelease => {
                self.output -= self.interval / self.release_time * self.release_start_level;
                if self.output <= 0.0 {
                    self.output = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }

            EnvelopeState::ForceRelease => {
                self.output -= self.interval / FORCE_RELEASE_TIME * self.release_start_level;
                if self.output <= 0.0 {
                    self.output = 0.0;
                    self.stage = if self.held {
                        EnvelopeState::Attack
                    } else {
                        EnvelopeState::Idle
                    };
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.output));
        self.output
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.output = 0.0;
        self.held = false;
        self.ticks_since_note_on = 0;
        self.release_start_level = 0.0;
    }

    pub fn output(&self) -> f32 {
        self.output
    }

    /// Output scaled by the first send level.
    pub fn output_1(&self) -> f32 {
        self.output * self.send_1
    }

    /// Output scaled by the second send level.
    pub fn output_2(&self) -> f32 {
        self.output * self.send_2
    }

    pub fn send_1(&self) -> f32 {
        self.send_1
    }

    pub fn send_2(&self) -> f32 {
        self.send_2
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.stage, EnvelopeState::Idle)
    }

    /// Control ticks elapsed since the last note-on.
    pub fn ticks_since_note_on(&self) -> u32 {
        self.ticks_since_note_on
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1 kHz control rate keeps the arithmetic readable.
    const INTERVAL: f32 = 0.001;

    fn run(env: &mut Adsr, ticks: usize) -> Vec<f32> {
        (0..ticks).map(|_| env.tick()).collect()
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = Adsr::adsr(INTERVAL, 0.01, 0.1, 0.7, 0.2);
        env.note_on();
        run(&mut env, 11);

        assert!(env.output() > 0.99, "expected attack to reach full level");
        assert_eq!(env.state(), EnvelopeState::Decay);
    }

    #[test]
    fn sustain_holds_target_level() {
        let mut env = Adsr::adsr(INTERVAL, 0.01, 0.05, 0.6, 0.2);
        env.note_on();
        run(&mut env, 70);

        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert!((env.output() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn release_from_sustain_falls_back_to_idle() {
        let mut env = Adsr::adsr(INTERVAL, 0.01, 0.01, 0.5, 0.1);
        env.note_on();
        run(&mut env, 40);
        assert_eq!(env.state(), EnvelopeState::Sustain);

        env.note_off();
        assert_eq!(env.state(), EnvelopeState::Release);
        run(&mut env, 102);

        assert_eq!(env.output(), 0.0);
        assert!(env.is_idle());
    }

    #[test]
    fn note_off_during_attack_forces_release() {
        let mut env = Adsr::adsr(INTERVAL, 0.1, 0.1, 0.5, 0.5);
        env.note_on();
        run(&mut env, 5);
        env.note_off();

        assert_eq!(env.state(), EnvelopeState::ForceRelease);
        run(&mut env, 12);
        assert!(env.is_idle());
    }

    #[test]
    fn note_off_during_decay_enters_off_release() {
        let mut env = Adsr::adsr(INTERVAL, 0.005, 0.5, 0.2, 0.1);
        env.note_on();
        run(&mut env, 20);
        assert_eq!(env.state(), EnvelopeState::Decay);

        let level = env.output();
        env.note_off();
        assert_eq!(env.state(), EnvelopeState::OffRelease);

        // Ramp starts from the decay level, not from sustain.
        let next = env.tick();
        assert!(next > 0.2 && next < level);
    }

    #[test]
    fn retrigger_goes_through_force_release_then_attack() {
        let mut env = Adsr::adsr(INTERVAL, 0.005, 0.01, 0.8, 0.2);
        env.note_on();
        run(&mut env, 50);
        assert_eq!(env.state(), EnvelopeState::Sustain);

        env.note_on();
        assert_eq!(env.state(), EnvelopeState::ForceRelease);

        let mut previous = env.output();
        for _ in 0..12 {
            let value = env.tick();
            if env.state() == EnvelopeState::ForceRelease {
                assert!(value <= previous);
            }
            previous = value;
        }
        assert_eq!(env.state(), EnvelopeState::Attack);
    }

    #[test]
    fn output_bounded_and_monotonic_per_phase() {
        for &(a, d, s, r) in &[(0u8, 0u8, 0u8, 0u8), (3, 40, 50, 20), (100, 100, 100, 100), (1, 1, 99, 1)] {
            let mut env = Adsr::new(INTERVAL);
            env.apply(AdsrParam::Attack(a));
            env.apply(AdsrParam::Decay(d));
            env.apply(AdsrParam::Sustain(s));
            env.apply(AdsrParam::Release(r));

            env.note_on();
            let mut previous = (env.state(), env.output());
            for tick in 0..40_000 {
                if tick == 20_000 {
                    env.note_off();
                    previous = (env.state(), env.output());
                }
                let value = env.tick();
                assert!((0.0..=1.0).contains(&value));

                let state = env.state();
                if state == previous.0 {
                    match state {
                        EnvelopeState::Attack => assert!(value >= previous.1),
                        EnvelopeState::Decay | EnvelopeState::Release => {
                            assert!(value <= previous.1)
                        }
                        _ => {}
                    }
                }
                previous = (state, value);
            }
        }
    }

    #[test]
    fn times_clamp_to_minimums() {
        let mut env = Adsr::new(INTERVAL);
        env.set_attack_percent(0);
        env.set_decay_percent(0);
        env.set_release_percent(0);
        assert_eq!(env.attack_time(), ATTACK_MIN_TIME);
        assert_eq!(env.decay_time(), DECAY_MIN_TIME);
        assert_eq!(env.release_time(), RELEASE_MIN_TIME);
    }

    #[test]
    fn setters_are_idempotent() {
        let mut env = Adsr::new(INTERVAL);
        env.set_attack_percent(37);
        let first = env.attack_time();
        env.set_attack_percent(37);
        assert_eq!(env.attack_time(), first);
        assert!((first - 0.37 * ATTACK_MAX_TIME).abs() < 1e-6);
    }

    #[test]
    fn send_levels_scale_output() {
        let mut env = Adsr::adsr(INTERVAL, 0.005, 0.01, 1.0, 0.2);
        env.apply(AdsrParam::Send1(50));
        env.apply(AdsrParam::Send2(25));
        env.note_on();
        run(&mut env, 20);

        assert!((env.output_1() - 0.5).abs() < 1e-6);
        assert!((env.output_2() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn counts_ticks_since_note_on() {
        let mut env = Adsr::new(INTERVAL);
        env.note_on();
        run(&mut env, 25);
        assert_eq!(env.ticks_since_note_on(), 25);
        env.note_on();
        assert_eq!(env.ticks_since_note_on(), 0);
    }
}
