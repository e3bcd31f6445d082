//! Computer keyboard to MIDI note mapping
//!
//! Two rows laid out like a piano: the home row plays the white keys, the
//! row above it the black keys.
//!
//!    w e   t y u   o p
//!   a s d f g h j k l ;

use std::time::{Duration, Instant};

/// Terminals report key presses but not releases, so every note is held for
/// a fixed time.
pub const NOTE_LENGTH: Duration = Duration::from_millis(400);

const MIN_OCTAVE: i8 = 0;
const MAX_OCTAVE: i8 = 8;

/// Semitone offset from C of the keyboard's lowest key.
fn semitone(key: char) -> Option<u8> {
    let offset = match key {
        'a' => 0,
        'w' => 1,
        's' => 2,
        'e' => 3,
        'd' => 4,
        'f' => 5,
        't' => 6,
        'g' => 7,
        'y' => 8,
        'h' => 9,
        'u' => 10,
        'j' => 11,
        'k' => 12,
        'o' => 13,
        'l' => 14,
        'p' => 15,
        ';' => 16,
        _ => return None,
    };
    Some(offset)
}

pub struct Keyboard {
    octave: i8,
    held: Vec<(u8, Instant)>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            octave: 4,
            held: Vec::new(),
        }
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    pub fn octave_down(&mut self) {
        self.octave = (self.octave - 1).max(MIN_OCTAVE);
    }

    pub fn octave_up(&mut self) {
        self.octave = (self.octave + 1).min(MAX_OCTAVE);
    }

    /// MIDI note for `key` in the current octave (C4 = 60).
    pub fn note(&self, key: char) -> Option<u8> {
        let note = (self.octave as i16 + 1) * 12 + semitone(key.to_ascii_lowercase())? as i16;
        u8::try_from(note).ok().filter(|n| *n <= 127)
    }

    /// Remember a pressed note. Returns false if it was already held, in
    /// which case only its release time moves.
    pub fn press(&mut self, note: u8, now: Instant) -> bool {
        let until = now + NOTE_LENGTH;
        if let Some(entry) = self.held.iter_mut().find(|(n, _)| *n == note) {
            entry.1 = until;
            return false;
        }
        self.held.push((note, until));
        true
    }

    /// Notes whose hold time is over.
    pub fn expired(&mut self, now: Instant) -> Vec<u8> {
        let mut released = Vec::new();
        self.held.retain(|&(note, until)| {
            if until <= now {
                released.push(note);
                false
            } else {
                true
            }
        });
        released
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn held(&self) -> usize {
        self.held.len()
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}
