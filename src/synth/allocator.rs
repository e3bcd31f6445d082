//! Voice slot bookkeeping for one program.
//!
//! The manager never touches a voice. It only remembers which note each slot
//! plays and in which state, and answers "which slot gets this note?".

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,
    /// Key held.
    Active { note: u8, age: u64 },
    /// Key released, the voice is still sounding.
    Releasing { note: u8, age: u64 },
}

impl VoiceState {
    pub fn note(self) -> Option<u8> {
        match self {
            VoiceState::Free => None,
            VoiceState::Active { note, .. } | VoiceState::Releasing { note, .. } => Some(note),
        }
    }

    fn age(self) -> u64 {
        match self {
            VoiceState::Free => 0,
            VoiceState::Active { age, .. } | VoiceState::Releasing { age, .. } => age,
        }
    }
}

/// Result of `PolyphonyManager::allocate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub slot: usize,
    /// Note the slot was playing before, if any. Equal to the new note on a
    /// retrigger.
    pub previous: Option<u8>,
}

/*
Allocation order for a new note:

  1. a slot already playing the same note (held or releasing): retrigger it
     instead of stacking a second copy of the note
  2. the lowest free slot
  3. the releasing slot whose key went up first
  4. the held slot that started first

Ages come from a counter bumped on every allocation and release, so "oldest"
is exact even when several events land in the same block.
*/
#[derive(Debug, Clone)]
pub struct PolyphonyManager {
    slots: Vec<VoiceState>,
    clock: u64,
}

impl PolyphonyManager {
    pub fn new(voices: usize) -> Self {
        Self {
            slots: vec![VoiceState::Free; voices],
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self, slot: usize) -> Option<VoiceState> {
        self.slots.get(slot).copied()
    }

    pub fn free_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, VoiceState::Free))
            .count()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Pick a slot for `note` and mark it active. `None` only when the
    /// manager has no slots at all.
    pub fn allocate(&mut self, note: u8) -> Option<Allocation> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.note() == Some(note))
            .or_else(|| self.slots.iter().position(|s| matches!(s, VoiceState::Free)))
            .or_else(|| self.oldest(|s| matches!(s, VoiceState::Releasing { .. })))
            .or_else(|| self.oldest(|s| matches!(s, VoiceState::Active { .. })))?;

        let previous = self.slots[slot].note();
        let age = self.tick();
        self.slots[slot] = VoiceState::Active { note, age };
        Some(Allocation { slot, previous })
    }

    fn oldest(&self, filter: impl Fn(&VoiceState) -> bool) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| filter(s))
            .min_by_key(|(_, s)| s.age())
            .map(|(idx, _)| idx)
    }

    /// Key up. Returns the slot that was holding `note`.
    pub fn release(&mut self, note: u8) -> Option<usize> {
        let slot = self
            .slots
            .iter()
            .position(|s| matches!(s, VoiceState::Active { note: n, .. } if *n == note))?;
        let age = self.tick();
        self.slots[slot] = VoiceState::Releasing { note, age };
        Some(slot)
    }

    /// Key up on every held note. Returns the slots that were released.
    pub fn release_all(&mut self) -> impl Iterator<Item = usize> + '_ {
        let age = self.tick();
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(move |(idx, slot)| match *slot {
                VoiceState::Active { note, .. } => {
                    *slot = VoiceState::Releasing { note, age };
                    Some(idx)
                }
                _ => None,
            })
    }

    /// The voice in `slot` went silent. Returns the note it was playing.
    pub fn free(&mut self, slot: usize) -> Option<u8> {
        let state = self.slots.get_mut(slot)?;
        let note = state.note();
        *state = VoiceState::Free;
        note
    }
}
