//! MIDI note arithmetic, note names and a compact set of notes.

use core::fmt::Write;

use heapless::String;

pub const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

pub const MIDI_A4: u8 = 69;
pub const MAX_MIDI_NOTE: u8 = 127;

/// Longest name `note_name` produces, e.g. `C#-1`.
pub const NOTE_NAME_LEN: usize = 4;

pub type NoteName = String<NOTE_NAME_LEN>;

/// Continuous MIDI pitch of `frequency_hz`: `69 + 12 * log2(f / a4)`.
pub fn fractional_midi(frequency_hz: f32, concert_a_hz: f32) -> f32 {
    MIDI_A4 as f32 + 12.0 * libm::log2f(frequency_hz / concert_a_hz)
}

pub fn midi_to_frequency(midi_note: u8, concert_a_hz: f32) -> f32 {
    concert_a_hz * libm::exp2f((midi_note as f32 - MIDI_A4 as f32) / 12.0)
}

pub fn pitch_class(midi_note: u8) -> u8 {
    midi_note % 12
}

/// Scientific pitch notation, `60` is `C4`.
pub fn note_name(midi_note: u8) -> NoteName {
    let mut name = NoteName::new();
    let octave = (midi_note / 12) as i8 - 1;
    // Fits: two letters plus at most two octave characters.
    let _ = write!(name, "{}{}", NOTE_NAMES[pitch_class(midi_note) as usize], octave);
    name
}

/// Parses `C4`, `F#3`, `Bb2` or `C-1` into a MIDI note number.
pub fn parse_note_name(name: &str) -> Option<u8> {
    let name = name.trim();
    let mut chars = name.char_indices();
    let (_, letter) = chars.next()?;
    let base: i16 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut rest = &name[letter.len_utf8()..];
    let mut accidental = 0i16;
    if let Some(stripped) = rest.strip_prefix('#') {
        accidental = 1;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('b') {
        accidental = -1;
        rest = stripped;
    }

    let octave: i16 = rest.parse().ok()?;
    if !(-1..=9).contains(&octave) {
        return None;
    }
    let midi = (octave + 1) * 12 + base + accidental;
    u8::try_from(midi).ok().filter(|&m| m <= MAX_MIDI_NOTE)
}

/// Set of MIDI notes `0..=127`, one bit per note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct NoteSet(u128);

impl NoteSet {
    pub const EMPTY: NoteSet = NoteSet(0);

    pub const fn new() -> Self {
        Self(0)
    }

    pub fn from_notes(notes: &[u8]) -> Self {
        let mut set = Self::new();
        for &note in notes {
            set.insert(note);
        }
        set
    }

    /// Notes above 127 are ignored; returns whether the note was added.
    pub fn insert(&mut self, note: u8) -> bool {
        if note > MAX_MIDI_NOTE {
            return false;
        }
        let fresh = !self.contains(note);
        self.0 |= 1u128 << note;
        fresh
    }

    pub fn remove(&mut self, note: u8) {
        if note <= MAX_MIDI_NOTE {
            self.0 &= !(1u128 << note);
        }
    }

    pub fn contains(&self, note: u8) -> bool {
        note <= MAX_MIDI_NOTE && self.0 & (1u128 << note) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn union(&self, other: &NoteSet) -> NoteSet {
        NoteSet(self.0 | other.0)
    }

    /// Notes in `self` that are not in `other`.
    pub fn difference(&self, other: &NoteSet) -> NoteSet {
        NoteSet(self.0 & !other.0)
    }

    pub fn lowest(&self) -> Option<u8> {
        (self.0 != 0).then(|| self.0.trailing_zeros() as u8)
    }

    pub fn highest(&self) -> Option<u8> {
        (self.0 != 0).then(|| 127 - self.0.leading_zeros() as u8)
    }

    /// Ascending order.
    pub fn iter(&self) -> NoteSetIter {
        NoteSetIter(self.0)
    }
}

impl FromIterator<u8> for NoteSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = NoteSet::new();
        for note in iter {
            set.insert(note);
        }
        set
    }
}

impl IntoIterator for NoteSet {
    type Item = u8;
    type IntoIter = NoteSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct NoteSetIter(u128);

impl Iterator for NoteSetIter {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        let note = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Some(note)
    }
}
