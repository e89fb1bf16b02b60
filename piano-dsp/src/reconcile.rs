use heapless::Vec;
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::note::{pitch_class, NoteSet};
use crate::pitch::PitchEstimate;

/// Most notes a single reconciliation state tracks at once.
pub const MAX_POLYPHONY: usize = 16;

/// How the player's pitch relates to an expected note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum MatchQuality {
    Match,
    Sharp,
    Flat,
    Missing,
    /// Nothing is expected right now.
    Silence,
}

impl MatchQuality {
    pub fn is_match(self) -> bool {
        self == MatchQuality::Match
    }

    fn rank(self) -> u8 {
        match self {
            MatchQuality::Match => 3,
            MatchQuality::Sharp | MatchQuality::Flat => 2,
            MatchQuality::Missing => 1,
            MatchQuality::Silence => 0,
        }
    }
}

/// Compares one expected note against the detected note.
///
/// `detected` must already be filtered for confidence and staleness; `None`
/// means nothing usable was heard. A note in the same pitch class but outside
/// `tolerance_cents` (including octave errors) is Sharp or Flat depending on
/// which side of the expected note it lies.
pub fn judge(expected: u8, detected: Option<&PitchEstimate>, tolerance_cents: f32) -> MatchQuality {
    let Some(estimate) = detected else {
        return MatchQuality::Missing;
    };
    let Some(midi) = estimate.midi_note else {
        return MatchQuality::Missing;
    };
    if pitch_class(midi) != pitch_class(expected) {
        return MatchQuality::Missing;
    }
    if midi == expected && estimate.cents_offset.abs() < tolerance_cents {
        return MatchQuality::Match;
    }
    let deviation_cents = (midi as f32 - expected as f32) * 100.0 + estimate.cents_offset;
    if deviation_cents > 0.0 {
        MatchQuality::Sharp
    } else {
        MatchQuality::Flat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct ExpectedNote {
    pub midi_note: u8,
    pub quality: MatchQuality,
}

/// Outcome of one reconciliation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationState {
    expected: Vec<ExpectedNote, MAX_POLYPHONY>,
    detected: Option<PitchEstimate>,
    stale: bool,
}

impl Default for ReconciliationState {
    fn default() -> Self {
        Self::new(None, false)
    }
}

impl ReconciliationState {
    pub fn new(detected: Option<PitchEstimate>, stale: bool) -> Self {
        Self {
            expected: Vec::new(),
            detected,
            stale,
        }
    }

    /// Judges every note of `expected` against `detected`. Notes beyond
    /// [`MAX_POLYPHONY`] are dropped, lowest notes first kept.
    pub fn evaluate(
        expected: &NoteSet,
        detected: Option<PitchEstimate>,
        usable: Option<&PitchEstimate>,
        stale: bool,
        tolerance_cents: f32,
    ) -> Self {
        let mut state = Self::new(detected, stale);
        for midi_note in expected.iter() {
            let quality = judge(midi_note, usable, tolerance_cents);
            if state.push(ExpectedNote { midi_note, quality }).is_err() {
                break;
            }
        }
        state
    }

    pub fn push(&mut self, note: ExpectedNote) -> Result<(), ExpectedNote> {
        self.expected.push(note)
    }

    pub fn expected(&self) -> &[ExpectedNote] {
        &self.expected
    }

    pub fn expected_notes(&self) -> NoteSet {
        self.expected.iter().map(|note| note.midi_note).collect()
    }

    pub fn quality_of(&self, midi_note: u8) -> Option<MatchQuality> {
        self.expected
            .iter()
            .find(|note| note.midi_note == midi_note)
            .map(|note| note.quality)
    }

    pub fn detected(&self) -> Option<&PitchEstimate> {
        self.detected.as_ref()
    }

    /// `true` when the pitch estimate was reused from an earlier tick.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// `Silence` when nothing is expected, otherwise the best per-note quality.
    pub fn quality(&self) -> MatchQuality {
        self.expected
            .iter()
            .map(|note| note.quality)
            .max_by_key(|quality| quality.rank())
            .unwrap_or(MatchQuality::Silence)
    }

    /// Notes currently judged `Match`.
    pub fn matched_notes(&self) -> NoteSet {
        self.expected
            .iter()
            .filter(|note| note.quality.is_match())
            .map(|note| note.midi_note)
            .collect()
    }
}
