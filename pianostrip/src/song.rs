//! Songs: timed note events, the step-symbol song format and the song catalog.
//!
//! A step-symbol song is a list of symbols on a fixed time grid. Each symbol is
//! a note (`"C4"`), a chord (`"C4+E4+G4"`) or a rest (`""`, `" "`, `"."`,
//! `"SIL"`).

use heapless::Vec;
use piano_dsp::note::MAX_MIDI_NOTE;
use piano_dsp::{parse_note_name, NoteSet};

use crate::error::SongError;

pub const MAX_SONG_EVENTS: usize = 512;
pub const CHORD_SEPARATOR: char = '+';
pub const SILENCE_TOKENS: [&str; 3] = ["", ".", "SIL"];

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct NoteEvent {
    pub midi_note: u8,
    pub start_seconds: f32,
    /// `None` lasts for the song's default step.
    pub duration_seconds: Option<f32>,
}

impl NoteEvent {
    pub fn new(midi_note: u8, start_seconds: f32, duration_seconds: f32) -> Self {
        Self {
            midi_note,
            start_seconds,
            duration_seconds: Some(duration_seconds),
        }
    }

    pub fn onset(midi_note: u8, start_seconds: f32) -> Self {
        Self {
            midi_note,
            start_seconds,
            duration_seconds: None,
        }
    }

    pub fn duration_or(&self, default_step_seconds: f32) -> f32 {
        self.duration_seconds.unwrap_or(default_step_seconds)
    }

    pub fn end_seconds(&self, default_step_seconds: f32) -> f32 {
        self.start_seconds + self.duration_or(default_step_seconds)
    }

    /// Whether `[start, end)` contains `at_time`.
    pub fn is_sounding(&self, at_time: f32, default_step_seconds: f32) -> bool {
        self.start_seconds <= at_time && at_time < self.end_seconds(default_step_seconds)
    }
}

/// How step symbols turn into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum StepMode {
    /// Every symbol is its own event lasting one step.
    #[default]
    Onset,
    /// A note held over consecutive steps becomes one longer event.
    Sustain,
}

fn is_silence(symbol: &str) -> bool {
    SILENCE_TOKENS.contains(&symbol.trim())
}

/// Notes of one step symbol, `None` when a part is not a note name.
pub fn parse_step(symbol: &str) -> Option<NoteSet> {
    if is_silence(symbol) {
        return Some(NoteSet::new());
    }
    let mut notes = NoteSet::new();
    for part in symbol.split(CHORD_SEPARATOR) {
        notes.insert(parse_note_name(part)?);
    }
    Some(notes)
}

/// Ordered, validated note events. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    events: Vec<NoteEvent, MAX_SONG_EVENTS>,
    default_step_seconds: f32,
    end_seconds: f32,
    max_duration_seconds: f32,
}

impl Song {
    /// Events must be sorted by start time; events sharing a start form a chord.
    pub fn new(events: &[NoteEvent], default_step_seconds: f32) -> Result<Self, SongError> {
        if !(default_step_seconds > 0.0) || !default_step_seconds.is_finite() {
            return Err(SongError::InvalidStep);
        }
        if events.len() > MAX_SONG_EVENTS {
            return Err(SongError::TooManyEvents {
                max: MAX_SONG_EVENTS,
            });
        }

        let mut song = Self {
            events: Vec::new(),
            default_step_seconds,
            end_seconds: 0.0,
            max_duration_seconds: 0.0,
        };
        let mut previous_start = 0.0f32;
        for (index, event) in events.iter().enumerate() {
            if event.midi_note > MAX_MIDI_NOTE {
                return Err(SongError::InvalidNote { index });
            }
            if !(event.start_seconds >= 0.0) || !event.start_seconds.is_finite() {
                return Err(SongError::InvalidDuration { index });
            }
            if let Some(duration) = event.duration_seconds {
                if !(duration > 0.0) || !duration.is_finite() {
                    return Err(SongError::InvalidDuration { index });
                }
            }
            if event.start_seconds < previous_start {
                return Err(SongError::Unsorted { index });
            }
            previous_start = event.start_seconds;

            let duration = event.duration_or(default_step_seconds);
            song.max_duration_seconds = song.max_duration_seconds.max(duration);
            song.end_seconds = song.end_seconds.max(event.start_seconds + duration);
            // Length was checked above.
            let _ = song.events.push(*event);
        }
        Ok(song)
    }

    /// Builds a song from step symbols spaced `step_seconds` apart.
    pub fn from_steps(steps: &[&str], step_seconds: f32, mode: StepMode) -> Result<Self, SongError> {
        if !(step_seconds > 0.0) || !step_seconds.is_finite() {
            return Err(SongError::InvalidStep);
        }
        let mut events: Vec<NoteEvent, MAX_SONG_EVENTS> = Vec::new();
        let mut held = NoteSet::new();
        // Per note: index into `events` and first step of the event still held.
        let mut open = [(0usize, 0usize); 128];

        for (step, symbol) in steps.iter().enumerate() {
            let notes = parse_step(symbol).ok_or(SongError::UnknownSymbol { step })?;
            let start_seconds = step as f32 * step_seconds;
            for midi_note in notes.iter() {
                if mode == StepMode::Sustain && held.contains(midi_note) {
                    let (index, first_step) = open[midi_note as usize];
                    events[index].duration_seconds =
                        Some((step + 1 - first_step) as f32 * step_seconds);
                    continue;
                }
                open[midi_note as usize] = (events.len(), step);
                let event = match mode {
                    StepMode::Onset => NoteEvent::onset(midi_note, start_seconds),
                    StepMode::Sustain => NoteEvent::new(midi_note, start_seconds, step_seconds),
                };
                events.push(event).map_err(|_| SongError::TooManyEvents {
                    max: MAX_SONG_EVENTS,
                })?;
            }
            held = notes;
        }
        Self::new(&events, step_seconds)
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn default_step_seconds(&self) -> f32 {
        self.default_step_seconds
    }

    pub fn duration_of(&self, event: &NoteEvent) -> f32 {
        event.duration_or(self.default_step_seconds)
    }

    /// When the last event stops sounding.
    pub fn end_seconds(&self) -> f32 {
        self.end_seconds
    }

    /// Longest single event, bounds how far back a sounding event can start.
    pub fn max_duration_seconds(&self) -> f32 {
        self.max_duration_seconds
    }
}

/// A named song in step-symbol form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SongEntry {
    pub name: &'static str,
    pub steps: &'static [&'static str],
    /// Falls back to the configured default step when `None`.
    pub step_seconds: Option<f32>,
}

impl SongEntry {
    pub fn load(&self, default_step_seconds: f32, mode: StepMode) -> Result<Song, SongError> {
        Song::from_steps(
            self.steps,
            self.step_seconds.unwrap_or(default_step_seconds),
            mode,
        )
    }
}

pub const DEMO_SONGS: &[SongEntry] = &[
    SongEntry {
        name: "C Major Scale",
        steps: &["C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5", "SIL"],
        step_seconds: Some(0.5),
    },
    SongEntry {
        name: "Twinkle",
        steps: &[
            "C4", "C4", "G4", "G4", "A4", "A4", "G4", ".", "F4", "F4", "E4", "E4", "D4", "D4",
            "C4", ".",
        ],
        step_seconds: Some(0.4),
    },
    SongEntry {
        name: "Chords",
        steps: &[
            "C4+E4+G4", "C4+E4+G4", " ", "F3+A3+C4", "F3+A3+C4", " ", "G3+B3+D4", "G3+B3+D4",
            " ", "C4+E4+G4", "C4+E4+G4", "C4+E4+G4",
        ],
        step_seconds: None,
    },
];

/// Encoder-driven song selection with wraparound.
#[derive(Debug, Clone, Copy)]
pub struct SongCatalog<'a> {
    entries: &'a [SongEntry],
    selected: usize,
}

impl Default for SongCatalog<'static> {
    fn default() -> Self {
        Self::new(DEMO_SONGS)
    }
}

impl<'a> SongCatalog<'a> {
    pub fn new(entries: &'a [SongEntry]) -> Self {
        Self {
            entries,
            selected: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &'a [SongEntry] {
        self.entries
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn current(&self) -> Option<&'a SongEntry> {
        self.entries.get(self.selected)
    }

    /// Selects `index` modulo the catalog length.
    pub fn select(&mut self, index: usize) -> Option<&'a SongEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.selected = index % self.entries.len();
        self.current()
    }

    /// Moves by `delta` entries (one per encoder detent), wrapping at both ends.
    pub fn step(&mut self, delta: i32) -> Option<&'a SongEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let len = self.entries.len() as i64;
        let index = (self.selected as i64 + delta as i64).rem_euclid(len);
        self.select(index as usize)
    }

    pub fn next(&mut self) -> Option<&'a SongEntry> {
        self.step(1)
    }

    pub fn previous(&mut self) -> Option<&'a SongEntry> {
        self.step(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_new_validates_events() {
        let sorted = [NoteEvent::new(60, 0.0, 1.0), NoteEvent::new(64, 0.5, 1.0)];
        let song = Song::new(&sorted, 0.12).unwrap();
        assert_eq!(song.len(), 2);
        assert_abs_diff_eq!(song.end_seconds(), 1.5);
        assert_abs_diff_eq!(song.max_duration_seconds(), 1.0);

        let unsorted = [NoteEvent::new(60, 1.0, 1.0), NoteEvent::new(64, 0.5, 1.0)];
        assert_eq!(Song::new(&unsorted, 0.12), Err(SongError::Unsorted { index: 1 }));

        let zero = [NoteEvent::new(60, 0.0, 0.0)];
        assert_eq!(Song::new(&zero, 0.12), Err(SongError::InvalidDuration { index: 0 }));

        let negative = [NoteEvent::onset(60, -1.0)];
        assert_eq!(Song::new(&negative, 0.12), Err(SongError::InvalidDuration { index: 0 }));

        let bad_note = [NoteEvent::onset(60, 0.0), NoteEvent::onset(128, 0.0)];
        assert_eq!(Song::new(&bad_note, 0.12), Err(SongError::InvalidNote { index: 1 }));

        assert_eq!(Song::new(&[], 0.0), Err(SongError::InvalidStep));
    }

    #[test]
    fn test_too_many_events() {
        let events = [NoteEvent::onset(60, 0.0); MAX_SONG_EVENTS + 1];
        assert_eq!(
            Song::new(&events, 0.1),
            Err(SongError::TooManyEvents { max: MAX_SONG_EVENTS })
        );
    }

    #[test]
    fn test_default_step_applies_to_open_durations() {
        let song = Song::new(&[NoteEvent::onset(60, 2.0)], 0.25).unwrap();
        assert_abs_diff_eq!(song.duration_of(&song.events()[0]), 0.25);
        assert_abs_diff_eq!(song.end_seconds(), 2.25);
        assert!(song.events()[0].is_sounding(2.1, 0.25));
        assert!(!song.events()[0].is_sounding(2.25, 0.25));
    }

    #[test]
    fn test_parse_step_symbols() {
        assert_eq!(parse_step("C4"), Some(NoteSet::from_notes(&[60])));
        assert_eq!(parse_step("C4+E4+G4"), Some(NoteSet::from_notes(&[60, 64, 67])));
        for rest in ["", " ", ".", "SIL"] {
            assert_eq!(parse_step(rest), Some(NoteSet::new()), "{:?}", rest);
        }
        assert_eq!(parse_step("X4"), None);
        assert_eq!(parse_step("C4+"), None);
    }

    #[test]
    fn test_onset_steps() {
        let song = Song::from_steps(&["C4", "C4", "SIL", "E4+G4"], 0.5, StepMode::Onset).unwrap();
        let events = song.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1], NoteEvent::onset(60, 0.5));
        assert_eq!(events[2].midi_note, 64);
        assert_abs_diff_eq!(events[3].start_seconds, 1.5);
        assert_abs_diff_eq!(song.default_step_seconds(), 0.5);
        assert_abs_diff_eq!(song.end_seconds(), 2.0);
    }

    #[test]
    fn test_sustain_steps_merge_held_notes() {
        let song = Song::from_steps(
            &["C4+E4", "C4+E4", "C4", "", "C4"],
            0.25,
            StepMode::Sustain,
        )
        .unwrap();
        let events = song.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].midi_note, 60);
        assert_abs_diff_eq!(events[0].duration_seconds.unwrap(), 0.75);
        assert_eq!(events[1].midi_note, 64);
        assert_abs_diff_eq!(events[1].duration_seconds.unwrap(), 0.5);
        assert_abs_diff_eq!(events[2].start_seconds, 1.0);
        assert_abs_diff_eq!(events[2].duration_seconds.unwrap(), 0.25);
    }

    #[test]
    fn test_unknown_symbol_reports_step() {
        assert_eq!(
            Song::from_steps(&["C4", "C4+Q1"], 0.1, StepMode::Onset),
            Err(SongError::UnknownSymbol { step: 1 })
        );
    }

    #[test]
    fn test_demo_songs_load() {
        for entry in DEMO_SONGS {
            for mode in [StepMode::Onset, StepMode::Sustain] {
                let song = entry.load(0.12, mode).unwrap();
                assert!(!song.is_empty(), "{}", entry.name);
            }
        }
        let chords = DEMO_SONGS[2].load(0.12, StepMode::Onset).unwrap();
        assert_abs_diff_eq!(chords.default_step_seconds(), 0.12);
    }

    #[test]
    fn test_catalog_wraps() {
        let mut catalog = SongCatalog::default();
        assert_eq!(catalog.len(), DEMO_SONGS.len());
        assert_eq!(catalog.current().unwrap().name, "C Major Scale");
        assert_eq!(catalog.previous().unwrap().name, "Chords");
        assert_eq!(catalog.next().unwrap().name, "C Major Scale");
        assert_eq!(catalog.step(4).unwrap().name, "Twinkle");
        assert_eq!(catalog.select(5).unwrap().name, "Chords");

        let mut empty = SongCatalog::new(&[]);
        assert!(empty.next().is_none());
        assert!(empty.current().is_none());
    }
}
