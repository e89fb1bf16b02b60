//! What the 16x2 character display shows.

use core::fmt::Write;

use heapless::String;
use piano_dsp::{note_name, MatchQuality, NoteName, ReconciliationState};

use crate::score::ScoreBoard;

pub const LCD_COLUMNS: usize = 16;

pub type LcdLine = String<LCD_COLUMNS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Complete,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "STOP",
            PlaybackState::Playing => "PLAY",
            PlaybackState::Paused => "HOLD",
            PlaybackState::Complete => "DONE",
        }
    }
}

pub fn quality_label(quality: MatchQuality) -> &'static str {
    match quality {
        MatchQuality::Match => "OK",
        MatchQuality::Sharp => "HIGH",
        MatchQuality::Flat => "LOW",
        MatchQuality::Missing => "MISS",
        MatchQuality::Silence => "--",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySummary {
    /// Lowest expected note, the one a player reads first in a chord.
    pub expected: Option<NoteName>,
    pub detected: Option<NoteName>,
    pub quality: MatchQuality,
    pub hits: u32,
    pub notes_played: u32,
    pub accuracy_percent: u8,
    pub playback: PlaybackState,
}

impl DisplaySummary {
    pub fn new(state: &ReconciliationState, score: &ScoreBoard, playback: PlaybackState) -> Self {
        let detected = state
            .detected()
            .filter(|estimate| estimate.confidence > 0.0)
            .and_then(|estimate| estimate.midi_note);
        Self {
            expected: state.expected_notes().lowest().map(note_name),
            detected: detected.map(note_name),
            quality: state.quality(),
            hits: score.hits(),
            notes_played: score.notes_played(),
            accuracy_percent: score.accuracy_percent(),
            playback,
        }
    }

    /// Two display rows, e.g. `C4   C#4   MISS` and `3/4     75% PLAY`.
    /// Text beyond the row width is cut off.
    pub fn lines(&self) -> [LcdLine; 2] {
        let mut top = LcdLine::new();
        let _ = write!(
            top,
            "{:<4} {:<5} {}",
            self.expected.as_deref().unwrap_or("-"),
            self.detected.as_deref().unwrap_or("-"),
            quality_label(self.quality)
        );

        let mut bottom = LcdLine::new();
        let mut score = String::<12>::new();
        let _ = write!(score, "{}/{}", self.hits, self.notes_played);
        let _ = write!(
            bottom,
            "{:<7}{:>3}% {}",
            score.as_str(),
            self.accuracy_percent,
            self.playback.label()
        );
        [top, bottom]
    }
}
