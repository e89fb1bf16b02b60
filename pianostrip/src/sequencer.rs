use heapless::Vec;
use piano_dsp::NoteSet;

#[cfg(feature = "logging")]
use defmt::warn;

use crate::song::{NoteEvent, Song};

/// Most events that can sound at the same instant.
pub const MAX_LIVE_EVENTS: usize = 64;

/// A started song event and the note it asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct ActiveNote {
    /// Index of the event in [`Song::events`].
    pub event: usize,
    pub midi_note: u8,
}

pub type ActiveNotes = Vec<ActiveNote, MAX_LIVE_EVENTS>;

/// Plays a [`Song`] forward in time.
///
/// A cursor marks the first event that has not started yet and `live` holds
/// the started events that may still be sounding. Querying increasing times
/// only walks events once; a time earlier than the previous query, or a jump
/// further ahead than the longest event, re-seeks with a binary search.
#[derive(Debug, Clone)]
pub struct NoteSequencer {
    song: Song,
    cursor: usize,
    live: Vec<usize, MAX_LIVE_EVENTS>,
    last_time: Option<f32>,
}

impl NoteSequencer {
    pub fn new(song: Song) -> Self {
        Self {
            song,
            cursor: 0,
            live: Vec::new(),
            last_time: None,
        }
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Notes sounding at `at_time` seconds into the song.
    pub fn active_notes(&mut self, at_time: f32) -> NoteSet {
        self.active_events(at_time)
            .iter()
            .map(|active| active.midi_note)
            .collect()
    }

    /// Events sounding at `at_time`, in start order. Two strikes of the same
    /// pitch are two entries with different event indices.
    pub fn active_events(&mut self, at_time: f32) -> ActiveNotes {
        let mut active = ActiveNotes::new();
        if !at_time.is_finite() {
            return active;
        }
        match self.last_time {
            Some(last) if at_time < last => self.seek(at_time),
            Some(last) if at_time - last > self.song.max_duration_seconds() => self.seek(at_time),
            None => self.seek(at_time),
            _ => {}
        }
        self.last_time = Some(at_time);
        self.advance(at_time);

        let events = self.song.events();
        for &event in self.live.iter() {
            // Same capacity as `live`.
            let _ = active.push(ActiveNote {
                event,
                midi_note: events[event].midi_note,
            });
        }
        active
    }

    /// `true` once a query has passed the end of the last event.
    pub fn playback_complete(&self) -> bool {
        self.last_time
            .is_some_and(|time| time >= self.song.end_seconds())
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.live.clear();
        self.last_time = None;
    }

    /// The next event that has not started yet.
    pub fn next_event(&self) -> Option<&NoteEvent> {
        self.song.events().get(self.cursor)
    }

    /// Events started so far.
    pub fn started_events(&self) -> usize {
        self.cursor
    }

    fn seek(&mut self, at_time: f32) {
        // Anything starting before this has already finished.
        let horizon = at_time - self.song.max_duration_seconds();
        self.cursor = self
            .song
            .events()
            .partition_point(|event| event.start_seconds < horizon);
        self.live.clear();
    }

    fn advance(&mut self, at_time: f32) {
        let step = self.song.default_step_seconds();
        let events = self.song.events();

        self.live.retain(|&index| events[index].is_sounding(at_time, step));
        while let Some(event) = events.get(self.cursor) {
            if event.start_seconds > at_time {
                break;
            }
            if event.is_sounding(at_time, step) && self.live.push(self.cursor).is_err() {
                #[cfg(feature = "logging")]
                warn!("more than {} simultaneous events, dropping one", MAX_LIVE_EVENTS);
            }
            self.cursor += 1;
        }
    }
}
