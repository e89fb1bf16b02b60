use heapless::Vec;
use piano_dsp::{MatchQuality, NoteSet, PitchEstimate, ReconciliationState};
use piano_viz::{ClassicPalette, LedFrame, LedMapper, Palette};

#[cfg(feature = "logging")]
use defmt::{trace, warn};

use crate::config::{PianoStripConfig, ReconcileConfig};
use crate::sequencer::{ActiveNote, ActiveNotes, MAX_LIVE_EVENTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum EnginePhase {
    /// No tick has been evaluated since construction or the last reset.
    AwaitingInput,
    Evaluated,
}

/// Reports notes that joined a set since the previous update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeTracker {
    previous: NoteSet,
}

impl EdgeTracker {
    pub fn update(&mut self, current: NoteSet) -> NoteSet {
        let rising = current.difference(&self.previous);
        self.previous = current;
        rising
    }

    /// Lets `notes` rise again on the next update.
    pub fn forget(&mut self, notes: &NoteSet) {
        self.previous = self.previous.difference(notes);
    }

    pub fn reset(&mut self) {
        self.previous.clear();
    }
}

/// Fires at most once per song event while that event stays live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLatch {
    fired: Vec<usize, MAX_LIVE_EVENTS>,
}

impl EventLatch {
    /// Events of `live` that meet `condition` and have not fired yet. Events
    /// missing from `live` are forgotten.
    pub fn update(
        &mut self,
        live: &[ActiveNote],
        mut condition: impl FnMut(&ActiveNote) -> bool,
    ) -> ActiveNotes {
        self.fired
            .retain(|event| live.iter().any(|active| active.event == *event));
        let mut rising = ActiveNotes::new();
        for active in live {
            if self.fired.contains(&active.event) || !condition(active) {
                continue;
            }
            if self.fired.push(active.event).is_err() {
                break;
            }
            let _ = rising.push(*active);
        }
        rising
    }

    pub fn reset(&mut self) {
        self.fired.clear();
    }
}

/// Everything one reconciliation tick produces.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub state: ReconciliationState,
    pub frame: LedFrame,
    /// Notes that turned `Match` on this tick. A new strike of a note
    /// restarts its edge.
    pub hits: NoteSet,
    /// Events expected for the first time on this tick.
    pub onsets: ActiveNotes,
    /// Events matched for the first time. Each event scores once.
    pub scored: ActiveNotes,
}

/// Compares what the song expects with what the microphone hears.
pub struct ReconciliationEngine<P: Palette = ClassicPalette> {
    policy: ReconcileConfig,
    mapper: LedMapper<P>,
    phase: EnginePhase,
    latest: Option<PitchEstimate>,
    state: ReconciliationState,
    matches: EdgeTracker,
    onsets: EventLatch,
    scored: EventLatch,
    reported_out_of_range: NoteSet,
}

impl ReconciliationEngine<ClassicPalette> {
    pub fn new(config: &PianoStripConfig) -> Self {
        Self::with_palette(config, ClassicPalette::default())
    }
}

impl<P: Palette> ReconciliationEngine<P> {
    pub fn with_palette(config: &PianoStripConfig, palette: P) -> Self {
        Self {
            policy: config.reconcile,
            mapper: LedMapper::with_palette(config.strip, palette),
            phase: EnginePhase::AwaitingInput,
            latest: None,
            state: ReconciliationState::default(),
            matches: EdgeTracker::default(),
            onsets: EventLatch::default(),
            scored: EventLatch::default(),
            reported_out_of_range: NoteSet::new(),
        }
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    pub fn mapper(&self) -> &LedMapper<P> {
        &self.mapper
    }

    pub fn latest_estimate(&self) -> Option<&PitchEstimate> {
        self.latest.as_ref()
    }

    /// Runs one tick at scheduler time `now`.
    ///
    /// `fresh` is the estimate from a window completed since the last tick.
    /// Without one the previous estimate is reused and the state is flagged
    /// stale. Estimates older than the staleness threshold or below the
    /// minimum confidence count as nothing heard.
    pub fn tick(
        &mut self,
        now: f32,
        expected: &[ActiveNote],
        fresh: Option<PitchEstimate>,
    ) -> TickOutput {
        let stale = fresh.is_none() && self.latest.is_some();
        if fresh.is_some() {
            self.latest = fresh;
        }
        let usable = self.usable_estimate(now);

        let playable = self.playable(expected);
        let playable_notes: NoteSet = playable.iter().map(|active| active.midi_note).collect();
        self.state = ReconciliationState::evaluate(
            &playable_notes,
            self.latest,
            usable.as_ref(),
            stale,
            self.policy.tolerance_cents,
        );
        self.phase = EnginePhase::Evaluated;

        let matched = self.state.matched_notes();
        let onsets = self.onsets.update(&playable, |_| true);
        let struck: NoteSet = onsets.iter().map(|active| active.midi_note).collect();
        self.matches.forget(&struck);
        let hits = self.matches.update(matched);
        let scored = self
            .scored
            .update(&playable, |active| matched.contains(active.midi_note));
        #[cfg(feature = "logging")]
        for active in scored.iter() {
            trace!("event {} hit on note {}", active.event, active.midi_note);
        }

        TickOutput {
            state: self.state.clone(),
            frame: self.mapper.render_frame(&self.state),
            hits,
            onsets,
            scored,
        }
    }

    /// Frame for the current state without evaluating anything.
    pub fn render(&self) -> LedFrame {
        self.mapper.render_frame(&self.state)
    }

    /// Overall quality of the last tick, `Silence` before the first one.
    pub fn quality(&self) -> MatchQuality {
        self.state.quality()
    }

    pub fn reset(&mut self) {
        self.phase = EnginePhase::AwaitingInput;
        self.latest = None;
        self.state = ReconciliationState::default();
        self.matches.reset();
        self.onsets.reset();
        self.scored.reset();
        self.reported_out_of_range.clear();
    }

    fn usable_estimate(&self, now: f32) -> Option<PitchEstimate> {
        self.latest.filter(|estimate| {
            estimate.age(now) <= self.policy.stale_after_seconds
                && estimate.confident_note(self.policy.min_confidence).is_some()
        })
    }

    /// Expected events the strip can show. Others are reported once and skipped.
    fn playable(&mut self, expected: &[ActiveNote]) -> ActiveNotes {
        let mut playable = ActiveNotes::new();
        for active in expected {
            if self.mapper.covers(active.midi_note) {
                if playable.push(*active).is_err() {
                    break;
                }
            } else if self.reported_out_of_range.insert(active.midi_note) {
                #[cfg(feature = "logging")]
                warn!("note {} is outside the strip, ignoring it", active.midi_note);
            }
        }
        playable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
    use piano_dsp::PitchMapper;

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::new(&PianoStripConfig::default())
    }

    /// One live event per note, numbered from `first_event`.
    fn events(first_event: usize, notes: &[u8]) -> ActiveNotes {
        notes
            .iter()
            .enumerate()
            .map(|(offset, &midi_note)| ActiveNote {
                event: first_event + offset,
                midi_note,
            })
            .collect()
    }

    fn heard(midi: u8, cents: f32, confidence: f32, timestamp: f32) -> PitchEstimate {
        PitchEstimate {
            frequency_hz: 0.0,
            midi_note: Some(midi),
            cents_offset: cents,
            confidence,
            timestamp,
        }
    }

    #[test]
    fn test_edge_tracker_reports_rising_notes_only() {
        let mut edges = EdgeTracker::default();
        assert_eq!(edges.update(NoteSet::from_notes(&[60])), NoteSet::from_notes(&[60]));
        assert!(edges.update(NoteSet::from_notes(&[60])).is_empty());
        assert_eq!(edges.update(NoteSet::from_notes(&[60, 64])), NoteSet::from_notes(&[64]));
        assert!(edges.update(NoteSet::new()).is_empty());
        assert_eq!(edges.update(NoteSet::from_notes(&[60])), NoteSet::from_notes(&[60]));
        edges.forget(&NoteSet::from_notes(&[60]));
        assert_eq!(edges.update(NoteSet::from_notes(&[60])), NoteSet::from_notes(&[60]));
    }

    #[test]
    fn test_event_latch_fires_once_per_event() {
        let mut latch = EventLatch::default();
        let first = events(0, &[60]);
        assert_eq!(latch.update(&first, |_| true), first);
        assert!(latch.update(&first, |_| true).is_empty());

        // Same pitch, next event.
        let second = events(1, &[60]);
        assert!(latch.update(&second, |_| false).is_empty());
        assert_eq!(latch.update(&second, |_| true), second);
        assert!(latch.update(&second, |_| true).is_empty());

        latch.reset();
        assert_eq!(latch.update(&second, |_| true), second);
    }

    #[test]
    fn test_phase_transitions() {
        let mut engine = engine();
        assert_eq!(engine.phase(), EnginePhase::AwaitingInput);
        assert_eq!(engine.quality(), MatchQuality::Silence);
        engine.tick(0.0, &[], None);
        assert_eq!(engine.phase(), EnginePhase::Evaluated);
        engine.reset();
        assert_eq!(engine.phase(), EnginePhase::AwaitingInput);
        assert!(engine.latest_estimate().is_none());
    }

    #[test]
    fn test_match_fires_hit_once() {
        let mut engine = engine();
        let expected = events(0, &[60]);
        let first = engine.tick(0.0, &expected, Some(heard(60, 5.0, 0.9, 0.0)));
        assert_eq!(first.state.quality(), MatchQuality::Match);
        assert_eq!(first.hits, NoteSet::from_notes(&[60]));
        assert_eq!(first.onsets, expected);
        assert_eq!(first.scored, expected);

        let second = engine.tick(0.04, &expected, Some(heard(60, -5.0, 0.9, 0.04)));
        assert_eq!(second.state.quality(), MatchQuality::Match);
        assert!(second.hits.is_empty());
        assert!(second.onsets.is_empty());
        assert!(second.scored.is_empty());
    }

    #[test]
    fn test_wobbling_back_to_a_note_scores_once() {
        let mut engine = engine();
        let held = events(0, &[69]);
        let mut scored = 0;
        let mut edges = 0;
        for (tick, midi) in [69, 70, 69].into_iter().enumerate() {
            let now = tick as f32 * 0.04;
            let output = engine.tick(now, &held, Some(heard(midi, 0.0, 0.9, now)));
            scored += output.scored.len();
            edges += output.hits.len();
        }
        assert_eq!(edges, 2);
        assert_eq!(scored, 1);

        let next = events(1, &[72]);
        let output = engine.tick(0.12, &next, Some(heard(69, 0.0, 0.9, 0.12)));
        assert_eq!(output.onsets, next);
        assert!(output.scored.is_empty());
    }

    #[test]
    fn test_restruck_note_scores_again() {
        let mut engine = engine();
        let first = engine.tick(0.0, &events(0, &[69]), Some(heard(69, 0.0, 0.9, 0.0)));
        let second = engine.tick(0.04, &events(1, &[69]), Some(heard(69, 0.0, 0.9, 0.04)));
        assert_eq!(first.hits, NoteSet::from_notes(&[69]));
        assert_eq!(second.hits, NoteSet::from_notes(&[69]));
        assert_eq!(second.onsets, events(1, &[69]));
        assert_eq!(second.scored, events(1, &[69]));
    }

    #[test]
    fn test_reused_estimate_is_flagged_stale() {
        let mut engine = engine();
        let expected = events(0, &[60]);
        engine.tick(0.0, &expected, Some(heard(60, 0.0, 0.9, 0.0)));
        let reused = engine.tick(0.1, &expected, None);
        assert!(reused.state.is_stale());
        assert_eq!(reused.state.quality(), MatchQuality::Match);

        // Past the staleness threshold the old estimate no longer counts.
        let expired = engine.tick(1.0, &expected, None);
        assert!(expired.state.is_stale());
        assert_eq!(expired.state.quality(), MatchQuality::Missing);
    }

    #[test]
    fn test_low_confidence_counts_as_nothing_heard() {
        let mut engine = engine();
        let expected = events(0, &[60]);
        let output = engine.tick(0.0, &expected, Some(heard(60, 0.0, 0.1, 0.0)));
        assert_eq!(output.state.quality(), MatchQuality::Missing);
        assert!(output.hits.is_empty());
        assert!(output.scored.is_empty());
        assert_eq!(output.state.detected().unwrap().confidence, 0.1);
    }

    #[test]
    fn test_sharp_and_flat() {
        let mut engine = engine();
        let expected = events(0, &[69]);
        let sharp = PitchMapper::default().from_frequency(452.0, 0.9, 0.0);
        assert_eq!(
            engine.tick(0.0, &expected, Some(sharp)).state.quality(),
            MatchQuality::Match
        );
        let octave_down = heard(57, 0.0, 0.9, 0.04);
        assert_eq!(
            engine.tick(0.04, &expected, Some(octave_down)).state.quality(),
            MatchQuality::Flat
        );
        let octave_up = heard(81, 0.0, 0.9, 0.08);
        assert_eq!(
            engine.tick(0.08, &expected, Some(octave_up)).state.quality(),
            MatchQuality::Sharp
        );
    }

    #[test]
    fn test_out_of_range_notes_are_ignored() {
        let mut engine = engine();
        let expected = events(0, &[20, 60, 120]);
        let output = engine.tick(0.0, &expected, None);
        assert_eq!(output.state.expected_notes(), NoteSet::from_notes(&[60]));
        assert_eq!(output.onsets.as_slice(), [ActiveNote { event: 1, midi_note: 60 }]);
        assert!(engine.reported_out_of_range.contains(20));
        assert!(engine.reported_out_of_range.contains(120));
        let again = engine.tick(0.04, &expected, None);
        assert_eq!(again.state.expected_notes(), NoteSet::from_notes(&[60]));
    }

    #[test]
    fn test_frame_follows_state() {
        let mut engine = engine();
        let expected = events(0, &[36]);
        let output = engine.tick(0.0, &expected, Some(heard(36, 0.0, 0.9, 0.0)));
        assert_eq!(output.frame.len(), 60);
        assert_eq!(output.frame, engine.render());
        assert_eq!(output.frame.color(0), Some(Rgb888::GREEN));
    }
}
