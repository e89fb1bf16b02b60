use embedded_graphics::{draw_target::DrawTarget, pixelcolor::Rgb888};
use piano_dsp::{
    MatchQuality, NoteSet, PitchEstimate, PitchMapper, SpectralAnalyzer, WindowHandoff,
};
use piano_viz::{ClassicPalette, Palette};

#[cfg(feature = "logging")]
use defmt::{info, trace, warn};

use crate::config::PianoStripConfig;
use crate::display::{DisplaySummary, PlaybackState};
use crate::engine::ReconciliationEngine;
use crate::error::{ConfigError, SongError};
use crate::score::ScoreBoard;
use crate::sequencer::{ActiveNotes, NoteSequencer};
use crate::song::{SongCatalog, StepMode};

/// Buzzer and score collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum Feedback {
    Hit { midi_note: u8 },
    PlaybackComplete,
}

pub trait FeedbackSink {
    fn feedback(&mut self, feedback: Feedback);
}

/// Discards all feedback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl FeedbackSink for NoFeedback {
    fn feedback(&mut self, _feedback: Feedback) {}
}

/// Requests coming from the encoder and its button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum PlaybackCommand {
    Start,
    Pause,
    Resume,
    Stop,
    NextSong,
    PreviousSong,
    SelectSong(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct CoordinatorStats {
    pub ticks: u32,
    /// Ticks that arrived too late and reused the previous pitch estimate.
    pub dropped_frames: u32,
    pub analysis_errors: u32,
    pub strip_errors: u32,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct TickReport {
    pub playback: PlaybackState,
    pub quality: MatchQuality,
    pub expected: NoteSet,
    /// Notes of the events that scored on this tick.
    pub hits: NoteSet,
    pub stale: bool,
}

/// The fixed-cadence tick loop.
///
/// Each [`tick`](Coordinator::tick) takes the newest sample window from the
/// handoff, turns it into a pitch estimate, asks the sequencer what should be
/// playing and lets the [`ReconciliationEngine`] judge it. The resulting frame
/// goes to the strip and hits go to the feedback sink. Nothing in a tick is
/// fatal.
pub struct Coordinator<'a, D, F, P = ClassicPalette>
where
    D: DrawTarget<Color = Rgb888>,
    F: FeedbackSink,
    P: Palette,
{
    config: PianoStripConfig,
    handoff: &'a WindowHandoff,
    analyzer: SpectralAnalyzer,
    pitch: PitchMapper,
    engine: ReconciliationEngine<P>,
    catalog: SongCatalog<'a>,
    step_mode: StepMode,
    sequencer: Option<NoteSequencer>,
    playback: PlaybackState,
    /// Scheduler time that corresponds to song time zero.
    song_origin: f32,
    paused_at: Option<f32>,
    last_tick: Option<f32>,
    last_display: Option<f32>,
    strip: D,
    feedback: F,
    score: ScoreBoard,
    stats: CoordinatorStats,
}

impl<'a, D, F> Coordinator<'a, D, F, ClassicPalette>
where
    D: DrawTarget<Color = Rgb888>,
    F: FeedbackSink,
{
    pub fn new(
        config: PianoStripConfig,
        handoff: &'a WindowHandoff,
        catalog: SongCatalog<'a>,
        strip: D,
        feedback: F,
    ) -> Result<Self, ConfigError> {
        Self::with_palette(config, handoff, catalog, strip, feedback, ClassicPalette::default())
    }
}

impl<'a, D, F, P> Coordinator<'a, D, F, P>
where
    D: DrawTarget<Color = Rgb888>,
    F: FeedbackSink,
    P: Palette,
{
    pub fn with_palette(
        config: PianoStripConfig,
        handoff: &'a WindowHandoff,
        catalog: SongCatalog<'a>,
        strip: D,
        feedback: F,
        palette: P,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        #[cfg(feature = "logging")]
        info!("pianostrip coordinator ready, {} songs", catalog.len());
        Ok(Self {
            config,
            handoff,
            analyzer: SpectralAnalyzer::new(config.spectral)?,
            pitch: PitchMapper::new(&config.spectral),
            engine: ReconciliationEngine::with_palette(&config, palette),
            catalog,
            step_mode: StepMode::default(),
            sequencer: None,
            playback: PlaybackState::Idle,
            song_origin: 0.0,
            paused_at: None,
            last_tick: None,
            last_display: None,
            strip,
            feedback,
            score: ScoreBoard::default(),
            stats: CoordinatorStats::default(),
        })
    }

    /// How step symbols are interpreted for songs loaded from now on.
    pub fn with_step_mode(mut self, step_mode: StepMode) -> Self {
        self.step_mode = step_mode;
        self
    }

    pub fn config(&self) -> &PianoStripConfig {
        &self.config
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    pub fn catalog(&self) -> &SongCatalog<'a> {
        &self.catalog
    }

    pub fn score(&self) -> &ScoreBoard {
        &self.score
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    pub fn engine(&self) -> &ReconciliationEngine<P> {
        &self.engine
    }

    pub fn strip(&self) -> &D {
        &self.strip
    }

    pub fn feedback_sink(&self) -> &F {
        &self.feedback
    }

    /// Seconds into the current song, zero when nothing is playing.
    pub fn song_time(&self, now: f32) -> f32 {
        match self.playback {
            PlaybackState::Playing | PlaybackState::Complete => (now - self.song_origin).max(0.0),
            PlaybackState::Paused => self
                .paused_at
                .map_or(0.0, |paused_at| (paused_at - self.song_origin).max(0.0)),
            PlaybackState::Idle => 0.0,
        }
    }

    pub fn apply(&mut self, command: PlaybackCommand, now: f32) -> Result<PlaybackState, SongError> {
        #[cfg(feature = "logging")]
        trace!("playback command {} at {}", command, now);
        match command {
            PlaybackCommand::Start => {
                if self.sequencer.is_none() {
                    self.load_selected()?;
                }
                self.stop();
                if self.sequencer.is_some() {
                    self.song_origin = now;
                    self.playback = PlaybackState::Playing;
                    #[cfg(feature = "logging")]
                    info!("playback started");
                }
            }
            PlaybackCommand::Pause => {
                if self.playback == PlaybackState::Playing {
                    self.paused_at = Some(now);
                    self.playback = PlaybackState::Paused;
                }
            }
            PlaybackCommand::Resume => {
                if let (PlaybackState::Paused, Some(paused_at)) = (self.playback, self.paused_at) {
                    self.song_origin += now - paused_at;
                    self.paused_at = None;
                    // The window being collected spans the pause.
                    self.handoff.clear();
                    self.last_tick = None;
                    self.playback = PlaybackState::Playing;
                }
            }
            PlaybackCommand::Stop => self.stop(),
            PlaybackCommand::NextSong => {
                self.catalog.next();
                self.stop();
                self.load_selected()?;
            }
            PlaybackCommand::PreviousSong => {
                self.catalog.previous();
                self.stop();
                self.load_selected()?;
            }
            PlaybackCommand::SelectSong(index) => {
                self.catalog.select(index);
                self.stop();
                self.load_selected()?;
            }
        }
        Ok(self.playback)
    }

    /// Runs one reconciliation tick at scheduler time `now` (seconds).
    pub fn tick(&mut self, now: f32) -> TickReport {
        self.stats.ticks = self.stats.ticks.wrapping_add(1);
        let overrun = self.last_tick.is_some_and(|last| {
            now - last > self.config.timing.overrun_factor * self.config.timing.tick_period_seconds()
        });
        self.last_tick = Some(now);

        if self.playback != PlaybackState::Playing {
            return self.report(NoteSet::new(), NoteSet::new());
        }

        let fresh = if overrun {
            self.stats.dropped_frames = self.stats.dropped_frames.wrapping_add(1);
            #[cfg(feature = "logging")]
            warn!("tick overrun at {}, reusing last pitch estimate", now);
            None
        } else {
            self.next_estimate(now)
        };

        let song_time = self.song_time(now);
        let Some(sequencer) = self.sequencer.as_mut() else {
            return self.report(NoteSet::new(), NoteSet::new());
        };
        let expected = sequencer.active_events(song_time);
        let complete = sequencer.playback_complete();

        let output = self.engine.tick(now, &expected, fresh);
        if output.frame.draw(&mut self.strip).is_err() {
            self.stats.strip_errors = self.stats.strip_errors.wrapping_add(1);
            #[cfg(feature = "logging")]
            warn!("strip write failed");
        }
        for active in output.scored.iter() {
            self.feedback.feedback(Feedback::Hit {
                midi_note: active.midi_note,
            });
        }
        self.score.record(&output);

        if complete {
            self.playback = PlaybackState::Complete;
            self.feedback.feedback(Feedback::PlaybackComplete);
            #[cfg(feature = "logging")]
            info!(
                "playback complete, {} of {} notes hit",
                self.score.hits(),
                self.score.notes_played()
            );
        }
        self.report(notes_of(&expected), notes_of(&output.scored))
    }

    pub fn summary(&self) -> DisplaySummary {
        DisplaySummary::new(self.engine.state(), &self.score, self.playback)
    }

    /// A summary once every display refresh period, `None` in between.
    pub fn poll_display(&mut self, now: f32) -> Option<DisplaySummary> {
        let due = self
            .last_display
            .map_or(true, |last| now < last || now - last >= self.config.timing.lcd_refresh_seconds());
        if !due {
            return None;
        }
        self.last_display = Some(now);
        Some(self.summary())
    }

    fn next_estimate(&mut self, now: f32) -> Option<PitchEstimate> {
        let window = self.handoff.try_take()?;
        match self.analyzer.analyze(&window) {
            Ok(frame) => Some(self.pitch.to_pitch(&frame, now)),
            Err(_error) => {
                self.stats.analysis_errors = self.stats.analysis_errors.wrapping_add(1);
                #[cfg(feature = "logging")]
                warn!("dropping window: {}", _error);
                None
            }
        }
    }

    fn load_selected(&mut self) -> Result<(), SongError> {
        let Some(entry) = self.catalog.current() else {
            self.sequencer = None;
            return Ok(());
        };
        let song = entry.load(self.config.timing.default_step_seconds, self.step_mode)?;
        #[cfg(feature = "logging")]
        info!("loaded song {=str} with {} events", entry.name, song.len());
        self.sequencer = Some(NoteSequencer::new(song));
        Ok(())
    }

    /// Rewinds the song and clears everything derived from it.
    fn stop(&mut self) {
        if let Some(sequencer) = self.sequencer.as_mut() {
            sequencer.reset();
        }
        self.engine.reset();
        self.score.reset();
        self.handoff.clear();
        self.paused_at = None;
        self.last_tick = None;
        self.playback = PlaybackState::Idle;
        if self.engine.render().draw(&mut self.strip).is_err() {
            self.stats.strip_errors = self.stats.strip_errors.wrapping_add(1);
            #[cfg(feature = "logging")]
            warn!("strip clear failed");
        }
    }

    fn report(&self, expected: NoteSet, hits: NoteSet) -> TickReport {
        TickReport {
            playback: self.playback,
            quality: self.engine.quality(),
            expected,
            hits,
            stale: self.engine.state().is_stale(),
        }
    }
}

fn notes_of(events: &ActiveNotes) -> NoteSet {
    events.iter().map(|active| active.midi_note).collect()
}
