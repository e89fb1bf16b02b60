#![no_std]

//! PianoStrip application core: songs, the note sequencer, pitch
//! reconciliation and the tick loop that ties the microphone to the strip.
//!
//! Hardware drivers stay outside. The strip is any
//! `DrawTarget<Color = Rgb888>`, audio arrives through
//! [`piano_dsp::Sampler::on_sample`], the display polls
//! [`Coordinator::poll_display`] and the encoder sends [`PlaybackCommand`]s.

pub mod config;
pub mod coordinator;
pub mod display;
pub mod engine;
pub mod error;
pub mod score;
pub mod sequencer;
pub mod song;

pub use config::{PianoStripConfig, PinMap, ReconcileConfig, TimingConfig};
pub use coordinator::{
    Coordinator, CoordinatorStats, Feedback, FeedbackSink, NoFeedback, PlaybackCommand, TickReport,
};
pub use display::{DisplaySummary, PlaybackState};
pub use engine::{EdgeTracker, EnginePhase, EventLatch, ReconciliationEngine, TickOutput};
pub use error::{ConfigError, SongError};
pub use score::ScoreBoard;
pub use sequencer::{ActiveNote, ActiveNotes, NoteSequencer};
pub use song::{NoteEvent, Song, SongCatalog, SongEntry, StepMode, DEMO_SONGS};

#[cfg(feature = "logging")]
use defmt_rtt as _;
