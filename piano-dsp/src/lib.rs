#![no_std]

//! Audio side of PianoStrip: microphone samples in, pitch estimates out.
//!
//! Samples are collected by a [`Sampler`] into a fixed [`SampleBuffer`], handed
//! over one full window at a time through a [`WindowHandoff`], turned into a
//! [`SpectralFrame`] by the [`SpectralAnalyzer`] and mapped to a MIDI note by the
//! [`PitchMapper`]. [`reconcile`] compares that estimate with expected notes.

pub mod config;
pub mod error;
pub mod handoff;
pub mod note;
pub mod pitch;
pub mod reconcile;
pub mod sample_buffer;
pub mod spectral;

pub use config::SpectralConfig;
pub use error::{AnalysisError, BufferError, ConfigError};
pub use handoff::{Sampler, SamplerStats, WindowHandoff};
pub use note::{note_name, parse_note_name, NoteName, NoteSet};
pub use pitch::{PitchEstimate, PitchMapper};
pub use reconcile::{judge, ExpectedNote, MatchQuality, ReconciliationState, MAX_POLYPHONY};
pub use sample_buffer::{Sample, SampleBuffer, SampleWindow};
pub use spectral::{SpectralAnalyzer, SpectralFrame};

#[cfg(feature = "logging")]
use defmt_rtt as _;
