#[allow(unused_imports)]
use micromath::F32Ext;

use crate::config::{SpectralConfig, CONCERT_A_HZ};
use crate::note::{fractional_midi, MAX_MIDI_NOTE};
use crate::spectral::SpectralFrame;

/// Dominant pitch of one analysis window.
///
/// `midi_note` is only meaningful when `confidence` is above zero; silent
/// windows carry `confidence == 0.0` and no note.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct PitchEstimate {
    pub frequency_hz: f32,
    pub midi_note: Option<u8>,
    pub cents_offset: f32,
    pub confidence: f32,
    /// Scheduler time, in seconds, at which the estimate was produced.
    pub timestamp: f32,
}

impl PitchEstimate {
    pub fn silent(timestamp: f32) -> Self {
        Self {
            frequency_hz: 0.0,
            midi_note: None,
            cents_offset: 0.0,
            confidence: 0.0,
            timestamp,
        }
    }

    /// The note, if the estimate is at least `min_confidence` sure of it.
    pub fn confident_note(&self, min_confidence: f32) -> Option<u8> {
        if self.confidence > 0.0 && self.confidence >= min_confidence {
            self.midi_note
        } else {
            None
        }
    }

    pub fn age(&self, now: f32) -> f32 {
        (now - self.timestamp).max(0.0)
    }
}

/// Converts spectral frames into MIDI pitch estimates.
#[derive(Debug, Clone, Copy)]
pub struct PitchMapper {
    concert_a_hz: f32,
}

impl Default for PitchMapper {
    fn default() -> Self {
        Self {
            concert_a_hz: CONCERT_A_HZ,
        }
    }
}

impl PitchMapper {
    pub fn new(config: &SpectralConfig) -> Self {
        Self {
            concert_a_hz: config.concert_a_hz,
        }
    }

    pub fn to_pitch(&self, frame: &SpectralFrame, timestamp: f32) -> PitchEstimate {
        match frame.dominant_frequency_hz() {
            Some(frequency_hz) => self.from_frequency(frequency_hz, frame.peak_ratio(), timestamp),
            None => PitchEstimate::silent(timestamp),
        }
    }

    /// Maps a frequency to the nearest note. Frequencies outside the MIDI
    /// range come back with zero confidence.
    pub fn from_frequency(&self, frequency_hz: f32, confidence: f32, timestamp: f32) -> PitchEstimate {
        if !(frequency_hz > 0.0) {
            return PitchEstimate::silent(timestamp);
        }
        let exact = fractional_midi(frequency_hz, self.concert_a_hz);
        let nearest = libm::roundf(exact);
        if nearest < 0.0 || nearest > MAX_MIDI_NOTE as f32 {
            return PitchEstimate {
                frequency_hz,
                ..PitchEstimate::silent(timestamp)
            };
        }
        PitchEstimate {
            frequency_hz,
            midi_note: Some(nearest as u8),
            cents_offset: 100.0 * (exact - nearest),
            confidence: confidence.clamp(0.0, 1.0),
            timestamp,
        }
    }
}
