use piano_viz::LayoutError;
use thiserror::Error;

/// Problems with song data, reported when a song is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum SongError {
    #[error("event {index} starts before the event preceding it")]
    Unsorted { index: usize },
    #[error("song exceeds {max} events")]
    TooManyEvents { max: usize },
    #[error("event {index} has a negative, zero or non-finite timing")]
    InvalidDuration { index: usize },
    #[error("event {index} is not a MIDI note")]
    InvalidNote { index: usize },
    #[error("step duration must be positive")]
    InvalidStep,
    #[error("step {step} is not a note, chord or rest")]
    UnknownSymbol { step: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum ConfigError {
    #[error(transparent)]
    Spectral(#[from] piano_dsp::ConfigError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("pin {0} is assigned twice")]
    PinConflict(u8),
    #[error("tick period must be non-zero")]
    TickPeriod,
    #[error("display refresh period must be non-zero")]
    DisplayRefresh,
    #[error("overrun factor must be at least 1")]
    OverrunFactor,
    #[error("default step duration must be positive")]
    StepDuration,
    #[error("match tolerance must be positive")]
    Tolerance,
    #[error("staleness threshold must not be negative")]
    Staleness,
    #[error("minimum confidence outside 0..=1")]
    Confidence,
}
