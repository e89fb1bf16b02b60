use thiserror::Error;

/// Producer/consumer errors of the sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum BufferError {
    /// A push arrived after the buffer filled up without an intervening drain.
    #[error("sample buffer is full")]
    BufferFull,
    /// A drain was requested before the window was complete.
    #[error("sample buffer is not full yet")]
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum AnalysisError {
    #[error("window holds {actual} samples, analyzer expects {expected}")]
    WindowSize { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum ConfigError {
    #[error("unsupported FFT size {0}, must be a power of two between 16 and 2048")]
    FftSize(usize),
    #[error("invalid sample rate {0} Hz")]
    SampleRate(u32),
    #[error("noise floor must be a non-negative number")]
    NoiseFloor,
    #[error("concert pitch must be positive")]
    ConcertPitch,
}
