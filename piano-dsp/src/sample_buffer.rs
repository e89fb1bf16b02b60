use heapless::Vec;

use crate::config::{SpectralConfig, MAX_FFT_SAMPLES};
use crate::error::BufferError;

/// One quantized microphone reading and its position in the sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct Sample {
    pub index: u32,
    pub value: i16,
}

impl Sample {
    pub const fn new(index: u32, value: i16) -> Self {
        Self { index, value }
    }
}

/// A completed analysis window, moved out of the [`SampleBuffer`] by
/// [`SampleBuffer::drain_full`].
///
/// Samples inside a window are consecutive, so only the sequence index of the
/// first one is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleWindow {
    first_index: u32,
    values: Vec<i16, MAX_FFT_SAMPLES>,
}

impl SampleWindow {
    /// Builds a window from raw values, e.g. for replaying recorded audio.
    pub fn from_values(first_index: u32, values: &[i16]) -> Result<Self, BufferError> {
        let mut window = Self {
            first_index,
            values: Vec::new(),
        };
        window
            .values
            .extend_from_slice(values)
            .map_err(|_| BufferError::BufferFull)?;
        Ok(window)
    }

    pub fn first_index(&self) -> u32 {
        self.first_index
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[i16] {
        &self.values
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &value)| Sample::new(self.first_index.wrapping_add(i as u32), value))
    }
}

/// Fixed-capacity accumulator owned by the sampling producer.
///
/// `push` is O(1) and never blocks, so it can run from a timer interrupt.
/// Once the buffer holds `capacity` samples it must be drained before the
/// next push is accepted.
pub struct SampleBuffer {
    capacity: usize,
    first_index: u32,
    values: Vec<i16, MAX_FFT_SAMPLES>,
}

impl SampleBuffer {
    pub fn new(config: &SpectralConfig) -> Self {
        Self::with_capacity(config.fft_samples)
    }

    /// Capacities above [`MAX_FFT_SAMPLES`] are clamped.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.clamp(1, MAX_FFT_SAMPLES),
            first_index: 0,
            values: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn push(&mut self, sample: Sample) -> Result<(), BufferError> {
        if self.is_full() {
            return Err(BufferError::BufferFull);
        }
        if self.values.is_empty() {
            self.first_index = sample.index;
        }
        self.values
            .push(sample.value)
            .map_err(|_| BufferError::BufferFull)
    }

    /// Hands the completed window over and starts a new one.
    pub fn drain_full(&mut self) -> Result<SampleWindow, BufferError> {
        if !self.is_full() {
            return Err(BufferError::NotReady);
        }
        Ok(SampleWindow {
            first_index: self.first_index,
            values: core::mem::take(&mut self.values),
        })
    }

    /// Drops a partial window. Returns the number of samples thrown away.
    pub fn discard(&mut self) -> usize {
        let dropped = self.values.len();
        self.values.clear();
        dropped
    }
}
