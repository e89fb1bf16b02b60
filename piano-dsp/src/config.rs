use crate::error::ConfigError;

// --- Audio Config ---
pub const FFT_SAMPLES: usize = 1024; // FFT Resolution
pub const FFT_SAMPLE_RATE_HZ: u32 = 8_000; // Microphone sample rate (1024 samples = 128 ms window)

/// Largest window the fixed-size buffers can hold.
pub const MAX_FFT_SAMPLES: usize = 2048;
pub const MIN_FFT_SAMPLES: usize = 16;
pub const MAX_BINS: usize = MAX_FFT_SAMPLES / 2;

/// Dominant bins below this magnitude are treated as silence. A full-scale
/// Hann-windowed tone peaks near `FFT_SAMPLES / 4`.
pub const NOISE_FLOOR: f32 = 0.5;

/// Reference pitch for MIDI note 69 (A4).
pub const CONCERT_A_HZ: f32 = 440.0;

/// Sampling and analysis parameters shared by the buffer, analyzer and mapper.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct SpectralConfig {
    pub fft_samples: usize,
    pub sample_rate_hz: u32,
    pub noise_floor: f32,
    pub concert_a_hz: f32,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            fft_samples: FFT_SAMPLES,
            sample_rate_hz: FFT_SAMPLE_RATE_HZ,
            noise_floor: NOISE_FLOOR,
            concert_a_hz: CONCERT_A_HZ,
        }
    }
}

impl SpectralConfig {
    pub fn with_fft_samples(mut self, fft_samples: usize) -> Self {
        self.fft_samples = fft_samples;
        self
    }

    pub fn with_sample_rate_hz(mut self, sample_rate_hz: u32) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    pub fn with_noise_floor(mut self, noise_floor: f32) -> Self {
        self.noise_floor = noise_floor;
        self
    }

    pub fn with_concert_a_hz(mut self, concert_a_hz: f32) -> Self {
        self.concert_a_hz = concert_a_hz;
        self
    }

    /// Number of magnitude bins produced per window.
    pub fn bin_count(&self) -> usize {
        self.fft_samples / 2
    }

    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate_hz as f32 / self.fft_samples as f32
    }

    pub fn nyquist_hz(&self) -> f32 {
        self.sample_rate_hz as f32 / 2.0
    }

    /// Duration of one analysis window in seconds.
    pub fn window_seconds(&self) -> f32 {
        self.fft_samples as f32 / self.sample_rate_hz as f32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_samples.is_power_of_two()
            || self.fft_samples < MIN_FFT_SAMPLES
            || self.fft_samples > MAX_FFT_SAMPLES
        {
            return Err(ConfigError::FftSize(self.fft_samples));
        }
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::SampleRate(self.sample_rate_hz));
        }
        if !(self.noise_floor >= 0.0) {
            return Err(ConfigError::NoiseFloor);
        }
        if !(self.concert_a_hz > 0.0) {
            return Err(ConfigError::ConcertPitch);
        }
        Ok(())
    }
}
