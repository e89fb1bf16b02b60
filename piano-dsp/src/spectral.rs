use heapless::Vec;
use microdsp::common::{apply_window_function, real_fft, WindowFunctionType::Hann};
use microfft::Complex32;
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::config::{SpectralConfig, MAX_BINS, MAX_FFT_SAMPLES};
use crate::error::{AnalysisError, ConfigError};
use crate::sample_buffer::SampleWindow;

/// Normalize a single sample from i16 to f32.
pub fn normalize_sample(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}

/// Normalize a slice of i16 samples to a slice of f32 samples.
pub fn normalize_samples(samples: &[i16], normalized_samples: &mut [f32]) {
    for (normalized, &sample) in normalized_samples.iter_mut().zip(samples) {
        *normalized = normalize_sample(sample);
    }
}

/// Apply a Hann window to a slice of f32 samples.
pub fn apply_hann_window(samples: &mut [f32]) {
    apply_window_function(Hann, samples);
}

/// Compute the real FFT in place. The length must be a supported power of two.
pub fn compute_fft(samples: &mut [f32]) -> &mut [Complex32] {
    real_fft(samples)
}

/// Compute the magnitude of the FFT output into `magnitudes`.
///
/// The packed real FFT stores the Nyquist term in the imaginary part of bin 0,
/// so bin 0 only reports the DC component.
pub fn compute_magnitude(fft_output: &[Complex32], magnitudes: &mut [f32]) {
    for (i, (magnitude, component)) in magnitudes.iter_mut().zip(fft_output).enumerate() {
        *magnitude = if i == 0 {
            component.re.abs()
        } else {
            libm::sqrtf(component.re * component.re + component.im * component.im)
        };
    }
}

/// Offset of the true peak from bin `k`, in bins, fitted through `k - 1`, `k`
/// and `k + 1`. Always within `-0.5..=0.5`.
pub fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let denominator = left - 2.0 * center + right;
    if denominator.abs() <= f32::EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denominator).clamp(-0.5, 0.5)
}

/// Magnitude spectrum of one analysis window and its dominant peak.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    magnitudes: Vec<f32, MAX_BINS>,
    sample_rate_hz: u32,
    bin_width_hz: f32,
    dominant_bin: Option<usize>,
    frequency_hz: f32,
    peak_energy: f32,
    total_energy: f32,
}

impl SpectralFrame {
    /// Picks the dominant bin of `magnitudes` and refines its frequency.
    ///
    /// `magnitudes` covers `0..sample_rate/2` with `fft_samples / 2` entries;
    /// anything beyond [`MAX_BINS`] is ignored. The DC bin never wins.
    pub fn from_magnitudes(magnitudes: &[f32], sample_rate_hz: u32, noise_floor: f32) -> Self {
        let magnitudes = &magnitudes[..magnitudes.len().min(MAX_BINS)];
        let bin_width_hz = if magnitudes.is_empty() {
            0.0
        } else {
            sample_rate_hz as f32 / (2 * magnitudes.len()) as f32
        };

        let mut dominant: Option<(usize, f32)> = None;
        let mut total_energy = 0.0f32;
        for (bin, &magnitude) in magnitudes.iter().enumerate().skip(1) {
            total_energy += magnitude * magnitude;
            if magnitude > noise_floor && dominant.map_or(true, |(_, best)| magnitude > best) {
                dominant = Some((bin, magnitude));
            }
        }

        let mut frame = Self {
            magnitudes: Vec::new(),
            sample_rate_hz,
            bin_width_hz,
            dominant_bin: None,
            frequency_hz: 0.0,
            peak_energy: 0.0,
            total_energy,
        };
        // Cannot overflow: the slice was clamped to MAX_BINS above.
        let _ = frame.magnitudes.extend_from_slice(magnitudes);

        if let Some((bin, magnitude)) = dominant {
            let left = magnitudes[bin - 1];
            let (offset, right) = match magnitudes.get(bin + 1) {
                Some(&right) => (parabolic_offset(left, magnitude, right), right),
                None => (0.0, 0.0),
            };
            frame.dominant_bin = Some(bin);
            frame.frequency_hz = (bin as f32 + offset) * bin_width_hz;
            // DC is left out of both energies.
            let left_energy = if bin > 1 { left * left } else { 0.0 };
            frame.peak_energy = left_energy + magnitude * magnitude + right * right;
        }
        frame
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn bin_width_hz(&self) -> f32 {
        self.bin_width_hz
    }

    /// `true` when no bin rose above the noise floor.
    pub fn is_silent(&self) -> bool {
        self.dominant_bin.is_none()
    }

    pub fn dominant_bin(&self) -> Option<usize> {
        self.dominant_bin
    }

    /// Refined dominant frequency, `None` for silent frames.
    pub fn dominant_frequency_hz(&self) -> Option<f32> {
        self.dominant_bin.map(|_| self.frequency_hz)
    }

    /// Share of the spectral energy concentrated in the dominant peak.
    pub fn peak_ratio(&self) -> f32 {
        if self.is_silent() || self.total_energy <= 0.0 {
            return 0.0;
        }
        (self.peak_energy / self.total_energy).clamp(0.0, 1.0)
    }
}

/// Windowed real-FFT analysis of completed sample windows.
pub struct SpectralAnalyzer {
    config: SpectralConfig,
    scratch: Vec<f32, MAX_FFT_SAMPLES>,
    magnitudes: Vec<f32, MAX_BINS>,
}

impl SpectralAnalyzer {
    /// Fails when the FFT size is not one the real FFT supports, or on any
    /// other invalid [`SpectralConfig`] field.
    pub fn new(config: SpectralConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            scratch: Vec::new(),
            magnitudes: Vec::new(),
        })
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    pub fn analyze(&mut self, window: &SampleWindow) -> Result<SpectralFrame, AnalysisError> {
        self.analyze_values(window.values())
    }

    /// Process a frame of i16 samples and return its spectral frame.
    pub fn analyze_values(&mut self, samples: &[i16]) -> Result<SpectralFrame, AnalysisError> {
        let expected = self.config.fft_samples;
        if samples.len() != expected || expected > MAX_FFT_SAMPLES {
            return Err(AnalysisError::WindowSize {
                expected,
                actual: samples.len(),
            });
        }

        // Step 1: Normalize samples
        self.scratch.clear();
        let _ = self.scratch.resize(expected, 0.0);
        normalize_samples(samples, &mut self.scratch);

        // Step 2: Apply Hann window
        apply_hann_window(&mut self.scratch);

        // Step 3: Compute FFT
        let fft_output = compute_fft(&mut self.scratch);

        // Step 4: Compute magnitude spectrum
        self.magnitudes.clear();
        let _ = self.magnitudes.resize(fft_output.len().min(MAX_BINS), 0.0);
        compute_magnitude(fft_output, &mut self.magnitudes);

        Ok(SpectralFrame::from_magnitudes(
            &self.magnitudes,
            self.config.sample_rate_hz,
            self.config.noise_floor,
        ))
    }
}
