#![allow(dead_code)]

use piano_dsp::{SpectralConfig, SpectralFrame};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub const SAMPLE_RATE: f32 = 8_000.0;
pub const WINDOW: usize = 1024;

/// A sine wave quantized to i16 at the given peak amplitude (0..=1).
pub fn sine_i16(frequency_hz: f32, amplitude: f32) -> [i16; WINDOW] {
    let mut samples = [0i16; WINDOW];
    for (i, sample) in samples.iter_mut().enumerate() {
        let phase = 2.0 * std::f32::consts::PI * frequency_hz * i as f32 / SAMPLE_RATE;
        *sample = (phase.sin() * amplitude * i16::MAX as f32) as i16;
    }
    samples
}

/// Sine plus seeded uniform noise, so runs are repeatable.
pub fn noisy_sine_i16(frequency_hz: f32, amplitude: f32, noise: f32, seed: u64) -> [i16; WINDOW] {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = sine_i16(frequency_hz, amplitude);
    for sample in samples.iter_mut() {
        let jitter = rng.random_range(-noise..noise) * i16::MAX as f32;
        *sample = (*sample as f32 + jitter).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
    samples
}

pub fn white_noise_i16(amplitude: f32, seed: u64) -> [i16; WINDOW] {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = [0i16; WINDOW];
    for sample in samples.iter_mut() {
        *sample = (rng.random_range(-amplitude..amplitude) * i16::MAX as f32) as i16;
    }
    samples
}

pub fn midi_frequency(midi: u8) -> f32 {
    440.0 * 2f32.powf((midi as f32 - 69.0) / 12.0)
}

/// Frame with a three-bin parabolic main lobe centred on `frequency_hz`, as a
/// clean pure tone would produce.
pub fn tone_frame(config: &SpectralConfig, frequency_hz: f32, amplitude: f32) -> SpectralFrame {
    let position = frequency_hz / config.bin_width_hz();
    let magnitudes: std::vec::Vec<f32> = (0..config.bin_count())
        .map(|bin| {
            let distance = bin as f32 - position;
            if distance.abs() < 1.5 {
                (amplitude * (1.0 - 0.25 * distance * distance)).max(0.0)
            } else {
                0.0
            }
        })
        .collect();
    SpectralFrame::from_magnitudes(&magnitudes, config.sample_rate_hz, config.noise_floor)
}
