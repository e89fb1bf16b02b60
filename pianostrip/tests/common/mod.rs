#![allow(dead_code)]

use embedded_graphics::{pixelcolor::Rgb888, prelude::*, Pixel};
use pianostrip::{Feedback, FeedbackSink};

pub const SAMPLE_RATE: f32 = 8_000.0;
pub const TICK_SECONDS: f32 = 0.04;
/// Samples arriving between two ticks at the default cadence.
pub const SAMPLES_PER_TICK: usize = 320;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripError;

/// A `led_count x 1` strip that keeps the last colors written to it.
pub struct RecordingStrip {
    pub leds: Vec<Rgb888>,
    pub draw_calls: usize,
    pub fail: bool,
}

impl RecordingStrip {
    pub fn new(led_count: usize) -> Self {
        Self {
            leds: vec![Rgb888::BLACK; led_count],
            draw_calls: 0,
            fail: false,
        }
    }

    pub fn failing(led_count: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(led_count)
        }
    }

    pub fn lit(&self) -> Vec<usize> {
        self.leds
            .iter()
            .enumerate()
            .filter(|(_, color)| **color != Rgb888::BLACK)
            .map(|(index, _)| index)
            .collect()
    }
}

impl OriginDimensions for RecordingStrip {
    fn size(&self) -> Size {
        Size::new(self.leds.len() as u32, 1)
    }
}

impl DrawTarget for RecordingStrip {
    type Color = Rgb888;
    type Error = StripError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.draw_calls += 1;
        if self.fail {
            return Err(StripError);
        }
        for Pixel(point, color) in pixels {
            if point.y == 0 && point.x >= 0 && (point.x as usize) < self.leds.len() {
                self.leds[point.x as usize] = color;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingFeedback {
    pub events: Vec<Feedback>,
}

impl FeedbackSink for RecordingFeedback {
    fn feedback(&mut self, feedback: Feedback) {
        self.events.push(feedback);
    }
}

/// Continuous sine samples, indexed globally so consecutive chunks join up.
pub struct SineSource {
    pub frequency_hz: f32,
    pub amplitude: f32,
    next_index: u64,
}

impl SineSource {
    pub fn new(frequency_hz: f32, amplitude: f32) -> Self {
        Self {
            frequency_hz,
            amplitude,
            next_index: 0,
        }
    }

    pub fn next_sample(&mut self) -> i16 {
        let t = self.next_index as f64 / SAMPLE_RATE as f64;
        self.next_index += 1;
        let phase = 2.0 * std::f64::consts::PI * self.frequency_hz as f64 * t;
        (phase.sin() * self.amplitude as f64 * i16::MAX as f64) as i16
    }
}
