use core::ops::Range;

use embedded_graphics::pixelcolor::Rgb888;
use piano_dsp::ReconciliationState;
use thiserror::Error;

use crate::frame::{LedFrame, MAX_LEDS};
use crate::palette::{apply_brightness, ClassicPalette, ColorContext, Palette};

// --- Strip Config ---
pub const LED_COUNT: u16 = 60;
/// MIDI note on LED index 0 (C2 for a 60-key strip).
pub const LED_BASE_MIDI: u8 = 36;
pub const LEDS_PER_KEY: u16 = 1;
pub const BRIGHTNESS: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub enum LayoutError {
    #[error("LED count {0} outside 1..=256")]
    LedCount(u16),
    #[error("{leds_per_key} LEDs per key does not fit a {led_count} LED strip")]
    LedsPerKey { leds_per_key: u16, led_count: u16 },
}

/// Physical arrangement of the strip relative to the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct StripLayout {
    pub led_count: u16,
    pub led_base_midi: u8,
    pub leds_per_key: u16,
    pub brightness: u8,
}

impl Default for StripLayout {
    fn default() -> Self {
        Self {
            led_count: LED_COUNT,
            led_base_midi: LED_BASE_MIDI,
            leds_per_key: LEDS_PER_KEY,
            brightness: BRIGHTNESS,
        }
    }
}

impl StripLayout {
    pub fn with_led_count(mut self, led_count: u16) -> Self {
        self.led_count = led_count;
        self
    }

    pub fn with_led_base_midi(mut self, led_base_midi: u8) -> Self {
        self.led_base_midi = led_base_midi;
        self
    }

    pub fn with_leds_per_key(mut self, leds_per_key: u16) -> Self {
        self.leds_per_key = leds_per_key;
        self
    }

    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = brightness;
        self
    }

    /// Number of whole keys the strip can show.
    pub fn key_count(&self) -> u16 {
        self.led_count / self.leds_per_key.max(1)
    }

    /// Highest MIDI note with LEDs, if any key fits.
    pub fn top_midi(&self) -> Option<u8> {
        let top = self.led_base_midi as u16 + self.key_count().checked_sub(1)?;
        u8::try_from(top).ok().filter(|&note| note <= 127)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.led_count == 0 || self.led_count as usize > MAX_LEDS {
            return Err(LayoutError::LedCount(self.led_count));
        }
        if self.leds_per_key == 0 || self.leds_per_key > self.led_count {
            return Err(LayoutError::LedsPerKey {
                leds_per_key: self.leds_per_key,
                led_count: self.led_count,
            });
        }
        Ok(())
    }
}

/// Maps notes onto the strip and renders reconciliation states into frames.
pub struct LedMapper<P: Palette = ClassicPalette> {
    layout: StripLayout,
    palette: P,
}

impl LedMapper<ClassicPalette> {
    pub fn new(layout: StripLayout) -> Self {
        Self::with_palette(layout, ClassicPalette::default())
    }
}

impl<P: Palette> LedMapper<P> {
    pub fn with_palette(layout: StripLayout, palette: P) -> Self {
        Self { layout, palette }
    }

    pub fn layout(&self) -> &StripLayout {
        &self.layout
    }

    /// LED indices lit for `midi_note`, in strip order. Notes the strip does
    /// not cover map to an empty range.
    pub fn map_note_to_leds(&self, midi_note: u8) -> Range<u16> {
        let key = midi_note as i32 - self.layout.led_base_midi as i32;
        if key < 0 || key >= self.layout.key_count() as i32 {
            return 0..0;
        }
        let per_key = self.layout.leds_per_key.max(1);
        let start = key as u16 * per_key;
        start..start + per_key
    }

    pub fn covers(&self, midi_note: u8) -> bool {
        !self.map_note_to_leds(midi_note).is_empty()
    }

    /// The note an LED belongs to. LEDs past the last whole key have none.
    pub fn led_to_note(&self, led_index: u16) -> Option<u8> {
        let key = led_index / self.layout.leds_per_key.max(1);
        if key >= self.layout.key_count() {
            return None;
        }
        u8::try_from(self.layout.led_base_midi as u16 + key)
            .ok()
            .filter(|&note| note <= 127)
    }

    /// Renders `state` into a full frame. Deterministic: the same state always
    /// yields the same frame.
    pub fn render_frame(&self, state: &ReconciliationState) -> LedFrame {
        let led_count = self.layout.led_count.min(MAX_LEDS as u16);
        let mut frame = LedFrame::filled(led_count, Rgb888::new(0, 0, 0));

        for led_index in 0..led_count {
            let context = self.context(led_index);
            frame.set(led_index, self.scaled(self.palette.background(&context)));
        }

        for expected in state.expected() {
            for led_index in self.map_note_to_leds(expected.midi_note) {
                let context = self.context(led_index);
                let color = self.palette.note_color(expected.quality, &context);
                frame.set(led_index, self.scaled(color));
            }
        }
        frame
    }

    fn context(&self, led_index: u16) -> ColorContext {
        ColorContext {
            midi_note: self.led_to_note(led_index),
        }
    }

    fn scaled(&self, color: Rgb888) -> Rgb888 {
        apply_brightness(color, self.layout.brightness)
    }
}
