use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
#[allow(unused_imports)]
use micromath::F32Ext;
use piano_dsp::MatchQuality;

/// Where on the strip a color is being chosen for.
pub struct ColorContext {
    /// The key this LED belongs to, if it maps to one.
    pub midi_note: Option<u8>,
}

/// Chooses strip colors. Implementations must be pure so identical states
/// always render identical frames.
pub trait Palette {
    /// Color of an LED with no expected note on it.
    fn background(&self, context: &ColorContext) -> Rgb888;

    /// Color of an LED under an expected note.
    fn note_color(&self, quality: MatchQuality, context: &ColorContext) -> Rgb888;
}

pub const AMBER: Rgb888 = Rgb888::new(255, 140, 0);
pub const DIM_AMBER: Rgb888 = Rgb888::new(40, 22, 0);

/// Green for a hit, amber when off pitch, dim amber while waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicPalette {
    pub matched: Rgb888,
    pub off_pitch: Rgb888,
    pub missing: Rgb888,
    pub idle: Rgb888,
}

impl Default for ClassicPalette {
    fn default() -> Self {
        Self {
            matched: Rgb888::GREEN,
            off_pitch: AMBER,
            missing: DIM_AMBER,
            idle: Rgb888::BLACK,
        }
    }
}

impl Palette for ClassicPalette {
    fn background(&self, _context: &ColorContext) -> Rgb888 {
        self.idle
    }

    fn note_color(&self, quality: MatchQuality, _context: &ColorContext) -> Rgb888 {
        match quality {
            MatchQuality::Match => self.matched,
            MatchQuality::Sharp | MatchQuality::Flat => self.off_pitch,
            MatchQuality::Missing => self.missing,
            MatchQuality::Silence => self.idle,
        }
    }
}

/// Classic note colors over a faint rainbow background, one hue per pitch
/// class so octaves line up visually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchClassPalette {
    pub notes: ClassicPalette,
    /// Background brightness, 0..=255.
    pub background_level: u8,
}

impl Default for PitchClassPalette {
    fn default() -> Self {
        Self {
            notes: ClassicPalette::default(),
            background_level: 12,
        }
    }
}

impl Palette for PitchClassPalette {
    fn background(&self, context: &ColorContext) -> Rgb888 {
        match context.midi_note {
            Some(note) => {
                let position = ((note % 12) as u32 * 255 / 12) as u8;
                scale_linear(map_position_to_rgb_on_wheel(position), self.background_level)
            }
            None => self.notes.idle,
        }
    }

    fn note_color(&self, quality: MatchQuality, context: &ColorContext) -> Rgb888 {
        self.notes.note_color(quality, context)
    }
}

pub fn map_position_to_rgb_on_wheel(pos: u8) -> Rgb888 {
    let pos = pos % 255;
    if pos < 85 {
        Rgb888::new(
            pos.saturating_mul(3),
            255u8.saturating_sub(pos.saturating_mul(3)),
            0,
        )
    } else if pos < 170 {
        let pos = pos.saturating_sub(85);
        Rgb888::new(
            255u8.saturating_sub(pos.saturating_mul(3)),
            0,
            pos.saturating_mul(3),
        )
    } else {
        let pos = pos.saturating_sub(170);
        Rgb888::new(
            0,
            pos.saturating_mul(3),
            255u8.saturating_sub(pos.saturating_mul(3)),
        )
    }
}

fn scale_channel(channel: u8, factor: u32) -> u8 {
    (channel as u32 * factor / 255) as u8
}

pub fn scale_linear(color: Rgb888, level: u8) -> Rgb888 {
    let factor = level as u32;
    Rgb888::new(
        scale_channel(color.r(), factor),
        scale_channel(color.g(), factor),
        scale_channel(color.b(), factor),
    )
}

/// Scales a color by a user brightness setting, corrected for the eye's
/// response (gamma 2.2). Full brightness leaves the color untouched.
pub fn apply_brightness(color: Rgb888, brightness: u8) -> Rgb888 {
    match brightness {
        255 => color,
        0 => Rgb888::BLACK,
        _ => {
            let factor = ((brightness as f32 / 255.0).powf(2.2) * 255.0).clamp(1.0, 255.0) as u8;
            scale_linear(color, factor)
        }
    }
}
