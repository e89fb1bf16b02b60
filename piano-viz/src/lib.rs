#![no_std]

//! Strip side of PianoStrip: which LEDs belong to which note, and what color
//! they get for a given reconciliation state.

pub mod frame;
pub mod led_mapper;
pub mod palette;

pub use frame::{LedFrame, MAX_LEDS};
pub use led_mapper::{LayoutError, LedMapper, StripLayout};
pub use palette::{ClassicPalette, ColorContext, Palette, PitchClassPalette};

#[cfg(feature = "logging")]
use defmt_rtt as _;
