use piano_dsp::SpectralConfig;
use piano_viz::StripLayout;

use crate::error::ConfigError;

// --- Pins ---
pub const LCD_RS: u8 = 9;
pub const LCD_EN: u8 = 8;
pub const LCD_D4: u8 = 7;
pub const LCD_D5: u8 = 6;
pub const LCD_D6: u8 = 4;
pub const LCD_D7: u8 = 3;

pub const ENCODER_CLK: u8 = 44;
pub const ENCODER_DT: u8 = 46;

pub const LED_STRIP_PIN: u8 = 24;
pub const BUZZER_PIN: u8 = 13;

// --- Timing ---
pub const LCD_REFRESH_MS: u32 = 200;
pub const TICK_PERIOD_MS: u32 = 40;
/// A tick arriving later than this many periods skips its pitch update.
pub const OVERRUN_FACTOR: f32 = 2.0;
/// Song playback default (override per song).
pub const DEFAULT_STEP_SECONDS: f32 = 0.12;

// --- Reconciliation ---
pub const TOLERANCE_CENTS: f32 = 50.0;
/// About three analysis windows at the default sample rate.
pub const STALE_AFTER_SECONDS: f32 = 0.4;
pub const MIN_CONFIDENCE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct PinMap {
    pub lcd_rs: u8,
    pub lcd_en: u8,
    pub lcd_data: [u8; 4],
    pub encoder_clk: u8,
    pub encoder_dt: u8,
    pub led_strip: u8,
    pub buzzer: u8,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            lcd_rs: LCD_RS,
            lcd_en: LCD_EN,
            lcd_data: [LCD_D4, LCD_D5, LCD_D6, LCD_D7],
            encoder_clk: ENCODER_CLK,
            encoder_dt: ENCODER_DT,
            led_strip: LED_STRIP_PIN,
            buzzer: BUZZER_PIN,
        }
    }
}

impl PinMap {
    /// A pin wired to two functions.
    pub fn conflict(&self) -> Option<u8> {
        let pins = [
            self.lcd_rs,
            self.lcd_en,
            self.lcd_data[0],
            self.lcd_data[1],
            self.lcd_data[2],
            self.lcd_data[3],
            self.encoder_clk,
            self.encoder_dt,
            self.led_strip,
            self.buzzer,
        ];
        pins.iter()
            .enumerate()
            .find(|&(i, pin)| pins[i + 1..].contains(pin))
            .map(|(_, &pin)| pin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct TimingConfig {
    pub tick_period_ms: u32,
    pub lcd_refresh_ms: u32,
    pub overrun_factor: f32,
    pub default_step_seconds: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: TICK_PERIOD_MS,
            lcd_refresh_ms: LCD_REFRESH_MS,
            overrun_factor: OVERRUN_FACTOR,
            default_step_seconds: DEFAULT_STEP_SECONDS,
        }
    }
}

impl TimingConfig {
    pub fn tick_period_seconds(&self) -> f32 {
        self.tick_period_ms as f32 / 1000.0
    }

    pub fn lcd_refresh_seconds(&self) -> f32 {
        self.lcd_refresh_ms as f32 / 1000.0
    }
}

/// Thresholds of the reconciliation policy.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct ReconcileConfig {
    /// A detected note within this many cents of the expected one is a match.
    pub tolerance_cents: f32,
    /// Pitch estimates older than this are ignored.
    pub stale_after_seconds: f32,
    pub min_confidence: f32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerance_cents: TOLERANCE_CENTS,
            stale_after_seconds: STALE_AFTER_SECONDS,
            min_confidence: MIN_CONFIDENCE,
        }
    }
}

/// Everything a deployment can tune, passed to each component at construction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct PianoStripConfig {
    pub pins: PinMap,
    pub spectral: SpectralConfig,
    pub strip: StripLayout,
    pub reconcile: ReconcileConfig,
    pub timing: TimingConfig,
}

impl PianoStripConfig {
    pub fn with_pins(mut self, pins: PinMap) -> Self {
        self.pins = pins;
        self
    }

    pub fn with_spectral(mut self, spectral: SpectralConfig) -> Self {
        self.spectral = spectral;
        self
    }

    pub fn with_strip(mut self, strip: StripLayout) -> Self {
        self.strip = strip;
        self
    }

    pub fn with_reconcile(mut self, reconcile: ReconcileConfig) -> Self {
        self.reconcile = reconcile;
        self
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spectral.validate()?;
        self.strip.validate()?;
        if let Some(pin) = self.pins.conflict() {
            return Err(ConfigError::PinConflict(pin));
        }
        let timing = &self.timing;
        if timing.tick_period_ms == 0 {
            return Err(ConfigError::TickPeriod);
        }
        if timing.lcd_refresh_ms == 0 {
            return Err(ConfigError::DisplayRefresh);
        }
        if !(timing.overrun_factor >= 1.0) {
            return Err(ConfigError::OverrunFactor);
        }
        if !(timing.default_step_seconds > 0.0) || !timing.default_step_seconds.is_finite() {
            return Err(ConfigError::StepDuration);
        }
        let reconcile = &self.reconcile;
        if !(reconcile.tolerance_cents > 0.0) {
            return Err(ConfigError::Tolerance);
        }
        if !(reconcile.stale_after_seconds >= 0.0) {
            return Err(ConfigError::Staleness);
        }
        if !(0.0..=1.0).contains(&reconcile.min_confidence) {
            return Err(ConfigError::Confidence);
        }
        Ok(())
    }
}
