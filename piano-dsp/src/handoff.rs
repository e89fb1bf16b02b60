use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};

#[cfg(feature = "logging")]
use defmt::{trace, warn};

use crate::config::SpectralConfig;
use crate::sample_buffer::{Sample, SampleBuffer, SampleWindow};

/// Single-slot handoff between the sampling producer and the coordination tick.
///
/// Publishing replaces a window the consumer has not taken yet, so a slow
/// consumer only ever sees the most recent audio.
pub struct WindowHandoff {
    signal: Signal<CriticalSectionRawMutex, SampleWindow>,
}

impl WindowHandoff {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    pub fn publish(&self, window: SampleWindow) {
        self.signal.signal(window);
    }

    /// Non-blocking; `None` when no new window completed since the last take.
    pub fn try_take(&self) -> Option<SampleWindow> {
        self.signal.try_take()
    }

    pub fn has_window(&self) -> bool {
        self.signal.signaled()
    }

    /// Drops a pending window.
    pub fn clear(&self) {
        self.signal.reset();
    }
}

impl Default for WindowHandoff {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct SamplerStats {
    pub samples: u32,
    pub windows_published: u32,
    /// Windows replaced before the consumer took them.
    pub overruns: u32,
}

/// Producer side: owns the [`SampleBuffer`] exclusively and publishes every
/// completed window through a [`WindowHandoff`].
pub struct Sampler<'a> {
    buffer: SampleBuffer,
    next_index: u32,
    handoff: &'a WindowHandoff,
    stats: SamplerStats,
}

impl<'a> Sampler<'a> {
    pub fn new(config: &SpectralConfig, handoff: &'a WindowHandoff) -> Self {
        Self {
            buffer: SampleBuffer::new(config),
            next_index: 0,
            handoff,
            stats: SamplerStats::default(),
        }
    }

    /// Records one reading. Returns `true` when it completed a window.
    pub fn on_sample(&mut self, value: i16) -> bool {
        let sample = Sample::new(self.next_index, value);
        self.next_index = self.next_index.wrapping_add(1);
        self.stats.samples = self.stats.samples.wrapping_add(1);

        // A full buffer is drained right below, so the push always has room.
        if self.buffer.push(sample).is_err() || !self.buffer.is_full() {
            return false;
        }
        match self.buffer.drain_full() {
            Ok(window) => {
                if self.handoff.has_window() {
                    // The tick never took the previous window.
                    self.stats.overruns = self.stats.overruns.wrapping_add(1);
                    #[cfg(feature = "logging")]
                    warn!("window overrun, replacing unconsumed window");
                }
                #[cfg(feature = "logging")]
                trace!("publishing window starting at {}", window.first_index());
                self.handoff.publish(window);
                self.stats.windows_published = self.stats.windows_published.wrapping_add(1);
                true
            }
            Err(_) => false,
        }
    }

    /// Forgets any partially collected audio, e.g. when playback stops.
    pub fn reset(&mut self) {
        self.buffer.discard();
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SpectralConfig {
        SpectralConfig::default().with_fft_samples(16)
    }

    #[test]
    fn test_sampler_publishes_full_windows() {
        let handoff = WindowHandoff::new();
        let mut sampler = Sampler::new(&small_config(), &handoff);

        for i in 0..15 {
            assert!(!sampler.on_sample(i));
        }
        assert!(!handoff.has_window());
        assert!(sampler.on_sample(15));
        assert!(handoff.has_window());

        let window = handoff.try_take().unwrap();
        assert_eq!(window.len(), 16);
        assert_eq!(window.first_index(), 0);
        assert_eq!(window.values()[15], 15);
        assert!(handoff.try_take().is_none());
        assert_eq!(sampler.pending(), 0);
    }

    #[test]
    fn test_unconsumed_window_is_replaced_by_newer_one() {
        let handoff = WindowHandoff::new();
        let mut sampler = Sampler::new(&small_config(), &handoff);
        for i in 0..32 {
            sampler.on_sample(i);
        }
        let window = handoff.try_take().unwrap();
        assert_eq!(window.first_index(), 16);
        assert_eq!(sampler.stats().windows_published, 2);
        assert_eq!(sampler.stats().overruns, 1);
    }

    #[test]
    fn test_consumed_windows_are_not_overruns() {
        let handoff = WindowHandoff::new();
        let mut sampler = Sampler::new(&small_config(), &handoff);
        for i in 0..48 {
            if sampler.on_sample(i) {
                assert!(handoff.try_take().is_some());
            }
        }
        let stats = sampler.stats();
        assert_eq!(stats.samples, 48);
        assert_eq!(stats.windows_published, 3);
        assert_eq!(stats.overruns, 0);
    }

    #[test]
    fn test_reset_drops_partial_window() {
        let handoff = WindowHandoff::new();
        let mut sampler = Sampler::new(&small_config(), &handoff);
        for i in 0..10 {
            sampler.on_sample(i);
        }
        sampler.reset();
        assert_eq!(sampler.pending(), 0);
        for i in 0..15 {
            sampler.on_sample(i);
        }
        assert!(!handoff.has_window());
    }

    #[test]
    fn test_clear_discards_pending_window() {
        let handoff = WindowHandoff::new();
        handoff.publish(SampleWindow::from_values(0, &[1, 2, 3]).unwrap());
        handoff.clear();
        assert!(handoff.try_take().is_none());
    }
}
