use crate::engine::TickOutput;

/// Running tally of hits against the notes the song asked for.
///
/// Both counts are per song event, and an event only scores after its onset
/// was counted, so hits never exceed notes played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "logging", derive(defmt::Format))]
pub struct ScoreBoard {
    hits: u32,
    onsets: u32,
}

impl ScoreBoard {
    pub fn record(&mut self, output: &TickOutput) {
        self.hits = self.hits.saturating_add(output.scored.len() as u32);
        self.onsets = self.onsets.saturating_add(output.onsets.len() as u32);
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Notes the song has asked for so far.
    pub fn notes_played(&self) -> u32 {
        self.onsets
    }

    /// Whole percent, never above 100. Zero before the first note.
    pub fn accuracy_percent(&self) -> u8 {
        if self.onsets == 0 {
            return 0;
        }
        (self.hits as u64 * 100 / self.onsets as u64).min(100) as u8
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
