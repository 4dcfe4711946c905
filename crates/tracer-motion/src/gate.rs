//! Perception gates that turn noisy per-tick readings into a single decision.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Samples a boolean predicate over a fixed window and decides by supermajority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorityVote {
    window: u32,
    min_hits: u32,
    samples: u32,
    hits: u32,
}

impl MajorityVote {
    /// Create a vote over `window` samples that needs `percent` percent hits.
    ///
    /// A zero window is treated as a window of one sample.
    pub fn new(window: u32, percent: u32) -> Self {
        let window = window.max(1);
        let percent = percent.min(100);
        // At most `window`, so it always fits back into a u32.
        let min_hits = (u64::from(window) * u64::from(percent)).div_ceil(100);
        MajorityVote {
            window,
            min_hits: u32::try_from(min_hits).unwrap_or(window),
            samples: 0,
            hits: 0,
        }
    }

    /// Number of hits needed for a positive decision.
    pub fn min_hits(&self) -> u32 {
        self.min_hits
    }

    /// Hits counted so far.
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Whether the window is full and a decision is available.
    pub fn is_decided(&self) -> bool {
        self.samples >= self.window
    }

    /// Add one sample. Returns the decision once the window is full.
    ///
    /// Samples fed after the decision are ignored until [`MajorityVote::reset`].
    pub fn feed(&mut self, hit: bool) -> Option<bool> {
        if !self.is_decided() {
            self.samples += 1;
            if hit {
                self.hits += 1;
            }
        }
        self.decision()
    }

    /// The decision, if the window is full.
    pub fn decision(&self) -> Option<bool> {
        self.is_decided().then_some(self.hits >= self.min_hits)
    }

    /// Start a new window.
    pub fn reset(&mut self) {
        self.samples = 0;
        self.hits = 0;
    }
}

/// Buffer size and threshold for [`StraightnessDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StraightnessSettings {
    /// Number of turn values averaged.
    pub window: usize,
    /// Mean |turn| must be below this value.
    pub threshold: u32,
}

impl Default for StraightnessSettings {
    fn default() -> Self {
        StraightnessSettings {
            window: 100,
            threshold: 7,
        }
    }
}

/// Detects that a line-trace correction has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StraightnessDetector {
    settings: StraightnessSettings,
    turns: VecDeque<u32>,
}

impl StraightnessDetector {
    /// Create an empty detector.
    pub fn new(settings: StraightnessSettings) -> Self {
        let settings = StraightnessSettings {
            window: settings.window.max(1),
            ..settings
        };
        StraightnessDetector {
            turns: VecDeque::with_capacity(settings.window),
            settings,
        }
    }

    /// Record the turn commanded this tick.
    pub fn feed(&mut self, turn: i16) {
        if self.turns.len() == self.settings.window {
            self.turns.pop_front();
        }
        self.turns.push_back(u32::from(turn.unsigned_abs()));
    }

    /// Integer mean of the buffered |turn| values, once the buffer is full.
    pub fn mean(&self) -> Option<u32> {
        if self.turns.len() < self.settings.window {
            return None;
        }
        let sum: u32 = self.turns.iter().sum();
        Some(sum / self.turns.len() as u32)
    }

    /// Whether the robot is driving straight.
    pub fn is_straight(&self) -> bool {
        self.mean().is_some_and(|mean| mean < self.settings.threshold)
    }

    /// Empty the buffer.
    pub fn reset(&mut self) {
        self.turns.clear();
    }
}

impl Default for StraightnessDetector {
    fn default() -> Self {
        Self::new(StraightnessSettings::default())
    }
}
