//! Preview highlight cycler.
//!
//! A second, independent low-frequency timer that advances a "currently
//! previewed" index through the canonical (non-looped) list every
//! `slide_duration` seconds. Purely decorative - it drives the highlight
//! border in the editing view and touches no persisted state.

use std::time::Duration;

/// Tick-driven highlight index over the canonical list.
#[derive(Debug, Clone)]
pub struct PreviewCycler {
    slide_duration: Duration,
    item_count: usize,
    index: usize,
    elapsed: Duration,
}

impl PreviewCycler {
    pub fn new(slide_duration_secs: u32) -> Self {
        Self {
            slide_duration: Duration::from_secs(u64::from(slide_duration_secs)),
            item_count: 0,
            index: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Index of the currently highlighted canonical item.
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Follow the canonical list size; the index survives size changes
    /// modulo the new count.
    pub fn set_item_count(&mut self, count: usize) {
        self.item_count = count;
        if count == 0 {
            self.index = 0;
        } else {
            self.index %= count;
        }
    }

    /// Apply a newly published dwell time; the running countdown restarts.
    pub fn set_slide_duration(&mut self, secs: u32) {
        let duration = Duration::from_secs(u64::from(secs));
        if duration != self.slide_duration {
            self.slide_duration = duration;
            self.elapsed = Duration::ZERO;
        }
    }

    /// Advance time; highlights move every `slide_duration`.
    pub fn tick(&mut self, dt: Duration) {
        if self.item_count == 0 || self.slide_duration.is_zero() {
            return;
        }
        self.elapsed += dt;
        while self.elapsed >= self.slide_duration {
            self.elapsed -= self.slide_duration;
            self.index = (self.index + 1) % self.item_count;
        }
    }
}

impl Default for PreviewCycler {
    fn default() -> Self {
        Self::new(core_media::SLIDE_DURATION_DEFAULT_SECS)
    }
}
