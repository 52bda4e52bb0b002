//! Full-screen slideshow sequencer.
//!
//! Drives the viewer route: images dwell for the shared slide duration,
//! videos hold the slide until the host reports playback finished (or
//! failed, which also advances - a broken video must not freeze the loop).
//!
//! Nothing advances until BOTH the media list and the settings have
//! loaded; starting the timer against the default duration and then
//! switching mid-slide is exactly the stutter this gate prevents.

use core_media::MediaKind;
use std::time::Duration;

/// Tick-driven slide sequencer for the full-screen viewer.
#[derive(Debug, Clone)]
pub struct SlideshowSequencer {
    kinds: Vec<MediaKind>,
    index: usize,
    slide_duration: Duration,
    elapsed: Duration,
    media_loaded: bool,
    settings_loaded: bool,
}

impl SlideshowSequencer {
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            index: 0,
            slide_duration: Duration::from_secs(u64::from(
                core_media::SLIDE_DURATION_DEFAULT_SECS,
            )),
            elapsed: Duration::ZERO,
            media_loaded: false,
            settings_loaded: false,
        }
    }

    /// Replace the playing list with a fresh snapshot of item kinds.
    pub fn set_items(&mut self, kinds: Vec<MediaKind>) {
        self.media_loaded = true;
        if kinds.is_empty() {
            self.index = 0;
        } else {
            self.index %= kinds.len();
        }
        self.kinds = kinds;
    }

    /// Apply the loaded (or re-published) slide duration.
    pub fn set_slide_duration(&mut self, secs: u32) {
        self.settings_loaded = true;
        self.slide_duration = Duration::from_secs(u64::from(secs));
        self.elapsed = Duration::ZERO;
    }

    /// Both the media list and the settings have loaded.
    pub fn is_ready(&self) -> bool {
        self.media_loaded && self.settings_loaded
    }

    /// Index of the slide currently shown, `None` while loading or empty.
    pub fn current_index(&self) -> Option<usize> {
        if self.is_ready() && !self.kinds.is_empty() {
            Some(self.index)
        } else {
            None
        }
    }

    /// Advance time. Only image slides use the dwell timer; a video slide
    /// holds until [`video_ended`](Self::video_ended) or
    /// [`video_failed`](Self::video_failed).
    pub fn tick(&mut self, dt: Duration) {
        let Some(index) = self.current_index() else {
            return;
        };
        if self.kinds[index] == MediaKind::Video {
            return;
        }
        self.elapsed += dt;
        if self.elapsed >= self.slide_duration {
            self.advance();
        }
    }

    /// The host's video element finished playing the current slide.
    pub fn video_ended(&mut self) {
        if let Some(index) = self.current_index() {
            if self.kinds[index] == MediaKind::Video {
                self.advance();
            }
        }
    }

    /// The current video failed to play; skip it rather than stall.
    pub fn video_failed(&mut self) {
        self.video_ended();
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % self.kinds.len();
        self.elapsed = Duration::ZERO;
    }
}

impl Default for SlideshowSequencer {
    fn default() -> Self {
        Self::new()
    }
}
