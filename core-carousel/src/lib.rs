//! # Core Carousel
//!
//! The animation side of the dashboard: the looping/interacting offset
//! state machine, the decorative preview highlight, and the full-screen
//! slideshow sequencer.
//!
//! Everything here is tick-driven pure state - hosts own the frame loop
//! and the timers, which keeps suspension/resume continuity testable
//! without a wall clock.

pub mod animator;
pub mod preview;
pub mod slideshow;

pub use animator::{AnimatorConfig, AnimatorState, CarouselAnimator};
pub use preview::PreviewCycler;
pub use slideshow::SlideshowSequencer;
