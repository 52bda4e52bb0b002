//! # Carousel Animator
//!
//! Drives the continuously translating horizontal offset over the loop
//! list.
//!
//! ## State machine
//!
//! Two states, explicit by design:
//!
//! - **Looping** (default): the offset advances linearly from its current
//!   value toward minus one full list-width, then wraps seamlessly and
//!   repeats. The full cycle takes `item_count * per_item_secs`, so pacing
//!   per item is fixed regardless of how much media is loaded.
//! - **Interacting**: any user action that could invalidate positions
//!   (drag, delete, upload) suspends looping. The offset is eased toward
//!   its value at suspension with a damped spring - never a discrete jump -
//!   so resuming afterwards starts from a visually continuous position.
//!
//! Transitions are event-driven from the outside (`begin_interaction` /
//! `resume_looping`, wired to `InteractionEvent`s) and timer-driven on the
//! inside: after the loop list is (re)built, a short rebuild-settle must
//! elapse before any motion, because measurement-dependent distances are
//! meaningless until the duplicated content has laid out.
//!
//! The animator is pure tick-based state: hosts call [`CarouselAnimator::tick`]
//! from their frame loop and read [`CarouselAnimator::offset`]. No wall
//! clock is consulted, which keeps every property testable.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Tuning for the carousel animation.
#[derive(Debug, Clone)]
pub struct AnimatorConfig {
    /// Rendered card width in pixels.
    pub item_width: f64,
    /// Gap between cards in pixels.
    pub item_gap: f64,
    /// Seconds each item contributes to a full cycle.
    pub per_item_secs: f64,
    /// Pause after a loop-list rebuild before motion resumes, giving the
    /// duplicated content time to lay out before distances are measured.
    pub rebuild_settle: Duration,
    /// Spring stiffness for the interaction ease.
    pub spring_stiffness: f64,
    /// Spring damping for the interaction ease.
    pub spring_damping: f64,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            item_width: 200.0,
            item_gap: 16.0,
            per_item_secs: 5.0,
            rebuild_settle: Duration::from_millis(200),
            spring_stiffness: 100.0,
            spring_damping: 20.0,
        }
    }
}

/// Animation state of the carousel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimatorState {
    /// Advancing continuously through the loop list.
    Looping,
    /// Suspended while the operator interacts; easing to rest.
    Interacting,
}

/// Tick-driven carousel offset animator.
#[derive(Debug)]
pub struct CarouselAnimator {
    config: AnimatorConfig,
    state: AnimatorState,
    /// Horizontal translation in pixels; always in `[-list_width, 0]`.
    offset: f64,
    /// Spring velocity, only meaningful while Interacting.
    velocity: f64,
    /// Resting position the spring eases toward.
    spring_target: f64,
    item_count: usize,
    rebuild_settle_remaining: Option<Duration>,
}

impl CarouselAnimator {
    pub fn new(config: AnimatorConfig) -> Self {
        Self {
            config,
            state: AnimatorState::Looping,
            offset: 0.0,
            velocity: 0.0,
            spring_target: 0.0,
            item_count: 0,
            rebuild_settle_remaining: None,
        }
    }

    pub fn state(&self) -> AnimatorState {
        self.state
    }

    /// Current horizontal offset in pixels (zero or negative).
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Width of one copy of the list: `count * (item_width + item_gap)`.
    pub fn list_width(&self) -> f64 {
        self.item_count as f64 * (self.config.item_width + self.config.item_gap)
    }

    /// Seconds one full cycle takes at the fixed per-item pacing.
    pub fn cycle_secs(&self) -> f64 {
        self.item_count as f64 * self.config.per_item_secs
    }

    /// Whether motion is currently possible: looping, non-empty, and past
    /// the rebuild settle.
    pub fn is_animating(&self) -> bool {
        self.state == AnimatorState::Looping
            && self.item_count > 0
            && self.rebuild_settle_remaining.is_none()
    }

    /// Inform the animator that the loop list was rebuilt with `count`
    /// canonical items.
    ///
    /// Arms the rebuild settle and clamps the offset into the new list
    /// width; animating before the settle elapses would measure stale
    /// layout and jump visibly.
    pub fn set_item_count(&mut self, count: usize) {
        if count == self.item_count {
            return;
        }
        debug!(count, "loop list rebuilt");
        self.item_count = count;

        if count == 0 {
            self.offset = 0.0;
            self.velocity = 0.0;
            self.rebuild_settle_remaining = None;
            return;
        }

        self.offset = self.offset.clamp(-self.list_width(), 0.0);
        self.spring_target = self.spring_target.clamp(-self.list_width(), 0.0);
        self.rebuild_settle_remaining = Some(self.config.rebuild_settle);
    }

    /// Suspend looping for a user interaction.
    ///
    /// The spring target is the offset at suspension, and the current
    /// linear velocity carries into the spring so deceleration is smooth
    /// rather than an instant stop.
    pub fn begin_interaction(&mut self) {
        if self.state == AnimatorState::Interacting {
            return;
        }
        self.state = AnimatorState::Interacting;
        self.spring_target = self.offset;
        self.velocity = if self.is_ready_for_motion() {
            -self.linear_speed()
        } else {
            0.0
        };
    }

    /// Resume looping from the current (eased) offset.
    ///
    /// Called once the interaction's settle delay has elapsed; the offset
    /// continues linearly from wherever the spring left it.
    pub fn resume_looping(&mut self) {
        if self.state == AnimatorState::Looping {
            return;
        }
        self.state = AnimatorState::Looping;
        self.velocity = 0.0;
        self.offset = self.offset.min(0.0);
    }

    /// Advance the animation by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        if self.item_count == 0 {
            return;
        }

        // Rebuild settle consumes ticks before any motion.
        if let Some(remaining) = self.rebuild_settle_remaining {
            if remaining > dt {
                self.rebuild_settle_remaining = Some(remaining - dt);
                return;
            }
            self.rebuild_settle_remaining = None;
            return;
        }

        let dt_secs = dt.as_secs_f64();
        match self.state {
            AnimatorState::Looping => {
                let width = self.list_width();
                self.offset -= self.linear_speed() * dt_secs;
                // Seamless wrap: the remainder carries over so there is no
                // visible pause at the seam.
                while self.offset <= -width {
                    self.offset += width;
                }
            }
            AnimatorState::Interacting => {
                let displacement = self.offset - self.spring_target;
                let acceleration = -self.config.spring_stiffness * displacement
                    - self.config.spring_damping * self.velocity;
                self.velocity += acceleration * dt_secs;
                self.offset += self.velocity * dt_secs;
            }
        }
    }

    fn linear_speed(&self) -> f64 {
        // width / cycle = (item_width + item_gap) / per_item_secs
        (self.config.item_width + self.config.item_gap) / self.config.per_item_secs
    }

    fn is_ready_for_motion(&self) -> bool {
        self.item_count > 0 && self.rebuild_settle_remaining.is_none()
    }
}

impl Default for CarouselAnimator {
    fn default() -> Self {
        Self::new(AnimatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn ticked(animator: &mut CarouselAnimator, total_ms: u64, step_ms: u64) {
        let mut elapsed = 0;
        while elapsed < total_ms {
            animator.tick(Duration::from_millis(step_ms));
            elapsed += step_ms;
        }
    }

    fn ready_animator(count: usize) -> CarouselAnimator {
        let mut animator = CarouselAnimator::default();
        animator.set_item_count(count);
        // Consume the rebuild settle.
        animator.tick(Duration::from_millis(200));
        animator
    }

    #[test]
    fn test_empty_list_never_moves() {
        let mut animator = CarouselAnimator::default();
        ticked(&mut animator, 5_000, 16);
        assert_eq!(animator.offset(), 0.0);
        assert!(!animator.is_animating());
    }

    #[test]
    fn test_rebuild_settle_gates_motion() {
        let mut animator = CarouselAnimator::default();
        animator.set_item_count(3);

        assert!(!animator.is_animating());
        animator.tick(Duration::from_millis(100));
        assert_eq!(animator.offset(), 0.0, "no motion during settle");

        animator.tick(Duration::from_millis(150));
        assert_eq!(animator.offset(), 0.0, "the settling tick itself is consumed");
        assert!(animator.is_animating());

        animator.tick(Duration::from_millis(100));
        assert!(animator.offset() < 0.0);
    }

    #[test]
    fn test_linear_pacing_is_fixed_per_item() {
        // (200 + 16) / 5 s = 43.2 px/s regardless of count.
        let mut three = ready_animator(3);
        let mut seven = ready_animator(7);

        three.tick(Duration::from_secs(1));
        seven.tick(Duration::from_secs(1));

        assert!((three.offset() + 43.2).abs() < EPS);
        assert!((seven.offset() + 43.2).abs() < EPS);
    }

    #[test]
    fn test_cycle_duration_scales_with_count() {
        let animator = ready_animator(4);
        assert!((animator.cycle_secs() - 20.0).abs() < EPS);
        assert!((animator.list_width() - 864.0).abs() < EPS);
    }

    #[test]
    fn test_wraparound_is_seamless() {
        let mut animator = ready_animator(2);
        let width = animator.list_width();

        // One full cycle in 10 ms steps; the offset must wrap, not stick.
        let cycle_ms = (animator.cycle_secs() * 1000.0) as u64;
        ticked(&mut animator, cycle_ms, 10);

        assert!(animator.offset() > -width);
        assert!(animator.offset() <= 0.0);
        // Remainder carried through the seam: close to zero but moving.
        assert!(animator.offset().abs() < width / 10.0);
    }

    #[test]
    fn test_interaction_suspends_without_jump() {
        let mut animator = ready_animator(3);
        ticked(&mut animator, 2_000, 16);
        let before = animator.offset();

        animator.begin_interaction();
        assert_eq!(animator.state(), AnimatorState::Interacting);
        assert_eq!(animator.offset(), before, "suspension itself moves nothing");

        // The spring decelerates smoothly: no tick may move farther than
        // the linear motion would have.
        let mut previous = animator.offset();
        for _ in 0..200 {
            animator.tick(Duration::from_millis(16));
            let delta = (animator.offset() - previous).abs();
            assert!(delta <= 43.2 * 0.016 + EPS, "spring overshoot: {}", delta);
            previous = animator.offset();
        }

        // And it converges back to the suspension offset.
        assert!((animator.offset() - before).abs() < 0.5);
    }

    #[test]
    fn test_resume_continues_from_current_offset() {
        let mut animator = ready_animator(3);
        ticked(&mut animator, 2_000, 16);

        animator.begin_interaction();
        ticked(&mut animator, 1_000, 16);
        let rest = animator.offset();

        animator.resume_looping();
        assert_eq!(animator.state(), AnimatorState::Looping);
        assert_eq!(animator.offset(), rest, "no snap on resume");

        animator.tick(Duration::from_secs(1));
        assert!((animator.offset() - (rest - 43.2)).abs() < EPS);
    }

    #[test]
    fn test_item_count_change_rearms_settle_and_clamps() {
        let mut animator = ready_animator(5);
        ticked(&mut animator, 20_000, 16);
        assert!(animator.offset() < 0.0);

        // Shrinking to one item clamps the offset into the new width.
        animator.set_item_count(1);
        assert!(animator.offset() >= -animator.list_width());
        assert!(!animator.is_animating(), "settle re-armed after rebuild");

        animator.set_item_count(0);
        assert_eq!(animator.offset(), 0.0);
    }

    #[test]
    fn test_duplicate_transitions_are_noops() {
        let mut animator = ready_animator(2);
        animator.begin_interaction();
        let target = animator.offset();
        ticked(&mut animator, 500, 16);

        // A second Started while already interacting must not retarget.
        animator.begin_interaction();
        ticked(&mut animator, 2_000, 16);
        assert!((animator.offset() - target).abs() < 0.5);

        animator.resume_looping();
        animator.resume_looping();
        assert_eq!(animator.state(), AnimatorState::Looping);
    }
}
