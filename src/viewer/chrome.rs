//! Auto-hiding of the overview map and zoom slider.
//!
//! After a move ends both elements wait [`FADE_DELAY_MS`], then fade out in
//! steps of [`FADE_STEP_MS`], losing [`FADE_DECAY`] of their opacity per
//! step until they drop to [`FADE_HIDE_THRESHOLD`] and are hidden.
//! Interacting with either element pins them fully opaque.

use std::time::Duration;
use web_time::Instant;

use crate::constants::chrome::{FADE_DECAY, FADE_DELAY_MS, FADE_HIDE_THRESHOLD, FADE_STEP_MS};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Fully opaque, no timer running.
    Pinned,
    /// Opaque until the deadline.
    Waiting { deadline: Instant },
    Fading { opacity: f64, next_step: Instant },
    Hidden,
}

/// Fade state shared by the overview map and the zoom slider.
#[derive(Debug, Clone)]
pub struct ChromeFade {
    phase: Phase,
}

impl Default for ChromeFade {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromeFade {
    pub fn new() -> Self {
        Self {
            phase: Phase::Pinned,
        }
    }

    /// Show fully and cancel any pending fade.
    pub fn pin(&mut self) -> (f64, bool) {
        self.phase = Phase::Pinned;
        (1.0, true)
    }

    /// Hide at once.
    pub fn hide(&mut self) -> (f64, bool) {
        self.phase = Phase::Hidden;
        (0.0, false)
    }

    /// Restart the delay before fading.
    pub fn schedule(&mut self, now: Instant) {
        self.phase = Phase::Waiting {
            deadline: now + Duration::from_millis(FADE_DELAY_MS),
        };
    }

    pub fn is_hidden(&self) -> bool {
        self.phase == Phase::Hidden
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Waiting { .. } | Phase::Fading { .. })
    }

    /// Advance to `now`. Returns the new `(opacity, visible)` when it
    /// changed.
    pub fn tick(&mut self, now: Instant) -> Option<(f64, bool)> {
        let step = Duration::from_millis(FADE_STEP_MS);
        if let Phase::Waiting { deadline } = self.phase {
            if now < deadline {
                return None;
            }
            self.phase = Phase::Fading {
                opacity: 1.0,
                next_step: deadline + step,
            };
        }
        let Phase::Fading {
            mut opacity,
            mut next_step,
        } = self.phase
        else {
            return None;
        };

        let mut changed = None;
        while now >= next_step {
            if opacity <= FADE_HIDE_THRESHOLD {
                return Some(self.hide());
            }
            changed = Some((opacity, true));
            opacity -= opacity * FADE_DECAY;
            next_step += step;
        }
        self.phase = Phase::Fading { opacity, next_step };
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_waits_before_fading() {
        let start = Instant::now();
        let mut fade = ChromeFade::new();
        fade.schedule(start);
        assert_eq!(fade.tick(start + ms(2400)), None);
        assert!(fade.is_pending());
    }

    #[test]
    fn test_fades_then_hides() {
        let start = Instant::now();
        let mut fade = ChromeFade::new();
        fade.schedule(start);

        assert_eq!(fade.tick(start + ms(2550)), Some((1.0, true)));
        let (opacity, visible) = fade.tick(start + ms(2600)).unwrap();
        assert!(visible);
        assert!((opacity - 0.88).abs() < 1e-9);

        assert_eq!(fade.tick(start + ms(5000)), Some((0.0, false)));
        assert!(fade.is_hidden());
        assert_eq!(fade.tick(start + ms(6000)), None);
    }

    #[test]
    fn test_pin_cancels_fade() {
        let start = Instant::now();
        let mut fade = ChromeFade::new();
        fade.schedule(start);
        assert_eq!(fade.pin(), (1.0, true));
        assert_eq!(fade.tick(start + ms(10_000)), None);
        assert!(!fade.is_hidden());
    }
}
