//! Pointer and click classification for list rows.
//!
//! One [`GestureClassifier`] per list. Timestamps come from the shell, so the
//! classifier is deterministic and never reads a clock.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    fn matches(self, dx: f64) -> bool {
        match self {
            SwipeDirection::Right => dx > 0.0,
            SwipeDirection::Left => dx < 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwipeConfig {
    pub direction: SwipeDirection,
    /// Fraction of the row width the pointer must travel.
    pub threshold_ratio: f64,
    pub max_vertical_px: f64,
    pub max_duration_ms: u64,
    pub double_tap_ms: u64,
}

impl SwipeConfig {
    pub const fn rightward() -> Self {
        Self {
            direction: SwipeDirection::Right,
            threshold_ratio: 0.35,
            max_vertical_px: 50.0,
            max_duration_ms: 500,
            double_tap_ms: 300,
        }
    }

    pub const fn leftward() -> Self {
        Self {
            direction: SwipeDirection::Left,
            ..Self::rightward()
        }
    }
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self::rightward()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GestureIntent {
    Select(usize),
    Activate(usize),
    Swipe {
        index: usize,
        direction: SwipeDirection,
    },
}

/// What the shell should do with the current pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// Not tracking this row, or motion away from the swipe direction.
    Ignored,
    /// Mostly vertical: tracking dropped, let the list scroll.
    ScrollAbort,
    /// Horizontal in the swipe direction: suppress default scrolling.
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TrackingState {
    #[default]
    Idle,
    Tracking {
        index: usize,
        origin_x: f64,
        origin_y: f64,
        started_at_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct LastTap {
    index: usize,
    at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureClassifier {
    config: SwipeConfig,
    state: TrackingState,
    last_tap: Option<LastTap>,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(SwipeConfig::default())
    }
}

impl GestureClassifier {
    pub fn new(config: SwipeConfig) -> Self {
        Self {
            config,
            state: TrackingState::Idle,
            last_tap: None,
        }
    }

    pub fn config(&self) -> &SwipeConfig {
        &self.config
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn on_pointer_down(&mut self, index: usize, x: f64, y: f64, at_ms: u64) {
        self.state = TrackingState::Tracking {
            index,
            origin_x: x,
            origin_y: y,
            started_at_ms: at_ms,
        };
    }

    /// The vertical check runs first so a scroll is never swallowed.
    pub fn on_pointer_move(&mut self, index: usize, x: f64, y: f64) -> MoveOutcome {
        let TrackingState::Tracking {
            index: tracked,
            origin_x,
            origin_y,
            ..
        } = self.state
        else {
            return MoveOutcome::Ignored;
        };

        if tracked != index {
            return MoveOutcome::Ignored;
        }

        let dx = x - origin_x;
        let dy = y - origin_y;

        if dy.abs() > dx.abs() {
            debug!(index, dx, dy, "vertical motion, swipe aborted");
            self.state = TrackingState::Idle;
            return MoveOutcome::ScrollAbort;
        }

        if self.config.direction.matches(dx) {
            MoveOutcome::Horizontal
        } else {
            MoveOutcome::Ignored
        }
    }

    /// Finishes tracking. Always returns to idle, swipe or not.
    pub fn on_pointer_up(
        &mut self,
        index: usize,
        x: f64,
        y: f64,
        at_ms: u64,
        element_width: f64,
    ) -> Option<GestureIntent> {
        let state = std::mem::take(&mut self.state);

        let TrackingState::Tracking {
            index: tracked,
            origin_x,
            origin_y,
            started_at_ms,
        } = state
        else {
            return None;
        };

        if tracked != index || !element_width.is_finite() || element_width <= 0.0 {
            return None;
        }

        let dx = x - origin_x;
        let dy = y - origin_y;
        let elapsed = at_ms.saturating_sub(started_at_ms);
        let config = &self.config;

        let far_enough = dx.abs() > config.threshold_ratio * element_width;
        let is_swipe = far_enough
            && config.direction.matches(dx)
            && dy.abs() < config.max_vertical_px
            && elapsed < config.max_duration_ms;

        if !is_swipe {
            return None;
        }

        debug!(index, dx, elapsed, direction = ?config.direction, "swipe detected");
        Some(GestureIntent::Swipe {
            index,
            direction: config.direction,
        })
    }

    pub fn on_pointer_cancel(&mut self) {
        self.state = TrackingState::Idle;
    }

    /// Second click on the same row inside the window activates it and
    /// forgets the tap, so a third click starts over.
    pub fn on_click(&mut self, index: usize, at_ms: u64) -> GestureIntent {
        let is_double = self.last_tap.is_some_and(|last| {
            last.index == index && at_ms.saturating_sub(last.at_ms) < self.config.double_tap_ms
        });

        if is_double {
            self.last_tap = None;
            return GestureIntent::Activate(index);
        }

        self.last_tap = Some(LastTap { index, at_ms });
        GestureIntent::Select(index)
    }

    pub fn reset(&mut self) {
        self.state = TrackingState::Idle;
        self.last_tap = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f64 = 400.0;

    fn swipe(classifier: &mut GestureClassifier, dx: f64, dy: f64, dt: u64) -> Option<GestureIntent> {
        classifier.on_pointer_down(2, 100.0, 100.0, 1_000);
        classifier.on_pointer_move(2, 100.0 + dx / 2.0, 100.0 + dy / 2.0);
        classifier.on_pointer_up(2, 100.0 + dx, 100.0 + dy, 1_000 + dt, WIDTH)
    }

    mod swipe_tests {
        use super::*;

        #[test]
        fn test_rightward_list_detects_right_swipe() {
            let mut c = GestureClassifier::new(SwipeConfig::rightward());
            assert_eq!(
                swipe(&mut c, 0.5 * WIDTH, 10.0, 200),
                Some(GestureIntent::Swipe {
                    index: 2,
                    direction: SwipeDirection::Right,
                })
            );
            assert_eq!(c.state(), TrackingState::Idle);
        }

        #[test]
        fn test_leftward_list_ignores_right_swipe() {
            let mut c = GestureClassifier::new(SwipeConfig::leftward());
            assert_eq!(swipe(&mut c, 0.5 * WIDTH, 10.0, 200), None);
            assert_eq!(c.state(), TrackingState::Idle);
        }

        #[test]
        fn test_leftward_list_detects_left_swipe() {
            let mut c = GestureClassifier::new(SwipeConfig::leftward());
            assert_eq!(
                swipe(&mut c, -0.5 * WIDTH, 0.0, 100),
                Some(GestureIntent::Swipe {
                    index: 2,
                    direction: SwipeDirection::Left,
                })
            );
        }

        #[test]
        fn test_thresholds() {
            let mut c = GestureClassifier::default();
            assert_eq!(swipe(&mut c, 0.3 * WIDTH, 0.0, 100), None, "too short");
            assert_eq!(swipe(&mut c, 0.5 * WIDTH, 30.0, 500), None, "too slow");
            assert!(swipe(&mut c, 0.5 * WIDTH, 30.0, 499).is_some());
        }

        #[test]
        fn test_vertical_drift_at_release_rejected() {
            let mut c = GestureClassifier::default();
            c.on_pointer_down(0, 0.0, 0.0, 0);
            assert_eq!(c.on_pointer_up(0, 300.0, 50.0, 100, WIDTH), None);
        }

        #[test]
        fn test_vertical_move_aborts_tracking() {
            let mut c = GestureClassifier::default();
            c.on_pointer_down(1, 0.0, 0.0, 0);
            assert_eq!(c.on_pointer_move(1, 5.0, 40.0), MoveOutcome::ScrollAbort);
            assert_eq!(c.state(), TrackingState::Idle);
            assert_eq!(c.on_pointer_up(1, 300.0, 0.0, 100, WIDTH), None);
        }

        #[test]
        fn test_move_outcomes() {
            let mut c = GestureClassifier::new(SwipeConfig::leftward());
            assert_eq!(c.on_pointer_move(0, 10.0, 0.0), MoveOutcome::Ignored);

            c.on_pointer_down(0, 100.0, 0.0, 0);
            assert_eq!(c.on_pointer_move(1, 50.0, 0.0), MoveOutcome::Ignored);
            assert_eq!(c.on_pointer_move(0, 150.0, 0.0), MoveOutcome::Ignored);
            assert_eq!(c.on_pointer_move(0, 50.0, 0.0), MoveOutcome::Horizontal);
        }

        #[test]
        fn test_release_on_other_row_is_discarded() {
            let mut c = GestureClassifier::default();
            c.on_pointer_down(0, 0.0, 0.0, 0);
            assert_eq!(c.on_pointer_up(1, 300.0, 0.0, 100, WIDTH), None);
            assert_eq!(c.state(), TrackingState::Idle);
        }

        #[test]
        fn test_bad_width_never_swipes() {
            let mut c = GestureClassifier::default();
            c.on_pointer_down(0, 0.0, 0.0, 0);
            assert_eq!(c.on_pointer_up(0, 300.0, 0.0, 100, 0.0), None);
            c.on_pointer_down(0, 0.0, 0.0, 0);
            assert_eq!(c.on_pointer_up(0, 300.0, 0.0, 100, f64::NAN), None);
        }

        #[test]
        fn test_cancel_resets() {
            let mut c = GestureClassifier::default();
            c.on_pointer_down(0, 0.0, 0.0, 0);
            c.on_pointer_cancel();
            assert_eq!(c.on_pointer_up(0, 300.0, 0.0, 100, WIDTH), None);
        }
    }

    mod click_tests {
        use super::*;

        #[test]
        fn test_double_click_selects_then_activates() {
            let mut c = GestureClassifier::default();
            assert_eq!(c.on_click(4, 1_000), GestureIntent::Select(4));
            assert_eq!(c.on_click(4, 1_250), GestureIntent::Activate(4));
            assert_eq!(c.on_click(4, 1_300), GestureIntent::Select(4));
        }

        #[test]
        fn test_slow_second_click_selects() {
            let mut c = GestureClassifier::default();
            c.on_click(4, 1_000);
            assert_eq!(c.on_click(4, 1_300), GestureIntent::Select(4));
        }

        #[test]
        fn test_click_on_other_row_selects() {
            let mut c = GestureClassifier::default();
            c.on_click(4, 1_000);
            assert_eq!(c.on_click(5, 1_100), GestureIntent::Select(5));
            assert_eq!(c.on_click(5, 1_200), GestureIntent::Activate(5));
        }

        #[test]
        fn test_clicks_independent_of_tracking() {
            let mut c = GestureClassifier::default();
            c.on_pointer_down(1, 0.0, 0.0, 0);
            assert_eq!(c.on_click(1, 10), GestureIntent::Select(1));
            assert!(matches!(c.state(), TrackingState::Tracking { index: 1, .. }));
        }
    }
}
