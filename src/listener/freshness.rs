//! Request/observation freshness check.

use std::time::Duration;

/// Maximum allowed distance between a request's timestamp and the
/// observation used to answer it: `2 × poll_interval + slack`, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    max_skew_secs: u64,
}

impl FreshnessWindow {
    pub fn new(poll_interval: Duration, slack: Duration) -> Self {
        let poll = poll_interval.as_secs();
        Self {
            max_skew_secs: poll.saturating_mul(2).saturating_add(slack.as_secs()),
        }
    }

    pub fn max_skew_secs(&self) -> u64 {
        self.max_skew_secs
    }

    /// Whether an observation taken at `observed_at` may answer a request
    /// stamped `requested_at`. Either may be the later one.
    pub fn admits(&self, requested_at: u64, observed_at: u64) -> bool {
        requested_at.abs_diff(observed_at) <= self.max_skew_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> FreshnessWindow {
        FreshnessWindow::new(Duration::from_secs(10), Duration::from_secs(5))
    }

    #[test]
    fn test_window_size() {
        assert_eq!(window().max_skew_secs(), 25);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let window = window();
        assert!(window.admits(125, 100));
        assert!(window.admits(75, 100));
        assert!(!window.admits(126, 100));
        assert!(!window.admits(74, 100));
    }

    #[test]
    fn test_request_far_from_observation() {
        let window = window();
        assert!(window.admits(108, 100));
        assert!(!window.admits(200, 100));
    }
}
