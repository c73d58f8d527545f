//! Per-session wait timeout that follows how the portal is behaving.

use std::time::Duration;

use portalbot_config::AdaptiveConfig;

/// Timeout used for element waits within one session.
///
/// Failures stretch it by `growth_factor`; a streak of `success_threshold`
/// successes shrinks it by `decay_factor`. The value never leaves
/// `[min, max]`.
#[derive(Debug, Clone)]
pub struct AdaptiveTimeout {
    current_ms: f64,
    min_ms: f64,
    max_ms: f64,
    growth_factor: f64,
    decay_factor: f64,
    success_threshold: u32,
    success_streak: u32,
    failure_streak: u32,
}

impl AdaptiveTimeout {
    pub fn new(initial: Duration, config: &AdaptiveConfig) -> Self {
        let min_ms = config.min_timeout_ms as f64;
        let max_ms = (config.max_timeout_ms as f64).max(min_ms);
        Self {
            current_ms: (initial.as_millis() as f64).clamp(min_ms, max_ms),
            min_ms,
            max_ms,
            growth_factor: config.growth_factor.max(1.0),
            decay_factor: config.decay_factor.clamp(f64::EPSILON, 1.0),
            success_threshold: config.success_threshold.max(1),
            success_streak: 0,
            failure_streak: 0,
        }
    }

    pub fn current(&self) -> Duration {
        Duration::from_millis(self.current_ms.round() as u64)
    }

    pub fn record_success(&mut self) {
        self.failure_streak = 0;
        self.success_streak += 1;
        if self.success_streak >= self.success_threshold {
            self.current_ms = (self.current_ms * self.decay_factor).max(self.min_ms);
            self.success_streak = 0;
        }
    }

    pub fn record_failure(&mut self) {
        self.success_streak = 0;
        self.failure_streak += 1;
        self.current_ms = (self.current_ms * self.growth_factor).min(self.max_ms);
    }

    pub fn success_streak(&self) -> u32 {
        self.success_streak
    }

    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn config() -> AdaptiveConfig {
        AdaptiveConfig {
            min_timeout_ms: 1_000,
            max_timeout_ms: 8_000,
            growth_factor: 2.0,
            decay_factor: 0.5,
            success_threshold: 3,
        }
    }

    #[test]
    fn initial_value_is_clamped() {
        let low = AdaptiveTimeout::new(Duration::from_millis(10), &config());
        assert_eq!(low.current(), Duration::from_millis(1_000));

        let high = AdaptiveTimeout::new(Duration::from_secs(60), &config());
        assert_eq!(high.current(), Duration::from_millis(8_000));
    }

    #[test]
    fn failures_grow_up_to_max() {
        let mut t = AdaptiveTimeout::new(Duration::from_millis(2_000), &config());
        t.record_failure();
        assert_eq!(t.current(), Duration::from_millis(4_000));
        t.record_failure();
        t.record_failure();
        assert_eq!(t.current(), Duration::from_millis(8_000));
        assert_eq!(t.failure_streak(), 3);
    }

    #[test]
    fn decay_needs_a_full_streak() {
        let mut t = AdaptiveTimeout::new(Duration::from_millis(4_000), &config());
        t.record_success();
        t.record_success();
        assert_eq!(t.current(), Duration::from_millis(4_000));
        t.record_success();
        assert_eq!(t.current(), Duration::from_millis(2_000));
        assert_eq!(t.success_streak(), 0);
    }

    #[test]
    fn failure_breaks_success_streak() {
        let mut t = AdaptiveTimeout::new(Duration::from_millis(4_000), &config());
        t.record_success();
        t.record_success();
        t.record_failure();
        assert_eq!(t.success_streak(), 0);
        t.record_success();
        t.record_success();
        assert_eq!(t.current(), Duration::from_millis(8_000));
    }

    #[test]
    fn decay_stops_at_min() {
        let mut t = AdaptiveTimeout::new(Duration::from_millis(1_500), &config());
        for _ in 0..9 {
            t.record_success();
        }
        assert_eq!(t.current(), Duration::from_millis(1_000));
    }

    /// Shipped defaults: 2s..30s, x1.5 on failure, x0.8 after 3 successes.
    #[rstest]
    #[case::three_successes_decay(10_000, 0, 3, 8_000)]
    #[case::two_successes_hold(10_000, 0, 2, 10_000)]
    #[case::two_streaks_decay_twice(10_000, 0, 6, 6_400)]
    #[case::decay_clamps_at_min(2_200, 0, 3, 2_000)]
    #[case::failure_grows(10_000, 1, 0, 15_000)]
    #[case::growth_clamps_at_max(25_000, 1, 0, 30_000)]
    #[case::max_is_sticky(30_000, 2, 0, 30_000)]
    #[case::initial_below_min(1_000, 0, 0, 2_000)]
    #[case::initial_above_max(60_000, 0, 0, 30_000)]
    fn default_config_transitions(
        #[case] initial_ms: u64,
        #[case] failures: u32,
        #[case] successes: u32,
        #[case] expected_ms: u64,
    ) {
        let mut t = AdaptiveTimeout::new(
            Duration::from_millis(initial_ms),
            &AdaptiveConfig::default(),
        );
        for _ in 0..failures {
            t.record_failure();
        }
        for _ in 0..successes {
            t.record_success();
        }
        assert_eq!(t.current(), Duration::from_millis(expected_ms));
    }
}
