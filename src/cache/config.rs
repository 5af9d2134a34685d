/*!
 * Refresh Configuration
 *
 * Runtime configuration for the background refresh cadence
 */

use std::time::Duration;

/// Configuration for a [`CachedValue`](super::CachedValue)'s background refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Interval between refresh ticks
    pub period: Duration,
}

impl RefreshConfig {
    /// Default refresh period (one tick per second)
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    /// Configuration with a custom refresh period
    pub const fn with_period(period: Duration) -> Self {
        Self { period }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
        }
    }
}
