//! Tunables for the Edge Proxy, mirroring [`crate::data::CircuitBreakerConfig`]'s
//! shape: one `Config` struct, a sane `Default`.

use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub struct ProxyConfig {
    /// How often each backend is health-checked.
    pub health_check_interval: Duration,
    /// How long a single health probe may take before it counts as a failure.
    pub probe_timeout: Duration,
    /// Consecutive failed probes before a backend is marked unhealthy.
    pub failover_threshold: u32,
    /// Migration attempts allowed per client within `reconnect_window`.
    pub max_reconnect_attempts: u32,
    /// Sliding window the reconnect attempt count is measured over.
    pub reconnect_window: Duration,
    /// Minimum spacing enforced between two migration attempts for one client.
    pub min_reconnect_interval: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(3),
            failover_threshold: 1,
            max_reconnect_attempts: 3,
            reconnect_window: Duration::from_secs(60),
            min_reconnect_interval: Duration::from_secs(5),
        }
    }
}
