//! The backend registry: a totally ordered list of game server instances the
//! proxy forwards connections to, each with a bookkeeping record adopted from
//! the load balancer's `ServerEndpoint`.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackendHealth {
    /// Not yet probed.
    Unknown,
    Healthy,
    /// Still accepting connections but under strain; eligible for selection.
    Degraded,
    Unhealthy,
}

/// One game server instance behind the proxy.
#[derive(Clone, Debug)]
pub struct BackendEndpoint {
    pub label: String,
    pub ws_url: String,
    pub status: BackendHealth,
    pub last_check: Option<Instant>,
    pub connection_count: u32,
    pub response_time: Duration,
    pub consecutive_failures: u32,
}

impl BackendEndpoint {
    pub fn new(label: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ws_url: ws_url.into(),
            status: BackendHealth::Unknown,
            last_check: None,
            connection_count: 0,
            response_time: Duration::ZERO,
            consecutive_failures: 0,
        }
    }

    pub fn is_selectable(&self) -> bool {
        matches!(self.status, BackendHealth::Healthy | BackendHealth::Degraded)
    }
}

/// Backends in priority order (`primary`, `secondary`, …). The proxy always
/// picks the first selectable one, never load-balances by count.
pub struct BackendRegistry {
    backends: Vec<BackendEndpoint>,
}

impl BackendRegistry {
    pub fn new(backends: Vec<BackendEndpoint>) -> Self {
        Self { backends }
    }

    pub fn all(&self) -> &[BackendEndpoint] {
        &self.backends
    }

    pub fn all_mut(&mut self) -> &mut [BackendEndpoint] {
        &mut self.backends
    }

    pub fn get(&self, label: &str) -> Option<&BackendEndpoint> {
        self.backends.iter().find(|b| b.label == label)
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut BackendEndpoint> {
        self.backends.iter_mut().find(|b| b.label == label)
    }

    /// First selectable backend in priority order, excluding `exclude` if given.
    pub fn select(&self, exclude: Option<&str>) -> Option<&BackendEndpoint> {
        self.backends
            .iter()
            .filter(|b| exclude != Some(b.label.as_str()))
            .find(|b| b.is_selectable())
    }

    pub fn record_success(&mut self, label: &str, elapsed: Duration) -> bool {
        let Some(backend) = self.get_mut(label) else { return false };
        let was_healthy = backend.status == BackendHealth::Healthy;
        backend.response_time = elapsed;
        backend.last_check = Some(Instant::now());
        backend.consecutive_failures = 0;
        backend.status = BackendHealth::Healthy;
        !was_healthy
    }

    /// Records a failed probe; returns `true` if this failure just tipped the
    /// backend from healthy into unhealthy (the transition that triggers migration).
    pub fn record_failure(&mut self, label: &str, failover_threshold: u32) -> bool {
        let Some(backend) = self.get_mut(label) else { return false };
        let was_healthy = backend.status == BackendHealth::Healthy;
        backend.consecutive_failures += 1;
        backend.last_check = Some(Instant::now());
        if backend.consecutive_failures >= failover_threshold {
            backend.status = BackendHealth::Unhealthy;
        }
        was_healthy && backend.status == BackendHealth::Unhealthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_prefers_earlier_backend_in_total_order() {
        let mut primary = BackendEndpoint::new("primary", "ws://a:1");
        primary.status = BackendHealth::Healthy;
        let mut secondary = BackendEndpoint::new("secondary", "ws://b:1");
        secondary.status = BackendHealth::Healthy;
        let registry = BackendRegistry::new(vec![primary, secondary]);

        assert_eq!(registry.select(None).unwrap().label, "primary");
    }

    #[test]
    fn select_skips_unhealthy_backend() {
        let mut primary = BackendEndpoint::new("primary", "ws://a:1");
        primary.status = BackendHealth::Unhealthy;
        let mut secondary = BackendEndpoint::new("secondary", "ws://b:1");
        secondary.status = BackendHealth::Healthy;
        let registry = BackendRegistry::new(vec![primary, secondary]);

        assert_eq!(registry.select(None).unwrap().label, "secondary");
    }

    #[test]
    fn record_failure_reports_healthy_to_unhealthy_transition_once() {
        let mut registry =
            BackendRegistry::new(vec![BackendEndpoint::new("primary", "ws://a:1")]);
        registry.record_success("primary", Duration::from_millis(10));

        assert!(registry.record_failure("primary", 1));
        // Already unhealthy; this shouldn't report a fresh transition.
        assert!(!registry.record_failure("primary", 1));
    }

    #[test]
    fn no_selectable_backend_returns_none() {
        let registry =
            BackendRegistry::new(vec![BackendEndpoint::new("primary", "ws://a:1")]);
        assert!(registry.select(None).is_none());
    }
}
