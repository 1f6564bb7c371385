//! Periodic backend health checking.
//!
//! Mirrors the load balancer's `health_check_server`: open a probe
//! connection, send a `health_check` frame, and treat any response (or even
//! just a successful connect) within the timeout as healthy.

use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::backend::BackendRegistry;
use super::config::ProxyConfig;
use crate::net::ClientFrame;

/// Probes every backend once. Returns the labels of backends that just
/// transitioned from healthy to unhealthy on this pass, i.e. those needing migration.
pub async fn check_all(registry: &Mutex<BackendRegistry>, config: &ProxyConfig) -> Vec<String> {
    let labels: Vec<String> =
        registry.lock().await.all().iter().map(|b| b.label.clone()).collect();

    let mut newly_unhealthy = Vec::new();
    for label in labels {
        let ws_url = registry
            .lock()
            .await
            .get(&label)
            .map(|b| b.ws_url.clone())
            .expect("label came from the registry we're iterating");

        match probe(&ws_url, config).await {
            Ok(elapsed) => {
                let recovered = registry.lock().await.record_success(&label, elapsed);
                if recovered {
                    log::info!("proxy: backend {label} is healthy again");
                }
            }
            Err(err) => {
                log::warn!("proxy: health check for backend {label} failed: {err}");
                let transitioned =
                    registry.lock().await.record_failure(&label, config.failover_threshold);
                if transitioned {
                    log::error!("proxy: backend {label} marked unhealthy, migrating connections");
                    newly_unhealthy.push(label);
                }
            }
        }
    }
    newly_unhealthy
}

async fn probe(ws_url: &str, config: &ProxyConfig) -> Result<std::time::Duration, String> {
    let start = Instant::now();
    let connect = timeout(config.probe_timeout, connect_async(ws_url));
    let (mut stream, _) = connect
        .await
        .map_err(|_| "connect timed out".to_string())?
        .map_err(|e| e.to_string())?;

    let probe_frame = ClientFrame::HealthCheck { timestamp: 0.0 };
    let payload = serde_json::to_string(&probe_frame).map_err(|e| e.to_string())?;
    stream.send(Message::text(payload)).await.map_err(|e| e.to_string())?;

    // Any response (or a clean timeout waiting for one) still proves the
    // connection is live; only a hard error counts as a failed probe.
    let _ = timeout(config.probe_timeout, stream.next()).await;
    let _ = stream.close(None).await;

    Ok(start.elapsed())
}

/// Runs `check_all` on `config.health_check_interval`, forwarding the labels
/// of newly unhealthy backends to `migrations` for the session manager to act on.
pub async fn run_loop(
    registry: Arc<Mutex<BackendRegistry>>,
    config: ProxyConfig,
    migrations: mpsc::Sender<String>,
) {
    let mut ticker = tokio::time::interval(config.health_check_interval);
    loop {
        ticker.tick().await;
        for label in check_all(&registry, &config).await {
            if migrations.send(label).await.is_err() {
                log::warn!("proxy: migration channel closed, stopping health loop");
                return;
            }
        }
    }
}
