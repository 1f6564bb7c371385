//! The Edge Proxy: a stateless WebSocket load balancer that sits in front of
//! one or more `hokm_server` backends.
//!
//! Health-checks every backend on an interval and, the moment one goes
//! unhealthy, sends each affected client a `server_migration` frame and
//! rewires its forwarding loop to the next healthy backend — without the
//! client having to reconnect from scratch.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Error;
use hokm_core::proxy::backend::BackendEndpoint;
use hokm_core::proxy::{BackendRegistry, ProxyConfig};
use hokm_core::proxy::health;
use hokm_core::proxy::session::{ProxySession, ReconnectTracker};
use pico_args::Arguments;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};

const HELP: &str = "\
Run the Hokm edge proxy

USAGE:
  edge_proxy [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Proxy listen address           [default: env PROXY_BIND or 127.0.0.1:6900]
  --backend    LABEL=URL   Backend to register; repeatable [default: env PROXY_BACKENDS, comma-separated label=url pairs]

FLAGS:
  -h, --help               Print help information
";

/// One slot per currently-connected client: the channel the health loop
/// signals on, and the backend label the session is presently bound to.
struct SessionSlot {
    migrate_tx: mpsc::Sender<()>,
    backend_cell: Arc<Mutex<Option<String>>>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: String = pargs
        .value_from_str("--bind")
        .ok()
        .or_else(|| std::env::var("PROXY_BIND").ok())
        .unwrap_or_else(|| "127.0.0.1:6900".to_string());

    let mut backend_args: Vec<String> = Vec::new();
    while let Ok(pair) = pargs.value_from_str::<_, String>("--backend") {
        backend_args.push(pair);
    }
    if backend_args.is_empty() {
        if let Ok(env_backends) = std::env::var("PROXY_BACKENDS") {
            backend_args.extend(env_backends.split(',').map(|s| s.to_string()));
        }
    }
    let backends: Vec<BackendEndpoint> = backend_args
        .iter()
        .filter_map(|pair| {
            let (label, url) = pair.split_once('=')?;
            Some(BackendEndpoint::new(label.trim(), url.trim()))
        })
        .collect();
    if backends.is_empty() {
        anyhow::bail!(
            "no backends configured; pass --backend label=ws://host:port or set PROXY_BACKENDS"
        );
    }

    let config = ProxyConfig::default();
    let registry = Arc::new(Mutex::new(BackendRegistry::new(backends)));
    let reconnects = Arc::new(Mutex::new(ReconnectTracker::default()));
    let sessions: Arc<Mutex<HashMap<String, SessionSlot>>> = Arc::new(Mutex::new(HashMap::new()));

    // Health loop: probes every backend on `health_check_interval` and
    // reports labels that just went unhealthy so we can migrate their clients.
    let (migration_tx, mut migration_rx) = mpsc::channel::<String>(32);
    tokio::spawn(health::run_loop(registry.clone(), config, migration_tx));

    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            while let Some(unhealthy_label) = migration_rx.recv().await {
                let slots = sessions.lock().await;
                for slot in slots.values() {
                    let bound_to = slot.backend_cell.lock().await.clone();
                    if bound_to.as_deref() == Some(unhealthy_label.as_str()) {
                        let _ = slot.migrate_tx.send(()).await;
                    }
                }
            }
        });
    }

    let listener = TcpListener::bind(&bind).await?;
    log::info!("edge proxy listening on {bind}");

    let mut next_client_id: u64 = 0;
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("proxy: accept failed: {err}");
                continue;
            }
        };

        next_client_id += 1;
        let client_id = format!("client-{next_client_id}");
        log::info!("proxy: accepted {peer_addr} as {client_id}");

        let registry = registry.clone();
        let reconnects = reconnects.clone();
        let sessions = sessions.clone();
        let config = config;

        tokio::spawn(async move {
            let ws = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(err) => {
                    log::warn!("proxy: websocket handshake with {client_id} failed: {err}");
                    return;
                }
            };

            let (migrate_tx, migrate_rx) = mpsc::channel(1);
            let backend_cell = Arc::new(Mutex::new(None));
            sessions.lock().await.insert(
                client_id.clone(),
                SessionSlot { migrate_tx, backend_cell: backend_cell.clone() },
            );

            let mut session =
                ProxySession::new(client_id.clone(), migrate_rx).with_backend_cell(backend_cell);
            if let Err(err) = session.run(ws, &registry, &config, &reconnects).await {
                log::warn!("proxy: session {client_id} ended: {err}");
            }

            sessions.lock().await.remove(&client_id);
        });
    }
}
