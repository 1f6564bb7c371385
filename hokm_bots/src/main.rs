//! Headless Hokm bots for load and soak testing a running server.
//!
//! Spawns `--count` bots and drives them concurrently over the WebSocket
//! gateway — each authenticates with its own `auth` frame, which provisions
//! the account on first use — until the room's game finishes or the process
//! is interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use pico_args::Arguments;

use hokm_bots::BotSession;

const HELP: &str = "\
Run headless Hokm bots against a live server

USAGE:
  hokm_bots [OPTIONS]

OPTIONS:
  --server URL     HTTP base URL of the server  [default: http://localhost:8080]
  --room CODE      Room code to join or create  [default: BOTS]
  --count N        Number of bots to spawn       [default: 4]

FLAGS:
  -h, --help       Print help information
";

struct Args {
    server_url: String,
    room_code: String,
    count: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        server_url: pargs
            .value_from_str("--server")
            .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        room_code: pargs
            .value_from_str("--room")
            .unwrap_or_else(|_| "BOTS".to_string()),
        count: pargs.value_from_str("--count").unwrap_or(4),
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || shutdown_handler.store(true, Ordering::SeqCst))
        .context("installing Ctrl+C handler")?;

    let ws_base = args
        .server_url
        .replace("http://", "ws://")
        .replace("https://", "wss://");
    let ws_url = format!("{ws_base}/ws");

    let mut handles = Vec::with_capacity(args.count as usize);

    for i in 0..args.count {
        let username = format!("bot_{}_{}", args.room_code.to_lowercase(), i);
        let password = "BotPassw0rd".to_string();

        let session = BotSession::new(username.clone(), ws_url.clone());
        let room_code = args.room_code.clone();
        handles.push(tokio::spawn(async move {
            if let Err(err) = session.run(&password, &room_code).await {
                log::error!("{username}: bot session failed: {err}");
            }
        }));
    }

    log::info!(
        "spawned {} bot(s) into room {} against {}",
        args.count,
        args.room_code,
        args.server_url
    );

    for handle in handles {
        if shutdown.load(Ordering::SeqCst) {
            handle.abort();
        } else {
            let _ = handle.await;
        }
    }

    Ok(())
}
