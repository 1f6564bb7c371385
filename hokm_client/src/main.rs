//! A terminal client for the Hokm game server.
//!
//! The client lists live rooms over the server's discovery endpoint, then
//! connects to the WebSocket gateway, authenticates with an `auth` frame,
//! and joins (or creates) a room by code.

use anyhow::{Context, Result};
use pico_args::Arguments;
use std::io::{self, Write};

#[allow(dead_code)]
mod api_client;
#[allow(dead_code)]
mod commands;
#[allow(dead_code)]
mod tui_app;
#[allow(dead_code)]
mod websocket_client;
#[allow(dead_code)]
mod widgets;

use hokm_client::{api_client::ApiClient, tui_app::TuiApp, websocket_client::WebSocketClient};

const HELP: &str = "\
Connect to a Hokm game server

USAGE:
  hokm_client [OPTIONS]

OPTIONS:
  --server URL          Server URL  [default: http://localhost:8080]
  --username NAME       Username for login
  --password PASS       Password for login
  --room CODE           Room code to join or create
  --tui                 Use TUI (Terminal UI) mode [default: false]

FLAGS:
  -h, --help            Print help information
";

struct Args {
    server_url: String,
    username: Option<String>,
    password: Option<String>,
    room_code: Option<String>,
    use_tui: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        server_url: pargs
            .value_from_str("--server")
            .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        username: pargs.opt_value_from_str("--username").ok().flatten(),
        password: pargs.opt_value_from_str("--password").ok().flatten(),
        room_code: pargs.opt_value_from_str("--room").ok().flatten(),
        use_tui: pargs.contains("--tui"),
    };

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let api_client = ApiClient::new(args.server_url.clone());

    let username = match args.username {
        Some(u) => u,
        None => {
            print!("Username: ");
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            input.trim().to_string()
        }
    };

    let password = match args.password {
        Some(p) => p,
        None => {
            print!("Password: ");
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            input.trim().to_string()
        }
    };

    println!("\nLive rooms:");
    let rooms = api_client.list_rooms().await.context("Failed to list rooms")?;
    if rooms.is_empty() {
        println!("  (none yet — type a new code to create one)");
    } else {
        for room in &rooms {
            println!("  {}", room.room_code);
        }
    }

    let room_code = match args.room_code {
        Some(code) => code,
        None => {
            print!("\nRoom code to join (new or existing): ");
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            input.trim().to_uppercase()
        }
    };

    if room_code.is_empty() {
        anyhow::bail!("A room code is required");
    }

    let ws_url = api_client.get_websocket_url();

    println!("\nConnecting to room: {}", room_code);

    if args.use_tui {
        println!("Starting TUI mode...");
        let terminal = ratatui::init();
        let tui_app = TuiApp::new(username.clone(), room_code);
        let result = tui_app.run(ws_url, username, password, terminal).await;
        ratatui::restore();
        result?;
    } else {
        let ws_client = WebSocketClient::new(ws_url, username, password, room_code);
        ws_client.connect_and_play().await?;
    }

    println!("\nDisconnected from room.");
    Ok(())
}
