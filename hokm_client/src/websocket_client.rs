//! Plain-text WebSocket client for the Hokm game server.
//!
//! This is the non-TUI client mode: it prints each [`ServerFrame`] as a
//! line of text and reads [`crate::commands::Command`]s from stdin.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use hokm_core::net::{ClientFrame, ServerFrame};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::commands::{Command, parse_command};

/// WebSocket game client.
pub struct WebSocketClient {
    ws_url: String,
    username: String,
    password: String,
    room_code: String,
}

impl WebSocketClient {
    /// Create a new WebSocket client that authenticates with `username` and
    /// `password` and immediately joins `room_code`.
    pub fn new(ws_url: String, username: String, password: String, room_code: String) -> Self {
        Self {
            ws_url,
            username,
            password,
            room_code,
        }
    }

    /// Connect to the WebSocket gateway and run the game session until the
    /// connection closes or the user quits.
    pub async fn connect_and_play(self) -> Result<()> {
        println!("Connecting to {}...", self.ws_url);

        let (ws_stream, _) = connect_async(&self.ws_url)
            .await
            .context("Failed to connect to WebSocket")?;

        println!("Connected. Authenticating...\n");

        let (mut write, mut read) = ws_stream.split();

        send_frame(
            &mut write,
            &ClientFrame::Auth { username: self.username, password: self.password },
        )
        .await?;
        send_frame(
            &mut write,
            &ClientFrame::Join { room_code: self.room_code.clone() },
        )
        .await?;

        let room_code = self.room_code;
        let own_player_id = Arc::new(AtomicI64::new(0));
        let read_player_id = own_player_id.clone();

        let read_handle = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(frame) => {
                            if let ServerFrame::AuthSuccess { player_id, .. } = &frame {
                                read_player_id.store(*player_id, Ordering::Relaxed);
                            }
                            display_server_frame(&frame)
                        }
                        Err(e) => eprintln!("Failed to parse server frame: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        println!("Server closed connection");
                        break;
                    }
                    Err(e) => {
                        eprintln!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut line = String::new();

        loop {
            use tokio::io::AsyncBufReadExt;

            line.clear();
            match stdin.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    match parse_command(input) {
                        Ok(Command::Quit) => {
                            println!("Disconnecting...");
                            break;
                        }
                        Ok(Command::Help) => print_help(),
                        Ok(command) => {
                            let frame = to_client_frame(
                                command,
                                &room_code,
                                own_player_id.load(Ordering::Relaxed),
                            );
                            if let Err(e) = send_frame(&mut write, &frame).await {
                                eprintln!("Error: {}", e);
                            }
                        }
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    break;
                }
            }
        }

        let _ = write.close().await;
        read_handle.abort();

        Ok(())
    }
}

fn to_client_frame(command: Command, room_code: &str, player_id: i64) -> ClientFrame {
    match command {
        Command::Join(code) => ClientFrame::Join { room_code: code },
        Command::Rejoin(code) => ClientFrame::Rejoin { room_code: code, player_id },
        Command::Leave => ClientFrame::Leave { room_code: room_code.to_string() },
        Command::Hokm(suit) => ClientFrame::HokmSelected { room_code: room_code.to_string(), suit },
        Command::Play(card) => ClientFrame::PlayCard { room_code: room_code.to_string(), card },
        Command::Chat(text) => ClientFrame::Chat { room_code: room_code.to_string(), text },
        Command::Help | Command::Quit => unreachable!("handled before reaching to_client_frame"),
    }
}

async fn send_frame<W>(write: &mut W, frame: &ClientFrame) -> Result<()>
where
    W: SinkExt<Message> + Unpin,
    W::Error: std::error::Error + Send + Sync + 'static,
{
    let json = serde_json::to_string(frame)?;
    write
        .send(Message::Text(json.into()))
        .await
        .context("Failed to send frame")?;
    Ok(())
}

fn display_server_frame(frame: &ServerFrame) {
    match frame {
        ServerFrame::AuthSuccess { player_id, .. } => {
            println!("Authenticated as player {player_id}");
        }
        ServerFrame::AuthFailed { reason } => println!("Authentication failed: {reason}"),
        ServerFrame::JoinSuccess { room_code, seat, players, .. } => {
            println!("Joined room {room_code} at seat {seat} ({} players seated)", players.len());
        }
        ServerFrame::PlayerJoined { seat, player_id } => {
            println!("Player {player_id} joined at seat {seat}");
        }
        ServerFrame::Error { code, message } => println!("Error [{code:?}]: {message}"),
        ServerFrame::PhaseChange { new_phase } => println!("-- phase: {new_phase} --"),
        ServerFrame::TeamAssignment { teams, hakem } => {
            println!("Teams assigned: {teams:?}, hakem is seat {hakem}");
        }
        ServerFrame::InitialDeal { hand, is_hakem } => {
            println!("Initial hand: {}", hand.join(" "));
            if *is_hakem {
                println!("You are the hakem — choose trump with 'hokm SUIT'");
            }
        }
        ServerFrame::HokmSelected { suit } => println!("Hokm selected: {suit}"),
        ServerFrame::FinalDeal { hand } => println!("Final hand: {}", hand.join(" ")),
        ServerFrame::TurnStart { current_player, your_turn, hand } => {
            if *your_turn {
                println!("Your turn (seat {current_player})");
            } else {
                println!("Waiting on seat {current_player}");
            }
            if let Some(hand) = hand {
                println!("Hand: {}", hand.join(" "));
            }
        }
        ServerFrame::CardPlayed { player, card } => println!("Seat {player} played {card}"),
        ServerFrame::TrickResult { winner, team_tricks } => {
            println!("Trick won by seat {winner}. Tricks: {team_tricks:?}");
        }
        ServerFrame::HandComplete { winning_team, round_scores } => {
            println!("Hand complete. Team {winning_team:?} won. Rounds: {round_scores:?}");
        }
        ServerFrame::GameOver { winning_team, final_scores } => {
            println!("GAME OVER. Team {winning_team:?} wins! Final: {final_scores:?}");
        }
        ServerFrame::PlayerDisconnected { player } => println!("Seat {player} disconnected"),
        ServerFrame::PlayerReconnected { player } => println!("Seat {player} reconnected"),
        ServerFrame::Chat { player, text } => println!("[chat] seat {player}: {text}"),
        ServerFrame::RoomClosed { reason } => println!("Room closed: {reason}"),
        ServerFrame::ServerMigration { new_server, .. } => {
            println!("Server migrating to {new_server}");
        }
        ServerFrame::Unknown => {}
    }
}

fn print_help() {
    println!("\nAvailable commands:");
    println!("  join CODE        join or create a room");
    println!("  rejoin CODE      resume a room after a disconnect");
    println!("  leave            leave the current room");
    println!("  hokm SUIT        select trump as hakem (hearts/diamonds/clubs/spades)");
    println!("  play CARD        play a card, e.g. 'play A_spades'");
    println!("  chat MESSAGE     send a chat message");
    println!("  help, quit");
}
