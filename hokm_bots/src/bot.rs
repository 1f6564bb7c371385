//! A single bot's WebSocket session: authenticates, joins a room, and plays
//! every turn it's dealt by picking the first legal card in hand.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use hokm_core::game::{Card, Suit};
use hokm_core::net::{ClientFrame, ServerFrame, decode_card, encode_card};
use rand::seq::IndexedRandom;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// One bot's view of its own hand and the currently led suit, just enough
/// state to pick a legal-looking card without re-deriving the full engine.
pub struct BotSession {
    pub username: String,
    ws_url: String,
    hand: Vec<Card>,
    led_suit: Option<Suit>,
    hokm: Option<Suit>,
    is_hakem: bool,
}

impl BotSession {
    pub fn new(username: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ws_url: ws_url.into(),
            hand: Vec::new(),
            led_suit: None,
            hokm: None,
            is_hakem: false,
        }
    }

    /// Connects, authenticates with `password`, joins `room_code`, and plays
    /// until the room closes or the connection drops.
    pub async fn run(mut self, password: &str, room_code: &str) -> Result<()> {
        let (ws, _) = connect_async(&self.ws_url).await.context("connecting to server")?;
        let (mut write, mut read) = ws.split();

        let auth = ClientFrame::Auth { username: self.username.clone(), password: password.to_string() };
        send(&mut write, &auth).await?;

        let join_sent = std::sync::atomic::AtomicBool::new(false);
        let room_code = room_code.to_string();

        while let Some(msg) = read.next().await {
            let Ok(Message::Text(text)) = msg else { break };
            let frame: ServerFrame = match serde_json::from_str(&text) {
                Ok(f) => f,
                Err(err) => {
                    log::warn!("{}: failed to parse server frame: {err}", self.username);
                    continue;
                }
            };

            match frame {
                ServerFrame::AuthSuccess { .. } => {
                    if !join_sent.swap(true, std::sync::atomic::Ordering::SeqCst) {
                        send(&mut write, &ClientFrame::Join { room_code: room_code.clone() }).await?;
                    }
                }
                ServerFrame::AuthFailed { reason } => {
                    anyhow::bail!("{}: auth failed: {reason}", self.username);
                }
                ServerFrame::InitialDeal { hand, is_hakem } => {
                    self.hand = hand.iter().filter_map(|s| decode_card(s)).collect();
                    self.is_hakem = is_hakem;
                    if is_hakem {
                        let suit = self.pick_hokm();
                        log::info!("{}: hakem picking {suit}", self.username);
                        send(&mut write, &ClientFrame::HokmSelected {
                            room_code: room_code.clone(),
                            suit: suit.as_wire_str().to_string(),
                        }).await?;
                    }
                }
                ServerFrame::FinalDeal { hand } => {
                    self.hand = hand.iter().filter_map(|s| decode_card(s)).collect();
                }
                ServerFrame::HokmSelected { suit } => {
                    self.hokm = Some(suit);
                }
                ServerFrame::TurnStart { your_turn, .. } => {
                    if your_turn {
                        if let Some(card) = self.pick_card() {
                            send(&mut write, &ClientFrame::PlayCard {
                                room_code: room_code.clone(),
                                card: encode_card(card),
                            }).await?;
                        }
                    }
                }
                ServerFrame::CardPlayed { player: _, card } => {
                    if let Some(card) = decode_card(&card) {
                        if self.led_suit.is_none() {
                            self.led_suit = Some(card.suit);
                        }
                        self.hand.retain(|c| *c != card);
                    }
                }
                ServerFrame::TrickResult { .. } => {
                    self.led_suit = None;
                }
                ServerFrame::GameOver { winning_team, final_scores } => {
                    log::info!("{}: game over, team {winning_team:?} won {final_scores:?}", self.username);
                    break;
                }
                ServerFrame::RoomClosed { reason } => {
                    log::info!("{}: room closed: {reason}", self.username);
                    break;
                }
                ServerFrame::Error { code, message } => {
                    log::warn!("{}: server error {code:?}: {message}", self.username);
                }
                _ => {}
            }
        }

        let _ = write.close().await;
        Ok(())
    }

    fn pick_hokm(&self) -> Suit {
        let mut counts = [0u8; 4];
        for card in &self.hand {
            counts[card.suit as usize] += 1;
        }
        Suit::ALL
            .into_iter()
            .max_by_key(|s| counts[*s as usize])
            .unwrap_or(Suit::Hearts)
    }

    /// Picks the first card following the led suit if one's in hand,
    /// otherwise a random card (legality is still enforced server-side).
    fn pick_card(&self) -> Option<Card> {
        if let Some(led) = self.led_suit
            && let Some(card) = self.hand.iter().find(|c| c.suit == led)
        {
            return Some(*card);
        }
        self.hand.choose(&mut rand::rng()).copied()
    }
}

async fn send(
    write: &mut (impl SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
    frame: &ClientFrame,
) -> Result<()> {
    let json = serde_json::to_string(frame)?;
    write.send(Message::text(json)).await.context("sending frame")?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
