//! The Room Coordinator: a single-writer actor owning one room's [`GameState`].
//!
//! Every public operation arrives as a [`RoomMessage`] over an mpsc channel
//! and is handled to completion before the next is read, so there is never
//! concurrent access to the state. This mirrors the table actor pattern: one
//! task per room, one inbox, one `&mut self` handler per message.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

use crate::data::{EntityType, HybridDataLayer, TransactionMode};
use crate::game::constants::{DEFAULT_CHAT_INTERVAL, DEFAULT_DISCONNECT_GRACE, DEFAULT_GAME_OVER_LINGER, DEFAULT_TURN_TIMEOUT};
use crate::game::{self, Card, GamePhase, GameState, Seat};

use super::messages::{JoinAck, PrivateSnapshot, RoomBroadcast, RoomError, RoomMessage};

pub type RoomCode = String;

#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    code: RoomCode,
}

impl RoomHandle {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub async fn send(&self, message: RoomMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "room is closed".to_string())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

pub struct RoomActor {
    code: RoomCode,
    state: GameState,
    inbox: mpsc::Receiver<RoomMessage>,
    data: Arc<HybridDataLayer>,
    subscribers: HashMap<Seat, mpsc::Sender<RoomBroadcast>>,
    player_seats: HashMap<i64, Seat>,
    disconnected_since: HashMap<Seat, Instant>,
    turn_deadline: Option<Instant>,
    last_chat_at: HashMap<Seat, Instant>,
    close_at: Option<Instant>,
    is_closed: bool,
}

impl RoomActor {
    pub fn new(code: RoomCode, data: Arc<HybridDataLayer>) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(64);
        let actor = Self {
            code: code.clone(),
            state: GameState::new(Utc::now()),
            inbox,
            data,
            subscribers: HashMap::new(),
            player_seats: HashMap::new(),
            disconnected_since: HashMap::new(),
            turn_deadline: None,
            last_chat_at: HashMap::new(),
            close_at: None,
            is_closed: false,
        };
        let handle = RoomHandle { sender, code };
        (actor, handle)
    }

    pub async fn run(mut self) {
        log::info!("room {} starting", self.code);
        let mut tick = interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                Some(message) = self.inbox.recv() => {
                    self.handle_message(message).await;
                    if self.is_closed {
                        break;
                    }
                }
                _ = tick.tick() => {
                    self.on_tick().await;
                    if self.is_closed {
                        break;
                    }
                }
                else => break,
            }
        }
        log::info!("room {} closed", self.code);
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join { player_id, response } => {
                let _ = response.send(self.handle_join(player_id).await);
            }
            RoomMessage::Rejoin { player_id, response } => {
                let _ = response.send(self.handle_rejoin(player_id).await);
            }
            RoomMessage::Leave { player_id, response } => {
                let _ = response.send(self.handle_leave(player_id).await);
            }
            RoomMessage::SelectHokm { player_id, suit, response } => {
                let _ = response.send(self.handle_select_hokm(player_id, &suit).await);
            }
            RoomMessage::PlayCard { player_id, card, response } => {
                let _ = response.send(self.handle_play_card(player_id, card).await);
            }
            RoomMessage::Chat { player_id, text, response } => {
                let _ = response.send(self.handle_chat(player_id, text).await);
            }
            RoomMessage::Subscribe { player_id, sender } => {
                if let Some(&seat) = self.player_seats.get(&player_id) {
                    self.subscribers.insert(seat, sender);
                }
            }
            RoomMessage::Unsubscribe { player_id } => {
                if let Some(&seat) = self.player_seats.get(&player_id) {
                    self.subscribers.remove(&seat);
                }
            }
            RoomMessage::Tick => self.on_tick().await,
        }
    }

    /// Re-keys every seat-indexed bookkeeping map (`player_seats`,
    /// `subscribers`, `disconnected_since`, `last_chat_at`) after an engine
    /// call that may have rotated `state.seating` — the 4th join, and the
    /// start of every hand after the first. Rotation only touches
    /// `GameState`, so without this the Room Coordinator's own maps would
    /// keep pointing at the seat a player used to occupy.
    fn remap_after_rotation(&mut self, old_seating: [Option<i64>; 4]) {
        let mut old_seat_of_player = HashMap::new();
        for (seat, occupant) in old_seating.iter().enumerate() {
            if let Some(player_id) = occupant {
                old_seat_of_player.insert(*player_id, seat);
            }
        }

        self.player_seats.clear();
        let mut subscribers = HashMap::new();
        let mut disconnected_since = HashMap::new();
        let mut last_chat_at = HashMap::new();

        for (new_seat, occupant) in self.state.seating.iter().enumerate() {
            let Some(player_id) = occupant else { continue };
            self.player_seats.insert(*player_id, new_seat);
            let Some(&old_seat) = old_seat_of_player.get(player_id) else { continue };
            if let Some(sender) = self.subscribers.remove(&old_seat) {
                subscribers.insert(new_seat, sender);
            }
            if let Some(since) = self.disconnected_since.remove(&old_seat) {
                disconnected_since.insert(new_seat, since);
            }
            if let Some(at) = self.last_chat_at.remove(&old_seat) {
                last_chat_at.insert(new_seat, at);
            }
        }
        self.subscribers = subscribers;
        self.disconnected_since = disconnected_since;
        self.last_chat_at = last_chat_at;
    }

    /// The room's full seated roster as `(seat, player_id)` pairs, in seat order.
    fn seated_roster(&self) -> Vec<(Seat, i64)> {
        self.state
            .seating
            .iter()
            .enumerate()
            .filter_map(|(seat, occupant)| occupant.map(|player_id| (seat, player_id)))
            .collect()
    }

    async fn handle_join(&mut self, player_id: i64) -> Result<JoinAck, RoomError> {
        let old_seating = self.state.seating;
        let events = game::engine::join(&mut self.state, player_id)?;
        self.remap_after_rotation(old_seating);
        let seat = self
            .state
            .seat_of(player_id)
            .expect("join always seats the player on success");
        self.broadcast(RoomBroadcast::PlayerJoined { seat, player_id });
        self.apply_events(events).await;
        self.persist(None).await;
        Ok(JoinAck {
            seat,
            players: self.seated_roster(),
            phase: self.state.phase,
            hand: self.state.hands[seat].clone(),
            teams: self.state.teams,
            hakem: self.state.hakem,
            hokm: self.state.hokm,
            current_turn: self.state.current_turn,
        })
    }

    async fn handle_rejoin(&mut self, player_id: i64) -> Result<PrivateSnapshot, RoomError> {
        let seat = self
            .player_seats
            .get(&player_id)
            .copied()
            .ok_or(RoomError::Game(crate::game::GameError::NotSeated))?;

        let grace_elapsed = self
            .disconnected_since
            .get(&seat)
            .map(|since| since.elapsed() > DEFAULT_DISCONNECT_GRACE)
            .unwrap_or(false);
        if grace_elapsed {
            return Err(RoomError::SessionExpired);
        }

        self.disconnected_since.remove(&seat);
        self.broadcast(RoomBroadcast::PlayerReconnected { seat });

        Ok(PrivateSnapshot {
            seat,
            players: self.seated_roster(),
            phase: self.state.phase,
            hand: self.state.hands[seat].clone(),
            teams: self.state.teams,
            hakem: self.state.hakem,
            hokm: self.state.hokm,
            current_turn: self.state.current_turn,
            tricks_won: self.state.tricks_won,
            rounds_won: self.state.rounds_won,
        })
    }

    async fn handle_leave(&mut self, player_id: i64) -> Result<(), RoomError> {
        let seat = self
            .player_seats
            .get(&player_id)
            .copied()
            .ok_or(RoomError::Game(crate::game::GameError::NotSeated))?;
        self.disconnected_since.insert(seat, Instant::now());
        self.subscribers.remove(&seat);
        self.broadcast(RoomBroadcast::PlayerDisconnected { seat });
        Ok(())
    }

    async fn handle_select_hokm(&mut self, player_id: i64, suit: &str) -> Result<(), RoomError> {
        let events = game::engine::select_hokm(&mut self.state, player_id, suit)?;
        self.apply_events(events).await;
        self.persist(None).await;
        Ok(())
    }

    async fn handle_play_card(&mut self, player_id: i64, card: Card) -> Result<(), RoomError> {
        let seat = self
            .player_seats
            .get(&player_id)
            .copied()
            .ok_or(RoomError::Game(crate::game::GameError::NotSeated))?;
        let old_seating = self.state.seating;
        let events = game::engine::apply_play(&mut self.state, seat, card)?;
        self.remap_after_rotation(old_seating);
        let event_tag = match self.state.phase {
            GamePhase::GameOver => Some("game_over"),
            GamePhase::HandComplete => Some("hand_complete"),
            _ => None,
        };
        self.apply_events(events).await;
        self.persist(event_tag).await;

        if self.state.phase == GamePhase::GameOver {
            self.finish_game().await;
        }
        Ok(())
    }

    async fn handle_chat(&mut self, player_id: i64, text: String) -> Result<(), RoomError> {
        let seat = self
            .player_seats
            .get(&player_id)
            .copied()
            .ok_or(RoomError::Game(crate::game::GameError::NotSeated))?;

        if let Some(last) = self.last_chat_at.get(&seat) {
            let elapsed = last.elapsed();
            if elapsed < DEFAULT_CHAT_INTERVAL {
                return Err(RoomError::RateLimited {
                    retry_after_secs: (DEFAULT_CHAT_INTERVAL - elapsed).as_secs().max(1),
                });
            }
        }
        self.last_chat_at.insert(seat, Instant::now());
        self.broadcast(RoomBroadcast::Chat { seat, text });
        Ok(())
    }

    /// Translates [`game::GameEvent`]s into per-seat broadcasts, sending any
    /// private hand only to the seat it belongs to.
    async fn apply_events(&mut self, events: Vec<game::GameEvent>) {
        for event in events {
            match event {
                game::GameEvent::PhaseChanged { phase } => {
                    self.broadcast(RoomBroadcast::PhaseChanged { phase });
                    self.rearm_turn_timer();
                }
                game::GameEvent::TeamsAssigned { teams, hakem } => {
                    self.broadcast(RoomBroadcast::TeamsAssigned { teams, hakem });
                }
                game::GameEvent::InitialDealt | game::GameEvent::FinalDealt => {
                    for seat in 0..4 {
                        self.send_hand(seat, self.state.hands[seat].clone());
                    }
                }
                game::GameEvent::HokmSelected { suit } => {
                    self.broadcast(RoomBroadcast::HokmSelected { suit });
                }
                game::GameEvent::CardPlayed { seat, card } => {
                    self.broadcast(RoomBroadcast::CardPlayed { seat, card });
                    self.broadcast(RoomBroadcast::TurnStarted {
                        seat: self.state.current_turn,
                    });
                    self.rearm_turn_timer();
                }
                game::GameEvent::TrickResolved { winner, team_tricks } => {
                    self.broadcast(RoomBroadcast::TrickResolved { winner, team_tricks });
                }
                game::GameEvent::HandComplete { winning_team, rounds_won } => {
                    self.broadcast(RoomBroadcast::HandComplete { winning_team, rounds_won });
                }
                game::GameEvent::GameOver { winning_team, final_scores } => {
                    self.broadcast(RoomBroadcast::GameOver { winning_team, final_scores });
                }
            }
        }
    }

    fn rearm_turn_timer(&mut self) {
        self.turn_deadline = if self.state.phase == GamePhase::Gameplay {
            Some(Instant::now() + DEFAULT_TURN_TIMEOUT)
        } else {
            None
        };
    }

    fn broadcast(&mut self, event: RoomBroadcast) {
        let code = &self.code;
        self.subscribers.retain(|seat, sender| {
            match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("room {code}: seat {seat} broadcast channel full, dropping notification");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    fn send_hand(&mut self, seat: Seat, hand: Vec<Card>) {
        if let Some(sender) = self.subscribers.get(&seat) {
            let _ = sender.try_send(RoomBroadcast::HandDealt { hand });
        }
    }

    async fn persist(&self, event: Option<&str>) {
        let Ok(payload) = serde_json::to_string(&self.state) else {
            log::error!("room {}: failed to serialize game state", self.code);
            return;
        };
        if let Err(err) = self.data.put(EntityType::GameState, &self.code, payload, event).await {
            log::warn!("room {}: persisting game state failed: {err}", self.code);
        }
    }

    async fn finish_game(&mut self) {
        if let Ok(payload) = serde_json::to_string(&self.state) {
            if let Err(err) = self
                .data
                .put_with_mode(
                    EntityType::CompletedGameRecord,
                    &self.code,
                    payload,
                    None,
                    TransactionMode::WriteThrough,
                )
                .await
            {
                log::error!("room {}: failed to write completed game record: {err}", self.code);
            }
        }
        self.close_at = Some(Instant::now() + DEFAULT_GAME_OVER_LINGER);
    }

    /// Auto-plays the disconnected/stalled seat's first legal card per the
    /// turn-timeout policy, and evicts seats whose disconnect grace expired.
    async fn on_tick(&mut self) {
        if self.is_closed {
            return;
        }
        if let Some(close_at) = self.close_at {
            if Instant::now() >= close_at {
                self.is_closed = true;
                return;
            }
        }

        if self.state.phase == GamePhase::Gameplay {
            if let Some(deadline) = self.turn_deadline {
                if Instant::now() >= deadline {
                    self.auto_play_current_turn().await;
                }
            }
        }

        let expired_seats: Vec<Seat> = self
            .disconnected_since
            .iter()
            .filter(|(_, since)| since.elapsed() > DEFAULT_DISCONNECT_GRACE)
            .map(|(&seat, _)| seat)
            .collect();
        if !expired_seats.is_empty() {
            self.abort_for_disconnect(expired_seats).await;
        }
    }

    async fn auto_play_current_turn(&mut self) {
        let seat = self.state.current_turn;
        let hand = self.state.hands[seat].clone();
        let led_suit = self.state.led_suit;

        let chosen = led_suit
            .and_then(|led| hand.iter().find(|c| c.suit == led).copied())
            .or_else(|| hand.first().copied());

        let Some(card) = chosen else {
            return;
        };
        log::warn!(
            "room {}: seat {} timed out, auto-playing {}",
            self.code,
            seat,
            card
        );
        let old_seating = self.state.seating;
        if let Ok(events) = game::engine::apply_play(&mut self.state, seat, card) {
            self.remap_after_rotation(old_seating);
            let event_tag = match self.state.phase {
                GamePhase::GameOver => Some("game_over"),
                GamePhase::HandComplete => Some("hand_complete"),
                _ => None,
            };
            self.apply_events(events).await;
            self.persist(event_tag).await;
            if self.state.phase == GamePhase::GameOver {
                self.finish_game().await;
            }
        }
    }

    /// A seat's disconnect grace ran out: the hand can no longer be
    /// completed fairly, so the room is aborted with no round awarded.
    async fn abort_for_disconnect(&mut self, seats: Vec<Seat>) {
        for seat in seats {
            self.disconnected_since.remove(&seat);
            log::info!("room {}: seat {} grace expired, aborting room", self.code, seat);
        }
        self.state.phase = GamePhase::GameOver;
        self.broadcast(RoomBroadcast::RoomAborted);
        self.persist(Some("game_over")).await;
        self.finish_game().await;
    }
}

/// Handle-facing request helpers used by the connection layer; these pair a
/// `RoomMessage` send with awaiting the response on the caller's behalf.
impl RoomHandle {
    pub async fn join(&self, player_id: i64) -> Result<JoinAck, RoomError> {
        self.request(|response| RoomMessage::Join { player_id, response }).await
    }

    pub async fn rejoin(&self, player_id: i64) -> Result<PrivateSnapshot, RoomError> {
        self.request(|response| RoomMessage::Rejoin { player_id, response }).await
    }

    pub async fn leave(&self, player_id: i64) -> Result<(), RoomError> {
        self.request(|response| RoomMessage::Leave { player_id, response }).await
    }

    pub async fn select_hokm(&self, player_id: i64, suit: String) -> Result<(), RoomError> {
        self.request(|response| RoomMessage::SelectHokm { player_id, suit, response }).await
    }

    pub async fn play_card(&self, player_id: i64, card: Card) -> Result<(), RoomError> {
        self.request(|response| RoomMessage::PlayCard { player_id, card, response }).await
    }

    pub async fn chat(&self, player_id: i64, text: String) -> Result<(), RoomError> {
        self.request(|response| RoomMessage::Chat { player_id, text, response }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, RoomError>>) -> RoomMessage,
    ) -> Result<T, RoomError> {
        let (response, recv) = oneshot::channel();
        if self.send(build(response)).await.is_err() {
            return Err(RoomError::SessionExpired);
        }
        recv.await.unwrap_or(Err(RoomError::SessionExpired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryStore;

    fn test_data() -> Arc<HybridDataLayer> {
        Arc::new(HybridDataLayer::new(
            Arc::new(InMemoryStore::default()),
            Arc::new(InMemoryStore::default()),
        ))
    }

    #[tokio::test]
    async fn join_rotation_carries_earlier_players_subscribers_to_their_new_seat() {
        let (mut actor, _handle) = RoomActor::new("room-1".to_string(), test_data());

        for player_id in 1..=3 {
            actor.handle_join(player_id).await.unwrap();
        }

        let (tx, mut rx) = mpsc::channel(8);
        let seat_before = actor.player_seats[&1];
        actor.subscribers.insert(seat_before, tx);

        // The 4th join may rotate seating to put the hakem at seat 0.
        actor.handle_join(4).await.unwrap();

        let seat_after = actor.player_seats[&1];
        assert!(actor.subscribers.contains_key(&seat_after));
        if seat_before != seat_after {
            assert!(!actor.subscribers.contains_key(&seat_before));
        }

        let msg = rx.recv().await.expect("subscriber should still be wired up after rotation");
        assert!(matches!(msg, RoomBroadcast::HandDealt { .. }));
    }

    #[tokio::test]
    async fn hand_rotation_keeps_player_seats_consistent_with_game_state() {
        let (mut actor, _handle) = RoomActor::new("room-2".to_string(), test_data());

        for player_id in 1..=4 {
            actor.handle_join(player_id).await.unwrap();
        }

        let hakem_id = actor.state.seating[actor.state.hakem].unwrap();
        actor.handle_select_hokm(hakem_id, "spades").await.unwrap();

        // Force the hand to complete immediately so the next hand rotates the hakem.
        actor.state.tricks_won = [6, 0];
        let leader = actor.state.current_turn;
        let seats_in_order = [
            leader,
            game::entities::next_seat(leader),
            game::entities::next_seat(game::entities::next_seat(leader)),
            game::entities::next_seat(game::entities::next_seat(game::entities::next_seat(leader))),
        ];
        let plays = [
            Card::new(crate::game::entities::Rank::Ace, crate::game::entities::Suit::Diamonds),
            Card::new(crate::game::entities::Rank::King, crate::game::entities::Suit::Diamonds),
            Card::new(crate::game::entities::Rank::Two, crate::game::entities::Suit::Diamonds),
            Card::new(crate::game::entities::Rank::Queen, crate::game::entities::Suit::Diamonds),
        ];
        for (&seat, &card) in seats_in_order.iter().zip(plays.iter()) {
            actor.state.hands[seat] = vec![card];
        }
        for (&seat, &card) in seats_in_order.iter().zip(plays.iter()) {
            let player_id = actor.state.seating[seat].unwrap();
            actor.handle_play_card(player_id, card).await.unwrap();
        }

        // After the hand-complete rotation, every seated player's bookkeeping
        // entry must agree with where the engine actually put them.
        for (seat, occupant) in actor.state.seating.iter().enumerate() {
            let player_id = occupant.expect("room stays full across hands");
            assert_eq!(actor.player_seats[&player_id], seat);
        }
    }
}
