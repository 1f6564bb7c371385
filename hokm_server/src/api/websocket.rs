//! WebSocket gateway carrying the Hokm wire protocol.
//!
//! This module implements a single bidirectional WebSocket connection per
//! client. Unlike a REST endpoint, the connection is not bound to a room at
//! upgrade time or by a path parameter: a connection authenticates itself by
//! sending an `auth` or `auth_token` frame first, then selects a room with a
//! `join` or `rejoin` frame. Everything afterwards — hokm selection, card
//! play, chat, disconnect/reconnect — flows as JSON frames over the same
//! socket.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws` (no query parameters; unauthenticated at the HTTP layer)
//! 2. Client sends `auth` (username/password) or `auth_token` (existing JWT)
//! 3. Server replies `auth_success` or `auth_failed`
//! 4. Client sends `join` or `rejoin` with a `room_code`
//! 5. Server subscribes the connection to that room's broadcasts and begins
//!    forwarding [`RoomBroadcast`] events translated into [`ServerFrame`]s
//! 6. `hokm_selected` / `play_card` / `chat` / `heartbeat` / `leave` flow for
//!    the remainder of the connection
//!
//! Frames sent before authentication, or naming a room the connection has
//! not joined, receive an `error` frame rather than closing the socket.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use hokm_core::game::Seat;
use hokm_core::net::{ClientFrame, ErrorCode, PlayerSummary, ServerFrame};
use hokm_core::room::{RoomBroadcast, RoomHandle, RoomMessage};
use log::{info, warn};
use tokio::sync::mpsc;

use super::AppState;
use super::rate_limiter::RateLimiter;

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection state. `room` and `own_seat` are set once a `join`/`rejoin`
/// succeeds; `hakem_seat` is tracked separately only to disambiguate the two
/// `hand_dealt` broadcasts (5 cards vs 13) into `initial_deal`/`final_deal`.
struct Connection {
    player_id: Option<i64>,
    room: Option<RoomHandle>,
    own_seat: Option<Seat>,
    hakem_seat: Option<Seat>,
    broadcasts: Option<mpsc::Receiver<RoomBroadcast>>,
}

impl Connection {
    fn new() -> Self {
        Self { player_id: None, room: None, own_seat: None, hakem_seat: None, broadcasts: None }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut conn = Connection::new();
    let mut limiter = RateLimiter::burst();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !limiter.check() {
                            send_frame(&mut sender, &ServerFrame::error(
                                ErrorCode::RateLimited,
                                "too many messages, slow down",
                            )).await;
                            continue;
                        }
                        let frame: ClientFrame = match serde_json::from_str(&text) {
                            Ok(f) => f,
                            Err(err) => {
                                warn!("ws: failed to parse client frame: {err}");
                                send_frame(&mut sender, &ServerFrame::error(
                                    ErrorCode::InternalError,
                                    "malformed frame",
                                )).await;
                                continue;
                            }
                        };
                        if let Some(reply) = handle_frame(frame, &mut conn, &state).await {
                            send_frame(&mut sender, &reply).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        warn!("ws: connection error: {err}");
                        break;
                    }
                    _ => {}
                }
            }
            event = next_broadcast(&mut conn.broadcasts) => {
                match event {
                    Some(broadcast) => {
                        if let Some(frame) = translate_broadcast(broadcast, &mut conn) {
                            send_frame(&mut sender, &frame).await;
                        }
                    }
                    None => conn.broadcasts = None,
                }
            }
        }
    }

    if let (Some(room), Some(player_id)) = (&conn.room, conn.player_id) {
        let _ = room.send(RoomMessage::Unsubscribe { player_id }).await;
    }
    info!("ws: connection closed (player_id={:?})", conn.player_id);
}

async fn next_broadcast(rx: &mut Option<mpsc::Receiver<RoomBroadcast>>) -> Option<RoomBroadcast> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_frame(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) {
    let Ok(json) = serde_json::to_string(frame) else {
        warn!("ws: failed to serialize server frame");
        return;
    };
    let _ = sender.send(Message::Text(json.into())).await;
}

async fn handle_frame(
    frame: ClientFrame,
    conn: &mut Connection,
    state: &AppState,
) -> Option<ServerFrame> {
    match frame {
        ClientFrame::Auth { username, password } => {
            match state.auth.authenticate(&username, &password).await {
                Ok(token) => match state.auth.validate(&token).await {
                    Ok(identity) => {
                        conn.player_id = Some(identity.player_id);
                        Some(ServerFrame::AuthSuccess { player_id: identity.player_id, token })
                    }
                    Err(err) => Some(ServerFrame::AuthFailed { reason: err.to_string() }),
                },
                Err(err) => Some(ServerFrame::AuthFailed { reason: err.to_string() }),
            }
        }
        ClientFrame::AuthToken { token } => match state.auth.validate(&token).await {
            Ok(identity) => {
                conn.player_id = Some(identity.player_id);
                Some(ServerFrame::AuthSuccess { player_id: identity.player_id, token })
            }
            Err(err) => Some(ServerFrame::AuthFailed { reason: err.to_string() }),
        },
        ClientFrame::Join { room_code } => handle_join(conn, state, room_code).await,
        ClientFrame::Rejoin { room_code, player_id } => {
            handle_rejoin(conn, state, room_code, player_id).await
        }
        ClientFrame::Leave { room_code } => handle_leave(conn, room_code).await,
        ClientFrame::HokmSelected { room_code, suit } => {
            handle_select_hokm(conn, room_code, suit).await
        }
        ClientFrame::PlayCard { room_code, card } => handle_play_card(conn, room_code, card).await,
        ClientFrame::Chat { room_code, text } => handle_chat(conn, room_code, text).await,
        ClientFrame::Heartbeat => None,
        ClientFrame::HealthCheck { .. } => None,
        ClientFrame::Unknown => {
            Some(ServerFrame::error(ErrorCode::InternalError, "unrecognized frame type"))
        }
    }
}

fn require_auth(conn: &Connection) -> Result<i64, ServerFrame> {
    conn.player_id
        .ok_or_else(|| ServerFrame::error(ErrorCode::SessionExpired, "authenticate before sending this frame"))
}

async fn handle_join(conn: &mut Connection, state: &AppState, room_code: String) -> Option<ServerFrame> {
    let player_id = match require_auth(conn) {
        Ok(id) => id,
        Err(frame) => return Some(frame),
    };

    let room = state.rooms.get_or_create(&room_code).await;
    let ack = match room.join(player_id).await {
        Ok(ack) => ack,
        Err(err) => return Some(error_frame_for(err)),
    };

    subscribe(conn, &room, player_id).await;
    conn.room = Some(room);
    conn.own_seat = Some(ack.seat);
    conn.hakem_seat = Some(ack.hakem);

    let players = roster_to_summaries(state, &ack.players).await;
    let hand = if ack.hand.is_empty() {
        None
    } else {
        Some(ack.hand.into_iter().map(hokm_core::net::encode_card).collect())
    };
    Some(ServerFrame::JoinSuccess {
        room_code,
        seat: ack.seat,
        players,
        phase: ack.phase,
        teams: ack.teams,
        hakem: ack.hakem,
        hokm: ack.hokm,
        current_turn: ack.current_turn,
        hand,
    })
}

async fn handle_rejoin(
    conn: &mut Connection,
    state: &AppState,
    room_code: String,
    player_id: i64,
) -> Option<ServerFrame> {
    if conn.player_id.is_none() {
        conn.player_id = Some(player_id);
    }

    let room = state.rooms.get_or_create(&room_code).await;
    let snapshot = match room.rejoin(player_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => return Some(error_frame_for(err)),
    };

    subscribe(conn, &room, player_id).await;
    conn.room = Some(room);
    conn.own_seat = Some(snapshot.seat);
    conn.hakem_seat = Some(snapshot.hakem);

    let players = roster_to_summaries(state, &snapshot.players).await;
    Some(ServerFrame::JoinSuccess {
        room_code,
        seat: snapshot.seat,
        players,
        phase: snapshot.phase,
        teams: snapshot.teams,
        hakem: snapshot.hakem,
        hokm: snapshot.hokm,
        current_turn: snapshot.current_turn,
        hand: Some(snapshot.hand.into_iter().map(hokm_core::net::encode_card).collect()),
    })
}

/// Resolves a seated roster into wire-facing summaries, looking up each
/// player's username. A lookup failure falls back to `"unknown"` rather than
/// failing the whole join — the room already has the seat either way.
async fn roster_to_summaries(state: &AppState, roster: &[(Seat, i64)]) -> Vec<PlayerSummary> {
    let mut summaries = Vec::with_capacity(roster.len());
    for &(seat, player_id) in roster {
        let username = state
            .auth
            .username_for(player_id)
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        summaries.push(PlayerSummary { seat, player_id, username });
    }
    summaries
}

async fn handle_leave(conn: &mut Connection, room_code: String) -> Option<ServerFrame> {
    let player_id = match require_auth(conn) {
        Ok(id) => id,
        Err(frame) => return Some(frame),
    };
    let Some(room) = conn.room.clone().filter(|r| r.code() == room_code) else {
        return Some(ServerFrame::error(ErrorCode::WrongPhase, "not in that room"));
    };
    match room.leave(player_id).await {
        Ok(()) => {
            let _ = room.send(RoomMessage::Unsubscribe { player_id }).await;
            conn.room = None;
            conn.own_seat = None;
            conn.broadcasts = None;
            None
        }
        Err(err) => Some(error_frame_for(err)),
    }
}

async fn handle_select_hokm(conn: &mut Connection, room_code: String, suit: String) -> Option<ServerFrame> {
    let player_id = match require_auth(conn) {
        Ok(id) => id,
        Err(frame) => return Some(frame),
    };
    let Some(room) = conn.room.clone().filter(|r| r.code() == room_code) else {
        return Some(ServerFrame::error(ErrorCode::WrongPhase, "not in that room"));
    };
    if let Err(err) = room.select_hokm(player_id, suit).await {
        return Some(error_frame_for(err));
    }
    None
}

async fn handle_play_card(conn: &mut Connection, room_code: String, card: String) -> Option<ServerFrame> {
    let player_id = match require_auth(conn) {
        Ok(id) => id,
        Err(frame) => return Some(frame),
    };
    let Some(room) = conn.room.clone().filter(|r| r.code() == room_code) else {
        return Some(ServerFrame::error(ErrorCode::WrongPhase, "not in that room"));
    };
    let Some(parsed) = hokm_core::net::decode_card(&card) else {
        return Some(ServerFrame::error(ErrorCode::InvalidCard, "unrecognized card encoding"));
    };
    if let Err(err) = room.play_card(player_id, parsed).await {
        return Some(error_frame_for(err));
    }
    None
}

async fn handle_chat(conn: &mut Connection, room_code: String, text: String) -> Option<ServerFrame> {
    let player_id = match require_auth(conn) {
        Ok(id) => id,
        Err(frame) => return Some(frame),
    };
    let Some(room) = conn.room.clone().filter(|r| r.code() == room_code) else {
        return Some(ServerFrame::error(ErrorCode::WrongPhase, "not in that room"));
    };
    if let Err(err) = room.chat(player_id, text).await {
        return Some(error_frame_for(err));
    }
    None
}

async fn subscribe(conn: &mut Connection, room: &RoomHandle, player_id: i64) {
    let (tx, rx) = mpsc::channel(32);
    if room.send(RoomMessage::Subscribe { player_id, sender: tx }).await.is_ok() {
        conn.broadcasts = Some(rx);
    }
}

/// Translates a room broadcast into the wire frame for this connection.
/// `HandDealt` is ambiguous between `initial_deal` and `final_deal` on the
/// wire, so it is disambiguated here by hand length (5 cards vs 13).
fn translate_broadcast(event: RoomBroadcast, conn: &mut Connection) -> Option<ServerFrame> {
    match event {
        RoomBroadcast::PlayerJoined { seat, player_id } => {
            Some(ServerFrame::PlayerJoined { seat, player_id })
        }
        RoomBroadcast::PhaseChanged { phase } => Some(ServerFrame::PhaseChange { new_phase: phase }),
        RoomBroadcast::TeamsAssigned { teams, hakem } => {
            conn.hakem_seat = Some(hakem);
            Some(ServerFrame::TeamAssignment { teams, hakem })
        }
        RoomBroadcast::HandDealt { hand } => {
            let is_initial = hand.len() <= hokm_core::game::constants::INITIAL_DEAL_SIZE;
            let encoded: Vec<String> = hand.into_iter().map(hokm_core::net::encode_card).collect();
            if is_initial {
                let is_hakem = conn.hakem_seat == conn.own_seat;
                Some(ServerFrame::InitialDeal { hand: encoded, is_hakem })
            } else {
                Some(ServerFrame::FinalDeal { hand: encoded })
            }
        }
        RoomBroadcast::HokmSelected { suit } => Some(ServerFrame::HokmSelected { suit }),
        RoomBroadcast::TurnStarted { seat } => Some(ServerFrame::TurnStart {
            current_player: seat,
            your_turn: Some(seat) == conn.own_seat,
            hand: None,
        }),
        RoomBroadcast::CardPlayed { seat, card } => {
            Some(ServerFrame::CardPlayed { player: seat, card: hokm_core::net::encode_card(card) })
        }
        RoomBroadcast::TrickResolved { winner, team_tricks } => {
            Some(ServerFrame::TrickResult { winner, team_tricks })
        }
        RoomBroadcast::HandComplete { winning_team, rounds_won } => {
            Some(ServerFrame::HandComplete { winning_team, round_scores: rounds_won })
        }
        RoomBroadcast::GameOver { winning_team, final_scores } => {
            Some(ServerFrame::GameOver { winning_team, final_scores })
        }
        RoomBroadcast::PlayerDisconnected { seat } => Some(ServerFrame::PlayerDisconnected { player: seat }),
        RoomBroadcast::PlayerReconnected { seat } => Some(ServerFrame::PlayerReconnected { player: seat }),
        RoomBroadcast::Chat { seat, text } => Some(ServerFrame::Chat { player: seat, text }),
        RoomBroadcast::RoomAborted => {
            Some(ServerFrame::RoomClosed { reason: "a seat's disconnect grace expired".to_string() })
        }
    }
}

fn error_frame_for(err: hokm_core::room::RoomError) -> ServerFrame {
    use hokm_core::game::GameError;
    use hokm_core::room::RoomError;

    let code = match &err {
        RoomError::Game(GameError::RoomFull) => ErrorCode::RoomFull,
        RoomError::Game(GameError::NotYourTurn) => ErrorCode::NotYourTurn,
        RoomError::Game(GameError::WrongPhase) => ErrorCode::WrongPhase,
        RoomError::Game(GameError::NotHakem) => ErrorCode::WrongPhase,
        RoomError::Game(GameError::InvalidSuit) => ErrorCode::InvalidCard,
        RoomError::Game(GameError::CardNotInHand) => ErrorCode::InvalidCard,
        RoomError::Game(GameError::MustFollowSuit) => ErrorCode::MustFollowSuit,
        RoomError::Game(GameError::AlreadySeated) => ErrorCode::RoomFull,
        RoomError::Game(GameError::NotSeated) => ErrorCode::SessionExpired,
        RoomError::SessionExpired => ErrorCode::SessionExpired,
        RoomError::RateLimited { .. } => ErrorCode::RateLimited,
    };
    ServerFrame::error(code, err.to_string())
}
