//! TUI application for the WebSocket-based Hokm client.
//!
//! This module provides a rich terminal UI using `ratatui` that connects to
//! the Hokm server via the `/ws` gateway for real-time game updates.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use hokm_core::game::{GamePhase, Seat, Team};
use hokm_core::net::{ClientFrame, ServerFrame};
use std::time::Duration;

use ratatui::{
    DefaultTerminal, Frame,
    crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    layout::{Alignment, Constraint, Flex, Layout, Margin, Position},
    style::{Style, Stylize},
    symbols::scrollbar,
    text::{Line, Span, Text},
    widgets::{
        Block, Cell, Clear, List, ListDirection, Padding, Paragraph, Row, Scrollbar,
        ScrollbarOrientation, Table, block,
    },
};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::commands::{Command, parse_command};
use crate::widgets::{ScrollableList, UserInput};

const HELP: &str = "\
join CODE
        Join or create the room with this code.
rejoin CODE
        Resume a room you disconnected from.
leave
        Leave the current room.
hokm SUIT
        As hakem, select trump: hearts, diamonds, clubs, or spades.
play CARD
        Play a card from your hand, e.g. 'play A_spades'.
chat MESSAGE
        Send a chat message to the room.
";
const MAX_LOG_RECORDS: usize = 1024;
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

fn suit_color(repr: &str) -> Span<'static> {
    let repr = repr.to_string();
    if repr.ends_with("hearts") {
        Span::styled(repr, Style::default().light_red())
    } else if repr.ends_with("diamonds") {
        Span::styled(repr, Style::default().light_blue())
    } else if repr.ends_with("clubs") {
        Span::styled(repr, Style::default().light_green())
    } else {
        Span::raw(repr)
    }
}

#[derive(Clone)]
#[allow(dead_code)]
enum RecordKind {
    Ack,
    Alert,
    Error,
    Game,
    You,
}

#[derive(Clone, Copy, PartialEq)]
enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// A timestamped terminal message with an importance label to help direct
/// user attention.
#[derive(Clone)]
struct Record {
    datetime: DateTime<Utc>,
    kind: RecordKind,
    content: String,
}

impl Record {
    fn new(kind: RecordKind, content: String) -> Self {
        Self { datetime: Utc::now(), kind, content }
    }
}

impl From<Record> for ratatui::widgets::ListItem<'_> {
    fn from(val: Record) -> Self {
        let repr = match val.kind {
            RecordKind::Ack => "ACK".light_blue(),
            RecordKind::Alert => "ALERT".light_magenta(),
            RecordKind::Error => "ERROR".light_red(),
            RecordKind::Game => "GAME".light_yellow(),
            RecordKind::You => "YOU".light_green(),
        };

        let msg = vec![
            format!("[{} ", val.datetime.format("%H:%M:%S")).into(),
            Span::styled(format!("{repr:5}"), repr.style),
            format!("]: {}", val.content).into(),
        ];

        ratatui::widgets::ListItem::new(Line::from(msg))
    }
}

/// Everything the last round of server frames told us about the room.
#[derive(Default)]
struct RoomView {
    phase: Option<GamePhase>,
    own_seat: Option<Seat>,
    hakem: Option<Seat>,
    teams: Option<[Team; 4]>,
    hokm: Option<String>,
    hand: Vec<String>,
    current_trick: Vec<(Seat, String)>,
    current_turn: Option<Seat>,
    your_turn: bool,
    tricks_won: [u8; 2],
    round_scores: [u8; 2],
}

/// TUI application state.
pub struct TuiApp {
    username: String,
    room_code: String,
    own_player_id: i64,
    show_help_menu: bool,
    help_handle: ScrollableList,
    log_handle: ScrollableList,
    user_input: UserInput,
    connection_status: ConnectionStatus,
    view: RoomView,
}

impl TuiApp {
    pub fn new(username: String, room_code: String) -> Self {
        let mut help_handle = ScrollableList::new(MAX_LOG_RECORDS);
        help_handle.push("".into());
        for line in HELP.lines() {
            help_handle.push(line.into());
        }
        help_handle.push("".into());
        help_handle.jump_to_first();

        Self {
            username,
            room_code,
            own_player_id: 0,
            show_help_menu: false,
            help_handle,
            log_handle: ScrollableList::new(MAX_LOG_RECORDS),
            user_input: UserInput::new(),
            connection_status: ConnectionStatus::Connected,
            view: RoomView::default(),
        }
    }

    fn handle_command(&mut self, user_input: &str, tx: &mpsc::UnboundedSender<ClientFrame>) {
        match parse_command(user_input) {
            Ok(Command::Help) => self.show_help_menu = !self.show_help_menu,
            Ok(Command::Quit) => {}
            Ok(command) => {
                let frame = self.to_client_frame(command);
                let _ = tx.send(frame);
                self.log_handle.push(Record::new(RecordKind::You, user_input.to_string()).into());
            }
            Err(e) => {
                self.log_handle.push(Record::new(RecordKind::Error, e.to_string()).into());
            }
        }
    }

    fn to_client_frame(&mut self, command: Command) -> ClientFrame {
        match command {
            Command::Join(code) => {
                self.room_code = code.clone();
                ClientFrame::Join { room_code: code }
            }
            Command::Rejoin(code) => {
                self.room_code = code.clone();
                ClientFrame::Rejoin { room_code: code, player_id: self.own_player_id }
            }
            Command::Leave => ClientFrame::Leave { room_code: self.room_code.clone() },
            Command::Hokm(suit) => {
                ClientFrame::HokmSelected { room_code: self.room_code.clone(), suit }
            }
            Command::Play(card) => {
                ClientFrame::PlayCard { room_code: self.room_code.clone(), card }
            }
            Command::Chat(text) => ClientFrame::Chat { room_code: self.room_code.clone(), text },
            Command::Help | Command::Quit => unreachable!("filtered out in handle_command"),
        }
    }

    /// Apply one server frame to local room state, logging anything worth a
    /// line in the history pane.
    fn apply_server_frame(&mut self, frame: ServerFrame) {
        match frame {
            ServerFrame::AuthSuccess { player_id, .. } => {
                self.own_player_id = player_id;
                self.log_handle.push(
                    Record::new(RecordKind::Ack, format!("authenticated as player {player_id}"))
                        .into(),
                );
            }
            ServerFrame::AuthFailed { reason } => {
                self.log_handle.push(Record::new(RecordKind::Error, reason).into());
            }
            ServerFrame::JoinSuccess { room_code, seat, players, phase, teams, hakem, hokm, current_turn, hand } => {
                self.room_code = room_code;
                self.view.own_seat = Some(seat);
                self.view.phase = Some(phase);
                self.view.teams = Some(teams);
                self.view.hakem = Some(hakem);
                self.view.hokm = hokm.map(|suit| suit.to_string());
                self.view.current_turn = Some(current_turn);
                self.view.your_turn = current_turn == seat;
                if let Some(hand) = hand {
                    self.view.hand = hand;
                }
                self.log_handle.push(
                    Record::new(
                        RecordKind::Ack,
                        format!("joined at seat {seat} ({} players seated)", players.len()),
                    )
                    .into(),
                );
            }
            ServerFrame::PlayerJoined { seat, player_id } => {
                self.log_handle.push(
                    Record::new(RecordKind::Game, format!("player {player_id} joined seat {seat}"))
                        .into(),
                );
            }
            ServerFrame::Error { code, message } => {
                self.log_handle
                    .push(Record::new(RecordKind::Error, format!("{code:?}: {message}")).into());
            }
            ServerFrame::PhaseChange { new_phase } => {
                self.view.phase = Some(new_phase);
                self.log_handle
                    .push(Record::new(RecordKind::Game, format!("phase: {new_phase}")).into());
            }
            ServerFrame::TeamAssignment { teams, hakem } => {
                self.view.teams = Some(teams);
                self.view.hakem = Some(hakem);
                self.log_handle
                    .push(Record::new(RecordKind::Game, format!("hakem is seat {hakem}")).into());
            }
            ServerFrame::InitialDeal { hand, is_hakem } => {
                self.view.hand = hand;
                if is_hakem {
                    self.log_handle.push(
                        Record::new(RecordKind::Alert, "you are hakem, choose trump".to_string())
                            .into(),
                    );
                }
            }
            ServerFrame::HokmSelected { suit } => {
                self.view.hokm = Some(suit.to_string());
                self.log_handle
                    .push(Record::new(RecordKind::Game, format!("hokm is {suit}")).into());
            }
            ServerFrame::FinalDeal { hand } => self.view.hand = hand,
            ServerFrame::TurnStart { current_player, your_turn, hand } => {
                self.view.current_turn = Some(current_player);
                self.view.your_turn = your_turn;
                if let Some(hand) = hand {
                    self.view.hand = hand;
                }
                if your_turn {
                    self.log_handle
                        .push(Record::new(RecordKind::Alert, "it's your turn!".to_string()).into());
                }
            }
            ServerFrame::CardPlayed { player, card } => {
                self.view.current_trick.push((player, card.clone()));
                self.view.hand.retain(|c| c != &card);
                self.log_handle
                    .push(Record::new(RecordKind::Game, format!("seat {player} played {card}")).into());
            }
            ServerFrame::TrickResult { winner, team_tricks } => {
                self.view.current_trick.clear();
                self.view.tricks_won = team_tricks;
                self.log_handle.push(
                    Record::new(RecordKind::Game, format!("trick won by seat {winner}")).into(),
                );
            }
            ServerFrame::HandComplete { winning_team, round_scores } => {
                self.view.round_scores = round_scores;
                self.log_handle.push(
                    Record::new(
                        RecordKind::Alert,
                        format!("hand complete, team {winning_team:?} took the round"),
                    )
                    .into(),
                );
            }
            ServerFrame::GameOver { winning_team, final_scores } => {
                self.log_handle.push(
                    Record::new(
                        RecordKind::Alert,
                        format!("game over, team {winning_team:?} wins {final_scores:?}"),
                    )
                    .into(),
                );
            }
            ServerFrame::PlayerDisconnected { player } => {
                self.log_handle
                    .push(Record::new(RecordKind::Alert, format!("seat {player} disconnected")).into());
            }
            ServerFrame::PlayerReconnected { player } => {
                self.log_handle
                    .push(Record::new(RecordKind::Alert, format!("seat {player} reconnected")).into());
            }
            ServerFrame::Chat { player, text } => {
                self.log_handle
                    .push(Record::new(RecordKind::Game, format!("seat {player}: {text}")).into());
            }
            ServerFrame::RoomClosed { reason } => {
                self.log_handle.push(Record::new(RecordKind::Error, reason).into());
            }
            ServerFrame::ServerMigration { new_server, .. } => {
                self.log_handle.push(
                    Record::new(RecordKind::Alert, format!("server migrating to {new_server}"))
                        .into(),
                );
            }
            ServerFrame::Unknown => {}
        }
    }

    fn draw_hand(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let spans: Vec<Span> = self
            .view
            .hand
            .iter()
            .flat_map(|card| vec![suit_color(card), "  ".into()])
            .collect();
        let hand = Paragraph::new(Line::from(spans)).block(
            Block::bordered().padding(Padding::uniform(1)).title(" your hand  "),
        );
        frame.render_widget(hand, area);
    }

    fn draw_trick(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let rows = self.view.current_trick.iter().map(|(seat, card)| {
            Row::new(vec![
                Cell::new(Text::from(format!("seat {seat}")).alignment(Alignment::Left)),
                Cell::new(Text::from(suit_color(card)).alignment(Alignment::Right)),
            ])
        });
        let table = Table::new(rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
            .block(Block::bordered().padding(Padding::uniform(1)).title(" current trick  "));
        frame.render_widget(table, area);
    }

    fn draw_status(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let phase = self.view.phase.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        let hokm = self.view.hokm.clone().unwrap_or_else(|| "-".to_string());
        let hakem = self.view.hakem.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        let turn = match (self.view.current_turn, self.view.your_turn) {
            (Some(seat), true) => format!("seat {seat} (you)"),
            (Some(seat), false) => format!("seat {seat}"),
            (None, _) => "-".to_string(),
        };

        let lines = vec![
            Line::from(format!(
                " room: {}   seat: {}   phase: {phase}",
                self.room_code,
                self.view.own_seat.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
            )),
            Line::from(format!(" hakem: {hakem}   hokm: {hokm}   turn: {turn}")),
            Line::from(format!(
                " tricks this hand: team0={} team1={}   rounds won: team0={} team1={}",
                self.view.tricks_won[0],
                self.view.tricks_won[1],
                self.view.round_scores[0],
                self.view.round_scores[1]
            )),
        ];
        let status = Paragraph::new(lines)
            .block(Block::bordered().padding(Padding::uniform(1)).title(" room  "));
        frame.render_widget(status, area);
    }

    fn draw_log(&mut self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let log_records = self.log_handle.list_items.clone();
        let log_records = List::new(log_records)
            .direction(ListDirection::BottomToTop)
            .block(block::Block::bordered().title(" history  "));
        frame.render_stateful_widget(log_records, area, &mut self.log_handle.list_state);

        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .begin_symbol(None)
                .end_symbol(None),
            area.inner(Margin { vertical: 1, horizontal: 1 }),
            &mut self.log_handle.scroll_state,
        );
    }

    fn draw_user_input(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let user_input = Paragraph::new(self.user_input.value.as_str()).style(Style::default()).block(
            block::Block::bordered()
                .title(format!(" {}@{}  ", self.username, self.room_code).light_green()),
        );
        frame.render_widget(user_input, area);
        frame.set_cursor_position(Position::new(
            area.x + self.user_input.char_idx as u16 + 1,
            area.y + 1,
        ));
    }

    fn draw_help_bar(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let status_indicator = match self.connection_status {
            ConnectionStatus::Connected => "● Connected".green(),
            ConnectionStatus::Disconnected => "● Disconnected".red(),
        };

        let help_message = vec![
            status_indicator,
            " | press ".into(),
            "Tab".bold().white(),
            " to view help, press ".into(),
            "Enter".bold().white(),
            " to record a command, or press ".into(),
            "Esc".bold().white(),
            " to exit".into(),
        ];
        frame.render_widget(Paragraph::new(Line::from(help_message)), area);
    }

    fn draw_help_menu(&mut self, frame: &mut Frame) {
        let vertical = Layout::vertical([Constraint::Max(14)]).flex(Flex::Center);
        let horizontal = Layout::horizontal([Constraint::Max(72)]).flex(Flex::Center);
        let [help_menu_area] = vertical.areas(frame.area());
        let [help_menu_area] = horizontal.areas(help_menu_area);
        frame.render_widget(Clear, help_menu_area);

        let help_items = self.help_handle.list_items.clone();
        let help_items = List::new(help_items)
            .direction(ListDirection::BottomToTop)
            .block(block::Block::bordered().title(" commands  "));
        frame.render_stateful_widget(help_items, help_menu_area, &mut self.help_handle.list_state);

        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .begin_symbol(None)
                .end_symbol(None),
            help_menu_area.inner(Margin { vertical: 1, horizontal: 1 }),
            &mut self.help_handle.scroll_state,
        );
    }

    fn draw(&mut self, frame: &mut Frame) {
        let window = Layout::vertical([
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(1),
        ]);
        let [top_area, user_input_area, help_area] = window.areas(frame.area());

        let [status_area, middle_area, log_area] = Layout::vertical([
            Constraint::Length(5),
            Constraint::Min(3),
            Constraint::Percentage(45),
        ])
        .areas(top_area);

        let [hand_area, trick_area] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(middle_area);

        self.draw_status(frame, status_area);
        self.draw_hand(frame, hand_area);
        self.draw_trick(frame, trick_area);
        self.draw_log(frame, log_area);
        self.draw_user_input(frame, user_input_area);
        self.draw_help_bar(frame, help_area);

        if self.show_help_menu {
            self.draw_help_menu(frame);
        }
    }

    /// Run the TUI application: authenticate, join, and loop until the user
    /// quits or the connection drops.
    pub async fn run(
        mut self,
        ws_url: String,
        username: String,
        password: String,
        mut terminal: DefaultTerminal,
    ) -> Result<()> {
        let (ws_stream, _) =
            connect_async(&ws_url).await.context("Failed to connect to WebSocket")?;

        let (mut write, mut read) = ws_stream.split();

        let (tx_frame, mut rx_frame) = mpsc::unbounded_channel::<ClientFrame>();
        tx_frame.send(ClientFrame::Auth { username, password })?;
        tx_frame.send(ClientFrame::Join { room_code: self.room_code.clone() })?;

        let write_handle = tokio::spawn(async move {
            while let Some(frame) = rx_frame.recv().await {
                if let Ok(json) = serde_json::to_string(&frame)
                    && write.send(Message::Text(json.into())).await.is_err()
                {
                    break;
                }
            }
        });

        let (tx_server, mut rx_server) = mpsc::unbounded_channel::<ServerFrame>();
        let (tx_error, mut rx_error) = mpsc::unbounded_channel::<String>();

        let read_handle = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Ok(frame) = serde_json::from_str::<ServerFrame>(&text) {
                            let _ = tx_server.send(frame);
                        }
                    }
                    Ok(Message::Close(_)) => {
                        let _ = tx_error.send("Server closed connection".to_string());
                        break;
                    }
                    Err(e) => {
                        let _ = tx_error.send(format!("WebSocket error: {}", e));
                        break;
                    }
                    _ => {}
                }
            }
        });

        loop {
            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(POLL_TIMEOUT)?
                && let Event::Key(KeyEvent { code, modifiers, kind, .. }) = event::read()?
                && kind == KeyEventKind::Press
            {
                match modifiers {
                    KeyModifiers::CONTROL => match code {
                        KeyCode::Home => self.log_handle.jump_to_first(),
                        KeyCode::End => self.log_handle.jump_to_last(),
                        _ => {}
                    },
                    KeyModifiers::NONE => match code {
                        KeyCode::Enter => {
                            let input = self.user_input.submit();
                            if matches!(parse_command(&input), Ok(Command::Quit)) {
                                write_handle.abort();
                                read_handle.abort();
                                return Ok(());
                            }
                            self.handle_command(&input, &tx_frame);
                        }
                        KeyCode::Char(to_insert) => self.user_input.input(to_insert),
                        KeyCode::Backspace => self.user_input.backspace(),
                        KeyCode::Delete => self.user_input.delete(),
                        KeyCode::Left => self.user_input.move_left(),
                        KeyCode::Right => self.user_input.move_right(),
                        KeyCode::Up => {
                            if self.show_help_menu {
                                self.help_handle.move_up();
                            } else {
                                self.log_handle.move_up();
                            }
                        }
                        KeyCode::Down => {
                            if self.show_help_menu {
                                self.help_handle.move_down();
                            } else {
                                self.log_handle.move_down();
                            }
                        }
                        KeyCode::Home => self.user_input.jump_to_first(),
                        KeyCode::End => self.user_input.jump_to_last(),
                        KeyCode::Tab => self.show_help_menu = !self.show_help_menu,
                        KeyCode::Esc => {
                            write_handle.abort();
                            read_handle.abort();
                            return Ok(());
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }

            if let Ok(frame) = rx_server.try_recv() {
                self.apply_server_frame(frame);
            }

            if let Ok(error_msg) = rx_error.try_recv() {
                self.connection_status = ConnectionStatus::Disconnected;
                self.log_handle.push(Record::new(RecordKind::Error, error_msg).into());
                terminal.draw(|frame| self.draw(frame))?;
                tokio::time::sleep(Duration::from_secs(2)).await;
                write_handle.abort();
                read_handle.abort();
                return Ok(());
            }
        }
    }
}
