use std::fmt;

/// A parsed, room-code-free user command. The caller fills in which room the
/// command targets (the room the client already joined, or a freshly typed
/// code for `join`/`rejoin`) before turning it into a [`hokm_core::net::ClientFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `join CODE` — join or create the room with this code.
    Join(String),
    /// `rejoin CODE` — resume a room after a disconnect.
    Rejoin(String),
    /// `leave` — leave the currently joined room.
    Leave,
    /// `hokm SUIT` — select trump as the hakem.
    Hokm(String),
    /// `play CARD` — play a card, e.g. `play A_spades`.
    Play(String),
    /// `chat MESSAGE...` — send a chat line to the room.
    Chat(String),
    /// `help` / `?` — show the command list.
    Help,
    /// `quit` / `exit` — disconnect and exit.
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `join`/`rejoin` with no room code given.
    MissingRoomCode(&'static str),
    /// `hokm` with no suit given.
    MissingSuit,
    /// `play` with no card given.
    MissingCard,
    /// `chat` with no message text given.
    EmptyChatMessage,
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoomCode(cmd) => {
                write!(f, "'{cmd}' requires a room code (e.g., '{cmd} ABCD')")
            }
            Self::MissingSuit => {
                write!(f, "'hokm' requires a suit (e.g., 'hokm hearts')")
            }
            Self::MissingCard => {
                write!(f, "'play' requires a card (e.g., 'play A_spades')")
            }
            Self::EmptyChatMessage => write!(f, "'chat' requires a message to send"),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a command string typed at the prompt into a [`Command`].
///
/// # Examples
///
/// ```
/// use hokm_client::commands::{parse_command, Command};
///
/// assert_eq!(parse_command("join ABCD"), Ok(Command::Join("ABCD".to_string())));
/// assert_eq!(parse_command("play A_spades"), Ok(Command::Play("A_spades".to_string())));
/// assert_eq!(parse_command("leave"), Ok(Command::Leave));
/// ```
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let trimmed = input.trim();

    match trimmed {
        "leave" => return Ok(Command::Leave),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        _ => {}
    }

    let parts: Vec<&str> = trimmed.split_ascii_whitespace().collect();
    match parts.first() {
        Some(&"join") => parts
            .get(1)
            .map(|code| Command::Join(code.to_string()))
            .ok_or(ParseError::MissingRoomCode("join")),
        Some(&"rejoin") => parts
            .get(1)
            .map(|code| Command::Rejoin(code.to_string()))
            .ok_or(ParseError::MissingRoomCode("rejoin")),
        Some(&"hokm") => parts
            .get(1)
            .map(|suit| Command::Hokm(suit.to_string()))
            .ok_or(ParseError::MissingSuit),
        Some(&"play") => parts
            .get(1)
            .map(|card| Command::Play(card.to_string()))
            .ok_or(ParseError::MissingCard),
        Some(&"chat") => {
            let text = parts[1..].join(" ");
            if text.is_empty() {
                Err(ParseError::EmptyChatMessage)
            } else {
                Ok(Command::Chat(text))
            }
        }
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leave() {
        assert_eq!(parse_command("leave"), Ok(Command::Leave));
    }

    #[test]
    fn test_parse_help() {
        assert_eq!(parse_command("help"), Ok(Command::Help));
        assert_eq!(parse_command("?"), Ok(Command::Help));
    }

    #[test]
    fn test_parse_quit() {
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_with_surrounding_whitespace() {
        assert_eq!(parse_command("  leave  "), Ok(Command::Leave));
    }

    #[test]
    fn test_parse_join_with_code() {
        assert_eq!(
            parse_command("join ABCD"),
            Ok(Command::Join("ABCD".to_string()))
        );
    }

    #[test]
    fn test_parse_join_without_code() {
        assert_eq!(
            parse_command("join"),
            Err(ParseError::MissingRoomCode("join"))
        );
    }

    #[test]
    fn test_parse_rejoin_with_code() {
        assert_eq!(
            parse_command("rejoin WXYZ"),
            Ok(Command::Rejoin("WXYZ".to_string()))
        );
    }

    #[test]
    fn test_parse_rejoin_without_code() {
        assert_eq!(
            parse_command("rejoin"),
            Err(ParseError::MissingRoomCode("rejoin"))
        );
    }

    #[test]
    fn test_parse_hokm_with_suit() {
        assert_eq!(
            parse_command("hokm hearts"),
            Ok(Command::Hokm("hearts".to_string()))
        );
    }

    #[test]
    fn test_parse_hokm_without_suit() {
        assert_eq!(parse_command("hokm"), Err(ParseError::MissingSuit));
    }

    #[test]
    fn test_parse_play_with_card() {
        assert_eq!(
            parse_command("play A_spades"),
            Ok(Command::Play("A_spades".to_string()))
        );
    }

    #[test]
    fn test_parse_play_without_card() {
        assert_eq!(parse_command("play"), Err(ParseError::MissingCard));
    }

    #[test]
    fn test_parse_chat_with_message() {
        assert_eq!(
            parse_command("chat hello there"),
            Ok(Command::Chat("hello there".to_string()))
        );
    }

    #[test]
    fn test_parse_chat_without_message() {
        assert_eq!(parse_command("chat"), Err(ParseError::EmptyChatMessage));
    }

    #[test]
    fn test_parse_unrecognized_command() {
        assert!(matches!(
            parse_command("teleport"),
            Err(ParseError::UnrecognizedCommand(_))
        ));
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(matches!(
            parse_command(""),
            Err(ParseError::UnrecognizedCommand(_))
        ));
    }

    #[test]
    fn test_error_message_missing_room_code() {
        let msg = ParseError::MissingRoomCode("join").to_string();
        assert!(msg.contains("join"));
        assert!(msg.contains("room code"));
    }

    #[test]
    fn test_error_message_unrecognized_command() {
        let msg = ParseError::UnrecognizedCommand("xyz".to_string()).to_string();
        assert!(msg.contains("xyz"));
        assert!(msg.contains("help"));
    }
}
