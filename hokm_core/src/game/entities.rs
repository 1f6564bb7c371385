//! Card, suit, and seat primitives shared by the rule engine and the wire protocol.

use std::fmt;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::constants::NUM_SEATS;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    /// Parses the suit names used in `hokm_selected` frames, case-insensitively.
    pub fn parse(s: &str) -> Option<Suit> {
        match s.to_ascii_lowercase().as_str() {
            "hearts" => Some(Suit::Hearts),
            "diamonds" => Some(Suit::Diamonds),
            "clubs" => Some(Suit::Clubs),
            "spades" => Some(Suit::Spades),
            _ => None,
        }
    }

    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Suit::Hearts => "hearts",
            Suit::Diamonds => "diamonds",
            Suit::Clubs => "clubs",
            Suit::Spades => "spades",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

/// Rank ordering is the derive order: `Two < Three < ... < King < Ace`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    fn as_wire_str(&self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }

    fn parse(s: &str) -> Option<Rank> {
        match s {
            "2" => Some(Rank::Two),
            "3" => Some(Rank::Three),
            "4" => Some(Rank::Four),
            "5" => Some(Rank::Five),
            "6" => Some(Rank::Six),
            "7" => Some(Rank::Seven),
            "8" => Some(Rank::Eight),
            "9" => Some(Rank::Nine),
            "10" => Some(Rank::Ten),
            "J" => Some(Rank::Jack),
            "Q" => Some(Rank::Queen),
            "K" => Some(Rank::King),
            "A" => Some(Rank::Ace),
            _ => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

/// A single playing card. `Ord`/`PartialOrd` order by rank only, which is
/// meaningful only when comparing cards already known to share a suit (or
/// both known to be trump) — see [`super::engine::resolve_trick`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.rank, self.suit)
    }
}

/// Wire encoding is `"{rank}_{suit}"`, e.g. `"A_hearts"`, `"10_spades"`.
impl std::str::FromStr for Card {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rank_str, suit_str) = s.split_once('_').ok_or(())?;
        let rank = Rank::parse(rank_str).ok_or(())?;
        let suit = Suit::parse(suit_str).ok_or(())?;
        Ok(Card::new(rank, suit))
    }
}

/// The 52-card deck, shuffled via an injected RNG so deals are reproducible in tests.
#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Builds the full, unshuffled deck.
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    /// Shuffles in place using the supplied RNG, so tests can inject a seeded one.
    pub fn shuffle(&mut self, rng: &mut impl rand::Rng) {
        self.cards.shuffle(rng);
    }

    /// Deals `n` cards off the top, removing them from the deck.
    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        self.cards.drain(0..n.min(self.cards.len())).collect()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed index 0..3 within a room.
pub type Seat = usize;

/// Seats 0 and 2 are team A; seats 1 and 3 are team B.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn index(&self) -> usize {
        match self {
            Team::A => 0,
            Team::B => 1,
        }
    }

    pub fn from_index(i: usize) -> Team {
        if i % 2 == 0 { Team::A } else { Team::B }
    }
}

/// The team a seat belongs to, by the fixed 0,2 vs 1,3 convention.
pub fn team_of(seat: Seat) -> Team {
    if seat % 2 == 0 { Team::A } else { Team::B }
}

/// The next seat clockwise.
pub fn next_seat(seat: Seat) -> Seat {
    (seat + 1) % NUM_SEATS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_has_52_unique_cards() {
        let deck = Deck::new();
        assert_eq!(deck.remaining(), 52);
    }

    #[test]
    fn card_wire_roundtrip() {
        let card = Card::new(Rank::Ten, Suit::Spades);
        let encoded = card.to_string();
        assert_eq!(encoded, "10_spades");
        let decoded: Card = encoded.parse().unwrap();
        assert_eq!(decoded, card);
    }

    #[test]
    fn ace_wire_roundtrip() {
        let card = Card::new(Rank::Ace, Suit::Hearts);
        assert_eq!(card.to_string(), "A_hearts");
        assert_eq!("A_hearts".parse::<Card>().unwrap(), card);
    }

    #[test]
    fn team_assignment_follows_seat_parity() {
        assert_eq!(team_of(0), Team::A);
        assert_eq!(team_of(1), Team::B);
        assert_eq!(team_of(2), Team::A);
        assert_eq!(team_of(3), Team::B);
    }

    #[test]
    fn next_seat_wraps() {
        assert_eq!(next_seat(3), 0);
        assert_eq!(next_seat(0), 1);
    }
}
