//! Pure Hokm rule engine.
//!
//! Every function here takes a [`GameState`] by `&mut` reference and returns
//! the [`GameEvent`]s the caller should broadcast, or a [`GameError`] if the
//! request was illegal. Nothing in this module performs I/O; the Room
//! Coordinator is the only thing that may persist or broadcast the result of
//! calling these functions.

use chrono::Utc;
use rand::Rng;

use super::constants::{
    CARDS_PER_HAND, FINAL_DEAL_SIZE, INITIAL_DEAL_SIZE, ROUNDS_TO_WIN_GAME, TRICKS_PER_HAND,
    TRICKS_TO_WIN_HAND,
};
use super::entities::{Card, Deck, Seat, Suit, Team, next_seat, team_of};
use super::state::{GameError, GameEvent, GamePhase, GameState, TrickPlay};

/// Seats a player into the next free slot. Auto-starts team assignment once
/// all four seats are filled.
pub fn join(state: &mut GameState, player_id: i64) -> Result<Vec<GameEvent>, GameError> {
    if state.phase != GamePhase::WaitingForPlayers {
        // Rejoining mid-game is handled by the Room Coordinator directly
        // against the existing seating; `join` only ever seats new players.
        if state.seat_of(player_id).is_some() {
            return Err(GameError::AlreadySeated);
        }
        return Err(GameError::RoomFull);
    }
    if state.seat_of(player_id).is_some() {
        return Err(GameError::AlreadySeated);
    }
    let seat = state
        .seating
        .iter()
        .position(|s| s.is_none())
        .ok_or(GameError::RoomFull)?;
    state.seating[seat] = Some(player_id);
    state.last_activity_at = Utc::now();

    let mut events = Vec::new();
    if state.seated_count() == 4 {
        events.extend(assign_teams_and_hakem(state, &mut rand::rng()));
        events.extend(deal_initial(state, &mut rand::rng()));
    }
    Ok(events)
}

/// Partitions seats 0,2 vs 1,3 into teams and picks a random hakem, per the
/// fixed seat/team convention. Rotates seating so the hakem sits at seat 0.
pub fn assign_teams_and_hakem(state: &mut GameState, rng: &mut impl Rng) -> Vec<GameEvent> {
    state.teams = [Team::A, Team::B, Team::A, Team::B];
    let hakem_seat: Seat = rng.random_range(0..4);
    rotate_seating_to(state, hakem_seat);
    state.hakem = 0;
    state.phase = GamePhase::TeamAssignment;
    let teams_event = GameEvent::TeamsAssigned {
        teams: state.teams,
        hakem: state.hakem,
    };
    state.phase = GamePhase::InitialDeal;
    vec![
        teams_event,
        GameEvent::PhaseChanged {
            phase: state.phase,
        },
    ]
}

/// Rotates `seating` (and any player-indexed bookkeeping) so the player
/// currently at `new_zero` becomes seat 0, preserving relative seat order.
fn rotate_seating_to(state: &mut GameState, new_zero: Seat) {
    if new_zero == 0 {
        return;
    }
    let mut rotated = [None; 4];
    for i in 0..4 {
        rotated[i] = state.seating[(new_zero + i) % 4];
    }
    state.seating = rotated;
}

/// Deals five cards to each seat and transitions to `hokm_selection`.
pub fn deal_initial(state: &mut GameState, rng: &mut impl Rng) -> Vec<GameEvent> {
    let mut deck = Deck::new();
    deck.shuffle(rng);
    for seat in 0..4 {
        state.hands[seat] = deck.deal(INITIAL_DEAL_SIZE);
    }
    // Stash the remainder for the final deal; it's simplest to just redeal
    // from a fresh deck with the same cards already removed from hands, so
    // track the leftover cards directly on the deck across the call by
    // handing final_deal a deck built from what's left once hokm is chosen.
    state.rest_of_deck = deck.deal(deck.remaining());
    state.phase = GamePhase::HokmSelection;
    vec![
        GameEvent::InitialDealt,
        GameEvent::PhaseChanged {
            phase: state.phase,
        },
    ]
}

/// Validates and records the hakem's trump choice, then transitions to `final_deal`.
pub fn select_hokm(
    state: &mut GameState,
    player_id: i64,
    suit: &str,
) -> Result<Vec<GameEvent>, GameError> {
    if state.phase != GamePhase::HokmSelection {
        return Err(GameError::WrongPhase);
    }
    if state.seating[state.hakem] != Some(player_id) {
        return Err(GameError::NotHakem);
    }
    let suit = Suit::parse(suit).ok_or(GameError::InvalidSuit)?;
    state.hokm = Some(suit);
    state.last_activity_at = Utc::now();

    let mut events = vec![GameEvent::HokmSelected { suit }];
    events.extend(deal_final(state));
    Ok(events)
}

/// Deals the remaining eight cards to each seat, transitions to `gameplay`,
/// and sets `current_turn` to the hakem.
fn deal_final(state: &mut GameState) -> Vec<GameEvent> {
    let rest = std::mem::take(&mut state.rest_of_deck);
    let mut rest = rest.into_iter();
    for seat in 0..4 {
        let mut dealt: Vec<Card> = (&mut rest).take(FINAL_DEAL_SIZE).collect();
        state.hands[seat].append(&mut dealt);
    }
    state.current_turn = state.hakem;
    state.phase = GamePhase::Gameplay;
    vec![
        GameEvent::FinalDealt,
        GameEvent::PhaseChanged {
            phase: state.phase,
        },
    ]
}

/// Checks whether `seat` may legally play `card` right now, without mutating state.
pub fn validate_play(state: &GameState, seat: Seat, card: Card) -> Result<(), GameError> {
    if state.phase != GamePhase::Gameplay {
        return Err(GameError::WrongPhase);
    }
    if seat != state.current_turn {
        return Err(GameError::NotYourTurn);
    }
    if !state.hands[seat].contains(&card) {
        return Err(GameError::CardNotInHand);
    }
    if let Some(led) = state.led_suit {
        let has_led_suit = state.hands[seat].iter().any(|c| c.suit == led);
        if card.suit != led && has_led_suit {
            return Err(GameError::MustFollowSuit);
        }
    }
    Ok(())
}

/// Applies a validated play: removes the card from the seat's hand, advances
/// or resolves the trick, and advances the hand/game as needed.
///
/// Callers must have already called [`validate_play`]; this function
/// re-validates defensively but the Room Coordinator is expected to have
/// checked first so it can report errors without mutating anything.
pub fn apply_play(
    state: &mut GameState,
    seat: Seat,
    card: Card,
) -> Result<Vec<GameEvent>, GameError> {
    validate_play(state, seat, card)?;

    let hand = &mut state.hands[seat];
    let idx = hand.iter().position(|c| *c == card).expect("validated above");
    hand.remove(idx);

    state.current_trick.push(TrickPlay { seat, card });
    state.played_cards.push(TrickPlay { seat, card });
    if state.led_suit.is_none() {
        state.led_suit = Some(card.suit);
    }
    state.last_activity_at = Utc::now();

    let mut events = vec![GameEvent::CardPlayed { seat, card }];

    if state.current_trick.len() < 4 {
        state.current_turn = next_seat(seat);
        return Ok(events);
    }

    events.extend(resolve_trick(state));
    Ok(events)
}

/// Resolves a complete (four-card) trick: determines the winner, updates
/// trick/hand/game counters, and transitions phase as needed.
fn resolve_trick(state: &mut GameState) -> Vec<GameEvent> {
    let trump = state.hokm;
    let led = state.led_suit.expect("a trick in progress always has a led suit");

    let winner = state
        .current_trick
        .iter()
        .max_by_key(|play| trick_strength(play.card, led, trump))
        .map(|play| play.seat)
        .expect("a resolved trick always has four plays");

    let winning_team = team_of(winner);
    state.tricks_won[winning_team.index()] += 1;
    state.current_trick.clear();
    state.led_suit = None;
    state.current_turn = winner;

    let mut events = vec![GameEvent::TrickResolved {
        winner,
        team_tricks: state.tricks_won,
    }];

    let team_reached_seven = state.tricks_won[0] >= TRICKS_TO_WIN_HAND.into()
        || state.tricks_won[1] >= TRICKS_TO_WIN_HAND.into();
    let hand_exhausted = state.tricks_played() >= TRICKS_PER_HAND;

    if team_reached_seven || hand_exhausted {
        events.extend(complete_hand(state));
    }

    events
}

/// Relative strength of a card within a resolving trick: trump always beats
/// non-trump; otherwise only cards of the led suit can win, ranked by rank.
fn trick_strength(card: Card, led_suit: Suit, trump: Option<Suit>) -> (u8, u8) {
    let is_trump = trump == Some(card.suit);
    let follows_led = card.suit == led_suit;
    let tier = if is_trump {
        2
    } else if follows_led {
        1
    } else {
        0
    };
    (tier, card.rank as u8)
}

/// Awards the hand to whichever team holds more tricks, increments that
/// team's `rounds_won`, and either ends the game or starts the next hand.
fn complete_hand(state: &mut GameState) -> Vec<GameEvent> {
    let winning_team = if state.tricks_won[0] > state.tricks_won[1] {
        Team::A
    } else {
        Team::B
    };
    state.rounds_won[winning_team.index()] += 1;
    state.phase = GamePhase::HandComplete;

    let mut events = vec![
        GameEvent::HandComplete {
            winning_team,
            rounds_won: state.rounds_won,
        },
        GameEvent::PhaseChanged {
            phase: state.phase,
        },
    ];

    if state.rounds_won[winning_team.index()] >= ROUNDS_TO_WIN_GAME {
        state.phase = GamePhase::GameOver;
        events.push(GameEvent::GameOver {
            winning_team,
            final_scores: state.rounds_won,
        });
        events.push(GameEvent::PhaseChanged {
            phase: state.phase,
        });
        return events;
    }

    // Next hand: rotate the hakem to a seat on the winning team, reshuffle, redeal.
    let next_hakem = next_hakem_on_team(state.hakem, winning_team);
    state.hakem = 0;
    state.hokm = None;
    state.tricks_won = [0, 0];
    state.played_cards.clear();
    rotate_seating_to(state, next_hakem);
    events.extend(deal_initial(state, &mut rand::rng()));
    events
}

/// Picks the seat on `team`, starting just after `previous_hakem`, that will
/// open the next hand. With the fixed team convention this is simply the
/// next seat of that parity.
fn next_hakem_on_team(previous_hakem: Seat, team: Team) -> Seat {
    let mut candidate = next_seat(previous_hakem);
    while team_of(candidate) != team {
        candidate = next_seat(candidate);
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Rank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn full_room() -> GameState {
        let mut state = GameState::new(Utc::now());
        for id in 1..=4 {
            join(&mut state, id).unwrap();
        }
        state
    }

    #[test]
    fn joining_four_players_reaches_hokm_selection() {
        let state = full_room();
        assert_eq!(state.phase, GamePhase::HokmSelection);
        for seat in 0..4 {
            assert_eq!(state.hands[seat].len(), INITIAL_DEAL_SIZE);
        }
    }

    #[test]
    fn fifth_join_is_rejected() {
        let mut state = full_room();
        let err = join(&mut state, 999).unwrap_err();
        assert_eq!(err, GameError::RoomFull);
    }

    #[test]
    fn hokm_selection_requires_hakem() {
        let mut state = full_room();
        let not_hakem = state
            .seating
            .iter()
            .position(|&s| s != state.seating[state.hakem])
            .unwrap();
        let impostor = state.seating[not_hakem].unwrap();
        let err = select_hokm(&mut state, impostor, "hearts").unwrap_err();
        assert_eq!(err, GameError::NotHakem);
    }

    #[test]
    fn hokm_selection_deals_remaining_cards() {
        let mut state = full_room();
        let hakem_id = state.seating[state.hakem].unwrap();
        select_hokm(&mut state, hakem_id, "Spades").unwrap();
        assert_eq!(state.phase, GamePhase::Gameplay);
        assert_eq!(state.hokm, Some(Suit::Spades));
        for seat in 0..4 {
            assert_eq!(state.hands[seat].len(), CARDS_PER_HAND);
        }
        assert_eq!(state.current_turn, state.hakem);
    }

    #[test]
    fn must_follow_suit_is_enforced() {
        let mut state = full_room();
        let hakem_id = state.seating[state.hakem].unwrap();
        select_hokm(&mut state, hakem_id, "spades").unwrap();

        let leader = state.current_turn;
        state.hands[leader] = vec![Card::new(Rank::Ace, Suit::Hearts)];
        apply_play(&mut state, leader, Card::new(Rank::Ace, Suit::Hearts)).unwrap();

        let next = state.current_turn;
        state.hands[next] = vec![
            Card::new(Rank::Two, Suit::Hearts),
            Card::new(Rank::King, Suit::Clubs),
        ];

        let err = validate_play(&state, next, Card::new(Rank::King, Suit::Clubs)).unwrap_err();
        assert_eq!(err, GameError::MustFollowSuit);

        apply_play(&mut state, next, Card::new(Rank::Two, Suit::Hearts)).unwrap();
        assert_eq!(state.current_trick.len(), 2);
    }

    #[test]
    fn trump_beats_led_suit() {
        let mut state = full_room();
        let hakem_id = state.seating[state.hakem].unwrap();
        select_hokm(&mut state, hakem_id, "spades").unwrap();

        let seats_in_order = [
            state.current_turn,
            next_seat(state.current_turn),
            next_seat(next_seat(state.current_turn)),
            next_seat(next_seat(next_seat(state.current_turn))),
        ];
        let plays = [
            Card::new(Rank::Ace, Suit::Diamonds),
            Card::new(Rank::King, Suit::Diamonds),
            Card::new(Rank::Two, Suit::Spades),
            Card::new(Rank::Queen, Suit::Diamonds),
        ];
        for (seat, card) in seats_in_order.iter().zip(plays.iter()) {
            state.hands[*seat] = vec![*card];
        }
        for (seat, card) in seats_in_order.iter().zip(plays.iter()) {
            apply_play(&mut state, *seat, *card).unwrap();
        }

        assert_eq!(state.current_turn, seats_in_order[2]);
        assert_eq!(state.tricks_won[team_of(seats_in_order[2]).index()], 1);
    }

    #[test]
    fn hand_completes_at_seven_tricks() {
        let mut state = full_room();
        let hakem_id = state.seating[state.hakem].unwrap();
        select_hokm(&mut state, hakem_id, "spades").unwrap();
        state.tricks_won = [6, 0];
        state.played_cards = vec![
            TrickPlay {
                seat: 0,
                card: Card::new(Rank::Two, Suit::Hearts)
            };
            48
        ];

        let seats_in_order = [
            state.current_turn,
            next_seat(state.current_turn),
            next_seat(next_seat(state.current_turn)),
            next_seat(next_seat(next_seat(state.current_turn))),
        ];
        let winner_seat = seats_in_order[0];
        let plays = [
            Card::new(Rank::Ace, Suit::Diamonds),
            Card::new(Rank::King, Suit::Diamonds),
            Card::new(Rank::Two, Suit::Diamonds),
            Card::new(Rank::Queen, Suit::Diamonds),
        ];
        for (seat, card) in seats_in_order.iter().zip(plays.iter()) {
            state.hands[*seat] = vec![*card];
        }
        for (seat, card) in seats_in_order.iter().zip(plays.iter()) {
            apply_play(&mut state, *seat, *card).unwrap();
        }

        assert_eq!(state.rounds_won[team_of(winner_seat).index()], 1);
    }

    #[test]
    fn game_over_blocks_further_play() {
        let mut state = full_room();
        state.phase = GamePhase::GameOver;
        let err = validate_play(&state, 0, Card::new(Rank::Two, Suit::Hearts)).unwrap_err();
        assert_eq!(err, GameError::WrongPhase);
    }

    #[test]
    fn deal_is_deterministic_given_a_seeded_rng() {
        let mut a = GameState::new(Utc::now());
        for id in 1..=4 {
            a.seating[id as usize - 1] = Some(id);
        }
        a.phase = GamePhase::WaitingForPlayers;
        let mut rng_a = seeded(42);
        assign_teams_and_hakem(&mut a, &mut rng_a);
        let mut rng_deal_a = seeded(7);
        deal_initial(&mut a, &mut rng_deal_a);

        let mut b = GameState::new(Utc::now());
        for id in 1..=4 {
            b.seating[id as usize - 1] = Some(id);
        }
        b.phase = GamePhase::WaitingForPlayers;
        let mut rng_b = seeded(42);
        assign_teams_and_hakem(&mut b, &mut rng_b);
        let mut rng_deal_b = seeded(7);
        deal_initial(&mut b, &mut rng_deal_b);

        assert_eq!(a.hands, b.hands);
    }
}
