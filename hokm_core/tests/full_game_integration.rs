//! Drives a full four-player game through the Room Coordinator, from the
//! fourth join to `game_over`, without touching any engine internals
//! directly — everything goes through [`RoomHandle`] the way a connection
//! handler would.

use std::collections::HashMap;
use std::sync::Arc;

use hokm_core::data::{HybridDataLayer, InMemoryStore};
use hokm_core::game::GamePhase;
use hokm_core::room::{PrivateSnapshot, RoomActor, RoomHandle};

fn test_data() -> Arc<HybridDataLayer> {
    Arc::new(HybridDataLayer::new(
        Arc::new(InMemoryStore::default()),
        Arc::new(InMemoryStore::default()),
    ))
}

async fn spawn_room(code: &str) -> RoomHandle {
    let (actor, handle) = RoomActor::new(code.to_string(), test_data());
    tokio::spawn(actor.run());
    handle
}

/// Rejoins every player to read back seat, hand, and phase. `rejoin` is
/// side-effect free for an already-seated player, so this is safe to call
/// as often as the test needs a fresh view of the room.
async fn snapshot_all(handle: &RoomHandle, player_ids: &[i64]) -> HashMap<i64, PrivateSnapshot> {
    let mut out = HashMap::new();
    for &id in player_ids {
        out.insert(id, handle.rejoin(id).await.expect("seated player can always rejoin"));
    }
    out
}

fn player_at_seat(snapshots: &HashMap<i64, PrivateSnapshot>, seat: usize) -> (i64, &PrivateSnapshot) {
    snapshots
        .iter()
        .find(|(_, s)| s.seat == seat)
        .map(|(&id, s)| (id, s))
        .expect("every seat is occupied for the life of the game")
}

#[tokio::test]
async fn four_players_play_a_full_game_to_game_over() {
    let handle = spawn_room("FULLGAME1").await;
    let player_ids = [1i64, 2, 3, 4];

    for &id in &player_ids {
        handle.join(id).await.expect("room has space for all four players");
    }

    let mut iterations = 0usize;
    loop {
        iterations += 1;
        assert!(iterations < 10_000, "game should reach game_over well within this many plays");

        let snapshots = snapshot_all(&handle, &player_ids).await;
        let phase = snapshots[&player_ids[0]].phase;

        match phase {
            GamePhase::GameOver => break,
            GamePhase::HokmSelection => {
                let hakem_seat = snapshots[&player_ids[0]].hakem;
                let (hakem_id, hakem_snapshot) = player_at_seat(&snapshots, hakem_seat);
                let suit = hakem_snapshot
                    .hand
                    .first()
                    .expect("the hakem holds cards during hokm_selection")
                    .suit;
                handle
                    .select_hokm(hakem_id, suit.as_wire_str().to_string())
                    .await
                    .expect("the hakem may choose hokm while the phase is hokm_selection");
            }
            GamePhase::Gameplay => {
                let turn_seat = snapshots[&player_ids[0]].current_turn;
                let (player_id, snapshot) = player_at_seat(&snapshots, turn_seat);

                let mut played = false;
                for &card in &snapshot.hand {
                    if handle.play_card(player_id, card).await.is_ok() {
                        played = true;
                        break;
                    }
                }
                assert!(played, "at least one card in a non-empty hand is always legal to play");
            }
            other => panic!("rejoin should never observe the transient phase {other:?}"),
        }
    }

    let final_snapshots = snapshot_all(&handle, &player_ids).await;
    let rounds = final_snapshots[&player_ids[0]].rounds_won;
    assert!(
        rounds[0] >= 7 || rounds[1] >= 7,
        "game_over only fires once a team has won seven hands, got {rounds:?}"
    );
    assert_ne!(rounds[0], rounds[1], "one team must be strictly ahead at game_over");

    for &id in &player_ids {
        let snapshot = &final_snapshots[&id];
        assert_eq!(snapshot.phase, GamePhase::GameOver);
        assert!(snapshot.hand.is_empty(), "no cards remain unplayed once the game is over");
    }
}

#[tokio::test]
async fn fourth_join_assigns_teams_by_seat_parity_and_deals_five_cards_each() {
    let handle = spawn_room("FULLGAME2").await;
    let player_ids = [10i64, 11, 12, 13];
    for &id in &player_ids {
        handle.join(id).await.unwrap();
    }

    let snapshots = snapshot_all(&handle, &player_ids).await;
    for (&id, snapshot) in &snapshots {
        assert_eq!(snapshot.phase, GamePhase::HokmSelection);
        assert_eq!(snapshot.hand.len(), 5, "player {id} should hold five cards before hokm is chosen");
        let expected_team = if snapshot.seat % 2 == 0 {
            hokm_core::game::Team::A
        } else {
            hokm_core::game::Team::B
        };
        assert_eq!(snapshot.teams[snapshot.seat], expected_team);
    }
}

#[tokio::test]
async fn a_fifth_join_is_rejected_once_the_room_is_full() {
    let handle = spawn_room("FULLGAME3").await;
    for id in 1..=4i64 {
        handle.join(id).await.unwrap();
    }

    let err = handle.join(5).await.expect_err("a fifth player cannot join a full room");
    assert!(matches!(
        err,
        hokm_core::room::RoomError::Game(hokm_core::game::GameError::RoomFull)
    ));
}

#[tokio::test]
async fn hand_completion_deals_a_fresh_five_cards_to_the_next_hakem() {
    let handle = spawn_room("FULLGAME4").await;
    let player_ids = [21i64, 22, 23, 24];
    for &id in &player_ids {
        handle.join(id).await.unwrap();
    }

    let before = snapshot_all(&handle, &player_ids).await;
    let first_hakem_seat = before[&player_ids[0]].hakem;
    let (first_hakem_id, _) = player_at_seat(&before, first_hakem_seat);

    loop {
        let snapshots = snapshot_all(&handle, &player_ids).await;
        match snapshots[&player_ids[0]].phase {
            GamePhase::HokmSelection => {
                let (hakem_id, hakem_snapshot) = player_at_seat(&snapshots, snapshots[&player_ids[0]].hakem);
                let suit = hakem_snapshot.hand.first().unwrap().suit;
                handle.select_hokm(hakem_id, suit.as_wire_str().to_string()).await.unwrap();
            }
            GamePhase::Gameplay => {
                let (player_id, snapshot) = player_at_seat(&snapshots, snapshots[&player_ids[0]].current_turn);
                for &card in &snapshot.hand {
                    if handle.play_card(player_id, card).await.is_ok() {
                        break;
                    }
                }
            }
            GamePhase::GameOver => break,
            _ => unreachable!(),
        }

        let after = snapshot_all(&handle, &player_ids).await;
        let hand_just_finished =
            after[&player_ids[0]].rounds_won != before[&player_ids[0]].rounds_won || after[&player_ids[0]].phase == GamePhase::GameOver;
        if hand_just_finished {
            if after[&player_ids[0]].phase != GamePhase::GameOver {
                assert_eq!(after[&player_ids[0]].phase, GamePhase::HokmSelection);
                let (next_hakem_id, _) = player_at_seat(&after, after[&player_ids[0]].hakem);
                assert_ne!(
                    next_hakem_id, first_hakem_id,
                    "the next hand's hakem must be a different player than the one who just won"
                );
                for snapshot in after.values() {
                    assert_eq!(snapshot.hand.len(), 5, "every seat is redealt five cards for the next hand");
                }
            }
            break;
        }
    }
}
