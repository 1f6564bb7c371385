//! Repository trait definitions for testability and dependency injection.
//!
//! This module provides a trait-based abstraction over the completed-game
//! cold-store schema the Hybrid Data Layer writes through at `game_over`
//! (completed game sessions, participants, moves, player stats), enabling
//! testing through a mock implementation without a live Postgres instance.
//! Account/credential storage is out of scope here — see [`crate::auth`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

use crate::auth::AuthResult;

/// One seat's participation record in a completed game, as written to the
/// `game_participants` table: player, team, and whether their team won.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameParticipant {
    pub player_id: i64,
    pub seat: i64,
    pub team: i64,
    pub won: bool,
}

/// A completed game, written through at `game_over` so the record is
/// durable before the client is told the game is over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedGameRecord {
    pub room_code: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub winning_team: i64,
    pub final_scores: [i64; 2],
    pub participants: Vec<GameParticipant>,
}

/// Durable per-player statistics, updated via the data layer's batched-update
/// sync policy for `PlayerStats`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub games_played: i64,
    pub games_won: i64,
    pub rating: f64,
}

/// Trait for the completed-game cold-store schema: game sessions,
/// participants, moves, and player statistics. `GameState` and `PlayerHand`
/// never reach this repository — those stay hot-store-only per the routing
/// table.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Write a completed game and its participants. Immutable once written.
    async fn record_completed_game(&self, record: &CompletedGameRecord) -> AuthResult<i64>;

    /// Append one entry to a room's append-only move log (durable mirror of
    /// the hot store's `game:{room_code}:moves`, synced immediately).
    async fn append_move(&self, room_code: &str, seat: i64, card: &str) -> AuthResult<()>;

    /// Read current stats for a player, defaulting to zero if never played.
    async fn get_stats(&self, player_id: i64) -> AuthResult<PlayerStats>;

    /// Apply a batched stats update for a player following a completed game.
    async fn update_stats(&self, player_id: i64, won: bool) -> AuthResult<()>;
}

/// Default PostgreSQL implementation of `GameRepository`.
pub struct PgGameRepository {
    pool: PgPool,
}

impl PgGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameRepository for PgGameRepository {
    async fn record_completed_game(&self, record: &CompletedGameRecord) -> AuthResult<i64> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO game_sessions (room_code, started_at, completed_at, winning_team, final_score_a, final_score_b)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&record.room_code)
        .bind(record.started_at)
        .bind(record.completed_at)
        .bind(record.winning_team)
        .bind(record.final_scores[0])
        .bind(record.final_scores[1])
        .fetch_one(&mut *tx)
        .await?;
        let session_id: i64 = row.get("id");

        for participant in &record.participants {
            sqlx::query(
                "INSERT INTO game_participants (session_id, player_id, seat, team, won)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(session_id)
            .bind(participant.player_id)
            .bind(participant.seat)
            .bind(participant.team)
            .bind(participant.won)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(session_id)
    }

    async fn append_move(&self, room_code: &str, seat: i64, card: &str) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO game_moves (room_code, seat, card, played_at) VALUES ($1, $2, $3, NOW())",
        )
        .bind(room_code)
        .bind(seat)
        .bind(card)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_stats(&self, player_id: i64) -> AuthResult<PlayerStats> {
        let row = sqlx::query(
            "SELECT games_played, games_won, rating FROM player_stats WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|r| PlayerStats {
                games_played: r.get("games_played"),
                games_won: r.get("games_won"),
                rating: r.get("rating"),
            })
            .unwrap_or_default())
    }

    async fn update_stats(&self, player_id: i64, won: bool) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO player_stats (player_id, games_played, games_won, rating)
             VALUES ($1, 1, $2, 1000.0)
             ON CONFLICT (player_id) DO UPDATE SET
                games_played = player_stats.games_played + 1,
                games_won = player_stats.games_won + EXCLUDED.games_won",
        )
        .bind(player_id)
        .bind(if won { 1 } else { 0 })
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Mock implementations for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for [`GameRepository`].
    #[derive(Default)]
    pub struct MockGameRepository {
        games: Mutex<Vec<CompletedGameRecord>>,
        stats: Mutex<HashMap<i64, PlayerStats>>,
        moves: Mutex<Vec<(String, i64, String)>>,
    }

    impl MockGameRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl GameRepository for MockGameRepository {
        async fn record_completed_game(&self, record: &CompletedGameRecord) -> AuthResult<i64> {
            let mut games = self.games.lock().unwrap();
            games.push(record.clone());
            Ok(games.len() as i64)
        }

        async fn append_move(&self, room_code: &str, seat: i64, card: &str) -> AuthResult<()> {
            self.moves
                .lock()
                .unwrap()
                .push((room_code.to_string(), seat, card.to_string()));
            Ok(())
        }

        async fn get_stats(&self, player_id: i64) -> AuthResult<PlayerStats> {
            Ok(self
                .stats
                .lock()
                .unwrap()
                .get(&player_id)
                .copied()
                .unwrap_or_default())
        }

        async fn update_stats(&self, player_id: i64, won: bool) -> AuthResult<()> {
            let mut stats = self.stats.lock().unwrap();
            let entry = stats.entry(player_id).or_default();
            entry.games_played += 1;
            if won {
                entry.games_won += 1;
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_game_repository_records_completed_game() {
            let repo = MockGameRepository::new();
            let record = CompletedGameRecord {
                room_code: "ABCD".to_string(),
                started_at: chrono::Utc::now(),
                completed_at: chrono::Utc::now(),
                winning_team: 0,
                final_scores: [7, 4],
                participants: vec![GameParticipant {
                    player_id: 1,
                    seat: 0,
                    team: 0,
                    won: true,
                }],
            };

            let id = repo.record_completed_game(&record).await.unwrap();
            assert_eq!(id, 1);

            repo.update_stats(1, true).await.unwrap();
            let stats = repo.get_stats(1).await.unwrap();
            assert_eq!(stats.games_played, 1);
            assert_eq!(stats.games_won, 1);
        }
    }
}
