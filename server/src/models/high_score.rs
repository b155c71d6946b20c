use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::eyre::Context as _;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tokio::sync::Mutex;

/// One leaderboard entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: i64,
    pub player_name: String,
    pub score: u32,
    pub level: u32,
    /// Game length in seconds
    pub game_duration: u32,
    pub created_at: DateTime<Utc>,
}

/// Append-only ranked store of finished games.
///
/// `top_n` orders by score descending; equal scores keep insertion order.
#[async_trait]
pub trait ScoreBoard: Send + Sync {
    async fn insert(
        &self,
        player_name: &str,
        score: u32,
        level: u32,
        duration_seconds: u32,
    ) -> color_eyre::Result<ScoreEntry>;
    async fn top_n(&self, n: usize) -> color_eyre::Result<Vec<ScoreEntry>>;
}

#[derive(Debug, Default)]
pub struct MemoryScoreBoard {
    entries: Mutex<Vec<ScoreEntry>>,
}

impl MemoryScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoreBoard for MemoryScoreBoard {
    async fn insert(
        &self,
        player_name: &str,
        score: u32,
        level: u32,
        duration_seconds: u32,
    ) -> color_eyre::Result<ScoreEntry> {
        let mut entries = self.entries.lock().await;
        let entry = ScoreEntry {
            id: entries.len() as i64 + 1,
            player_name: player_name.to_string(),
            score,
            level,
            game_duration: duration_seconds,
            created_at: Utc::now(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn top_n(&self, n: usize) -> color_eyre::Result<Vec<ScoreEntry>> {
        let mut ranked = self.entries.lock().await.clone();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        ranked.truncate(n);
        Ok(ranked)
    }
}

#[derive(Debug, FromRow)]
struct HighScoreRow {
    id: i64,
    player_name: String,
    score: i32,
    level: i32,
    game_duration: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<HighScoreRow> for ScoreEntry {
    type Error = color_eyre::Report;

    fn try_from(row: HighScoreRow) -> Result<Self, Self::Error> {
        Ok(ScoreEntry {
            id: row.id,
            player_name: row.player_name,
            score: u32::try_from(row.score).wrap_err("Negative score in high_scores")?,
            level: u32::try_from(row.level).wrap_err("Negative level in high_scores")?,
            game_duration: u32::try_from(row.game_duration)
                .wrap_err("Negative duration in high_scores")?,
            created_at: row.created_at,
        })
    }
}

fn to_column(value: u32, column: &str) -> color_eyre::Result<i32> {
    i32::try_from(value).wrap_err_with(|| format!("{column} does not fit an INTEGER column"))
}

/// Postgres-backed leaderboard over the `high_scores` table
#[derive(Debug, Clone)]
pub struct PgScoreBoard {
    pool: PgPool,
}

impl PgScoreBoard {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreBoard for PgScoreBoard {
    async fn insert(
        &self,
        player_name: &str,
        score: u32,
        level: u32,
        duration_seconds: u32,
    ) -> color_eyre::Result<ScoreEntry> {
        let row: HighScoreRow = sqlx::query_as(
            r#"
            INSERT INTO high_scores (player_name, score, level, game_duration)
            VALUES ($1, $2, $3, $4)
            RETURNING id, player_name, score, level, game_duration, created_at
            "#,
        )
        .bind(player_name)
        .bind(to_column(score, "score")?)
        .bind(to_column(level, "level")?)
        .bind(to_column(duration_seconds, "game_duration")?)
        .fetch_one(&self.pool)
        .await
        .wrap_err("Failed to save high score")?;

        row.try_into()
    }

    async fn top_n(&self, n: usize) -> color_eyre::Result<Vec<ScoreEntry>> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let rows: Vec<HighScoreRow> = sqlx::query_as(
            r#"
            SELECT id, player_name, score, level, game_duration, created_at
            FROM high_scores
            ORDER BY score DESC, id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .wrap_err("Failed to fetch high scores")?;

        rows.into_iter().map(ScoreEntry::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_top_n_orders_by_score() {
        let board = MemoryScoreBoard::new();
        board.insert("Alice", 50, 2, 30).await.unwrap();
        board.insert("Bob", 120, 3, 95).await.unwrap();
        board.insert("Carol", 50, 2, 41).await.unwrap();
        board.insert("Dave", 10, 1, 5).await.unwrap();

        let top = board.top_n(3).await.unwrap();
        let names: Vec<_> = top.iter().map(|e| e.player_name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Alice", "Carol"]);
    }

    #[tokio::test]
    async fn test_insert_returns_entry() {
        let board = MemoryScoreBoard::new();
        let entry = board.insert("Alice", 70, 2, 64).await.unwrap();

        assert_eq!(entry.id, 1);
        assert_eq!(entry.player_name, "Alice");
        assert_eq!(entry.score, 70);
        assert_eq!(entry.level, 2);
        assert_eq!(entry.game_duration, 64);

        assert!(board.top_n(0).await.unwrap().is_empty());
    }

    #[test]
    fn test_negative_row_is_rejected() {
        let row = HighScoreRow {
            id: 1,
            player_name: "Mallory".to_string(),
            score: -5,
            level: 1,
            game_duration: 0,
            created_at: Utc::now(),
        };
        assert!(ScoreEntry::try_from(row).is_err());
    }
}
