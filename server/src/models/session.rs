use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::eyre::{Context as _, eyre};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, types::Json};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::codec::StateRecord;

/// A stored game session: the encoded state plus caller-owned metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(flatten)]
    pub state: StateRecord,
    pub player_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(state: StateRecord, player_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            state,
            player_name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.state.id.as_deref()
    }
}

/// Durable key-value storage for sessions.
///
/// `put` is last-write-wins. Serializing concurrent writers to the same
/// session is the caller's job.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> color_eyre::Result<Option<SessionRecord>>;
    async fn put(&self, session: SessionRecord) -> color_eyre::Result<SessionRecord>;
}

fn require_id(session: &SessionRecord) -> color_eyre::Result<String> {
    session
        .id()
        .map(str::to_string)
        .ok_or_else(|| eyre!("Cannot store a session without an id"))
}

// In-process store, used by tests and embedders without a database
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> color_eyre::Result<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn put(&self, mut session: SessionRecord) -> color_eyre::Result<SessionRecord> {
        let id = require_id(&session)?;
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(&id) {
            session.created_at = existing.created_at;
        }
        session.updated_at = Utc::now();

        sessions.insert(id, session.clone());
        Ok(session)
    }
}

#[derive(Debug, FromRow)]
struct GameSessionRow {
    player_name: Option<String>,
    state: Json<StateRecord>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GameSessionRow> for SessionRecord {
    fn from(row: GameSessionRow) -> Self {
        SessionRecord {
            state: row.state.0,
            player_name: row.player_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed session store over the `game_sessions` table.
///
/// The full state lives in a JSONB column; score, level and game_over are
/// mirrored into plain columns so they can be queried directly.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, session_id: &str) -> color_eyre::Result<Option<SessionRecord>> {
        let row: Option<GameSessionRow> = sqlx::query_as(
            r#"
            SELECT player_name, state, created_at, updated_at
            FROM game_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .wrap_err("Failed to fetch game session from database")?;

        Ok(row.map(SessionRecord::from))
    }

    async fn put(&self, session: SessionRecord) -> color_eyre::Result<SessionRecord> {
        let id = require_id(&session)?;
        let score = i32::try_from(session.state.score.unwrap_or(0))
            .wrap_err("Score does not fit the score column")?;
        let level = i32::try_from(session.state.level.unwrap_or(1))
            .wrap_err("Level does not fit the level column")?;
        let game_over = session.state.game_over.unwrap_or(false);

        let row: GameSessionRow = sqlx::query_as(
            r#"
            INSERT INTO game_sessions (id, player_name, score, level, game_over, state)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET
                player_name = EXCLUDED.player_name,
                score = EXCLUDED.score,
                level = EXCLUDED.level,
                game_over = EXCLUDED.game_over,
                state = EXCLUDED.state,
                updated_at = NOW()
            RETURNING player_name, state, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(session.player_name.as_deref())
        .bind(score)
        .bind(level)
        .bind(game_over)
        .bind(Json(&session.state))
        .fetch_one(&self.pool)
        .await
        .wrap_err_with(|| format!("Failed to save game session {id}"))?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> SessionRecord {
        SessionRecord::new(
            StateRecord {
                id: Some(id.to_string()),
                score: Some(10),
                ..StateRecord::default()
            },
            Some("Alice".to_string()),
        )
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.get("session_a").await.unwrap().is_none());

        let saved = store.put(record("session_a")).await.unwrap();
        let loaded = store.get("session_a").await.unwrap().unwrap();

        assert_eq!(saved, loaded);
        assert_eq!(loaded.player_name.as_deref(), Some("Alice"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_keeps_created_at() {
        let store = MemorySessionStore::new();
        let first = store.put(record("session_a")).await.unwrap();

        let mut second = record("session_a");
        second.state.score = Some(20);
        second.created_at = first.created_at + chrono::Duration::days(1);
        let second = store.put(second).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.state.score, Some(20));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_without_id_fails() {
        let store = MemorySessionStore::new();
        let session = SessionRecord::new(StateRecord::default(), None);
        assert!(store.put(session).await.is_err());
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_session_record_serializes_flat() {
        let value = serde_json::to_value(record("session_a")).unwrap();
        assert_eq!(value["id"], serde_json::json!("session_a"));
        assert_eq!(value["score"], serde_json::json!(10));
        assert_eq!(value["player_name"], serde_json::json!("Alice"));
        assert!(value.get("state").is_none());
    }
}
