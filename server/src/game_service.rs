use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

use crate::codec::StateCodec;
use crate::config::AppConfig;
use crate::engine::{
    Direction, GameEngine, GameRules, GameState, MoveOutcome, SeededPositions, StandardEngine,
    new_session_id,
};
use crate::errors::{EngineError, OrNotFound as _, ServiceError, ServiceResult};
use crate::models::{ScoreBoard, ScoreEntry, SessionRecord, SessionStore};

const DEFAULT_HIGH_SCORE_LIMIT: usize = 10;

/// Parameters for a new game. Everything unset falls back to configuration.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StartGame {
    /// Reuse (and overwrite) this session id instead of generating one
    pub session_id: Option<String>,
    pub player_name: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub obstacles: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveResponse {
    #[serde(rename = "game_state")]
    pub session: SessionRecord,
    pub food_eaten: bool,
    pub outcome: MoveOutcome,
}

type SessionLock = Arc<tokio::sync::Mutex<()>>;
type LockMap = Mutex<HashMap<String, SessionLock>>;

// Holds one session's lock. The map entry is dropped with the last holder so
// the map only tracks sessions that are in use.
struct SessionGuard<'a> {
    locks: &'a LockMap,
    session_id: String,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.session_id);
        }
    }
}

/// Loads a session, applies one engine transition and stores the result.
///
/// Operations on the same session id are serialized through a per-session
/// lock, so two concurrent moves never read the same stored state.
pub struct GameService<S, B> {
    engine: StandardEngine,
    codec: StateCodec,
    sessions: S,
    scores: B,
    width: i32,
    height: i32,
    obstacles: usize,
    rng: Mutex<SeededPositions>,
    locks: LockMap,
}

impl<S, B> GameService<S, B>
where
    S: SessionStore,
    B: ScoreBoard,
{
    pub fn new(config: &AppConfig, sessions: S, scores: B) -> Result<Self, EngineError> {
        config.validate()?;

        let rules = config.rules();
        let (width, height) = config.dimensions();
        let rng = match config.game.rng_seed {
            Some(seed) => SeededPositions::new(seed),
            None => SeededPositions::from_entropy(),
        };

        Ok(Self {
            engine: StandardEngine::new(rules.clone()),
            codec: StateCodec::new(rules),
            sessions,
            scores,
            width,
            height,
            obstacles: config.game.obstacles,
            rng: Mutex::new(rng),
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn rules(&self) -> &GameRules {
        self.engine.rules()
    }

    pub fn codec(&self) -> &StateCodec {
        &self.codec
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    /// Number of session ids with a lock currently held or awaited.
    pub fn active_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn lock_session(&self, session_id: &str) -> SessionGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(session_id.to_string()).or_default().clone()
        };

        let mut guard = SessionGuard {
            locks: &self.locks,
            session_id: session_id.to_string(),
            guard: None,
        };
        guard.guard = Some(lock.lock_owned().await);
        guard
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut SeededPositions) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    async fn load(&self, session_id: &str) -> ServiceResult<(SessionRecord, GameState)> {
        let record = self.sessions.get(session_id).await?.or_not_found(session_id)?;
        let state = self.codec.decode(record.state.clone())?;
        Ok((record, state))
    }

    async fn save(
        &self,
        state: &GameState,
        player_name: Option<String>,
    ) -> ServiceResult<SessionRecord> {
        let record = SessionRecord::new(self.codec.encode(state), player_name);
        Ok(self.sessions.put(record).await?)
    }

    #[tracing::instrument(skip(self), err)]
    pub async fn start_game(&self, request: StartGame) -> ServiceResult<SessionRecord> {
        let session_id = request.session_id.unwrap_or_else(new_session_id);
        let _guard = self.lock_session(&session_id).await;

        let player_name = match request.player_name.filter(|name| !name.trim().is_empty()) {
            Some(name) => Some(name),
            None => self
                .sessions
                .get(&session_id)
                .await?
                .and_then(|existing| existing.player_name),
        };

        let width = request.width.unwrap_or(self.width);
        let height = request.height.unwrap_or(self.height);
        let obstacles = request.obstacles.unwrap_or(self.obstacles);

        let state = self.with_rng(|rng| {
            self.engine
                .create(width, height, obstacles, Some(session_id.clone()), rng)
        })?;

        let record = self.save(&state, player_name).await?;
        info!(
            session_id = %state.id,
            width,
            height,
            obstacles = state.obstacles.len(),
            "Started game"
        );
        Ok(record)
    }

    /// Optionally turn, then advance one step.
    #[tracing::instrument(skip(self), err)]
    pub async fn make_move(
        &self,
        session_id: &str,
        direction: Option<Direction>,
    ) -> ServiceResult<MoveResponse> {
        let _guard = self.lock_session(session_id).await;

        let (record, mut state) = self.load(session_id).await?;

        if let Some(direction) = direction {
            self.engine.change_direction(&mut state, direction);
        }
        let outcome = self.with_rng(|rng| self.engine.move_snake(&mut state, rng));

        let session = self.save(&state, record.player_name).await?;
        Ok(MoveResponse {
            session,
            food_eaten: outcome.food_eaten(),
            outcome,
        })
    }

    #[tracing::instrument(skip(self), err)]
    pub async fn get_state(&self, session_id: &str) -> ServiceResult<SessionRecord> {
        let (record, _) = self.load(session_id).await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self), err)]
    pub async fn reset_game(&self, session_id: &str) -> ServiceResult<SessionRecord> {
        let _guard = self.lock_session(session_id).await;

        let (record, state) = self.load(session_id).await?;
        let fresh = self.with_rng(|rng| self.engine.reset(&state, rng))?;

        let session = self.save(&fresh, record.player_name).await?;
        info!(session_id, high_score = fresh.high_score, "Reset game");
        Ok(session)
    }

    #[tracing::instrument(skip(self), err)]
    pub async fn toggle_pause(&self, session_id: &str) -> ServiceResult<SessionRecord> {
        let _guard = self.lock_session(session_id).await;

        let (record, mut state) = self.load(session_id).await?;
        self.engine.toggle_pause(&mut state);
        self.save(&state, record.player_name).await
    }

    #[tracing::instrument(skip(self), err)]
    pub async fn submit_score(
        &self,
        player_name: &str,
        score: u32,
        level: u32,
        duration_seconds: u32,
    ) -> ServiceResult<ScoreEntry> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "player name must not be empty".to_string(),
            ));
        }
        if level == 0 {
            return Err(ServiceError::InvalidRequest(
                "level starts at 1".to_string(),
            ));
        }

        let entry = self
            .scores
            .insert(player_name, score, level, duration_seconds)
            .await?;
        info!(player_name, score, level, "Recorded high score");
        Ok(entry)
    }

    pub async fn high_scores(&self, limit: Option<usize>) -> ServiceResult<Vec<ScoreEntry>> {
        let limit = limit.unwrap_or(DEFAULT_HIGH_SCORE_LIMIT);
        Ok(self.scores.top_n(limit).await?)
    }
}
