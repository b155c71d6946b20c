// Snake Game Engine
// This module implements the rules for a single-player, server-authoritative snake game

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use uuid::Uuid;

use crate::errors::EngineError;

pub mod game_state;
pub mod rng;
pub mod rules;


pub use game_state::{Direction, GameState, Position, UnknownDirection};
pub use rng::{PositionSource, SeededPositions};
#[cfg(test)]
pub use rng::ScriptedPositions;
pub use rules::{GameRules, RuleProfile};

const SESSION_ID_PREFIX: &str = "session_";

/// Generate an opaque session identifier.
pub fn new_session_id() -> String {
    format!("{}{}", SESSION_ID_PREFIX, Uuid::new_v4().simple())
}

// Transition rules every engine variant implements. Each call applies at most
// one transition; the caller owns persistence and sequencing.
pub trait GameEngine {
    fn create(
        &self,
        width: i32,
        height: i32,
        max_obstacles: usize,
        session_id: Option<String>,
        rng: &mut dyn PositionSource,
    ) -> Result<GameState, EngineError>;
    fn change_direction(&self, state: &mut GameState, requested: Direction);
    fn move_snake(&self, state: &mut GameState, rng: &mut dyn PositionSource) -> MoveOutcome;
    fn reset(
        &self,
        state: &GameState,
        rng: &mut dyn PositionSource,
    ) -> Result<GameState, EngineError>;
    fn toggle_pause(&self, state: &mut GameState);
}

// What a single move did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Game already over or paused; nothing changed.
    Ignored,
    Moved,
    AteFood { levels_gained: u32 },
    Collided { cause: DeathCause },
}

impl MoveOutcome {
    pub fn food_eaten(&self) -> bool {
        matches!(self, MoveOutcome::AteFood { .. })
    }

    pub fn collision(&self) -> Option<DeathCause> {
        match self {
            MoveOutcome::Collided { cause } => Some(*cause),
            _ => None,
        }
    }
}

// Reasons a game can end on a move, in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    WallCollision,
    SelfCollision,
    ObstacleCollision,
}

// Standard snake engine, parameterised by its rules
#[derive(Debug, Clone, Default)]
pub struct StandardEngine {
    rules: GameRules,
}

impl StandardEngine {
    pub fn new(rules: GameRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Apply a raw direction token. Unrecognized tokens are ignored.
    pub fn change_direction_token(&self, state: &mut GameState, token: &str) {
        match token.parse::<Direction>() {
            Ok(direction) => self.change_direction(state, direction),
            Err(e) => tracing::debug!(session_id = %state.id, error = %e, "Ignoring direction token"),
        }
    }

    fn build_state(
        &self,
        id: String,
        width: i32,
        height: i32,
        max_obstacles: usize,
        high_score: u32,
        rng: &mut dyn PositionSource,
    ) -> Result<GameState, EngineError> {
        self.rules.validate()?;

        if width <= 0 || height <= 0 {
            return Err(EngineError::config(format!(
                "grid must be positive, got {width}x{height}"
            )));
        }

        let obstacle_count = if self.rules.obstacles_enabled {
            max_obstacles
        } else {
            0
        };

        // Room is needed for the snake, the food and every obstacle
        let cells = i64::from(width) * i64::from(height);
        if obstacle_count as i64 >= cells - 1 {
            return Err(EngineError::config(format!(
                "{obstacle_count} obstacles leave no room on a {width}x{height} grid"
            )));
        }

        let start = Position::new(width / 2, height / 2);

        let mut obstacles = BTreeSet::new();
        while obstacles.len() < obstacle_count {
            let pos = rng::sample_free(rng, width, height, |p| {
                *p == start || obstacles.contains(p)
            });
            obstacles.insert(pos);
        }

        let food = rng::sample_free(rng, width, height, |p| {
            *p == start || obstacles.contains(p)
        });

        Ok(GameState {
            id,
            width,
            height,
            snake: VecDeque::from([start]),
            direction: Direction::Right,
            food,
            obstacles,
            score: 0,
            level: 1,
            speed: self.rules.base_speed,
            high_score,
            game_over: false,
            paused: false,
            moves_count: 0,
        })
    }

    fn end_game(&self, state: &mut GameState) {
        state.high_score = state.high_score.max(state.score);
        state.game_over = true;
    }

    fn detect_collision(&self, state: &GameState, new_head: &Position) -> Option<DeathCause> {
        if !state.in_bounds(new_head) {
            Some(DeathCause::WallCollision)
        } else if state.snake.contains(new_head) {
            Some(DeathCause::SelfCollision)
        } else if state.obstacles.contains(new_head) {
            Some(DeathCause::ObstacleCollision)
        } else {
            None
        }
    }
}

impl GameEngine for StandardEngine {
    fn create(
        &self,
        width: i32,
        height: i32,
        max_obstacles: usize,
        session_id: Option<String>,
        rng: &mut dyn PositionSource,
    ) -> Result<GameState, EngineError> {
        let id = session_id.unwrap_or_else(new_session_id);
        self.build_state(id, width, height, max_obstacles, 0, rng)
    }

    fn change_direction(&self, state: &mut GameState, requested: Direction) {
        // Reversing in place would run the head straight into the neck
        if requested == state.direction.opposite() {
            return;
        }
        state.direction = requested;
    }

    fn move_snake(&self, state: &mut GameState, rng: &mut dyn PositionSource) -> MoveOutcome {
        if state.game_over || state.paused {
            return MoveOutcome::Ignored;
        }

        let new_head = state.head().apply_direction(state.direction);

        if let Some(cause) = self.detect_collision(state, &new_head) {
            self.end_game(state);
            tracing::debug!(
                session_id = %state.id,
                ?cause,
                x = new_head.x,
                y = new_head.y,
                score = state.score,
                "Game over"
            );
            return MoveOutcome::Collided { cause };
        }

        state.snake.push_front(new_head);
        state.moves_count += 1;

        if new_head != state.food {
            state.snake.pop_back();
            return MoveOutcome::Moved;
        }

        let previous = state.score;
        state.score = state.score.saturating_add(self.rules.food_reward);

        let mut levels_gained = 0;
        for _ in 0..self.rules.levels_gained(previous, state.score) {
            // Progression stops once the speed bottoms out
            if !self.rules.can_level_up(state.speed) {
                break;
            }
            state.level += 1;
            state.speed = self.rules.next_speed(state.speed);
            levels_gained += 1;
        }
        if levels_gained > 0 {
            tracing::debug!(
                session_id = %state.id,
                level = state.level,
                speed = state.speed,
                "Level up"
            );
        }

        if state.free_cells() == 0 {
            self.end_game(state);
            tracing::debug!(session_id = %state.id, score = state.score, "Board filled");
        } else {
            let food = rng::sample_free(rng, state.width, state.height, |p| {
                state.is_occupied(p)
            });
            state.food = food;
        }

        MoveOutcome::AteFood { levels_gained }
    }

    fn reset(
        &self,
        state: &GameState,
        rng: &mut dyn PositionSource,
    ) -> Result<GameState, EngineError> {
        let high_score = state.high_score.max(state.score);
        self.build_state(
            state.id.clone(),
            state.width,
            state.height,
            state.obstacles.len(),
            high_score,
            rng,
        )
    }

    fn toggle_pause(&self, state: &mut GameState) {
        if !self.rules.pause_enabled {
            tracing::debug!(session_id = %state.id, "Pause disabled, ignoring toggle");
            return;
        }
        state.paused = !state.paused;
    }
}
