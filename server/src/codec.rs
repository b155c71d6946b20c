//! Flat, storage-friendly representation of [`GameState`].
//!
//! Positions travel as explicit `[x, y]` pairs so the record means the same
//! thing in JSON, in a JSONB column or in any other serde format. Required
//! fields are modelled as `Option` on the wire so a missing field is reported
//! as [`EngineError::MalformedState`] instead of a generic parse error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::engine::{Direction, GameRules, GameState, Position};
use crate::errors::EngineError;

/// Persisted / API form of a game state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub snake: Option<Vec<[i32; 2]>>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub food: Option<[i32; 2]>,
    #[serde(default)]
    pub obstacles: Option<Vec<[i32; 2]>>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub speed: Option<u32>,
    #[serde(default)]
    pub high_score: Option<u32>,
    #[serde(default)]
    pub game_over: Option<bool>,
    #[serde(default)]
    pub paused: Option<bool>,
    #[serde(default)]
    pub moves_count: Option<u32>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, EngineError> {
    value.ok_or_else(|| EngineError::malformed(format!("missing required field `{field}`")))
}

/// Converts between [`GameState`] and [`StateRecord`].
///
/// Decoding needs the rules because an absent `speed` falls back to the
/// profile's base speed.
#[derive(Debug, Clone, Default)]
pub struct StateCodec {
    rules: GameRules,
}

impl StateCodec {
    pub fn new(rules: GameRules) -> Self {
        Self { rules }
    }

    pub fn encode(&self, state: &GameState) -> StateRecord {
        StateRecord {
            id: Some(state.id.clone()),
            width: Some(state.width),
            height: Some(state.height),
            snake: Some(state.snake.iter().map(|&p| p.into()).collect()),
            direction: Some(state.direction.as_str().to_string()),
            food: Some(state.food.into()),
            obstacles: Some(state.obstacles.iter().map(|&p| p.into()).collect()),
            score: Some(state.score),
            level: Some(state.level),
            speed: Some(state.speed),
            high_score: Some(state.high_score),
            game_over: Some(state.game_over),
            paused: Some(state.paused),
            moves_count: Some(state.moves_count),
        }
    }

    pub fn decode(&self, record: StateRecord) -> Result<GameState, EngineError> {
        let id = required(record.id, "id")?;
        let width = required(record.width, "width")?;
        let height = required(record.height, "height")?;
        let snake = required(record.snake, "snake")?;
        let direction = required(record.direction, "direction")?;
        let food = required(record.food, "food")?;
        let game_over = required(record.game_over, "game_over")?;

        let direction = direction
            .parse::<Direction>()
            .map_err(|e| EngineError::malformed(e.to_string()))?;

        let mut obstacles = BTreeSet::new();
        for pair in record.obstacles.unwrap_or_default() {
            let pos = Position::from(pair);
            if !obstacles.insert(pos) {
                return Err(EngineError::malformed(format!(
                    "duplicate obstacle ({}, {})",
                    pos.x, pos.y
                )));
            }
        }

        let state = GameState {
            id,
            width,
            height,
            snake: snake.into_iter().map(Position::from).collect::<VecDeque<_>>(),
            direction,
            food: food.into(),
            obstacles,
            score: record.score.unwrap_or(0),
            level: record.level.unwrap_or(1),
            speed: record.speed.unwrap_or(self.rules.base_speed),
            high_score: record.high_score.unwrap_or(0),
            game_over,
            paused: record.paused.unwrap_or(false),
            moves_count: record.moves_count.unwrap_or(0),
        };

        state.check_invariants().map_err(EngineError::MalformedState)?;
        Ok(state)
    }

    pub fn to_json(&self, state: &GameState) -> serde_json::Value {
        // A record of plain strings, integers and arrays always serializes
        serde_json::to_value(self.encode(state)).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(&self, value: serde_json::Value) -> Result<GameState, EngineError> {
        let record: StateRecord = serde_json::from_value(value)
            .map_err(|e| EngineError::malformed(format!("invalid state record: {e}")))?;
        self.decode(record)
    }
}
