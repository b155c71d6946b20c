// Game state representation for a single snake session

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

// 2D cell on the grid. Signed so a head stepping off the board is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn apply_direction(&self, direction: Direction) -> Position {
        match direction {
            Direction::Up => Position::new(self.x, self.y - 1),
            Direction::Down => Position::new(self.x, self.y + 1),
            Direction::Left => Position::new(self.x - 1, self.y),
            Direction::Right => Position::new(self.x + 1, self.y),
        }
    }

    pub fn in_bounds(&self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.x < width && self.y >= 0 && self.y < height
    }
}

impl From<[i32; 2]> for Position {
    fn from([x, y]: [i32; 2]) -> Self {
        Position::new(x, y)
    }
}

impl From<Position> for [i32; 2] {
    fn from(pos: Position) -> Self {
        [pos.x, pos.y]
    }
}

// Movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction: {0:?}")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

/// Authoritative state of one game.
///
/// The snake is stored head-first. Fields are public so callers (and tests)
/// can stage positions directly; [`GameState::check_invariants`] is what the
/// codec runs before handing a decoded state back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub id: String,
    pub width: i32,
    pub height: i32,
    pub snake: VecDeque<Position>,
    pub direction: Direction,
    pub food: Position,
    pub obstacles: BTreeSet<Position>,
    pub score: u32,
    pub level: u32,
    pub speed: u32,
    pub high_score: u32,
    pub game_over: bool,
    pub paused: bool,
    pub moves_count: u32,
}

impl GameState {
    pub fn head(&self) -> Position {
        // Length >= 1 is an invariant of every constructed state
        self.snake[0]
    }

    pub fn len(&self) -> usize {
        self.snake.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snake.is_empty()
    }

    pub fn in_bounds(&self, pos: &Position) -> bool {
        pos.in_bounds(self.width, self.height)
    }

    pub fn is_occupied(&self, pos: &Position) -> bool {
        self.snake.contains(pos) || self.obstacles.contains(pos)
    }

    /// Number of cells not covered by the snake or an obstacle.
    pub fn free_cells(&self) -> usize {
        let total = self.width as usize * self.height as usize;
        total.saturating_sub(self.snake.len() + self.obstacles.len())
    }

    /// Check the structural invariants of the state, returning a description
    /// of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.width <= 0 || self.height <= 0 {
            return Err(format!(
                "grid must be positive, got {}x{}",
                self.width, self.height
            ));
        }
        if self.snake.is_empty() {
            return Err("snake has no segments".to_string());
        }

        let mut seen = BTreeSet::new();
        for segment in &self.snake {
            if !self.in_bounds(segment) {
                return Err(format!(
                    "snake segment ({}, {}) is outside the grid",
                    segment.x, segment.y
                ));
            }
            if !seen.insert(*segment) {
                return Err(format!(
                    "duplicate snake segment ({}, {})",
                    segment.x, segment.y
                ));
            }
        }

        for obstacle in &self.obstacles {
            if !self.in_bounds(obstacle) {
                return Err(format!(
                    "obstacle ({}, {}) is outside the grid",
                    obstacle.x, obstacle.y
                ));
            }
            if seen.contains(obstacle) {
                return Err(format!(
                    "obstacle ({}, {}) overlaps the snake",
                    obstacle.x, obstacle.y
                ));
            }
        }

        if !self.in_bounds(&self.food) {
            return Err(format!(
                "food ({}, {}) is outside the grid",
                self.food.x, self.food.y
            ));
        }
        // A filled board ends the game with the last food under the snake
        if !self.game_over && self.is_occupied(&self.food) {
            return Err(format!(
                "food ({}, {}) overlaps the snake or an obstacle",
                self.food.x, self.food.y
            ));
        }

        if self.level == 0 {
            return Err("level must be at least 1".to_string());
        }
        if self.speed == 0 {
            return Err("speed must be positive".to_string());
        }

        Ok(())
    }
}
