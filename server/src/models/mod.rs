pub mod high_score;
pub mod session;

pub use high_score::{MemoryScoreBoard, PgScoreBoard, ScoreBoard, ScoreEntry};
pub use session::{MemorySessionStore, PgSessionStore, SessionRecord, SessionStore};
