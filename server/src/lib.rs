pub mod codec;
pub mod config;
pub mod engine;
pub mod errors;
pub mod game_service;
pub mod models;
pub mod state;

/// Terminal output for the `snake-server` binary
pub mod cli {
    pub mod output;
}

pub use codec::{StateCodec, StateRecord};
pub use errors::{EngineError, ServiceError};
pub use game_service::{GameService, MoveResponse, StartGame};
