/// Failures raised by the engine and the state codec.
///
/// Collisions, a finished game and a paused game are not errors; they show up
/// as state fields and move outcomes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("malformed state: {0}")]
    MalformedState(String),
}

impl EngineError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration(message.into())
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        EngineError::MalformedState(message.into())
    }
}

/// Errors surfaced by [`crate::game_service::GameService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("game session not found: {0}")]
    SessionNotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("storage failure: {0:?}")]
    Storage(color_eyre::Report),
}

impl From<color_eyre::Report> for ServiceError {
    fn from(err: color_eyre::Report) -> Self {
        ServiceError::Storage(err)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub(crate) trait OrNotFound<T> {
    fn or_not_found(self, session_id: &str) -> ServiceResult<T>;
}

impl<T> OrNotFound<T> for Option<T> {
    fn or_not_found(self, session_id: &str) -> ServiceResult<T> {
        match self {
            Some(val) => Ok(val),
            None => Err(ServiceError::SessionNotFound(session_id.to_string())),
        }
    }
}
