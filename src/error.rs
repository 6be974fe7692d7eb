use thiserror::Error;

use crate::database::store::StoreError;

/// Error surface of the engine. Callers embedding this crate map `NotFound`
/// and `InvalidState` onto their own 404/409 style responses; `Store` is the
/// bucket for persistence failures that survived retrying.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        log::error!("Store error: {}", error);
        EngineError::Store(error)
    }
}

impl EngineError {
    pub fn not_found(message: impl Into<String>) -> Self {
        EngineError::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        EngineError::InvalidState(message.into())
    }
}
