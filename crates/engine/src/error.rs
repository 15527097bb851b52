//! The module contains the error the engine can throw.
//!
//! Every public operation returns [`EngineError`] on failure; callers (the
//! request-handling layer) map the categories onto transport-level status
//! codes. The engine itself never panics past its boundary.
//!
//! Categories:
//!
//! - [`Unauthorized`] the actor lacks the required role; checked before any
//!   data is read so clients cannot probe for existence.
//! - [`Validation`] malformed input; checked before any mutation.
//! - [`StateConflict`] the entity is not in the state required for the
//!   requested transition; detected inside the mutating transaction.
//! - [`KeyNotFound`] thrown when an item is not found.
//! - [`ExistingKey`] a natural key is already taken.
//!
//! [`Unauthorized`]: EngineError::Unauthorized
//! [`Validation`]: EngineError::Validation
//! [`StateConflict`]: EngineError::StateConflict
//! [`KeyNotFound`]: EngineError::KeyNotFound
//! [`ExistingKey`]: EngineError::ExistingKey
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0} access required")]
    Unauthorized(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Conflicting state: {0}")]
    StateConflict(String),
    #[error("\"{0}\" not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::StateConflict(a), Self::StateConflict(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
