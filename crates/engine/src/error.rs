//! The module contains the errors the engine can return.
//!
//! The taxonomy is deliberately small:
//!
//! - [`Validation`] rejected input, surfaced to the caller for correction.
//! - [`NotFound`] a referenced entity does not exist (or was already consumed).
//! - [`PermissionDenied`] the message inbox refused access.
//! - [`Inbox`] the message inbox failed for another reason.
//! - [`Database`] a storage failure; the whole unit of work was rolled back.
//!
//! [`Validation`]: EngineError::Validation
//! [`NotFound`]: EngineError::NotFound
//! [`PermissionDenied`]: EngineError::PermissionDenied
//! [`Inbox`]: EngineError::Inbox
//! [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Inbox access denied: {0}")]
    PermissionDenied(String),
    #[error("Inbox unavailable: {0}")]
    Inbox(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::Inbox(a), Self::Inbox(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
