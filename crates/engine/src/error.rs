//! The module contains the error the engine can throw.
//!
//! Every operation runs inside one database transaction, so any of these
//! errors aborts the whole operation and nothing is written.
//!
//! - [`KeyNotFound`] a referenced order, item, ingredient, account or
//!   financial year does not exist.
//! - [`Validation`] the input breaks a local invariant.
//! - [`StateConflict`] the entity status does not allow the operation.
//! - [`InsufficientStock`] a deduction would push stock below zero.
//! - [`WriteConflict`] a concurrent writer changed the row first.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Validation`]: EngineError::Validation
//!  [`StateConflict`]: EngineError::StateConflict
//!  [`InsufficientStock`]: EngineError::InsufficientStock
//!  [`WriteConflict`]: EngineError::WriteConflict
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Unbalanced transaction: debit {debit} != credit {credit}")]
    UnbalancedTransaction { debit: i64, credit: i64 },
    #[error("State conflict: {0}")]
    StateConflict(String),
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),
    #[error("Write conflict: {0}")]
    WriteConflict(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (
                Self::UnbalancedTransaction {
                    debit: da,
                    credit: ca,
                },
                Self::UnbalancedTransaction {
                    debit: db,
                    credit: cb,
                },
            ) => da == db && ca == cb,
            (Self::StateConflict(a), Self::StateConflict(b)) => a == b,
            (Self::InsufficientStock(a), Self::InsufficientStock(b)) => a == b,
            (Self::WriteConflict(a), Self::WriteConflict(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
