use thiserror::Error;

use crate::domain::{ExpenseId, ParticipantId, SettlementError};
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error("Cannot remove participant '{name}': used by {expenses} expense(s)")]
    ParticipantInUse { name: String, expenses: i64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Invalid payer: participant {0} does not belong to this event")]
    InvalidPayer(ParticipantId),

    #[error("Invalid beneficiaries: {0}")]
    InvalidBeneficiaries(String),

    /// The stored event failed the engine's own checks. The message stays
    /// generic; details live in the source chain and the log.
    #[error("Internal error: could not compute settlement")]
    Inconsistent(#[source] SettlementError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EventNotFound(id) => AppError::EventNotFound(id.to_string()),
            StoreError::ParticipantNotFound(id) => AppError::ParticipantNotFound(id),
            StoreError::ExpenseNotFound(id) => AppError::ExpenseNotFound(id),
            StoreError::ParticipantInUse { name, expenses, .. } => {
                AppError::ParticipantInUse { name, expenses }
            }
            StoreError::ForeignPayer(id) => AppError::InvalidPayer(id),
            StoreError::ForeignBeneficiary(id) => AppError::InvalidBeneficiaries(format!(
                "participant {} does not belong to this event",
                id
            )),
            StoreError::NoBeneficiaries => {
                AppError::InvalidBeneficiaries("the event has no participants".to_string())
            }
            StoreError::Backend(err) => AppError::Database(err),
        }
    }
}
