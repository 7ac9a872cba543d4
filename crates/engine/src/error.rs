//! Engine error type

use persistence::DbError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Budget must be positive, got {0}")]
    InvalidBudget(Decimal),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stored record could not be decoded: {0}")]
    Corrupt(String),

    #[error("Price source error: {0}")]
    PriceSource(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

pub type EngineResult<T> = Result<T, EngineError>;
