use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("unsupported currency: {0}")]
    InvalidCurrency(String),

    #[error("invalid transaction id: {0}")]
    InvalidTransactionId(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("settlement failed permanently after {0} deliveries")]
    RetriesExhausted(u32),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("bus error: {0}")]
    Bus(#[from] message_bus::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("acquirer error: {0}")]
    Acquirer(String),

    #[error("alert delivery error: {0}")]
    Alert(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Validation errors surface to HTTP clients as 400s; everything else
    /// is internal.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidAmount(_) | Error::InvalidCurrency(_) | Error::InvalidTransactionId(_)
        )
    }
}
