//! Error types for the message bus

use thiserror::Error;

/// Message bus error
#[derive(Debug, Error)]
pub enum Error {
    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Publish error
    #[error("publish error: {0}")]
    Publish(String),

    /// Subscribe error
    #[error("subscribe error: {0}")]
    Subscribe(String),

    /// Stream admin error
    #[error("stream error: {0}")]
    Stream(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Handler failure, propagated back to the ack policy
    #[error("handler error: {0}")]
    Handler(String),

    /// Operation attempted on a closed bus
    #[error("bus is closed")]
    Closed,
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
