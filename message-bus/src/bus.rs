//! Bus contract: publish/subscribe with a typed delivery descriptor

use crate::Result;
use async_trait::async_trait;

/// One delivery of a message to a handler.
///
/// `attempt` counts prior deliveries of the same message to this consumer,
/// so it is 0 on first receipt. Once `attempt` reaches `max_attempts` the
/// bus stops requeueing and routes the payload to the topic's dead-letter
/// companion.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Logical topic the message was published to
    pub topic: String,

    /// Routing key (transaction id for pipeline topics)
    pub key: String,

    /// Opaque payload bytes
    pub payload: Vec<u8>,

    /// Prior deliveries of this message (0 on first receipt)
    pub attempt: u32,

    /// Redelivery budget before dead-lettering
    pub max_attempts: u32,
}

impl Delivery {
    /// True when the redelivery budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Message handler trait
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one delivery. An `Err` return triggers the bus's redelivery
    /// policy; `Ok` acknowledges the message.
    async fn handle(&self, delivery: Delivery) -> Result<()>;
}

/// Bus contract shared by the durable and in-memory implementations
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Deliver `payload` under routing `key` to `topic`. Returns once the
    /// broker has accepted the message.
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<()>;

    /// Register a handler for `topic`. Returns once the subscription is
    /// registered; dispatch happens on background tasks.
    async fn subscribe(&self, topic: &str, handler: std::sync::Arc<dyn MessageHandler>)
        -> Result<()>;

    /// Tear down subscriptions and the underlying connection.
    async fn close(&self) -> Result<()>;
}
