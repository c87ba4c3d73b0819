//! Topic-based pub/sub for the payment pipeline
//!
//! Provides two bus implementations behind one contract:
//! - JetStream-backed bus with per-subscriber fan-out, bounded redelivery
//!   and per-topic dead-letter routing
//! - In-memory bus for tests and single-process wiring (best-effort fan-out,
//!   no retry, no DLQ)

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod bus;
pub mod client;
pub mod error;
pub mod jetstream;
pub mod memory;
pub mod metrics;

pub use bus::{Delivery, MessageBus, MessageHandler};
pub use client::NatsClient;
pub use error::{Error, Result};
pub use jetstream::{BusConfig, JetStreamBus};
pub use memory::MemoryBus;

/// Dead-letter topic companion for a working topic.
pub fn dlq_topic(topic: &str) -> String {
    format!("dlq.{}", topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dlq_topic_naming() {
        assert_eq!(dlq_topic("settlement.requested"), "dlq.settlement.requested");
    }
}
