//! In-memory bus for tests and single-process wiring
//!
//! Best-effort fan-out: each publish spawns one task per registered handler
//! with a 10-second deadline. Handler failures are logged, never retried;
//! there is no dead-letter routing. A closed bus rejects further
//! subscriptions.

use crate::{
    bus::{Delivery, MessageBus, MessageHandler},
    Error, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

const HANDLER_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Default)]
struct Registry {
    subs: HashMap<String, Vec<Arc<dyn MessageHandler>>>,
    closed: bool,
}

/// In-memory message bus
pub struct MemoryBus {
    registry: RwLock<Registry>,
    max_attempts: u32,
}

impl MemoryBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            max_attempts: 3,
        }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<()> {
        let handlers: Vec<Arc<dyn MessageHandler>> = {
            let registry = self.registry.read().await;
            registry.subs.get(topic).cloned().unwrap_or_default()
        };

        for handler in handlers {
            let delivery = Delivery {
                topic: topic.to_string(),
                key: key.to_string(),
                payload: payload.to_vec(),
                attempt: 0,
                max_attempts: self.max_attempts,
            };
            let topic = topic.to_string();

            tokio::spawn(async move {
                match tokio::time::timeout(HANDLER_DEADLINE, handler.handle(delivery)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("[bus] handler error for topic={}: {}", topic, e),
                    Err(_) => warn!(
                        "[bus] handler for topic={} exceeded {:?} deadline",
                        topic, HANDLER_DEADLINE
                    ),
                }
            });
        }

        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let mut registry = self.registry.write().await;
        if registry.closed {
            return Err(Error::Closed);
        }
        registry.subs.entry(topic.to_string()).or_default().push(handler);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut registry = self.registry.write().await;
        registry.closed = true;
        registry.subs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct Recorder {
        tx: mpsc::UnboundedSender<Delivery>,
    }

    #[async_trait]
    impl MessageHandler for Recorder {
        async fn handle(&self, delivery: Delivery) -> Result<()> {
            self.tx.send(delivery).expect("receiver alive");
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl MessageHandler for Failing {
        async fn handle(&self, _delivery: Delivery) -> Result<()> {
            Err(Error::Handler("induced failure".to_string()))
        }
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let bus = MemoryBus::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        bus.subscribe("transaction.created", Arc::new(Recorder { tx: tx_a }))
            .await
            .unwrap();
        bus.subscribe("transaction.created", Arc::new(Recorder { tx: tx_b }))
            .await
            .unwrap();

        bus.publish("transaction.created", "tx-1", b"{}").await.unwrap();

        let got_a = rx_a.recv().await.unwrap();
        let got_b = rx_b.recv().await.unwrap();
        assert_eq!(got_a.key, "tx-1");
        assert_eq!(got_b.key, "tx-1");
        assert_eq!(got_a.attempt, 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = MemoryBus::new();
        assert!(bus.publish("settlement.requested", "tx-1", b"{}").await.is_ok());
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_fail_publish() {
        let bus = MemoryBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        bus.subscribe("settlement.requested", Arc::new(Failing)).await.unwrap();
        bus.subscribe("settlement.requested", Arc::new(Recorder { tx })).await.unwrap();

        assert!(bus.publish("settlement.requested", "tx-2", b"{}").await.is_ok());
        assert_eq!(rx.recv().await.unwrap().key, "tx-2");
    }

    #[tokio::test]
    async fn test_closed_bus_rejects_subscriptions() {
        let bus = MemoryBus::new();
        bus.close().await.unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = bus
            .subscribe("transaction.created", Arc::new(Recorder { tx }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Closed));
    }
}
