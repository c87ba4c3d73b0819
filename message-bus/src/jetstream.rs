//! Durable JetStream bus with bounded redelivery and per-topic DLQ routing
//!
//! Every subscriber gets its own ephemeral consumer on the topic's stream,
//! so each subscriber process sees each message independently. The ack
//! discipline per message:
//! - handler success: ack
//! - handler failure, redelivery budget remaining: Nak (requeue)
//! - handler failure, budget spent: publish the original payload to
//!   `dlq.<topic>` under the same key, then Term
//!
//! The DLQ routing lives here, in one place, so a dead message appears in
//! the dead-letter stream exactly once.

use crate::{
    bus::{Delivery, MessageBus, MessageHandler},
    client::NatsClient,
    dlq_topic,
    metrics::{
        MESSAGE_DLQ_TOTAL, MESSAGE_PROCESS_DURATION, MESSAGE_PUBLISH_TOTAL,
        MESSAGE_RECEIVE_TOTAL,
    },
    Error, Result,
};
use async_nats::jetstream::{self, consumer, AckKind};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Bus configuration
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Redeliveries allowed before a failing message is dead-lettered
    /// (initial delivery not counted)
    pub max_attempts: u32,

    /// How long the broker waits for an ack before redelivering
    pub ack_wait: Duration,

    /// How long an idle ephemeral consumer survives before cleanup
    pub inactive_threshold: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            ack_wait: Duration::from_secs(30),
            inactive_threshold: Duration::from_secs(300),
        }
    }
}

/// JetStream-backed message bus
pub struct JetStreamBus {
    client: NatsClient,
    config: BusConfig,
    consumer_tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl JetStreamBus {
    /// Connect with default configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, BusConfig::default()).await
    }

    /// Connect with explicit configuration.
    pub async fn connect_with_config(url: &str, config: BusConfig) -> Result<Self> {
        let client = NatsClient::connect(url).await?;
        Ok(Self {
            client,
            config,
            consumer_tasks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn subject(topic: &str, key: &str) -> String {
        if key.is_empty() {
            topic.to_string()
        } else {
            format!("{}.{}", topic, key)
        }
    }
}

#[async_trait]
impl MessageBus for JetStreamBus {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        self.client.get_or_create_stream(topic).await?;

        let subject = Self::subject(topic, key);
        let result: Result<()> = async {
            let ack = self
                .client
                .jetstream()
                .publish(subject, Bytes::copy_from_slice(payload))
                .await
                .map_err(|e| Error::Publish(e.to_string()))?;

            // Wait for broker acknowledgment
            ack.await.map_err(|e| Error::Publish(e.to_string()))?;
            Ok(())
        }
        .await;

        let status = if result.is_ok() { "success" } else { "error" };
        MESSAGE_PUBLISH_TOTAL.with_label_values(&[topic, status]).inc();

        result
    }

    async fn subscribe(&self, topic: &str, handler: Arc<dyn MessageHandler>) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        let stream = self.client.get_or_create_stream(topic).await?;

        // Declare the dead-letter companion up front, as part of the
        // subscription contract
        if !topic.starts_with("dlq.") {
            self.client.get_or_create_stream(&dlq_topic(topic)).await?;
        }

        // Ephemeral consumer: this subscriber's private view of the topic
        let consumer_config = consumer::pull::Config {
            durable_name: None,
            deliver_policy: consumer::DeliverPolicy::New,
            ack_policy: consumer::AckPolicy::Explicit,
            ack_wait: self.config.ack_wait,
            max_deliver: (self.config.max_attempts + 1) as i64,
            inactive_threshold: self.config.inactive_threshold,
            ..Default::default()
        };

        let consumer = stream
            .create_consumer(consumer_config)
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        info!("📡 subscribed to topic: {}", topic);

        let topic = topic.to_string();
        let jetstream = self.client.jetstream().clone();
        let max_attempts = self.config.max_attempts;

        let handle = tokio::spawn(async move {
            while let Some(next) = messages.next().await {
                let msg = match next {
                    Ok(msg) => msg,
                    Err(e) => {
                        error!("[{}] consumer stream error: {}", topic, e);
                        continue;
                    }
                };

                // Each delivery runs on its own task; the bus does not
                // serialize handlers across messages.
                let topic = topic.clone();
                let handler = handler.clone();
                let jetstream = jetstream.clone();
                tokio::spawn(async move {
                    dispatch(jetstream, topic, max_attempts, handler, msg).await;
                });
            }

            warn!("[{}] consumer loop ended", topic);
        });

        self.consumer_tasks.lock().await.push(handle);

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);

        // Stop pulling new messages; in-flight handler tasks finish on
        // their current message
        for handle in self.consumer_tasks.lock().await.drain(..) {
            handle.abort();
        }

        self.client.flush().await?;
        info!("message bus closed");
        Ok(())
    }
}

async fn dispatch(
    jetstream: jetstream::Context,
    topic: String,
    max_attempts: u32,
    handler: Arc<dyn MessageHandler>,
    msg: jetstream::Message,
) {
    // Redelivery count from broker-tracked delivery info
    let delivered = msg.info().map(|info| info.delivered).unwrap_or(1);
    let attempt = delivered.saturating_sub(1) as u32;

    let subject = msg.subject.to_string();
    let key = subject
        .strip_prefix(&format!("{}.", topic))
        .unwrap_or("")
        .to_string();

    let delivery = Delivery {
        topic: topic.clone(),
        key: key.clone(),
        payload: msg.payload.to_vec(),
        attempt,
        max_attempts,
    };

    MESSAGE_RECEIVE_TOTAL.with_label_values(&[&topic, "received"]).inc();
    let start = Instant::now();

    match handler.handle(delivery).await {
        Ok(()) => {
            if let Err(e) = msg.ack().await {
                error!("[{}] failed to ack message: {}", topic, e);
            }
            MESSAGE_PROCESS_DURATION
                .with_label_values(&[&topic])
                .observe(start.elapsed().as_secs_f64());
        }
        Err(e) if attempt < max_attempts => {
            warn!("[{}] handler error (retry {}/{}): {}", topic, attempt, max_attempts, e);
            if let Err(nak_err) = msg.ack_with(AckKind::Nak(None)).await {
                error!("[{}] failed to nak message: {}", topic, nak_err);
            }
        }
        Err(e) => {
            error!("[{}] max retries exceeded ({}), routing to DLQ: {}", topic, attempt, e);

            let dlq = dlq_topic(&topic);
            let dlq_subject = if key.is_empty() {
                dlq.clone()
            } else {
                format!("{}.{}", dlq, key)
            };

            let routed: Result<()> = async {
                let ack = jetstream
                    .publish(dlq_subject, Bytes::copy_from_slice(&msg.payload))
                    .await
                    .map_err(|e| Error::Publish(e.to_string()))?;
                ack.await.map_err(|e| Error::Publish(e.to_string()))?;
                Ok(())
            }
            .await;

            match routed {
                Ok(()) => {
                    MESSAGE_DLQ_TOTAL.with_label_values(&[&topic]).inc();
                    if let Err(term_err) = msg.ack_with(AckKind::Term).await {
                        error!("[{}] failed to terminate message: {}", topic, term_err);
                    }
                }
                Err(publish_err) => {
                    // Keep the message alive so the DLQ publish is retried
                    // on the next delivery rather than losing the payload
                    error!("[{}] DLQ publish failed, requeueing: {}", topic, publish_err);
                    if let Err(nak_err) = msg.ack_with(AckKind::Nak(None)).await {
                        error!("[{}] failed to nak message: {}", topic, nak_err);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_config_default() {
        let config = BusConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.ack_wait, Duration::from_secs(30));
    }

    #[test]
    fn test_subject_building() {
        assert_eq!(
            JetStreamBus::subject("transaction.created", "abc-123"),
            "transaction.created.abc-123"
        );
        assert_eq!(JetStreamBus::subject("transaction.created", ""), "transaction.created");
    }
}
