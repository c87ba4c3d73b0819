//! NATS client wrapper with connection and stream management

use crate::{Error, Result};
use async_nats::jetstream::{self, stream::Config as StreamConfig};
use std::time::Duration;
use tracing::info;

/// Working streams keep messages for the redelivery window only.
const WORKING_STREAM_MAX_AGE: Duration = Duration::from_secs(300);

/// Dead-letter streams are durable and retained for operator review.
const DLQ_STREAM_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// NATS client wrapper. One long-lived connection per process; concurrent
/// publishes serialize through the underlying client.
#[derive(Clone)]
pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    /// Connect to a NATS server and initialize JetStream.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("connecting to NATS: {}", url);

        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let jetstream = jetstream::new(client.clone());

        info!("✅ connected to NATS, JetStream initialized");

        Ok(Self { client, jetstream })
    }

    /// Get the underlying NATS client
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    /// Get the JetStream context
    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }

    /// JetStream stream name for a logical topic.
    pub fn stream_name(topic: &str) -> String {
        topic.to_uppercase().replace('.', "_")
    }

    /// Create or get the stream backing `topic`. Dead-letter topics get a
    /// durable long-retention stream; working topics get the 5-minute TTL.
    pub async fn get_or_create_stream(&self, topic: &str) -> Result<jetstream::stream::Stream> {
        let stream_name = Self::stream_name(topic);

        match self.jetstream.get_stream(&stream_name).await {
            Ok(stream) => Ok(stream),
            Err(_) => {
                info!("creating JetStream stream: {}", stream_name);

                let max_age = if topic.starts_with("dlq.") {
                    DLQ_STREAM_MAX_AGE
                } else {
                    WORKING_STREAM_MAX_AGE
                };

                let config = StreamConfig {
                    name: stream_name,
                    subjects: vec![topic.to_string(), format!("{}.>", topic)],
                    max_age,
                    retention: jetstream::stream::RetentionPolicy::Limits,
                    storage: jetstream::stream::StorageType::File,
                    num_replicas: 1,
                    ..Default::default()
                };

                self.jetstream
                    .create_stream(config)
                    .await
                    .map_err(|e| Error::Stream(e.to_string()))
            }
        }
    }

    /// Flush pending messages.
    pub async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }
}
