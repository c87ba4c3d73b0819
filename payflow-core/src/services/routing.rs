//! Routing worker logic: advance created transactions to `processing` and
//! request their settlement

use crate::error::{Error, Result};
use crate::events::{topics, Routing, SettlementRequested};
use crate::models::TransactionStatus;
use crate::stores::TransactionStore;
use async_trait::async_trait;
use chrono::Utc;
use message_bus::{Delivery, MessageBus, MessageHandler};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct RoutingService {
    transactions: TransactionStore,
    bus: Arc<dyn MessageBus>,
}

impl RoutingService {
    pub fn new(transactions: TransactionStore, bus: Arc<dyn MessageBus>) -> Self {
        Self { transactions, bus }
    }

    /// Handle one `transaction.created` delivery; the routing key is the
    /// transaction id. Store errors propagate so the bus redelivers.
    pub async fn process(&self, transaction_id: &str) -> Result<()> {
        let id = Uuid::parse_str(transaction_id.trim())
            .map_err(|_| Error::InvalidTransactionId(transaction_id.to_string()))?;

        let advanced = self
            .transactions
            .update_status(id, TransactionStatus::Processing)
            .await?;
        if !advanced {
            // Redelivery of an already-routed transaction; nothing to redo
            debug!("transaction {} already advanced past pending", id);
        }

        let event = SettlementRequested {
            transaction_id: id,
            routing: Routing::simulated_acquirer(),
            requested_at: Utc::now(),
        };
        let payload = serde_json::to_vec(&event)?;

        // A failed publish is not worth a redelivery: re-entering this
        // handler would re-advance state that is already advanced
        if let Err(e) = self
            .bus
            .publish(topics::SETTLEMENT_REQUESTED, &id.to_string(), &payload)
            .await
        {
            warn!("[routing] publish settlement.requested failed for {}: {}", id, e);
        }

        Ok(())
    }
}

#[async_trait]
impl MessageHandler for RoutingService {
    async fn handle(&self, delivery: Delivery) -> message_bus::Result<()> {
        self.process(&delivery.key)
            .await
            .map_err(|e| message_bus::Error::Handler(e.to_string()))
    }
}
