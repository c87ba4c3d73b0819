//! Settlement worker logic
//!
//! Per delivery: check the redelivery budget, record a fresh settlement
//! attempt, execute it against the acquirer and move the transaction to its
//! terminal state. Store failures propagate so the bus requeues; a spent
//! budget returns a permanent failure so the bus dead-letters the original
//! payload.

use crate::acquirer::{AcquirerClient, AttemptOutcome};
use crate::error::{Error, Result};
use crate::events::{topics, SettlementCompleted, SettlementFailed, SettlementRequested};
use crate::models::{Settlement, SettlementStatus, TransactionStatus};
use crate::stores::{AccountStore, SettlementStore, TransactionStore};
use async_trait::async_trait;
use chrono::Utc;
use message_bus::{Delivery, MessageBus, MessageHandler};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Redeliveries allowed before a settlement request is dead-lettered.
pub const MAX_SETTLEMENT_RETRIES: u32 = 3;

pub struct SettlementService {
    transactions: TransactionStore,
    settlements: SettlementStore,
    accounts: AccountStore,
    bus: Arc<dyn MessageBus>,
    acquirer: Arc<dyn AcquirerClient>,
}

impl SettlementService {
    pub fn new(
        transactions: TransactionStore,
        settlements: SettlementStore,
        accounts: AccountStore,
        bus: Arc<dyn MessageBus>,
        acquirer: Arc<dyn AcquirerClient>,
    ) -> Self {
        Self {
            transactions,
            settlements,
            accounts,
            bus,
            acquirer,
        }
    }

    pub async fn process(&self, delivery: &Delivery) -> Result<()> {
        let request: SettlementRequested = serde_json::from_slice(&delivery.payload)?;

        info!(
            transaction_id = %request.transaction_id,
            retry_count = delivery.attempt,
            "processing settlement"
        );

        if delivery.attempt >= MAX_SETTLEMENT_RETRIES {
            // The bus routes the original payload to dlq.settlement.requested
            // once it sees this failure with a spent budget
            error!(
                "settlement exhausted max retries for transaction {} (retry_count {})",
                request.transaction_id, delivery.attempt
            );
            return Err(Error::RetriesExhausted(delivery.attempt));
        }

        let transaction = self
            .transactions
            .get_by_id(request.transaction_id)
            .await?
            .ok_or(Error::TransactionNotFound(request.transaction_id))?;

        let account = self
            .accounts
            .get_or_create_merchant(transaction.merchant_id, &transaction.currency)
            .await?;

        // The attempt row is written before the acquirer call so the audit
        // trail survives a crash mid-attempt
        let now = Utc::now();
        let settlement = Settlement {
            id: Uuid::new_v4(),
            merchant_account_id: account.id,
            external_reference: transaction.id.to_string(),
            status: SettlementStatus::Pending,
            amount: transaction.amount,
            metadata: serde_json::json!({
                "routing": request.routing,
                "requested_at": request.requested_at,
            }),
            attempts: 1,
            created_at: now,
            updated_at: now,
        };

        self.settlements.create_attempt(&settlement).await?;

        info!("settlement attempt created: {}", settlement.id);

        match self.acquirer.settle(&settlement).await? {
            AttemptOutcome::Approved => {
                self.finish(transaction.id, TransactionStatus::Completed).await?;
                info!(
                    "settlement successful: transaction {} settlement {}",
                    transaction.id, settlement.id
                );
                self.publish_outcome(
                    topics::SETTLEMENT_COMPLETED,
                    &transaction.id.to_string(),
                    &SettlementCompleted::new(transaction.id, settlement.id),
                )
                .await;
            }
            AttemptOutcome::Declined => {
                self.finish(transaction.id, TransactionStatus::Failed).await?;
                warn!(
                    "settlement failed: transaction {} settlement {}",
                    transaction.id, settlement.id
                );
                self.publish_outcome(
                    topics::SETTLEMENT_FAILED,
                    &transaction.id.to_string(),
                    &SettlementFailed::new(transaction.id, settlement.id),
                )
                .await;
            }
        }

        Ok(())
    }

    /// Terminal status is written after the attempt resolves. A zero-row
    /// update means a concurrent delivery already finished the transaction;
    /// that is a no-op, not an error.
    async fn finish(&self, transaction_id: Uuid, status: TransactionStatus) -> Result<()> {
        self.transactions.update_status(transaction_id, status).await?;
        Ok(())
    }

    /// Outcome events are advisory; publish failures are logged, never
    /// propagated.
    async fn publish_outcome<T: Serialize>(&self, topic: &str, key: &str, event: &T) {
        match serde_json::to_vec(event) {
            Ok(payload) => {
                if let Err(e) = self.bus.publish(topic, key, &payload).await {
                    warn!("failed to publish {} event for {}: {}", topic, key, e);
                }
            }
            Err(e) => warn!("failed to encode {} event for {}: {}", topic, key, e),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Settlement>> {
        self.settlements.get_by_id(id).await
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Settlement>> {
        self.settlements.list(limit, offset).await
    }
}

#[async_trait]
impl MessageHandler for SettlementService {
    async fn handle(&self, delivery: Delivery) -> message_bus::Result<()> {
        self.process(&delivery)
            .await
            .map_err(|e| message_bus::Error::Handler(e.to_string()))
    }
}
