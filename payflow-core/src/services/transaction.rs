//! Transaction intake: validate, persist, announce

use crate::error::{Error, Result};
use crate::events::topics;
use crate::models::{Transaction, TransactionStatus};
use crate::stores::TransactionStore;
use chrono::Utc;
use message_bus::MessageBus;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// The deployment accepts a single currency.
pub const ALLOWED_CURRENCIES: &[&str] = &["NGN"];

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionInput {
    pub amount: i64,
    pub currency: String,
    pub user_id: Uuid,
    pub merchant_id: Uuid,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Normalise and validate a currency code.
pub fn validate_currency(currency: &str) -> Result<String> {
    let normalised = currency.trim().to_uppercase();
    if ALLOWED_CURRENCIES.contains(&normalised.as_str()) {
        Ok(normalised)
    } else {
        Err(Error::InvalidCurrency(currency.to_string()))
    }
}

pub struct TransactionService {
    store: TransactionStore,
    bus: Arc<dyn MessageBus>,
}

impl TransactionService {
    pub fn new(store: TransactionStore, bus: Arc<dyn MessageBus>) -> Self {
        Self { store, bus }
    }

    /// Validate and persist a transaction, then announce it on
    /// `transaction.created`. The publish runs on a detached task and its
    /// failure is logged, not propagated: the store is authoritative and
    /// reconciliation is the compensating mechanism for lost events.
    pub async fn create(&self, input: CreateTransactionInput) -> Result<Uuid> {
        if input.amount <= 0 {
            return Err(Error::InvalidAmount(input.amount));
        }

        let currency = validate_currency(&input.currency)?;

        let metadata = match input.metadata {
            Some(value) if !value.is_null() => value,
            _ => serde_json::json!({}),
        };

        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            amount: input.amount,
            currency,
            user_id: input.user_id,
            merchant_id: input.merchant_id,
            status: TransactionStatus::Pending,
            metadata,
            created_at: now,
            updated_at: now,
        };

        self.store.create(&transaction).await?;

        let payload = serde_json::to_vec(&transaction)?;
        let key = transaction.id.to_string();
        let bus = self.bus.clone();
        tokio::spawn(async move {
            if let Err(e) = bus.publish(topics::TRANSACTION_CREATED, &key, &payload).await {
                warn!("failed to publish transaction.created for {}: {}", key, e);
            }
        });

        Ok(transaction.id)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Transaction>> {
        self.store.get_by_id(id).await
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>> {
        self.store.list(limit, offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_is_normalised_to_uppercase() {
        assert_eq!(validate_currency("ngn").unwrap(), "NGN");
        assert_eq!(validate_currency("NGN").unwrap(), "NGN");
        assert_eq!(validate_currency(" ngn ").unwrap(), "NGN");
    }

    #[test]
    fn test_unsupported_currency_is_rejected() {
        assert!(matches!(validate_currency("USD"), Err(Error::InvalidCurrency(_))));
        assert!(matches!(validate_currency(""), Err(Error::InvalidCurrency(_))));
    }

    #[test]
    fn test_create_input_metadata_defaults_absent() {
        let input: CreateTransactionInput = serde_json::from_value(serde_json::json!({
            "amount": 1500,
            "currency": "NGN",
            "user_id": Uuid::new_v4(),
            "merchant_id": Uuid::new_v4(),
        }))
        .unwrap();
        assert!(input.metadata.is_none());
    }
}
