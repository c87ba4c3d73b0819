//! Acquirer integration seam
//!
//! The deployment routes every settlement through a simulated acquirer; the
//! trait is the boundary a real processor integration would implement.

use crate::error::Result;
use crate::models::Settlement;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of one settlement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Approved,
    Declined,
}

#[async_trait]
pub trait AcquirerClient: Send + Sync {
    /// Execute one settlement attempt. `Err` means the call itself failed
    /// (transient, retryable); `Declined` is a definitive refusal.
    async fn settle(&self, settlement: &Settlement) -> Result<AttemptOutcome>;
}

/// Simulated acquirer with configurable latency and decline injection.
pub struct SimulatedAcquirer {
    latency_ms: u64,
    success_rate: f64,
}

impl SimulatedAcquirer {
    pub fn new(latency_ms: u64, success_rate: f64) -> Self {
        Self {
            latency_ms,
            success_rate,
        }
    }

    /// Always approves, with a small simulated network delay.
    pub fn with_defaults() -> Self {
        Self::new(50, 1.0)
    }

    fn should_approve(&self) -> bool {
        if self.success_rate >= 1.0 {
            return true;
        }
        rand::thread_rng().gen::<f64>() <= self.success_rate
    }
}

#[async_trait]
impl AcquirerClient for SimulatedAcquirer {
    async fn settle(&self, settlement: &Settlement) -> Result<AttemptOutcome> {
        info!(
            "simulated acquirer: settling {} ({} {})",
            settlement.id, settlement.amount, "NGN"
        );

        tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;

        if self.should_approve() {
            Ok(AttemptOutcome::Approved)
        } else {
            warn!("simulated acquirer: declined settlement {}", settlement.id);
            Ok(AttemptOutcome::Declined)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SettlementStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn settlement() -> Settlement {
        Settlement {
            id: Uuid::new_v4(),
            merchant_account_id: Uuid::new_v4(),
            external_reference: Uuid::new_v4().to_string(),
            status: SettlementStatus::Pending,
            amount: 1500,
            metadata: serde_json::json!({}),
            attempts: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_full_success_rate_always_approves() {
        let acquirer = SimulatedAcquirer::new(0, 1.0);
        for _ in 0..10 {
            assert_eq!(acquirer.settle(&settlement()).await.unwrap(), AttemptOutcome::Approved);
        }
    }

    #[tokio::test]
    async fn test_zero_success_rate_always_declines() {
        let acquirer = SimulatedAcquirer::new(0, 0.0);
        for _ in 0..10 {
            assert_eq!(acquirer.settle(&settlement()).await.unwrap(), AttemptOutcome::Declined);
        }
    }
}
