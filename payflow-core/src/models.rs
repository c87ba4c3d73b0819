//! Domain models backing the transaction and settlement stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Transaction lifecycle state.
///
/// Transitions follow `pending → processing → {completed, failed}` (plus
/// `pending → cancelled`); terminal states are never left. The store
/// enforces this by updating only when the current status is an allowed
/// predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Cancelled
        )
    }

    /// States a transaction may be in for an update to this status to
    /// take effect.
    pub fn allowed_predecessors(&self) -> &'static [TransactionStatus] {
        match self {
            TransactionStatus::Pending => &[],
            TransactionStatus::Processing => &[TransactionStatus::Pending],
            TransactionStatus::Completed | TransactionStatus::Failed => {
                &[TransactionStatus::Pending, TransactionStatus::Processing]
            }
            TransactionStatus::Cancelled => &[TransactionStatus::Pending],
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment intent. Amount is in the smallest currency unit and immutable
/// after creation, as is the currency.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub user_id: Uuid,
    pub merchant_id: Uuid,
    pub status: TransactionStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Settlement attempt outcome recorded on the row.
///
/// Advisory only: rows are written `pending` before the acquirer call and
/// never updated; the authoritative outcome is the parent transaction's
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Success,
    Failed,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Success => "success",
            SettlementStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One settlement attempt against a merchant account. Append-only; a
/// retried message produces a fresh row, preserving the audit trail of
/// attempts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Settlement {
    pub id: Uuid,
    pub merchant_account_id: Uuid,
    /// Parent transaction id, as text
    pub external_reference: String,
    pub status: SettlementStatus,
    /// Copied from the parent transaction at attempt time
    pub amount: i64,
    pub metadata: serde_json::Value,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    User,
    Merchant,
    System,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::User => "user",
            AccountType::Merchant => "merchant",
            AccountType::System => "system",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settlement destination. At most one merchant account exists per
/// `(owner_id, account_type)`, enforced by a unique index.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_type: String,
    pub account_type: AccountType,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit row written by the reconciliation job for each amount mismatch.
/// Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReconciliationRecord {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub expected_amount: i64,
    pub actual_amount: i64,
    pub status: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Processing.is_terminal());
    }

    #[test]
    fn test_status_transition_dag() {
        // processing is reachable from pending only
        assert_eq!(
            TransactionStatus::Processing.allowed_predecessors(),
            &[TransactionStatus::Pending]
        );

        // terminal states are reachable from pending or processing, never
        // from another terminal state
        for terminal in [TransactionStatus::Completed, TransactionStatus::Failed] {
            let allowed = terminal.allowed_predecessors();
            assert!(allowed.contains(&TransactionStatus::Processing));
            assert!(!allowed.iter().any(|s| s.is_terminal()));
        }

        // nothing transitions back to pending
        assert!(TransactionStatus::Pending.allowed_predecessors().is_empty());
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Processing).unwrap(),
            r#""processing""#
        );
        let parsed: TransactionStatus = serde_json::from_str(r#""completed""#).unwrap();
        assert_eq!(parsed, TransactionStatus::Completed);
    }
}
