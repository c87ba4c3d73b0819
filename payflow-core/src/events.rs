//! Typed payloads for the pipeline topics
//!
//! Each topic carries one tagged record; the only free-form map is the
//! `attributes` bag for provider-specific routing extras. Routing keys are
//! the transaction id throughout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Pipeline topic names
pub mod topics {
    /// Published by the intake service; payload is the full `Transaction`.
    pub const TRANSACTION_CREATED: &str = "transaction.created";

    /// Published by the routing worker; payload is `SettlementRequested`.
    pub const SETTLEMENT_REQUESTED: &str = "settlement.requested";

    /// Published by the settlement worker on success.
    pub const SETTLEMENT_COMPLETED: &str = "settlement.completed";

    /// Published by the settlement worker on a declined attempt.
    pub const SETTLEMENT_FAILED: &str = "settlement.failed";
}

/// Routing envelope attached to a settlement request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routing {
    pub route: String,
    pub priority: String,

    /// Provider-specific routing extras
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl Routing {
    /// The single route the simulated deployment knows.
    pub fn simulated_acquirer() -> Self {
        Self {
            route: "simulated-acquirer".to_string(),
            priority: "normal".to_string(),
            attributes: HashMap::new(),
        }
    }
}

/// `settlement.requested` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequested {
    pub transaction_id: Uuid,
    pub routing: Routing,
    pub requested_at: DateTime<Utc>,
}

/// `settlement.completed` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementCompleted {
    pub transaction_id: Uuid,
    pub settlement_id: Uuid,
    pub status: String,
    pub completed_at: DateTime<Utc>,
}

impl SettlementCompleted {
    pub fn new(transaction_id: Uuid, settlement_id: Uuid) -> Self {
        Self {
            transaction_id,
            settlement_id,
            status: "completed".to_string(),
            completed_at: Utc::now(),
        }
    }
}

/// `settlement.failed` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementFailed {
    pub transaction_id: Uuid,
    pub settlement_id: Uuid,
    pub status: String,
    pub failed_at: DateTime<Utc>,
}

impl SettlementFailed {
    pub fn new(transaction_id: Uuid, settlement_id: Uuid) -> Self {
        Self {
            transaction_id,
            settlement_id,
            status: "failed".to_string(),
            failed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_requested_wire_shape() {
        let event = SettlementRequested {
            transaction_id: Uuid::new_v4(),
            routing: Routing::simulated_acquirer(),
            requested_at: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("transaction_id").is_some());
        assert_eq!(value["routing"]["route"], "simulated-acquirer");
        assert_eq!(value["routing"]["priority"], "normal");
        // empty attributes are elided from the wire
        assert!(value["routing"].get("attributes").is_none());
        assert!(value.get("requested_at").is_some());
    }

    #[test]
    fn test_outcome_events_carry_status() {
        let completed = SettlementCompleted::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(completed.status, "completed");

        let failed = SettlementFailed::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(failed.status, "failed");

        let value = serde_json::to_value(&failed).unwrap();
        assert!(value.get("failed_at").is_some());
    }

    #[test]
    fn test_routing_attributes_round_trip() {
        let mut routing = Routing::simulated_acquirer();
        routing.attributes.insert("region".to_string(), "lagos".to_string());

        let bytes = serde_json::to_vec(&routing).unwrap();
        let parsed: Routing = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.attributes["region"], "lagos");
    }
}
