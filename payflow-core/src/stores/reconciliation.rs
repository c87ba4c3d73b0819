use crate::error::Result;
use crate::models::ReconciliationRecord;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Append-only audit log written by the reconciliation job.
#[derive(Clone)]
pub struct ReconciliationStore {
    pool: PgPool,
}

impl ReconciliationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record_mismatch(
        &self,
        entity_id: &str,
        expected_amount: i64,
        actual_amount: i64,
    ) -> Result<ReconciliationRecord> {
        let record = sqlx::query_as::<_, ReconciliationRecord>(
            r#"
            INSERT INTO reconciliation_logs (
                id, entity_type, entity_id, expected_amount, actual_amount,
                status, notes, created_at
            )
            VALUES ($1, 'transactions', $2, $3, $4, 'mismatch', 'automated-check', $5)
            RETURNING id, entity_type, entity_id, expected_amount, actual_amount,
                      status, notes, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entity_id)
        .bind(expected_amount)
        .bind(actual_amount)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }
}
