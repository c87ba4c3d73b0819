use crate::error::Result;
use crate::models::{Transaction, TransactionStatus};
use crate::stores::clamp_page;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct TransactionStore {
    pool: PgPool,
}

impl TransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, transaction: &Transaction) -> Result<()> {
        let metadata = if transaction.metadata.is_null() {
            serde_json::json!({})
        } else {
            transaction.metadata.clone()
        };

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, amount, currency, user_id, merchant_id,
                status, metadata, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.user_id)
        .bind(transaction.merchant_id)
        .bind(transaction.status)
        .bind(metadata)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Absence is a nullable result, not an error.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, amount, currency, user_id, merchant_id,
                   status, metadata, created_at, updated_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Advance the transaction to `status`, guarded by the lifecycle DAG:
    /// the update takes effect only when the current status is an allowed
    /// predecessor, so replays and out-of-order deliveries affect zero rows
    /// and terminal states are never left. Returns whether a row changed.
    pub async fn update_status(&self, id: Uuid, status: TransactionStatus) -> Result<bool> {
        let allowed: Vec<String> = status
            .allowed_predecessors()
            .iter()
            .map(|s| s.to_string())
            .collect();

        if allowed.is_empty() {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = ANY($3)
            "#,
        )
        .bind(status)
        .bind(id)
        .bind(&allowed)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>> {
        let (limit, offset) = clamp_page(limit, offset);

        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, amount, currency, user_id, merchant_id,
                   status, metadata, created_at, updated_at
            FROM transactions
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}
