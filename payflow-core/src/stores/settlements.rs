use crate::error::Result;
use crate::models::Settlement;
use crate::stores::clamp_page;
use sqlx::PgPool;
use uuid::Uuid;

/// Append-only store: one row per settlement attempt, never updated. The
/// row's status stays `pending`; the attempt outcome is authoritative on
/// the parent transaction.
#[derive(Clone)]
pub struct SettlementStore {
    pool: PgPool,
}

impl SettlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_attempt(&self, settlement: &Settlement) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settlements (
                id, merchant_account_id, external_reference, status,
                amount, metadata, attempts, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(settlement.id)
        .bind(settlement.merchant_account_id)
        .bind(&settlement.external_reference)
        .bind(settlement.status)
        .bind(settlement.amount)
        .bind(&settlement.metadata)
        .bind(settlement.attempts)
        .bind(settlement.created_at)
        .bind(settlement.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Settlement>> {
        let settlement = sqlx::query_as::<_, Settlement>(
            r#"
            SELECT id, merchant_account_id, external_reference, status,
                   amount, metadata, attempts, created_at, updated_at
            FROM settlements
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settlement)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Settlement>> {
        let (limit, offset) = clamp_page(limit, offset);

        let settlements = sqlx::query_as::<_, Settlement>(
            r#"
            SELECT id, merchant_account_id, external_reference, status,
                   amount, metadata, attempts, created_at, updated_at
            FROM settlements
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(settlements)
    }
}
