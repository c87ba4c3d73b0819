use crate::error::{Error, Result};
use crate::models::{Account, AccountType};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountStore {
    pool: PgPool,
}

impl AccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Return the merchant account for `owner_id`, creating it on first
    /// use. Concurrent callers may race on the insert; the unique index on
    /// `(owner_id, account_type)` makes the collision benign and both
    /// callers end up with the same row.
    pub async fn get_or_create_merchant(&self, owner_id: Uuid, currency: &str) -> Result<Account> {
        if let Some(account) = self.get_by_owner(owner_id, AccountType::Merchant).await? {
            return Ok(account);
        }

        let inserted = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (
                id, owner_id, owner_type, account_type, currency,
                created_at, updated_at
            )
            VALUES ($1, $2, 'merchant', $3, $4, NOW(), NOW())
            ON CONFLICT (owner_id, account_type) DO NOTHING
            RETURNING id, owner_id, owner_type, account_type, currency,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(AccountType::Merchant)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(account) = inserted {
            return Ok(account);
        }

        // Lost the race: the winner's row is the account
        self.get_by_owner(owner_id, AccountType::Merchant)
            .await?
            .ok_or(Error::Database(sqlx::Error::RowNotFound))
    }

    pub async fn get_by_owner(
        &self,
        owner_id: Uuid,
        account_type: AccountType,
    ) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner_id, owner_type, account_type, currency,
                   created_at, updated_at
            FROM accounts
            WHERE owner_id = $1 AND account_type = $2
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .bind(account_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }
}
