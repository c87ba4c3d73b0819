// Integration tests for the transaction pipeline, wired over the in-memory
// bus against a migrated Postgres database.
//
// These require DB_URL to point at a database with the workspace migrations
// applied; run with: cargo test -- --ignored

use message_bus::{Delivery, MemoryBus, MessageBus};
use payflow_core::acquirer::SimulatedAcquirer;
use payflow_core::config::DatabaseConfig;
use payflow_core::db::{self, DbPool};
use payflow_core::error::Error;
use payflow_core::events::topics;
use payflow_core::models::{SettlementStatus, TransactionStatus};
use payflow_core::services::{
    CreateTransactionInput, RoutingService, SettlementService, TransactionService,
};
use payflow_core::stores::{AccountStore, SettlementStore, TransactionStore};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

async fn test_pool() -> DbPool {
    let db_url = std::env::var("DB_URL").expect("DB_URL set for integration tests");
    db::create_pool(&db_url, &DatabaseConfig::default())
        .await
        .expect("database reachable")
}

fn settlement_worker(
    pool: &DbPool,
    bus: Arc<dyn MessageBus>,
    success_rate: f64,
) -> Arc<SettlementService> {
    Arc::new(SettlementService::new(
        TransactionStore::new(pool.clone()),
        SettlementStore::new(pool.clone()),
        AccountStore::new(pool.clone()),
        bus,
        Arc::new(SimulatedAcquirer::new(0, success_rate)),
    ))
}

fn create_input(amount: i64) -> CreateTransactionInput {
    serde_json::from_value(serde_json::json!({
        "amount": amount,
        "currency": "ngn",
        "user_id": Uuid::new_v4(),
        "merchant_id": Uuid::new_v4(),
    }))
    .expect("valid input")
}

async fn wait_for_status(
    store: &TransactionStore,
    id: Uuid,
    status: TransactionStatus,
) -> Result<(), String> {
    for _ in 0..40 {
        if let Some(tx) = store.get_by_id(id).await.map_err(|e| e.to_string())? {
            if tx.status == status {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(format!("transaction {} never reached {}", id, status))
}

#[tokio::test]
#[ignore]
async fn test_happy_path_reaches_completed_with_one_settlement_row() {
    let pool = test_pool().await;
    let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());

    let routing = Arc::new(RoutingService::new(
        TransactionStore::new(pool.clone()),
        bus.clone(),
    ));
    bus.subscribe(topics::TRANSACTION_CREATED, routing).await.unwrap();
    bus.subscribe(topics::SETTLEMENT_REQUESTED, settlement_worker(&pool, bus.clone(), 1.0))
        .await
        .unwrap();

    let intake = TransactionService::new(TransactionStore::new(pool.clone()), bus.clone());
    let id = intake.create(create_input(1500)).await.expect("created");

    let transactions = TransactionStore::new(pool.clone());
    wait_for_status(&transactions, id, TransactionStatus::Completed)
        .await
        .expect("settled within deadline");

    let tx = transactions.get_by_id(id).await.unwrap().expect("present");
    assert_eq!(tx.amount, 1500);
    assert_eq!(tx.currency, "NGN");

    let rows: Vec<(Uuid, i64, String)> = sqlx::query_as(
        "SELECT id, amount, status FROM settlements WHERE external_reference = $1",
    )
    .bind(id.to_string())
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1, 1500);
    assert_eq!(rows[0].2, SettlementStatus::Pending.as_str());
}

#[tokio::test]
#[ignore]
async fn test_declined_attempt_fails_the_transaction() {
    let pool = test_pool().await;
    let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());

    let routing = Arc::new(RoutingService::new(
        TransactionStore::new(pool.clone()),
        bus.clone(),
    ));
    bus.subscribe(topics::TRANSACTION_CREATED, routing).await.unwrap();
    bus.subscribe(topics::SETTLEMENT_REQUESTED, settlement_worker(&pool, bus.clone(), 0.0))
        .await
        .unwrap();

    let intake = TransactionService::new(TransactionStore::new(pool.clone()), bus.clone());
    let id = intake.create(create_input(2000)).await.expect("created");

    let transactions = TransactionStore::new(pool.clone());
    wait_for_status(&transactions, id, TransactionStatus::Failed)
        .await
        .expect("failed within deadline");
}

#[tokio::test]
#[ignore]
async fn test_replayed_transaction_created_is_a_no_op() {
    let pool = test_pool().await;
    let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());

    let intake = TransactionService::new(TransactionStore::new(pool.clone()), bus.clone());
    let id = intake.create(create_input(700)).await.expect("created");

    let routing = RoutingService::new(TransactionStore::new(pool.clone()), bus.clone());
    routing.process(&id.to_string()).await.expect("first delivery");
    routing.process(&id.to_string()).await.expect("replay");

    let transactions = TransactionStore::new(pool.clone());
    let tx = transactions.get_by_id(id).await.unwrap().expect("present");
    assert_eq!(tx.status, TransactionStatus::Processing);
}

#[tokio::test]
#[ignore]
async fn test_exhausted_retries_leave_the_transaction_in_processing() {
    let pool = test_pool().await;
    let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());

    let intake = TransactionService::new(TransactionStore::new(pool.clone()), bus.clone());
    let id = intake.create(create_input(900)).await.expect("created");

    let transactions = TransactionStore::new(pool.clone());
    transactions
        .update_status(id, TransactionStatus::Processing)
        .await
        .expect("advanced");

    let worker = settlement_worker(&pool, bus.clone(), 1.0);
    let payload = serde_json::to_vec(&serde_json::json!({
        "transaction_id": id,
        "routing": { "route": "simulated-acquirer", "priority": "normal" },
        "requested_at": chrono::Utc::now(),
    }))
    .unwrap();

    // Fourth receipt: the redelivery budget is spent
    let delivery = Delivery {
        topic: topics::SETTLEMENT_REQUESTED.to_string(),
        key: id.to_string(),
        payload,
        attempt: 3,
        max_attempts: 3,
    };

    let result = worker.process(&delivery).await;
    assert!(matches!(result, Err(Error::RetriesExhausted(3))));

    // No attempt was executed and no status change happened
    let tx = transactions.get_by_id(id).await.unwrap().expect("present");
    assert_eq!(tx.status, TransactionStatus::Processing);

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM settlements WHERE external_reference = $1")
            .bind(id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count.0, 0);
}

#[tokio::test]
#[ignore]
async fn test_each_redelivery_creates_a_fresh_settlement_row() {
    let pool = test_pool().await;
    let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());

    let intake = TransactionService::new(TransactionStore::new(pool.clone()), bus.clone());
    let id = intake.create(create_input(1200)).await.expect("created");

    let transactions = TransactionStore::new(pool.clone());
    transactions
        .update_status(id, TransactionStatus::Processing)
        .await
        .expect("advanced");

    let worker = settlement_worker(&pool, bus.clone(), 1.0);
    let payload = serde_json::to_vec(&serde_json::json!({
        "transaction_id": id,
        "routing": { "route": "simulated-acquirer", "priority": "normal" },
        "requested_at": chrono::Utc::now(),
    }))
    .unwrap();

    for attempt in 0..2 {
        let delivery = Delivery {
            topic: topics::SETTLEMENT_REQUESTED.to_string(),
            key: id.to_string(),
            payload: payload.clone(),
            attempt,
            max_attempts: 3,
        };
        worker.process(&delivery).await.expect("attempt succeeds");
    }

    // Two deliveries, two audit rows; the transaction stays completed
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM settlements WHERE external_reference = $1")
            .bind(id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count.0, 2);

    let tx = transactions.get_by_id(id).await.unwrap().expect("present");
    assert_eq!(tx.status, TransactionStatus::Completed);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_merchant_account_creation_yields_one_account() {
    let pool = test_pool().await;
    let accounts = AccountStore::new(pool.clone());
    let owner = Uuid::new_v4();

    let (a, b) = tokio::join!(
        accounts.get_or_create_merchant(owner, "NGN"),
        accounts.get_or_create_merchant(owner, "NGN"),
    );

    let a = a.expect("first caller");
    let b = b.expect("second caller");
    assert_eq!(a.id, b.id);
}

#[tokio::test]
#[ignore]
async fn test_validation_rejects_before_any_row_is_written() {
    let pool = test_pool().await;
    let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());
    let intake = TransactionService::new(TransactionStore::new(pool.clone()), bus.clone());

    let negative = intake.create(create_input(-1)).await;
    assert!(matches!(negative, Err(Error::InvalidAmount(-1))));

    let usd: CreateTransactionInput = serde_json::from_value(serde_json::json!({
        "amount": 100,
        "currency": "USD",
        "user_id": Uuid::new_v4(),
        "merchant_id": Uuid::new_v4(),
    }))
    .unwrap();
    assert!(matches!(intake.create(usd).await, Err(Error::InvalidCurrency(_))));
}
