// Reconciliation job: verifies that every terminal transaction's amount
// matches the sum of its booked settlements, records mismatches and raises
// warning alerts. Runs to completion; exits non-zero only on query failure.

use payflow_core::alert::AlertClient;
use payflow_core::config::Config;
use payflow_core::db::{self, DbPool};
use payflow_core::stores::ReconciliationStore;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq)]
struct ReconcileSummary {
    total_checked: usize,
    mismatches: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env("reconcile-job", 0)?;

    info!("starting reconciliation job");

    let pool = db::create_pool(config.db_url()?, &config.database).await?;
    let alerts = AlertClient::new(config.alert_webhook_url.clone());

    let summary = run_reconcile(&pool, &alerts, &config.service_name).await?;

    info!(
        "reconciliation summary: total_checked={} mismatches={}",
        summary.total_checked, summary.mismatches
    );
    info!("reconciliation job completed successfully");

    Ok(())
}

async fn run_reconcile(
    pool: &DbPool,
    alerts: &AlertClient,
    service: &str,
) -> anyhow::Result<ReconcileSummary> {
    // Expected amount per terminal transaction vs. the sum of its booked
    // settlement attempts
    let rows: Vec<(Uuid, i64, i64)> = sqlx::query_as(
        r#"
        SELECT t.id, t.amount, COALESCE(SUM(s.amount), 0)::BIGINT
        FROM transactions t
        LEFT JOIN settlements s ON s.external_reference = t.id::text
        WHERE t.status IN ('completed', 'failed')
        GROUP BY t.id, t.amount
        "#,
    )
    .fetch_all(pool)
    .await?;

    let store = ReconciliationStore::new(pool.clone());
    let mut mismatches = 0;

    for (id, expected, actual) in &rows {
        if expected == actual {
            continue;
        }

        mismatches += 1;
        let difference = expected - actual;

        warn!(
            "reconciliation mismatch detected: transaction_id={} expected={} actual={} difference={}",
            id, expected, actual, difference
        );

        store.record_mismatch(&id.to_string(), *expected, *actual).await?;

        let details = json!({
            "transaction_id": id,
            "expected_amount": expected,
            "actual_amount": actual,
            "difference": difference,
        });
        if let Err(e) = alerts
            .send_warning(service, "Transaction amount mismatch detected", Some(details))
            .await
        {
            warn!("failed to send alert for {}: {}", id, e);
        }
    }

    Ok(ReconcileSummary {
        total_checked: rows.len(),
        mismatches,
    })
}
