// Settlement worker: executes settlement attempts with bounded redelivery
// and dead-letter escape.

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use message_bus::{JetStreamBus, MessageBus};
use payflow_core::acquirer::SimulatedAcquirer;
use payflow_core::config::Config;
use payflow_core::db;
use payflow_core::events::topics;
use payflow_core::services::SettlementService;
use payflow_core::stores::{AccountStore, SettlementStore, TransactionStore};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "settlement-worker".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn prometheus_metrics() -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => match String::from_utf8(buffer) {
            Ok(body) => HttpResponse::Ok()
                .content_type("text/plain; version=0.0.4")
                .body(body),
            Err(e) => HttpResponse::InternalServerError()
                .body(format!("Failed to encode metrics: {}", e)),
        },
        Err(e) => {
            HttpResponse::InternalServerError().body(format!("Failed to gather metrics: {}", e))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env("settlement-worker", 8082)?;

    info!("🚀 {} starting", config.service_name);

    let pool = db::create_pool(config.db_url()?, &config.database).await?;
    info!("✅ postgres connection successful");

    let bus = Arc::new(JetStreamBus::connect(&config.nats_url).await?);
    info!("✅ message bus initialized: {}", config.nats_url);

    let settlement = Arc::new(SettlementService::new(
        TransactionStore::new(pool.clone()),
        SettlementStore::new(pool.clone()),
        AccountStore::new(pool),
        bus.clone() as Arc<dyn MessageBus>,
        Arc::new(SimulatedAcquirer::with_defaults()),
    ));

    bus.subscribe(topics::SETTLEMENT_REQUESTED, settlement).await?;
    info!("settlement worker subscribed to {}", topics::SETTLEMENT_REQUESTED);

    let bind_address = format!("0.0.0.0:{}", config.http_port);

    HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(health))
            .route("/metrics", web::get().to(prometheus_metrics))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    info!("shutting down gracefully...");
    bus.close().await.ok();

    Ok(())
}
