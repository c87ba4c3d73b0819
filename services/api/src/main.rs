use actix_web::{web, App, HttpServer};
use message_bus::{JetStreamBus, MessageBus};
use payflow_core::config::Config;
use payflow_core::db;
use payflow_core::services::TransactionService;
use payflow_core::stores::{SettlementStore, TransactionStore};
use std::sync::Arc;
use tracing::info;

mod handlers;

pub struct AppState {
    pub transactions: TransactionService,
    pub settlements: SettlementStore,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env("api", 8080)?;

    info!("🚀 {} starting on port {}", config.service_name, config.http_port);

    let pool = db::create_pool(config.db_url()?, &config.database).await?;

    let bus: Arc<dyn MessageBus> = Arc::new(JetStreamBus::connect(&config.nats_url).await?);
    info!("✅ message bus initialized: {}", config.nats_url);

    let state = web::Data::new(AppState {
        transactions: TransactionService::new(TransactionStore::new(pool.clone()), bus.clone()),
        settlements: SettlementStore::new(pool),
    });

    let bind_address = format!("0.0.0.0:{}", config.http_port);
    info!("listening on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(handlers::health))
            .route("/metrics", web::get().to(handlers::prometheus_metrics))
            .route("/v1/transactions", web::post().to(handlers::create_transaction))
            .route("/v1/transactions/list", web::get().to(handlers::list_transactions))
            .route("/v1/transactions/{id}", web::get().to(handlers::get_transaction))
            .route("/v1/settlements/list", web::get().to(handlers::list_settlements))
            .route("/v1/settlements/{id}", web::get().to(handlers::get_settlement))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    info!("shutting down gracefully...");
    bus.close().await.ok();

    Ok(())
}
