// Alert sink: accepts alert records from the pipeline services and buffers
// them for operator review.

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use payflow_core::alert::Alert;
use payflow_core::config::Config;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

mod store;

use store::{AlertStore, MemoryAlertStore};

struct AppState {
    store: Arc<dyn AlertStore>,
}

async fn webhook(state: web::Data<AppState>, alert: web::Json<Alert>) -> impl Responder {
    let alert = alert.into_inner();

    info!(
        "[{}] {}: {} | details: {}",
        alert.severity,
        alert.service,
        alert.message,
        alert.details.clone().unwrap_or_else(|| json!({}))
    );

    state.store.append(alert).await;

    HttpResponse::Ok().json(json!({ "status": "ok", "message": "alert received" }))
}

async fn alerts(state: web::Data<AppState>) -> impl Responder {
    let alerts = state.store.list().await;
    HttpResponse::Ok().json(json!({ "count": alerts.len(), "alerts": alerts }))
}

async fn clear(state: web::Data<AppState>) -> impl Responder {
    state.store.clear().await;
    HttpResponse::Ok().json(json!({ "status": "ok", "message": "alerts cleared" }))
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "healthy", "service": "alert-receiver" }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env("alert-receiver", 9000)?;

    let state = web::Data::new(AppState {
        store: Arc::new(MemoryAlertStore::new()),
    });

    let bind_address = format!("0.0.0.0:{}", config.http_port);

    info!("alert webhook receiver listening on {}", bind_address);
    info!("  POST /webhook - receive alerts from services");
    info!("  GET  /alerts  - view all received alerts");
    info!("  POST /clear   - clear alert history");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health))
            .route("/webhook", web::post().to(webhook))
            .route("/alerts", web::get().to(alerts))
            .route("/clear", web::post().to(clear))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    info!("shutting down alert receiver...");

    Ok(())
}
