// DLQ monitor: terminal observation point for dead-lettered settlement
// requests. Every message is surfaced as an error log and an alert, then
// acknowledged.

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use async_trait::async_trait;
use message_bus::{dlq_topic, Delivery, JetStreamBus, MessageBus, MessageHandler};
use payflow_core::alert::AlertClient;
use payflow_core::config::Config;
use payflow_core::events::topics;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

struct DlqHandler {
    alerts: AlertClient,
    service_name: String,
}

#[async_trait]
impl MessageHandler for DlqHandler {
    async fn handle(&self, delivery: Delivery) -> message_bus::Result<()> {
        let payload = String::from_utf8_lossy(&delivery.payload).to_string();

        error!(
            "DLQ message received - settlement failed permanently: topic={} key={} payload={}",
            delivery.topic, delivery.key, payload
        );

        let details = json!({
            "topic": delivery.topic,
            "key": delivery.key,
            "payload": payload,
        });
        if let Err(e) = self
            .alerts
            .send_error(&self.service_name, "settlement request dead-lettered", Some(details))
            .await
        {
            warn!("failed to send DLQ alert for {}: {}", delivery.key, e);
        }

        // Always ack; the DLQ is where the message rests for operator action
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "dlq-monitor".to_string(),
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

    let config = Config::from_env("dlq-monitor", 8083)?;

    info!("starting DLQ monitor");

    let bus = Arc::new(JetStreamBus::connect(&config.nats_url).await?);
    info!("✅ message bus initialized: {}", config.nats_url);

    let handler = Arc::new(DlqHandler {
        alerts: AlertClient::new(config.alert_webhook_url.clone()),
        service_name: config.service_name.clone(),
    });

    let dlq = dlq_topic(topics::SETTLEMENT_REQUESTED);
    bus.subscribe(&dlq, handler).await?;
    info!("DLQ monitor subscribed to {}", dlq);

    let bind_address = format!("0.0.0.0:{}", config.http_port);

    HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(health))
            .route("/metrics", web::get().to(prometheus_metrics))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    info!("shutting down DLQ monitor...");
    bus.close().await.ok();

    Ok(())
}
