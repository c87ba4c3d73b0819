use crate::AppState;
use actix_web::{web, HttpResponse, Responder};
use payflow_core::services::CreateTransactionInput;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn prometheus_metrics() -> impl Responder {
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

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl PageQuery {
    fn normalised(&self) -> (i64, i64) {
        let limit = if self.limit > 0 { self.limit } else { 10 };
        (limit, self.offset.max(0))
    }
}

pub async fn create_transaction(
    state: web::Data<AppState>,
    payload: web::Json<CreateTransactionInput>,
) -> impl Responder {
    match state.transactions.create(payload.into_inner()).await {
        Ok(id) => HttpResponse::Created().json(json!({ "id": id })),
        Err(e) if e.is_validation() => {
            HttpResponse::BadRequest().json(json!({ "error": e.to_string() }))
        }
        Err(e) => {
            error!("failed to create transaction: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "internal error" }))
        }
    }
}

pub async fn get_transaction(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let id = match Uuid::parse_str(&path) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({ "error": "invalid transaction id" }))
        }
    };

    match state.transactions.get(id).await {
        Ok(Some(transaction)) => HttpResponse::Ok().json(transaction),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "transaction not found" })),
        Err(e) => {
            error!("failed to get transaction {}: {}", id, e);
            HttpResponse::InternalServerError().json(json!({ "error": "internal error" }))
        }
    }
}

pub async fn list_transactions(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> impl Responder {
    let (limit, offset) = query.normalised();

    match state.transactions.list(limit, offset).await {
        Ok(transactions) => HttpResponse::Ok().json(json!({
            "data": transactions,
            "limit": limit,
            "offset": offset,
        })),
        Err(e) => {
            error!("failed to list transactions: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "internal error" }))
        }
    }
}

pub async fn get_settlement(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = match Uuid::parse_str(&path) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({ "error": "invalid settlement id" }))
        }
    };

    match state.settlements.get_by_id(id).await {
        Ok(Some(settlement)) => HttpResponse::Ok().json(settlement),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "settlement not found" })),
        Err(e) => {
            error!("failed to get settlement {}: {}", id, e);
            HttpResponse::InternalServerError().json(json!({ "error": "internal error" }))
        }
    }
}

pub async fn list_settlements(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> impl Responder {
    let (limit, offset) = query.normalised();

    match state.settlements.list(limit, offset).await {
        Ok(settlements) => HttpResponse::Ok().json(json!({
            "data": settlements,
            "limit": limit,
            "offset": offset,
        })),
        Err(e) => {
            error!("failed to list settlements: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "internal error" }))
        }
    }
}
