pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use config::PosConfig;
use services::{OrderService, PaymentProcessor, PaymentService, PosRepository};

pub use startup::Application;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: PosConfig,
    pub repository: Arc<dyn PosRepository>,
    pub orders: OrderService,
    pub payments: PaymentService,
}

impl AppState {
    /// Wire both services to one processor client, bound to the configured
    /// location.
    pub fn new(
        config: PosConfig,
        repository: Arc<dyn PosRepository>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Self {
        let location_id = config.square.location_id.clone();
        Self {
            orders: OrderService::new(processor.clone(), location_id.clone()),
            payments: PaymentService::new(processor, location_id),
            repository,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/api/order", post(handlers::orders::create_order))
        .route("/api/order/:order_id", get(handlers::orders::get_order))
        .route(
            "/api/order/table/:table_number",
            get(handlers::orders::get_orders_by_table),
        )
        .route("/api/payment", post(handlers::payments::create_payment))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Outermost: the trace span reads the id assigned here.
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
