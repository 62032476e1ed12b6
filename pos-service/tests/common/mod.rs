#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use pos_service::config::{DatabaseConfig, PosConfig, SquareConfig, StoreBackend};
use pos_service::services::square::{
    CreateOrderRequest, CreatePaymentRequest, Money, Order, Payment, PaymentProcessor,
    ProcessorError, SearchOrdersRequest,
};
use pos_service::services::InMemoryRepository;
use pos_service::{build_router, AppState};
use secrecy::Secret;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

pub const LOCATION_ID: &str = "L1";
pub const CREATED_AT: &str = "2024-11-25T14:56:50Z";

/// In-process processor that echoes created orders back and records every
/// call it receives.
#[derive(Default)]
pub struct FakeProcessor {
    orders: Mutex<Vec<Order>>,
    order_requests: Mutex<Vec<CreateOrderRequest>>,
    payment_requests: Mutex<Vec<CreatePaymentRequest>>,
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
}

impl FakeProcessor {
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn seed(&self, order: Order) {
        self.orders.lock().unwrap().push(order);
    }

    pub fn set_state(&self, order_id: &str, state: &str) {
        let mut orders = self.orders.lock().unwrap();
        if let Some(order) = orders
            .iter_mut()
            .find(|o| o.id.as_deref() == Some(order_id))
        {
            order.state = Some(state.to_string());
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn order_requests(&self) -> Vec<CreateOrderRequest> {
        self.order_requests.lock().unwrap().clone()
    }

    pub fn payment_requests(&self) -> Vec<CreatePaymentRequest> {
        self.payment_requests.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> Result<(), ProcessorError> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(ProcessorError::Remote(message)),
            None => Ok(()),
        }
    }
}

/// A remote order as the processor would report it.
pub fn remote_order(id: &str, reference: &str, state: &str) -> Order {
    Order {
        id: Some(id.to_string()),
        location_id: LOCATION_ID.to_string(),
        reference_id: Some(reference.to_string()),
        state: Some(state.to_string()),
        created_at: Some(CREATED_AT.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ProcessorError> {
        self.record("create_order")?;
        self.order_requests.lock().unwrap().push(request.clone());

        let mut order = request.order.clone();
        let mut orders = self.orders.lock().unwrap();
        order.id = Some(format!("SQ-{}", orders.len() + 1));
        order.state = Some("OPEN".to_string());
        order.created_at = Some(CREATED_AT.to_string());

        let mut total = 0;
        if let Some(items) = order.line_items.as_mut() {
            for item in items.iter_mut() {
                let quantity: i64 = item.quantity.parse().unwrap_or(0);
                let unit = item
                    .base_price_money
                    .as_ref()
                    .map(|m| m.amount)
                    .unwrap_or(0);
                item.total_money = Some(Money::new(unit * quantity));
                total += unit * quantity;
            }
        }
        order.total_money = Some(Money::new(total));
        order.net_amount_due_money = Some(Money::new(total));

        orders.push(order.clone());
        Ok(order)
    }

    async fn retrieve_order(&self, order_id: &str) -> Result<Option<Order>, ProcessorError> {
        self.record("retrieve_order")?;
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id.as_deref() == Some(order_id))
            .cloned())
    }

    async fn search_orders(
        &self,
        request: &SearchOrdersRequest,
    ) -> Result<Vec<Order>, ProcessorError> {
        self.record("search_orders")?;
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| request.location_ids.contains(&o.location_id))
            .cloned()
            .collect())
    }

    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<Payment, ProcessorError> {
        self.record("create_payment")?;
        self.payment_requests.lock().unwrap().push(request.clone());
        Ok(Payment {
            id: Some("PAY-1".to_string()),
            status: Some("COMPLETED".to_string()),
            order_id: Some(request.order_id.clone()),
            amount_money: Some(request.amount_money.clone()),
            tip_money: Some(request.tip_money.clone()),
            source_type: Some("CASH".to_string()),
            ..Default::default()
        })
    }
}

pub fn test_config() -> PosConfig {
    PosConfig {
        common: service_core::config::Config::default(),
        service_name: "pos-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "info".to_string(),
        otlp_endpoint: None,
        store: StoreBackend::Memory,
        database: DatabaseConfig {
            url: Secret::new(String::new()),
            max_connections: 1,
            min_connections: 0,
        },
        square: SquareConfig {
            access_token: Secret::new("test-token".to_string()),
            location_id: LOCATION_ID.to_string(),
            api_base_url: "http://127.0.0.1:1".to_string(),
            api_version: "2024-10-17".to_string(),
            timeout_seconds: 5,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub processor: Arc<FakeProcessor>,
    pub repository: Arc<InMemoryRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        let processor = Arc::new(FakeProcessor::default());
        let repository = Arc::new(InMemoryRepository::new());
        let state = AppState::new(test_config(), repository.clone(), processor.clone());

        Self {
            router: build_router(state),
            processor,
            repository,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

/// Money is serialized as a JSON float; compare to the cent.
pub fn assert_money(value: &Value, expected: f64) {
    let actual = value
        .as_f64()
        .unwrap_or_else(|| panic!("expected a number, got {}", value));
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}
