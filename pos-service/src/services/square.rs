//! Square payment processor client.
//!
//! Implements the subset of the Square Connect v2 API this service needs:
//! order creation, retrieval and search, and payment creation. Wire types
//! mirror the processor's JSON; every optional nested collection stays an
//! `Option<Vec<_>>` here and is normalised by the mapper.

use crate::config::SquareConfig;
use crate::services::metrics::record_processor_call;
use crate::services::money::CURRENCY;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

/// Header pinning the API version the wire types were written against.
const SQUARE_VERSION_HEADER: &str = "Square-Version";

/// Amount in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64) -> Self {
        Self {
            amount,
            currency: CURRENCY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub location_id: String,
    /// Free-text reference; carries the table number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<OrderLineItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenders: Option<Vec<Tender>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tax_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_discount_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tip_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_service_charge_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_amount_due_money: Option<Money>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderLineItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Decimal quantity encoded as a string, e.g. `"2"` or `"1.5"`.
    pub quantity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_price_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_discounts: Option<Vec<OrderLineItemAppliedDiscount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<Vec<OrderLineItemModifier>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderLineItemModifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_price_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price_money: Option<Money>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderLineItemAppliedDiscount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub discount_uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_money: Option<Money>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tender {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tender_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_money: Option<Money>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// `POST /v2/orders` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub order: Order,
    pub idempotency_key: String,
}

/// `POST /v2/orders/search` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOrdersRequest {
    pub location_ids: Vec<String>,
}

/// Amount physically handed over for a cash payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashPaymentDetails {
    pub buyer_supplied_money: Money,
}

/// `POST /v2/payments` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub source_id: String,
    pub idempotency_key: String,
    pub amount_money: Money,
    pub tip_money: Money,
    pub order_id: String,
    pub location_id: String,
    pub cash_details: CashPaymentDetails,
}

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    order: Option<Order>,
}

#[derive(Debug, Deserialize)]
struct SearchOrdersResponse {
    orders: Option<Vec<Order>>,
}

#[derive(Debug, Deserialize)]
struct PaymentEnvelope {
    payment: Option<Payment>,
}

/// Square API error response.
#[derive(Debug, Deserialize)]
pub struct SquareErrorResponse {
    #[serde(default)]
    pub errors: Vec<SquareErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct SquareErrorDetail {
    pub category: String,
    pub code: String,
    pub detail: Option<String>,
    pub field: Option<String>,
}

impl SquareErrorResponse {
    fn message(&self) -> String {
        self.errors
            .iter()
            .map(|e| match &e.detail {
                Some(detail) => format!("{} - {}", e.code, detail),
                None => format!("{} ({})", e.code, e.category),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Failures at the processor boundary.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("{0}")]
    NotFound(String),

    #[error("external processor error: {0}")]
    Remote(String),

    #[error("failed to map processor response: {0}")]
    Mapping(String),
}

impl ProcessorError {
    fn label(&self) -> &'static str {
        match self {
            ProcessorError::NotFound(_) => "not_found",
            ProcessorError::Remote(_) => "remote_error",
            ProcessorError::Mapping(_) => "mapping_error",
        }
    }
}

impl From<ProcessorError> for AppError {
    fn from(err: ProcessorError) -> Self {
        match err {
            ProcessorError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            ProcessorError::Remote(_) => AppError::BadGateway(err.to_string()),
            ProcessorError::Mapping(_) => AppError::InternalError(anyhow::anyhow!(err)),
        }
    }
}

/// The remote order/payment platform.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ProcessorError>;

    /// `Ok(None)` when the processor has no order with this id.
    async fn retrieve_order(&self, order_id: &str) -> Result<Option<Order>, ProcessorError>;

    async fn search_orders(
        &self,
        request: &SearchOrdersRequest,
    ) -> Result<Vec<Order>, ProcessorError>;

    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<Payment, ProcessorError>;
}

/// Square client for interacting with the Square API.
#[derive(Clone)]
pub struct SquareClient {
    client: Client,
    config: SquareConfig,
}

impl SquareClient {
    /// Create a new Square client with a pooled HTTP connection.
    pub fn new(config: SquareConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Check if Square is configured (access token is set).
    pub fn is_configured(&self) -> bool {
        !self.config.access_token.expose_secret().is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.config.access_token.expose_secret())
            .header(SQUARE_VERSION_HEADER, &self.config.api_version)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<(StatusCode, String), ProcessorError> {
        if !self.is_configured() {
            return Err(ProcessorError::Remote(
                "Square credentials not configured".to_string(),
            ));
        }

        let response = self.authorized(request).send().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Square request failed");
            ProcessorError::Remote(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProcessorError::Remote(e.to_string()))?;

        tracing::debug!(operation, status = %status, "Square response received");

        Ok((status, body))
    }

    fn decode<T: DeserializeOwned>(
        operation: &'static str,
        status: StatusCode,
        body: &str,
    ) -> Result<T, ProcessorError> {
        if !status.is_success() {
            let message = serde_json::from_str::<SquareErrorResponse>(body)
                .ok()
                .map(|e| e.message())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| body.to_string());
            tracing::error!(operation, status = %status, error = %message, "Square request rejected");
            return Err(ProcessorError::Remote(message));
        }

        serde_json::from_str(body).map_err(|e| {
            tracing::error!(operation, error = %e, "Unexpected Square response body");
            ProcessorError::Mapping(e.to_string())
        })
    }
}

fn observe<T>(operation: &'static str, result: Result<T, ProcessorError>) -> Result<T, ProcessorError> {
    match &result {
        Ok(_) => record_processor_call(operation, "ok"),
        Err(e) => record_processor_call(operation, e.label()),
    }
    result
}

#[async_trait]
impl PaymentProcessor for SquareClient {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ProcessorError> {
        let result: Result<Order, ProcessorError> = async {
            let (status, body) = self
                .send(
                    "create_order",
                    self.client.post(self.url("/v2/orders")).json(request),
                )
                .await?;
            let envelope: OrderEnvelope = Self::decode("create_order", status, &body)?;
            envelope
                .order
                .ok_or_else(|| ProcessorError::Mapping("create order response has no order".to_string()))
        }
        .await;

        if let Ok(order) = &result {
            tracing::info!(
                order_id = ?order.id,
                reference_id = ?order.reference_id,
                "Square order created"
            );
        }
        observe("create_order", result)
    }

    async fn retrieve_order(&self, order_id: &str) -> Result<Option<Order>, ProcessorError> {
        let result: Result<Option<Order>, ProcessorError> = async {
            let (status, body) = self
                .send(
                    "retrieve_order",
                    self.client.get(self.url(&format!("/v2/orders/{}", order_id))),
                )
                .await?;
            if status == StatusCode::NOT_FOUND {
                tracing::info!(order_id, "Square order not found");
                return Ok(None);
            }
            let envelope: OrderEnvelope = Self::decode("retrieve_order", status, &body)?;
            Ok(envelope.order)
        }
        .await;

        observe("retrieve_order", result)
    }

    async fn search_orders(
        &self,
        request: &SearchOrdersRequest,
    ) -> Result<Vec<Order>, ProcessorError> {
        let result: Result<Vec<Order>, ProcessorError> = async {
            let (status, body) = self
                .send(
                    "search_orders",
                    self.client.post(self.url("/v2/orders/search")).json(request),
                )
                .await?;
            let response: SearchOrdersResponse = Self::decode("search_orders", status, &body)?;
            Ok(response.orders.unwrap_or_default())
        }
        .await;

        observe("search_orders", result)
    }

    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<Payment, ProcessorError> {
        let result: Result<Payment, ProcessorError> = async {
            let (status, body) = self
                .send(
                    "create_payment",
                    self.client.post(self.url("/v2/payments")).json(request),
                )
                .await?;
            let envelope: PaymentEnvelope = Self::decode("create_payment", status, &body)?;
            envelope.payment.ok_or_else(|| {
                ProcessorError::Mapping("create payment response has no payment".to_string())
            })
        }
        .await;

        if let Ok(payment) = &result {
            tracing::info!(
                payment_id = ?payment.id,
                order_id = %request.order_id,
                status = ?payment.status,
                "Square payment created"
            );
        }
        observe("create_payment", result)
    }
}
