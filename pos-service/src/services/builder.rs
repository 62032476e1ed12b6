//! Outbound translation: order and payment requests to processor payloads.

use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{LineItemModifierRequest, LineItemRequest, OrderRequest, PaymentRequest};
use crate::services::money::money;
use crate::services::square::{
    CashPaymentDetails, CreateOrderRequest, CreatePaymentRequest, Money, Order, OrderLineItem,
    OrderLineItemModifier,
};

/// Only cash tenders are supported.
pub const CASH_SOURCE_ID: &str = "CASH";

/// Minor units reported as physically tendered for every cash payment.
/// A fixed placeholder, not derived from the bill.
pub const CASH_TENDERED_PLACEHOLDER: i64 = 100_000_000_000_000;

/// Fresh token per attempt; retries are new logical attempts.
fn new_idempotency_key() -> String {
    Uuid::new_v4().to_string()
}

/// Processor order for a table. The table number travels in `reference_id`,
/// the only field it can later be recovered from.
pub fn build_order(location_id: &str, request: &OrderRequest) -> Result<Order, AppError> {
    Ok(Order {
        location_id: location_id.to_string(),
        reference_id: Some(request.table_number.clone()),
        line_items: Some(build_line_items(&request.items)?),
        ..Default::default()
    })
}

pub fn build_line_items(items: &[LineItemRequest]) -> Result<Vec<OrderLineItem>, AppError> {
    items
        .iter()
        .map(|item| {
            Ok(OrderLineItem {
                name: Some(item.name.clone()),
                quantity: item.quantity.to_string(),
                base_price_money: Some(money(item.price)?),
                modifiers: Some(build_modifiers(&item.modifiers)?),
                ..Default::default()
            })
        })
        .collect()
}

fn build_modifiers(
    modifiers: &[LineItemModifierRequest],
) -> Result<Vec<OrderLineItemModifier>, AppError> {
    modifiers
        .iter()
        .map(|modifier| {
            Ok(OrderLineItemModifier {
                name: Some(modifier.name.clone()),
                quantity: Some(modifier.quantity.normalize().to_string()),
                base_price_money: Some(money(modifier.unit_price)?),
                ..Default::default()
            })
        })
        .collect()
}

pub fn build_create_order_request(
    location_id: &str,
    request: &OrderRequest,
) -> Result<CreateOrderRequest, AppError> {
    Ok(CreateOrderRequest {
        order: build_order(location_id, request)?,
        idempotency_key: new_idempotency_key(),
    })
}

pub fn build_payment_request(
    location_id: &str,
    request: &PaymentRequest,
) -> Result<CreatePaymentRequest, AppError> {
    Ok(CreatePaymentRequest {
        source_id: CASH_SOURCE_ID.to_string(),
        idempotency_key: new_idempotency_key(),
        amount_money: money(request.bill_amount)?,
        tip_money: money(request.tip_amount)?,
        order_id: request.order_id.clone(),
        location_id: location_id.to_string(),
        cash_details: CashPaymentDetails {
            buyer_supplied_money: Money::new(CASH_TENDERED_PLACEHOLDER),
        },
    })
}
