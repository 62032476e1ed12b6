//! Locally stored orders and their line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::FromRow;

use crate::dtos::OrderRequest;

/// An order as recorded locally. `id` is the processor's order id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: String,
    pub table_number: String,
    pub location_id: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: String,
    pub name: String,
    pub quantity: i32,
    /// Unit price in major units.
    pub price: Decimal,
}

/// Input for recording an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: String,
    pub table_number: String,
    pub location_id: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl NewOrder {
    /// Local record for a request the processor accepted as `order_id`.
    /// Table, location and items come from the request, not the processor.
    pub fn from_request(order_id: &str, request: &OrderRequest) -> Result<Self, AppError> {
        let items = request
            .items
            .iter()
            .map(|item| {
                let quantity = i32::try_from(item.quantity).map_err(|_| {
                    AppError::BadRequest(anyhow::anyhow!(
                        "quantity out of range for item '{}'",
                        item.name
                    ))
                })?;
                Ok(NewOrderItem {
                    name: item.name.clone(),
                    quantity,
                    price: item.price,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Self {
            id: order_id.to_string(),
            table_number: request.table_number.clone(),
            location_id: request.location_id.clone(),
            created_at: Utc::now(),
            items,
        })
    }
}
