//! Order endpoints.
//!
//! Every order is created at the processor first; the local record adopts the
//! processor's id. Reads check the local record, then return the processor's
//! current view.

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{LineItemView, OrderRequest, OrderView};
use crate::models::{NewOrder, Order};
use crate::AppState;

/// Create an order remotely, record it locally and return the merged view.
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<Json<OrderView>, AppError> {
    request.validate()?;

    let remote = state.orders.create_order(&request).await?;

    let local = NewOrder::from_request(&remote.id, &request)?;
    let stored = state.repository.add_order(local).await.map_err(|e| {
        tracing::error!(order_id = %remote.id, error = %e, "Failed to record order locally");
        e
    })?;

    Ok(Json(merged_view(stored, remote)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderView>, AppError> {
    if state.repository.get_order(&order_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Order with ID {} was not found.",
            order_id
        )));
    }

    let view = state.orders.get_order(&order_id).await?;
    Ok(Json(view))
}

pub async fn get_orders_by_table(
    State(state): State<AppState>,
    Path(table_number): Path<String>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    if state
        .repository
        .get_orders_by_table(&table_number)
        .await?
        .is_empty()
    {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "No orders found for table {}",
            table_number
        )));
    }

    let views = state.orders.get_orders_by_table(&table_number).await?;
    Ok(Json(views))
}

/// Identity, timestamps and items come from the local record; totals from
/// the processor. A fresh order is never closed.
fn merged_view(local: Order, remote: OrderView) -> OrderView {
    let items = local
        .items
        .into_iter()
        .map(|item| {
            let quantity = Decimal::from(item.quantity);
            LineItemView {
                name: item.name,
                comment: None,
                quantity,
                unit_price: item.price,
                amount: item.price * quantity,
                discounts: Vec::new(),
                modifiers: Vec::new(),
            }
        })
        .collect();

    OrderView {
        id: local.id,
        created_at: local.created_at,
        is_closed: false,
        table_number: local.table_number,
        location_id: local.location_id,
        items,
        totals: remote.totals,
    }
}
