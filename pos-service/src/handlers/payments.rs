//! Payment endpoint.

use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{PaymentRequest, PaymentView};
use crate::models::NewPayment;
use crate::AppState;

/// Submit a cash payment remotely, then record it locally under a fresh id.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<PaymentView>, AppError> {
    request.validate()?;

    let view = state.payments.create_payment(&request).await?;

    let stored = state
        .repository
        .add_payment(NewPayment {
            order_id: request.order_id.clone(),
            bill_amount: request.bill_amount,
            tip_amount: request.tip_amount,
        })
        .await?;

    tracing::info!(payment_id = %stored.id, order_id = %stored.order_id, "Payment recorded");

    Ok(Json(PaymentView {
        order_id: stored.order_id,
        bill_amount: stored.bill_amount,
        tip_amount: stored.tip_amount,
        source_id: view.source_id,
    }))
}
