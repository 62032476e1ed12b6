//! Cash payment submission.

use service_core::error::AppError;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::dtos::{PaymentRequest, PaymentView};
use crate::services::builder::{build_payment_request, CASH_SOURCE_ID};
use crate::services::metrics::{record_payment_amount, record_payment_submitted};
use crate::services::money::CURRENCY;
use crate::services::square::PaymentProcessor;

#[derive(Clone)]
pub struct PaymentService {
    processor: Arc<dyn PaymentProcessor>,
    location_id: String,
}

impl PaymentService {
    pub fn new(processor: Arc<dyn PaymentProcessor>, location_id: impl Into<String>) -> Self {
        Self {
            processor,
            location_id: location_id.into(),
        }
    }

    /// Submit a cash payment against an order. The view echoes the request
    /// amounts; nothing is read back from the processor's payment.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentView, AppError> {
        let payload = build_payment_request(&self.location_id, request)?;

        match self.processor.create_payment(&payload).await {
            Ok(payment) => {
                record_payment_submitted("success");
                record_payment_amount(
                    CURRENCY,
                    payload.amount_money.amount,
                    payload.tip_money.amount,
                );
                info!(payment_id = ?payment.id, status = ?payment.status, "Payment submitted");
            }
            Err(e) => {
                record_payment_submitted("error");
                error!(error = %e, "Failed to submit payment");
                return Err(e.into());
            }
        }

        Ok(PaymentView {
            order_id: request.order_id.clone(),
            bill_amount: request.bill_amount,
            tip_amount: request.tip_amount,
            source_id: CASH_SOURCE_ID.to_string(),
        })
    }
}
