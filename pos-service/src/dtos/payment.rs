use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_non_negative;

/// Body of `POST /api/payment`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaymentRequest {
    #[validate(length(min = 1, message = "Order id is required"))]
    pub order_id: String,
    #[validate(custom(function = "validate_non_negative"))]
    pub bill_amount: Decimal,
    #[validate(custom(function = "validate_non_negative"))]
    pub tip_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentView {
    pub order_id: String,
    pub bill_amount: Decimal,
    pub tip_amount: Decimal,
    pub source_id: String,
}
