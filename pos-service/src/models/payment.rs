//! Locally stored cash payments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A payment as recorded locally. The id is generated here, not by the
/// processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: String,
    pub bill_amount: Decimal,
    pub tip_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: String,
    pub bill_amount: Decimal,
    pub tip_amount: Decimal,
}
