//! Order request and view DTOs.
//!
//! Money fields are decimal major units. Conversion to the processor's
//! minor units happens in `services::builder` and `services::mapper`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_non_negative, validate_positive};

/// Body of `POST /api/order`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderRequest {
    #[validate(length(min = 1, message = "Table number is required"))]
    pub table_number: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location_id: String,
    #[validate(nested)]
    pub items: Vec<LineItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    /// Bounded to what the local store's `INTEGER` column holds.
    #[validate(range(
        min = 1,
        max = 2147483647,
        message = "Quantity must be between 1 and 2147483647"
    ))]
    pub quantity: u32,
    /// Unit price.
    #[validate(custom(function = "validate_non_negative"))]
    pub price: Decimal,
    #[serde(default)]
    #[validate(nested)]
    pub modifiers: Vec<LineItemModifierRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineItemModifierRequest {
    #[validate(length(min = 1, message = "Modifier name is required"))]
    pub name: String,
    #[validate(custom(function = "validate_non_negative"))]
    pub unit_price: Decimal,
    /// Fractional quantities are allowed by the processor.
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub is_closed: bool,
    pub table_number: String,
    pub location_id: String,
    pub items: Vec<LineItemView>,
    pub totals: OrderTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemView {
    pub name: String,
    pub comment: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub discounts: Vec<DiscountView>,
    pub modifiers: Vec<ModifierView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierView {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountView {
    /// The processor's discount uid, not a display label.
    pub name: String,
    pub amount: Decimal,
    pub is_percentage: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub discounts: Decimal,
    pub due: Decimal,
    pub tax: Decimal,
    pub service_charge: Decimal,
    pub tips: Decimal,
    pub paid: Decimal,
    pub total: Decimal,
}
