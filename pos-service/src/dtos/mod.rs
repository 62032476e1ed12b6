pub mod order;
pub mod payment;

pub use order::{
    DiscountView, LineItemModifierRequest, LineItemRequest, LineItemView, ModifierView,
    OrderRequest, OrderTotals, OrderView,
};
pub use payment::{PaymentRequest, PaymentView};

use rust_decimal::Decimal;
use validator::ValidationError;

pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Amount must not be negative".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new("positive");
        err.message = Some("Quantity must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}
