//! Inbound translation: processor orders to `OrderView`.
//!
//! Absent nested collections (line items, modifiers, discounts, tenders)
//! become empty vectors and absent money fields become zero; nothing
//! optional leaks past this module.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::dtos::{DiscountView, LineItemView, ModifierView, OrderTotals, OrderView};
use crate::services::money::major_or_zero;
use crate::services::square::{
    Order, OrderLineItem, OrderLineItemAppliedDiscount, OrderLineItemModifier, ProcessorError,
    Tender,
};

/// The only processor state that counts as closed. Matched exactly.
pub const COMPLETED_STATE: &str = "COMPLETED";

pub fn map_order(order: &Order) -> Result<OrderView, ProcessorError> {
    let id = order
        .id
        .clone()
        .ok_or_else(|| ProcessorError::Mapping("order has no id".to_string()))?;

    Ok(OrderView {
        created_at: parse_timestamp(&id, order.created_at.as_deref())?,
        is_closed: is_closed(order.state.as_deref()),
        table_number: order.reference_id.clone().unwrap_or_default(),
        location_id: order.location_id.clone(),
        items: map_line_items(order.line_items.as_deref().unwrap_or_default())?,
        totals: map_totals(order),
        id,
    })
}

pub fn is_closed(state: Option<&str>) -> bool {
    state == Some(COMPLETED_STATE)
}

fn parse_timestamp(order_id: &str, raw: Option<&str>) -> Result<DateTime<Utc>, ProcessorError> {
    let raw = raw.ok_or_else(|| {
        ProcessorError::Mapping(format!("order {} has no created_at", order_id))
    })?;
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            ProcessorError::Mapping(format!(
                "order {} has malformed created_at '{}': {}",
                order_id, raw, e
            ))
        })
}

fn parse_quantity(raw: Option<&str>) -> Result<Decimal, ProcessorError> {
    match raw {
        None => Ok(Decimal::ZERO),
        Some(q) => Decimal::from_str(q.trim())
            .map_err(|e| ProcessorError::Mapping(format!("malformed quantity '{}': {}", q, e))),
    }
}

fn map_line_items(items: &[OrderLineItem]) -> Result<Vec<LineItemView>, ProcessorError> {
    items
        .iter()
        .map(|item| {
            Ok(LineItemView {
                name: item.name.clone().unwrap_or_default(),
                comment: None,
                quantity: parse_quantity(Some(item.quantity.as_str()))?,
                unit_price: major_or_zero(item.base_price_money.as_ref()),
                amount: major_or_zero(item.total_money.as_ref()),
                discounts: map_discounts(item.applied_discounts.as_deref().unwrap_or_default()),
                modifiers: map_modifiers(item.modifiers.as_deref().unwrap_or_default())?,
            })
        })
        .collect()
}

// Percentage discounts are reported as flat amounts; the flag is never set.
fn map_discounts(discounts: &[OrderLineItemAppliedDiscount]) -> Vec<DiscountView> {
    discounts
        .iter()
        .map(|discount| DiscountView {
            name: discount.discount_uid.clone(),
            amount: major_or_zero(discount.applied_money.as_ref()),
            is_percentage: false,
        })
        .collect()
}

fn map_modifiers(modifiers: &[OrderLineItemModifier]) -> Result<Vec<ModifierView>, ProcessorError> {
    modifiers
        .iter()
        .map(|modifier| {
            Ok(ModifierView {
                name: modifier.name.clone().unwrap_or_default(),
                quantity: parse_quantity(modifier.quantity.as_deref())?,
                unit_price: major_or_zero(modifier.base_price_money.as_ref()),
                amount: major_or_zero(modifier.total_price_money.as_ref()),
            })
        })
        .collect()
}

fn map_totals(order: &Order) -> OrderTotals {
    OrderTotals {
        discounts: major_or_zero(order.total_discount_money.as_ref()),
        due: major_or_zero(order.net_amount_due_money.as_ref()),
        tax: major_or_zero(order.total_tax_money.as_ref()),
        service_charge: major_or_zero(order.total_service_charge_money.as_ref()),
        tips: major_or_zero(order.total_tip_money.as_ref()),
        paid: paid_to_date(order.tenders.as_deref().unwrap_or_default()),
        total: major_or_zero(order.total_money.as_ref()),
    }
}

fn paid_to_date(tenders: &[Tender]) -> Decimal {
    tenders
        .iter()
        .map(|tender| major_or_zero(tender.amount_money.as_ref()))
        .sum()
}
