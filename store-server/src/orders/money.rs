//! Money calculation for order totals
//!
//! All amounts are `Decimal` with 2-place precision. Rounding happens at
//! computation boundaries (each derived aggregate), never before
//! comparisons.

use rust_decimal::prelude::*;
use shared::models::OrderItem;

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum order item quantity accepted at checkout
pub const MAX_QUANTITY: u32 = 9999;

/// Round a monetary value to 2 places, midpoint away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Computed order aggregates, derived once at checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
}

/// Compute the order aggregates from item snapshots.
///
/// `tax_rate_percent` is the percent rate (5 = 5%); `shipping_amount`
/// is the flat amount for the chosen method, zero for digital-only
/// orders.
pub fn compute_totals(
    items: &[OrderItem],
    tax_rate_percent: Decimal,
    shipping_amount: Decimal,
) -> OrderTotals {
    let subtotal = round_money(items.iter().map(OrderItem::line_total).sum());
    let tax_amount = round_money(subtotal * tax_rate_percent / Decimal::from(100));
    let shipping_amount = round_money(shipping_amount);
    let total_amount = round_money(subtotal + tax_amount + shipping_amount);

    OrderTotals {
        subtotal,
        tax_amount,
        shipping_amount,
        total_amount,
    }
}
