//! Money and tax arithmetic.
//!
//! Everything here is pure and works on [`BigDecimal`] so repeated computations over the same
//! inputs always produce the same cents. Rounding to currency precision happens once, at the
//! point a figure is displayed or stored.

use bigdecimal::{BigDecimal, RoundingMode, Zero};

use crate::invoice::LineItem;

/// Number of decimal places used for every displayed and stored amount.
pub const CURRENCY_SCALE: i64 = 2;

/// Sum `quantity * price` over `items`.
///
/// An empty list yields zero. A line with quantity `0` contributes nothing; rejecting such lines
/// is left to [`crate::validate`].
pub fn subtotal(items: &[LineItem]) -> BigDecimal {
    items
        .iter()
        .map(LineItem::total)
        .fold(BigDecimal::zero(), |acc, line| acc + line)
}

/// Compute `subtotal * tax_rate / 100`. The rate is a percentage and may be zero.
pub fn tax_amount(subtotal: &BigDecimal, tax_rate: &BigDecimal) -> BigDecimal {
    subtotal * tax_rate / BigDecimal::from(100)
}

/// Grand total of `items` at `tax_rate`, rounded to currency precision.
///
/// # Example
/// ```rust
/// use std::str::FromStr;
///
/// use bigdecimal::BigDecimal;
/// use invoicely::{money, LineItemBuilder};
///
/// let items = vec![
///     LineItemBuilder::default()
///         .description("Design")
///         .quantity(2)
///         .price(BigDecimal::from(50))
///         .build()
///         .unwrap(),
///     LineItemBuilder::default()
///         .description("Hosting")
///         .quantity(1)
///         .price(BigDecimal::from(25))
///         .build()
///         .unwrap(),
/// ];
/// let total = money::total(&items, &BigDecimal::from(10));
/// assert_eq!(total, BigDecimal::from_str("137.50").unwrap());
/// ```
pub fn total(items: &[LineItem], tax_rate: &BigDecimal) -> BigDecimal {
    let subtotal = subtotal(items);
    let tax = tax_amount(&subtotal, tax_rate);
    round_currency(&(subtotal + tax))
}

/// Round half away from zero to [`CURRENCY_SCALE`] places.
pub fn round_currency(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(CURRENCY_SCALE, RoundingMode::HalfUp)
}

/// Render an amount with exactly two decimals, e.g. `137.50` or `0.00`.
///
/// `Display` of a zero `BigDecimal` drops its scale, so the precision is given explicitly.
pub fn format_money(value: &BigDecimal) -> String {
    format!("{:.2}", round_currency(value))
}

/// Subtotal, tax and grand total of an invoice, each rounded for display.
///
/// `total` is rounded from the exact sum, so it is always equal to [`total`] for the same input
/// even when the rounded `subtotal` and `tax` would add up to a different cent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
}

impl Totals {
    pub fn compute(items: &[LineItem], tax_rate: &BigDecimal) -> Totals {
        let subtotal = subtotal(items);
        let tax = tax_amount(&subtotal, tax_rate);
        let total = round_currency(&(&subtotal + &tax));
        Totals {
            subtotal: round_currency(&subtotal),
            tax: round_currency(&tax),
            total,
        }
    }
}
