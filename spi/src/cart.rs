//! Cart snapshots taken at checkout.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// A single product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product name shown to the shopper.
    pub name: String,
    /// Price of one unit.
    pub unit_price: Amount,
    /// Number of units.
    pub quantity: u32,
}

impl LineItem {
    /// Creates a line item.
    pub fn new(name: impl Into<String>, unit_price: Amount, quantity: u32) -> Self {
        Self {
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Amount {
        self.unit_price.saturating_mul(self.quantity)
    }
}

/// An ordered, read-only view of the cart at the moment the shopper checks out.
///
/// No tax or shipping is modelled, so the total equals the subtotal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    items: Vec<LineItem>,
}

impl CartSnapshot {
    /// Creates a snapshot from line items, keeping their order.
    #[must_use]
    pub const fn new(items: Vec<LineItem>) -> Self {
        Self { items }
    }

    /// The line items in checkout order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns `true` if the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of every line total.
    #[must_use]
    pub fn subtotal(&self) -> Amount {
        self.items
            .iter()
            .map(LineItem::line_total)
            .fold(Amount::ZERO, Amount::saturating_add)
    }

    /// Amount due. Equal to [`CartSnapshot::subtotal`].
    #[must_use]
    pub fn total(&self) -> Amount {
        self.subtotal()
    }
}

impl FromIterator<LineItem> for CartSnapshot {
    fn from_iter<I: IntoIterator<Item = LineItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, price: &str, quantity: u32) -> LineItem {
        LineItem::new(name, price.parse().unwrap(), quantity)
    }

    #[test]
    fn test_total_sums_price_times_quantity() {
        let cart: CartSnapshot = [
            item("Premium Wireless Headphones", "299.99", 1),
            item("Smart Watch Pro", "449.99", 1),
            item("USB-C Cable (3-Pack)", "29.99", 2),
        ]
        .into_iter()
        .collect();
        assert_eq!(cart.total().to_string(), "809.96");
        assert_eq!(cart.unit_count(), 4);
    }

    #[test]
    fn test_decimal_sum_has_no_float_drift() {
        let cart = CartSnapshot::new(vec![item("a", "0.10", 1), item("b", "0.20", 1)]);
        assert_eq!(cart.total(), "0.3".parse().unwrap());
    }

    #[test]
    fn test_empty_cart_totals_zero() {
        let cart = CartSnapshot::default();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Amount::ZERO);
    }

    #[test]
    fn test_zero_quantity_line_contributes_nothing() {
        assert_eq!(item("x", "12.50", 0).line_total(), Amount::ZERO);
    }
}
