//! Session cart.
//!
//! The cart lives in the session under a single key as a map from product id
//! (decimal string) to an entry holding a snapshot of the product's name,
//! image and discounted price taken when it was first added. Quantities are
//! `NonZeroU32`, so an entry can never be stored at zero: reducing below one
//! is a no-op and removal is explicit.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clothaura_core::ProductId;

use super::product::Product;

/// Requested quantity for an add-to-cart action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Coerce raw query input into a quantity.
    ///
    /// Missing, non-numeric and non-positive values become 1. Values above
    /// `u32::MAX` saturate.
    #[must_use]
    pub fn coerce(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n >= 1)
            .map_or(Self::ONE, |n| {
                let n = u32::try_from(n).unwrap_or(u32::MAX);
                NonZeroU32::new(n).map_or(Self::ONE, Self)
            })
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub name: String,
    /// Discounted price at the moment the product was first added.
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub qty: NonZeroU32,
}

impl CartEntry {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.qty.get())
    }
}

/// Read-only line of a cart view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub qty: u32,
    pub line_total: Decimal,
}

/// Snapshot of the whole cart with computed totals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub grand_total: Decimal,
}

impl CartView {
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.qty)).sum()
    }
}

/// The per-session cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    entries: BTreeMap<String, CartEntry>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `qty` of a product.
    ///
    /// A product already in the cart only has its quantity raised; its name,
    /// image and unit price stay as first captured.
    pub fn add(&mut self, product: &Product, qty: Quantity) {
        self.entries
            .entry(product.id.to_string())
            .and_modify(|entry| entry.qty = entry.qty.saturating_add(qty.get()))
            .or_insert_with(|| CartEntry {
                name: product.name.clone(),
                unit_price: product.final_price(),
                image: product.main_image.clone(),
                qty: qty.0,
            });
    }

    /// Raise the quantity by one. Returns whether an entry was changed.
    pub fn increase(&mut self, product_id: ProductId) -> bool {
        match self.entries.get_mut(&product_id.to_string()) {
            Some(entry) => {
                entry.qty = entry.qty.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Lower the quantity by one, never below one. Returns whether an entry
    /// was changed.
    pub fn decrease(&mut self, product_id: ProductId) -> bool {
        let Some(entry) = self.entries.get_mut(&product_id.to_string()) else {
            return false;
        };
        match NonZeroU32::new(entry.qty.get() - 1) {
            Some(lower) => {
                entry.qty = lower;
                true
            }
            None => false,
        }
    }

    /// Drop a product from the cart. Returns whether it was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        self.entries.remove(&product_id.to_string()).is_some()
    }

    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartEntry> {
        self.entries.get(&product_id.to_string())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries keyed by product id string.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CartEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sum of `unit_price * qty` over all entries.
    #[must_use]
    pub fn grand_total(&self) -> Decimal {
        self.entries.values().map(CartEntry::line_total).sum()
    }

    #[must_use]
    pub fn view(&self) -> CartView {
        let lines = self
            .entries
            .iter()
            .map(|(id, entry)| CartLine {
                product_id: id.clone(),
                name: entry.name.clone(),
                unit_price: entry.unit_price,
                image: entry.image.clone(),
                qty: entry.qty.get(),
                line_total: entry.line_total(),
            })
            .collect();
        CartView {
            lines,
            grand_total: self.grand_total(),
        }
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::tests::product;
    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add(i32, u32),
        Increase(i32),
        Decrease(i32),
        Remove(i32),
    }

    fn op() -> impl Strategy<Value = Op> {
        let id = 1..6i32;
        prop_oneof![
            (id.clone(), 1..5u32).prop_map(|(id, q)| Op::Add(id, q)),
            id.clone().prop_map(Op::Increase),
            id.clone().prop_map(Op::Decrease),
            id.prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_quantities_stay_positive_and_total_matches(ops in prop::collection::vec(op(), 0..60)) {
            let prices = ["250.00", "99.50", "0.99", "1299.00", "10.10"];
            let mut cart = Cart::new();

            for op in ops {
                match op {
                    Op::Add(id, q) => {
                        let p = product(id, prices[usize::try_from(id - 1).unwrap()]);
                        cart.add(&p, Quantity::coerce(Some(&q.to_string())));
                    }
                    Op::Increase(id) => { cart.increase(ProductId::new(id)); }
                    Op::Decrease(id) => { cart.decrease(ProductId::new(id)); }
                    Op::Remove(id) => { cart.remove(ProductId::new(id)); }
                }

                let expected: Decimal = cart
                    .entries()
                    .map(|(_, e)| e.unit_price * Decimal::from(e.qty.get()))
                    .sum();
                prop_assert_eq!(cart.grand_total(), expected);
                for (_, entry) in cart.entries() {
                    prop_assert!(entry.qty.get() >= 1);
                }
            }
        }

        #[test]
        fn prop_decrease_never_removes(start in 1..20u32, steps in 0..40usize) {
            let mut cart = Cart::new();
            cart.add(&product(1, "5.00"), Quantity::coerce(Some(&start.to_string())));
            for _ in 0..steps {
                cart.decrease(ProductId::new(1));
            }
            let remaining = cart.get(ProductId::new(1)).map(|e| e.qty.get());
            prop_assert_eq!(remaining, Some(start.saturating_sub(u32::try_from(steps).unwrap()).max(1)));
        }
    }
}
