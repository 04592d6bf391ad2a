//! Part price lookup.

use std::collections::HashMap;

use crate::money::Money;

/// Price used for parts the catalog does not list.
pub const FALLBACK_PART_PRICE: Money = Money::from_units(250);

const DEFAULT_PRICES: &[(&str, i64)] = &[
    ("1J0807221", 850),
    ("5G0823300", 1500),
    ("5G0809857", 1200),
    ("5G0941006", 2200),
    ("5G0831055", 800),
    ("1K0199262", 320),
    ("5G0601025", 780),
];

/// Source of part prices.
pub trait PartsCatalog: Send + Sync {
    /// Unit price of a part.
    fn price(&self, part_number: &str) -> Money;
}

/// In-memory price table with a fallback price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    prices: HashMap<String, Money>,
    fallback: Money,
}

impl PriceTable {
    /// An empty table where every part costs `fallback`.
    pub fn empty(fallback: Money) -> Self {
        Self {
            prices: HashMap::new(),
            fallback,
        }
    }

    /// Set or replace one price.
    pub fn with_price(mut self, part_number: impl Into<String>, price: Money) -> Self {
        self.prices.insert(part_number.into(), price);
        self
    }

    /// Replace the fallback price.
    pub fn with_fallback(mut self, fallback: Money) -> Self {
        self.fallback = fallback;
        self
    }

    /// Whether the part has its own price.
    pub fn contains(&self, part_number: &str) -> bool {
        self.prices.contains_key(part_number)
    }

    /// Fallback price.
    pub fn fallback(&self) -> Money {
        self.fallback
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        DEFAULT_PRICES.iter().fold(
            PriceTable::empty(FALLBACK_PART_PRICE),
            |table, (part, units)| table.with_price(*part, Money::from_units(*units)),
        )
    }
}

impl PartsCatalog for PriceTable {
    fn price(&self, part_number: &str) -> Money {
        self.prices.get(part_number).copied().unwrap_or(self.fallback)
    }
}

impl<T: PartsCatalog + ?Sized> PartsCatalog for std::sync::Arc<T> {
    fn price(&self, part_number: &str) -> Money {
        (**self).price(part_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prices() {
        let table = PriceTable::default();
        assert_eq!(table.price("5G0941006"), Money::from_units(2200));
        assert_eq!(table.price("5G0845011"), FALLBACK_PART_PRICE);
        assert!(!table.contains("5G0845011"));
    }

    #[test]
    fn test_overrides() {
        let table = PriceTable::default()
            .with_price("5G0845011", Money::from_units(900))
            .with_fallback(Money::from_units(100));
        assert_eq!(table.price("5G0845011"), Money::from_units(900));
        assert_eq!(table.price("unknown"), Money::from_units(100));
    }
}
