//! Colony-wide resource store.

use colony_core::{ResourceKind, ResourceTable};
use serde::{Deserialize, Serialize};

/// Resources owned by the colony.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    stock: ResourceTable,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an inventory holding the provided stock.
    #[must_use]
    pub fn with_stock(stock: ResourceTable) -> Self {
        Self { stock }
    }

    /// Reports whether every entry of `cost` is covered.
    #[must_use]
    pub fn check(&self, cost: &ResourceTable) -> bool {
        cost.iter().all(|(kind, amount)| self.stock.get(kind) >= amount)
    }

    /// Debits `cost` if it is fully covered; otherwise leaves the stock untouched.
    pub fn spend(&mut self, cost: &ResourceTable) -> bool {
        if !self.check(cost) {
            return false;
        }
        let mut remaining = ResourceTable::new();
        for (kind, held) in self.stock.iter() {
            remaining.add(kind, held - cost.get(kind));
        }
        self.stock = remaining;
        true
    }

    /// Credits every entry of `resources`.
    pub fn add(&mut self, resources: &ResourceTable) {
        for (kind, amount) in resources.iter() {
            self.stock.add(kind, amount);
        }
    }

    /// Amount of `kind` currently held.
    #[must_use]
    pub fn amount(&self, kind: ResourceKind) -> u32 {
        self.stock.get(kind)
    }

    /// Current stock.
    #[must_use]
    pub fn stock(&self) -> &ResourceTable {
        &self.stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_is_all_or_nothing() {
        let mut inventory =
            Inventory::with_stock(ResourceTable::new().with(ResourceKind::Wood, 2));
        let cost = ResourceTable::new()
            .with(ResourceKind::Wood, 1)
            .with(ResourceKind::Stone, 1);

        assert!(!inventory.check(&cost));
        assert!(!inventory.spend(&cost));
        assert_eq!(inventory.amount(ResourceKind::Wood), 2);

        inventory.add(&ResourceTable::new().with(ResourceKind::Stone, 1));
        assert!(inventory.spend(&cost));
        assert_eq!(inventory.amount(ResourceKind::Wood), 1);
        assert_eq!(inventory.amount(ResourceKind::Stone), 0);
    }

    #[test]
    fn empty_cost_is_always_affordable() {
        let mut inventory = Inventory::new();
        assert!(inventory.spend(&ResourceTable::new()));
    }
}
