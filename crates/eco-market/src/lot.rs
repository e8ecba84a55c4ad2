//! Inventory lots: batches of units a seller offers on the market.

use rust_decimal::Decimal;

use eco_types::{AgentId, Unit};

use crate::mailbox::Mailbox;

/// A batch of identical-kind units contributed by one seller.
///
/// Once pushed, a lot is owned by the market. The seller never touches it
/// again; sale proceeds come back through `seller`.
#[derive(Debug, Clone)]
pub struct InventoryLot {
    /// The selling agent.
    pub originator: AgentId,
    /// Seller display name, for log output.
    pub originator_name: String,
    /// Key of the good in this lot.
    pub kind_key: String,
    /// The units on offer, sold front first.
    pub units: Vec<Unit>,
    /// Asking price per unit.
    pub unit_price: Decimal,
    /// Production cost per unit.
    pub cost_basis: Decimal,
    /// Where sale proceeds are credited.
    pub seller: Mailbox,
}

impl InventoryLot {
    /// Number of units still in the lot.
    pub const fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Whether the lot has been sold out.
    pub const fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Copies of the first `quantity` units, as proposed to a buyer.
    pub fn front_units(&self, quantity: usize) -> Vec<Unit> {
        self.units.iter().take(quantity).cloned().collect()
    }

    /// Remove and return the first `quantity` units (fewer if the lot is
    /// smaller).
    pub fn take_front(&mut self, quantity: usize) -> Vec<Unit> {
        let n = quantity.min(self.units.len());
        self.units.drain(..n).collect()
    }
}
