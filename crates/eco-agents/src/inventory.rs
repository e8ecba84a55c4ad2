//! Unsold production waiting to be sent to market.
//!
//! Each accumulator collects the units of one good produced since the last
//! trip to market, along with what they cost. Pricing uses the average cost
//! per unit plus a greed markup on the good's base value.

use rust_decimal::Decimal;

use eco_types::{ConsumableKind, Unit};

use crate::error::AgentError;

/// Units of one good and their combined production cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryAccumulator {
    /// The good being accumulated.
    pub kind: ConsumableKind,
    /// Units produced and not yet sent to market.
    pub units: Vec<Unit>,
    /// Total cost of producing `units`.
    pub cost: Decimal,
}

impl InventoryAccumulator {
    /// An empty accumulator for `kind`.
    pub const fn new(kind: ConsumableKind) -> Self {
        Self {
            kind,
            units: Vec::new(),
            cost: Decimal::ZERO,
        }
    }

    /// Add a batch of units produced for `cost`.
    pub fn add(&mut self, units: Vec<Unit>, cost: Decimal) -> Result<(), AgentError> {
        self.cost = self
            .cost
            .checked_add(cost)
            .ok_or_else(|| AgentError::overflow("inventory cost"))?;
        self.units.extend(units);
        Ok(())
    }

    /// Number of units held.
    pub const fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether nothing is held.
    pub const fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Average production cost of one unit. Zero when empty.
    pub fn cost_basis(&self) -> Result<Decimal, AgentError> {
        if self.units.is_empty() {
            return Ok(Decimal::ZERO);
        }
        self.cost
            .checked_div(Decimal::from(self.units.len()))
            .ok_or_else(|| AgentError::overflow("inventory cost basis"))
    }

    /// Asking price per unit: cost basis plus `greed * kind.value`.
    pub fn unit_price(&self, greed: u32) -> Result<Decimal, AgentError> {
        let markup = Decimal::from(greed)
            .checked_mul(self.kind.value)
            .ok_or_else(|| AgentError::overflow("greed markup"))?;
        self.cost_basis()?
            .checked_add(markup)
            .ok_or_else(|| AgentError::overflow("unit price"))
    }
}
