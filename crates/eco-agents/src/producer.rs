//! Producers: turning one worker's labor into units of a good.
//!
//! A producer is a fixed recipe. Each cycle consumes one labor contract and
//! yields `rate` units, costing `rate * cost` in materials plus
//! `rate * wage` in wages. Producing is deterministic, so retrying a cycle
//! after a refused payment is always safe.

use std::fmt::Debug;

use rust_decimal::Decimal;

use eco_types::{ConsumableKind, Unit};

use crate::error::AgentError;

/// Key of the built-in orchard producer.
pub const KEY_ORCHARD: &str = "orchard";

/// The result of one production cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionCycle {
    /// Materials plus wages.
    pub total_cost: Decimal,
    /// The wage share of `total_cost`, owed to the worker.
    pub total_wage: Decimal,
    /// The units produced.
    pub units: Vec<Unit>,
}

/// A recipe that turns labor into goods.
pub trait Producer: Debug + Send + Sync {
    /// Identity key of this producer.
    fn key(&self) -> &str;

    /// The good this producer makes.
    fn kind(&self) -> &ConsumableKind;

    /// Units produced per cycle. Always positive.
    fn rate(&self) -> u32;

    /// Material cost per unit.
    fn cost(&self) -> Decimal;

    /// Wage per unit produced.
    fn wage(&self) -> Decimal;

    /// Total cost of one cycle, without producing anything.
    fn estimate(&self) -> Result<Decimal, AgentError> {
        let rate = Decimal::from(self.rate());
        let wages = rate
            .checked_mul(self.wage())
            .ok_or_else(|| AgentError::overflow("producer wage estimate"))?;
        rate.checked_mul(self.cost())
            .and_then(|materials| materials.checked_add(wages))
            .ok_or_else(|| AgentError::overflow("producer cost estimate"))
    }

    /// Run one cycle.
    fn produce(&self) -> Result<ProductionCycle, AgentError> {
        let total_wage = Decimal::from(self.rate())
            .checked_mul(self.wage())
            .ok_or_else(|| AgentError::overflow("producer wages"))?;
        let total_cost = self.estimate()?;
        let units = (0..self.rate())
            .map(|_| Unit::new(self.kind().clone()))
            .collect();
        Ok(ProductionCycle {
            total_cost,
            total_wage,
            units,
        })
    }
}

/// Grows apples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orchard {
    rate: u32,
    cost: Decimal,
    wage: Decimal,
    kind: ConsumableKind,
}

impl Orchard {
    /// An orchard with custom economics.
    pub fn new(rate: u32, cost: Decimal, wage: Decimal) -> Result<Self, AgentError> {
        if rate == 0 {
            return Err(AgentError::InvalidProducer {
                reason: String::from("rate must be positive"),
            });
        }
        if cost.is_sign_negative() || wage.is_sign_negative() {
            return Err(AgentError::InvalidProducer {
                reason: format!("cost ({cost}) and wage ({wage}) must not be negative"),
            });
        }
        Ok(Self {
            rate,
            cost,
            wage,
            kind: ConsumableKind::apple(),
        })
    }

    /// Ten apples per cycle at 1.00 materials and 5.00 wages each.
    pub fn standard() -> Self {
        Self {
            rate: 10,
            cost: Decimal::ONE,
            wage: Decimal::new(5, 0),
            kind: ConsumableKind::apple(),
        }
    }
}

impl Producer for Orchard {
    fn key(&self) -> &str {
        KEY_ORCHARD
    }

    fn kind(&self) -> &ConsumableKind {
        &self.kind
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn cost(&self) -> Decimal {
        self.cost
    }

    fn wage(&self) -> Decimal {
        self.wage
    }
}
