//! Consumable goods, produced units, and consumer demand.
//!
//! A [`ConsumableKind`] is an immutable descriptor of a good. Its `key` is
//! the sole index used across the whole system (market inventory, agent
//! inventories, orders), so two distinct kinds never share a key.
//!
//! Produced goods are individually trackable [`Unit`]s rather than a bare
//! count. When units change hands they are cloned into the receiving
//! party's holdings, never shared.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::UnitId;

/// Map key of the built-in apple consumable.
pub const KEY_APPLE: &str = "apple";

/// Immutable descriptor of a consumable good.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumableKind {
    /// Stable identity key, used as the map index everywhere.
    pub key: String,
    /// The "normal" quantity of this good, used to weight demand urgency.
    pub scale: u32,
    /// Base valuation used when sellers mark up their prices.
    pub value: Decimal,
}

impl ConsumableKind {
    /// Create a new consumable descriptor.
    pub fn new(key: impl Into<String>, scale: u32, value: Decimal) -> Self {
        Self {
            key: key.into(),
            scale,
            value,
        }
    }

    /// The built-in apple: scale 1, base value 0.25.
    pub fn apple() -> Self {
        Self::new(KEY_APPLE, 1, Decimal::new(25, 2))
    }

    /// Return the identity key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// One produced unit of a consumable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identity of this unit.
    pub id: UnitId,
    /// The kind of good this unit is.
    pub kind: ConsumableKind,
}

impl Unit {
    /// Create a fresh unit of the given kind.
    pub fn new(kind: ConsumableKind) -> Self {
        Self {
            id: UnitId::new(),
            kind,
        }
    }

    /// Return the key of this unit's kind.
    pub fn key(&self) -> &str {
        self.kind.key()
    }
}

/// A quantity of some good that a consuming agent wants this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demand {
    /// The good being demanded.
    pub kind: ConsumableKind,
    /// Units still wanted. Decremented as purchases succeed.
    pub quantity: u32,
}

impl Demand {
    /// Create a demand for `quantity` units of `kind`.
    pub const fn new(kind: ConsumableKind, quantity: u32) -> Self {
        Self { kind, quantity }
    }

    /// Whether nothing more is wanted.
    pub const fn is_met(&self) -> bool {
        self.quantity == 0
    }

    /// Record `fulfilled` units obtained and return the units still unmet.
    pub const fn fulfill(&mut self, fulfilled: u32) -> u32 {
        self.quantity = self.quantity.saturating_sub(fulfilled);
        self.quantity
    }

    /// Reset the wanted quantity for a new cycle.
    ///
    /// The quantity becomes `expectation_scale * need_scale * kind.scale`,
    /// saturating at `u32::MAX`.
    pub const fn reset(&mut self, expectation_scale: u32, need_scale: u32) {
        self.quantity = expectation_scale
            .saturating_mul(need_scale)
            .saturating_mul(self.kind.scale);
    }
}
