//! Shared type definitions for the Eco economy simulation.
//!
//! This crate is the single source of truth for the plain data that flows
//! between the market, the agents, and the tick driver. It has no async or
//! locking concerns.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents, units, and orders
//! - [`consumable`] -- Consumable descriptors, produced units, and demand
//! - [`snapshot`] -- Immutable report records for agents and the market

pub mod consumable;
pub mod ids;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use consumable::{ConsumableKind, Demand, KEY_APPLE, Unit};
pub use ids::{AgentId, OrderId, UnitId};
pub use snapshot::{AgentSnapshot, MarketReport};
