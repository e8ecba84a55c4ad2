//! Immutable report records pulled by the reporting side.
//!
//! Snapshots are taken under the owning component's lock at read time and
//! handed out by value. Nothing in a snapshot refers back to live state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

/// Point-in-time view of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// The agent's identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Markup coefficient applied when this agent sells.
    pub greed: u32,
    /// Cash on hand.
    pub cash: Decimal,
    /// Number of consumable units the agent holds.
    pub consumables: usize,
    /// Units this agent has sent to market.
    pub sent_to_market: u64,
    /// Units this agent has produced.
    pub produced: u64,
    /// Total cash received (sales proceeds and wages).
    pub revenue: Decimal,
    /// Total wages this agent has paid to workers.
    pub wages_paid: Decimal,
    /// Number of workers hired.
    pub hired: u64,
    /// Units wanted but not obtained.
    pub unmet_demand: u64,
    /// Whether the agent currently has an employer.
    pub employed: bool,
}

/// Market activity since the previous report, plus current stock.
///
/// Everything except `stock` is an accumulator that resets each time a
/// report is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketReport {
    /// Units sold to buyers.
    pub sold: u64,
    /// Units pushed to the market by sellers.
    pub received: u64,
    /// Total cash paid by buyers.
    pub total_cash_flow: Decimal,
    /// `total_cash_flow / sold`, or zero when nothing sold.
    pub average_price: Decimal,
    /// Units currently offered across all lots.
    pub stock: u64,
}
