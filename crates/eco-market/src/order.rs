//! Purchase orders and the affordability arithmetic.
//!
//! An [`Order`] is a one-shot request: it lives only for the duration of
//! one match attempt. The buyer may attach an outcome slot to learn how
//! many units it obtained, which feeds its unmet-demand tally.
//!
//! # Rounding policy
//!
//! Always round down to the nearest affordable whole unit. A buyer who
//! cannot afford a single unit is turned away; the market never grants
//! credit.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::oneshot;

use eco_types::{AgentId, OrderId};

use crate::mailbox::Mailbox;

/// A request to buy up to `desired_quantity` units of one good.
#[derive(Debug)]
pub struct Order {
    /// Identifier for log correlation.
    pub id: OrderId,
    /// The buying agent.
    pub requester: AgentId,
    /// Buyer display name, for log output.
    pub requester_name: String,
    /// Key of the good wanted.
    pub kind_key: String,
    /// Units wanted.
    pub desired_quantity: u32,
    /// The buyer's cash as it saw it when ordering.
    pub available_cash: Decimal,
    /// Where the purchase debit (carrying the goods) is sent.
    pub reply: Mailbox,
    /// Optional slot for the match result.
    pub outcome: Option<oneshot::Sender<OrderOutcome>>,
}

impl Order {
    /// Build an order with no outcome slot.
    pub fn new(
        requester_name: impl Into<String>,
        kind_key: impl Into<String>,
        desired_quantity: u32,
        available_cash: Decimal,
        reply: Mailbox,
    ) -> Self {
        Self {
            id: OrderId::new(),
            requester: reply.owner(),
            requester_name: requester_name.into(),
            kind_key: kind_key.into(),
            desired_quantity,
            available_cash,
            reply,
            outcome: None,
        }
    }
}

/// How a match attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    /// The buyer accepted and received `quantity` units.
    Filled {
        /// Units delivered.
        quantity: u32,
        /// Price paid per unit.
        unit_price: Decimal,
        /// Total paid.
        total: Decimal,
    },
    /// The order asked for zero units.
    NothingRequested,
    /// No lot of that kind is on offer.
    NoSupply,
    /// The buyer's cash does not cover one unit at the cheapest price.
    Unaffordable {
        /// The cheapest price on offer.
        unit_price: Decimal,
    },
    /// The buyer's mailbox refused or did not answer the proposal.
    Declined {
        /// Units that were proposed.
        quantity: u32,
    },
    /// The market stopped before the order was matched.
    MarketClosed,
}

impl OrderOutcome {
    /// Units the buyer actually obtained.
    pub const fn fulfilled(&self) -> u32 {
        match self {
            Self::Filled { quantity, .. } => *quantity,
            _ => 0,
        }
    }
}

/// How many units a buyer with `cash` can take from a lot.
///
/// Takes `min(desired, available)`; if that costs more than `cash`, drops
/// to `floor(cash / unit_price)`. Returns zero when not even one unit is
/// affordable. A zero price makes everything available affordable; a
/// negative price or negative cash buys nothing.
pub fn purchasable_quantity(
    desired: u32,
    available: usize,
    unit_price: Decimal,
    cash: Decimal,
) -> u32 {
    let available = u32::try_from(available).unwrap_or(u32::MAX);
    let wanted = desired.min(available);
    if wanted == 0 || unit_price.is_sign_negative() || cash.is_sign_negative() {
        return 0;
    }
    if unit_price.is_zero() {
        return wanted;
    }
    if cash < unit_price {
        return 0;
    }

    match Decimal::from(wanted).checked_mul(unit_price) {
        Some(cost) if cost <= cash => wanted,
        _ => cash
            .checked_div(unit_price)
            .and_then(|q| q.floor().to_u32())
            .map_or(0, |affordable| affordable.min(wanted)),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn rounds_down_to_affordable_units() {
        // 9.99 at 2.00 buys 4 (8.00), never 5 (10.00).
        assert_eq!(purchasable_quantity(10, 10, dec!(2.00), dec!(9.99)), 4);
    }

    #[test]
    fn full_quantity_when_affordable() {
        assert_eq!(purchasable_quantity(10, 10, dec!(2.00), dec!(25.00)), 10);
    }

    #[test]
    fn exact_cash_buys_exact_quantity() {
        assert_eq!(purchasable_quantity(5, 10, dec!(2.00), dec!(10.00)), 5);
    }

    #[test]
    fn limited_by_stock() {
        assert_eq!(purchasable_quantity(50, 7, dec!(1.00), dec!(1000)), 7);
    }

    #[test]
    fn cannot_afford_one_unit() {
        assert_eq!(purchasable_quantity(10, 10, dec!(2.00), dec!(1.99)), 0);
    }

    #[test]
    fn nothing_desired_or_available() {
        assert_eq!(purchasable_quantity(0, 10, dec!(1), dec!(100)), 0);
        assert_eq!(purchasable_quantity(10, 0, dec!(1), dec!(100)), 0);
    }

    #[test]
    fn zero_price_takes_everything_wanted() {
        assert_eq!(purchasable_quantity(4, 10, Decimal::ZERO, Decimal::ZERO), 4);
    }

    #[test]
    fn negative_inputs_buy_nothing() {
        assert_eq!(purchasable_quantity(4, 10, dec!(-1), dec!(10)), 0);
        assert_eq!(purchasable_quantity(4, 10, dec!(1), dec!(-10)), 0);
    }

    #[test]
    fn fractional_prices_floor() {
        // 1.00 / 0.30 = 3.33.. -> 3 units costing 0.90.
        assert_eq!(purchasable_quantity(10, 10, dec!(0.30), dec!(1.00)), 3);
    }

    #[test]
    fn fulfilled_counts_only_fills() {
        let filled = OrderOutcome::Filled {
            quantity: 4,
            unit_price: dec!(2),
            total: dec!(8),
        };
        assert_eq!(filled.fulfilled(), 4);
        assert_eq!(OrderOutcome::NoSupply.fulfilled(), 0);
        assert_eq!(OrderOutcome::Declined { quantity: 4 }.fulfilled(), 0);
    }
}
