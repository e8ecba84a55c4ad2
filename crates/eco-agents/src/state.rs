//! The mutable part of an agent, owned by its mailbox processor.
//!
//! Every change to cash, held goods, revenue, or employment goes through
//! [`AgentState::apply`]. The agent itself only reads this state, and only
//! through the shared lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;

use eco_market::TransactionKind;
use eco_types::Unit;

/// State shared between an agent and its mailbox processor.
pub type SharedState = Arc<Mutex<AgentState>>;

/// Lock the shared state, recovering from a poisoned lock.
pub fn lock(state: &Mutex<AgentState>) -> MutexGuard<'_, AgentState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cash, goods, and employment of one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentState {
    /// Cash on hand. Never negative.
    pub cash: Decimal,
    /// Goods held for consumption.
    pub consumables: Vec<Unit>,
    /// Whether some employer has hired this agent.
    pub employed: bool,
    /// Total cash credited.
    pub revenue: Decimal,
}

/// Why a transaction was not applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Refusal {
    /// The debit exceeds cash on hand.
    #[error("insufficient funds: {requested} requested, {available} available")]
    InsufficientFunds {
        /// Amount asked for.
        requested: Decimal,
        /// Cash on hand.
        available: Decimal,
    },

    /// Credits and debits must not be negative.
    #[error("negative amount {amount}")]
    NegativeAmount {
        /// The offending amount.
        amount: Decimal,
    },

    /// Applying the amount would leave the representable range.
    #[error("cash overflow")]
    Overflow,
}

/// What it takes to reverse an applied transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo {
    /// Take back a credit.
    Credit {
        /// Amount credited.
        amount: Decimal,
    },
    /// Refund a debit and drop the goods it delivered.
    Debit {
        /// Amount debited.
        amount: Decimal,
        /// Units appended by the debit.
        units: usize,
    },
    /// Drop received goods.
    GoodsIn {
        /// Units appended.
        units: usize,
    },
    /// Restore the previous employment flag.
    Employment {
        /// The flag before the change.
        previous: bool,
    },
}

impl AgentState {
    /// State for a new agent holding `cash`.
    pub fn with_cash(cash: Decimal) -> Self {
        Self {
            cash,
            ..Self::default()
        }
    }

    /// Apply one transaction.
    ///
    /// A refused transaction changes nothing. In particular a debit larger
    /// than cash on hand is refused whole, never applied in part.
    pub fn apply(&mut self, kind: TransactionKind) -> Result<Undo, Refusal> {
        match kind {
            TransactionKind::Credit { amount } => {
                if amount.is_sign_negative() {
                    return Err(Refusal::NegativeAmount { amount });
                }
                let cash = self.cash.checked_add(amount).ok_or(Refusal::Overflow)?;
                let revenue = self.revenue.checked_add(amount).ok_or(Refusal::Overflow)?;
                self.cash = cash;
                self.revenue = revenue;
                Ok(Undo::Credit { amount })
            }
            TransactionKind::Debit { amount, units } => {
                if amount.is_sign_negative() {
                    return Err(Refusal::NegativeAmount { amount });
                }
                if amount > self.cash {
                    return Err(Refusal::InsufficientFunds {
                        requested: amount,
                        available: self.cash,
                    });
                }
                self.cash = self.cash.checked_sub(amount).ok_or(Refusal::Overflow)?;
                let count = units.len();
                self.consumables.extend(units);
                Ok(Undo::Debit {
                    amount,
                    units: count,
                })
            }
            TransactionKind::GoodsIn { units } => {
                let count = units.len();
                self.consumables.extend(units);
                Ok(Undo::GoodsIn { units: count })
            }
            TransactionKind::Employment { employed } => {
                let previous = self.employed;
                self.employed = employed;
                Ok(Undo::Employment { previous })
            }
        }
    }

    /// Reverse a transaction applied by [`AgentState::apply`].
    ///
    /// Only valid when nothing else has touched the state since.
    pub fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Credit { amount } => {
                self.cash = self.cash.saturating_sub(amount).max(Decimal::ZERO);
                self.revenue = self.revenue.saturating_sub(amount);
            }
            Undo::Debit { amount, units } => {
                self.cash = self.cash.saturating_add(amount);
                self.drop_last(units);
            }
            Undo::GoodsIn { units } => self.drop_last(units),
            Undo::Employment { previous } => self.employed = previous,
        }
    }

    fn drop_last(&mut self, count: usize) {
        let keep = self.consumables.len().saturating_sub(count);
        self.consumables.truncate(keep);
    }
}
