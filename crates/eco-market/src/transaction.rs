//! Transaction messages exchanged between the market and agents.
//!
//! A [`Transaction`] is the only way anyone asks an agent to change its
//! cash, goods, or employment status. It carries exactly one
//! [`TransactionKind`] and, when the sender needs to know whether the agent
//! accepted it, a single-use reply slot.
//!
//! The reply contract: a transaction that carries a reply slot receives
//! exactly one boolean reply, including on the rejection path. The
//! [`oneshot`] channel makes "at most once" a type-level fact; the agent's
//! mailbox processor makes "at least once" hold by answering on every
//! branch.

use rust_decimal::Decimal;
use tokio::sync::oneshot;

use eco_types::Unit;

/// The single effect a transaction asks the receiving agent to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    /// Add cash (sale proceeds, wages).
    Credit {
        /// Amount to add.
        amount: Decimal,
    },
    /// Remove cash, rejected if it would take the agent below zero.
    ///
    /// Any `units` are delivered only when the debit is accepted. Market
    /// purchases carry the reserved units here; production costs carry
    /// none.
    Debit {
        /// Amount to remove.
        amount: Decimal,
        /// Goods delivered in exchange, if any.
        units: Vec<Unit>,
    },
    /// Add goods with no cash effect.
    GoodsIn {
        /// Units received.
        units: Vec<Unit>,
    },
    /// Change the agent's employment status.
    Employment {
        /// Whether the agent is now employed.
        employed: bool,
    },
}

impl TransactionKind {
    /// Short label used in log output.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Credit { .. } => "credit",
            Self::Debit { .. } => "debit",
            Self::GoodsIn { .. } => "goods_in",
            Self::Employment { .. } => "employment",
        }
    }
}

/// A message delivered to an agent's mailbox.
#[derive(Debug)]
pub struct Transaction {
    /// The requested effect.
    pub kind: TransactionKind,
    /// Name of the counterparty, for log output.
    pub from: String,
    /// Free-form note, for log output.
    pub memo: String,
    /// Reply slot. `Some` means the sender is waiting for accept/reject.
    pub reply: Option<oneshot::Sender<bool>>,
}

impl Transaction {
    /// Create a fire-and-forget transaction.
    pub fn new(kind: TransactionKind, from: impl Into<String>, memo: impl Into<String>) -> Self {
        Self {
            kind,
            from: from.into(),
            memo: memo.into(),
            reply: None,
        }
    }

    /// Attach a reply slot, turning this into a response-required request.
    #[must_use]
    pub fn with_reply(mut self, reply: oneshot::Sender<bool>) -> Self {
        self.reply = Some(reply);
        self
    }

    /// Whether the sender is waiting for accept/reject.
    pub const fn requires_response(&self) -> bool {
        self.reply.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_and_forget_needs_no_response() {
        let t = Transaction::new(
            TransactionKind::Credit {
                amount: Decimal::ONE,
            },
            "market",
            "proceeds",
        );
        assert!(!t.requires_response());
        assert_eq!(t.kind.label(), "credit");
    }

    #[test]
    fn with_reply_requires_response() {
        let (tx, _rx) = oneshot::channel();
        let t = Transaction::new(
            TransactionKind::Debit {
                amount: Decimal::TEN,
                units: Vec::new(),
            },
            "orchard",
            "cost",
        )
        .with_reply(tx);
        assert!(t.requires_response());
        assert_eq!(t.kind.label(), "debit");
    }
}
