//! Error types for the eco-agents crate.
//!
//! Refused transactions and unmet demand are ordinary values, not errors.
//! What ends up here is misconfiguration, arithmetic that left the
//! representable range, or a market that stopped underneath an agent.

use eco_market::MarketError;

/// Errors that can occur while an agent acts.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A producer was configured with values outside its contract.
    #[error("invalid producer: {reason}")]
    InvalidProducer {
        /// Description of the violated constraint.
        reason: String,
    },

    /// A cash or quantity computation overflowed.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },

    /// The market or a counterparty's mailbox refused a message.
    #[error(transparent)]
    Market(#[from] MarketError),
}

impl AgentError {
    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        Self::ArithmeticOverflow {
            context: context.into(),
        }
    }
}
