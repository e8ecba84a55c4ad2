//! Market order matching, transaction mailboxes, and the labor market.
//!
//! This crate holds every piece of state that more than one party touches,
//! and the message protocol that keeps each agent's own state single-writer.
//!
//! # Modules
//!
//! - [`transaction`] -- The tagged transaction message and its reply slot
//! - [`mailbox`] -- Per-agent queues and the bounded request/response call
//! - [`lot`] -- Inventory lots contributed by sellers
//! - [`order`] -- Purchase orders, outcomes, and affordability rounding
//! - [`book`] -- The price-sorted order book with reserve/settle/restore
//! - [`market`] -- The market actor and its handle
//! - [`labor`] -- The FIFO labor market
//!
//! # Reserve / confirm
//!
//! A match pops the cheapest lot out of the book before proposing the sale
//! to the buyer, so no other order can see it. The book lock is released
//! for the whole round trip to the buyer's mailbox. On acceptance the sold
//! units leave the lot and the seller is credited; on rejection the lot
//! goes back in sorted position untouched.

pub mod book;
pub mod labor;
pub mod lot;
pub mod mailbox;
pub mod market;
pub mod order;
pub mod transaction;

pub use book::{OrderBook, Reservation, Settlement};
pub use labor::{LaborContract, LaborMarket};
pub use lot::InventoryLot;
pub use mailbox::{Envelope, Mailbox, MailboxReceiver, Reply, mailbox};
pub use market::{Market, MarketConfig, MarketHandle};
pub use order::{Order, OrderOutcome, purchasable_quantity};
pub use transaction::{Transaction, TransactionKind};

use eco_types::AgentId;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised by the market machinery.
///
/// Insufficient funds, missing supply, and an empty labor queue are not
/// errors; they come back as ordinary values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    /// The agent's mailbox processor has exited.
    #[error("mailbox of agent {owner} is closed")]
    MailboxClosed {
        /// The agent whose mailbox refused the message.
        owner: AgentId,
    },

    /// The market has been told to quit and no longer takes requests.
    #[error("market is closed")]
    MarketClosed,
}
