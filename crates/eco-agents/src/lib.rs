//! Agents for the Eco simulation.
//!
//! An agent is two cooperating pieces: the [`Agent`] that plans and acts
//! once per tick, and a mailbox processor task that is the sole writer of
//! the agent's cash and goods. Everything else (the market, employers,
//! workers, and the agent itself) changes that state only by sending
//! transactions.
//!
//! # Modules
//!
//! - [`agent`] -- Per-tick actions: demand, hiring, production, selling
//! - [`error`] -- Error types for agent operations ([`AgentError`])
//! - [`inventory`] -- Unsold production and its pricing
//! - [`processor`] -- The mailbox processor task
//! - [`producer`] -- Production recipes ([`Producer`], [`Orchard`])
//! - [`state`] -- The state the processor owns and how transactions apply

pub mod agent;
pub mod error;
pub mod inventory;
pub mod processor;
pub mod producer;
pub mod state;

pub use agent::{Agent, AgentContext, AgentParams, TickActivity};
pub use error::AgentError;
pub use inventory::InventoryAccumulator;
pub use processor::{process_transactions, spawn_processor};
pub use producer::{KEY_ORCHARD, Orchard, ProductionCycle, Producer};
pub use state::{AgentState, Refusal, SharedState, Undo};
