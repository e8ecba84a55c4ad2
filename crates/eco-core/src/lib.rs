//! Configuration, the tick driver, and the bounded run loop.
//!
//! This crate wires agents and markets into a running economy. It owns no
//! economic rules of its own: it creates the shared markets, lets every
//! agent act once per tick, collects the reports, and stops when a bound is
//! reached.
//!
//! # Modules
//!
//! - [`config`] -- Typed `eco-config.yaml` with defaults and env overrides
//! - [`tick`] -- [`Economy`] and a single concurrent tick
//! - [`runner`] -- [`run_simulation`], bounded by ticks and wall-clock time

pub mod config;
pub mod runner;
pub mod tick;

pub use config::{
    ConfigError, EconomyConfig, MarketSettings, OrchardConfig, PopulationConfig, SimulationConfig,
};
pub use runner::{
    LogCallback, NoOpCallback, RunnerError, SimulationEndReason, SimulationResult, TickCallback,
    log_simulation_end, run_simulation,
};
pub use tick::{Economy, TickError, TickSummary, start_markets};
