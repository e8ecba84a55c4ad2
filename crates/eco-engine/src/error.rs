//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure that can happen between startup
//! and printing the final report.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, giving `main` a single
/// type to propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: eco_core::ConfigError,
    },

    /// Agent seeding failed.
    #[error("spawner error: {source}")]
    Spawner {
        /// The underlying agent error.
        #[from]
        source: eco_agents::AgentError,
    },

    /// The simulation loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: eco_core::RunnerError,
    },

    /// Shutting the economy down failed.
    #[error("shutdown error: {source}")]
    Shutdown {
        /// The underlying tick error.
        #[from]
        source: eco_core::TickError,
    },

    /// The final report could not be serialized.
    #[error("report error: {source}")]
    Report {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}
