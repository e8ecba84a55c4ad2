//! The JSON document printed when a run ends.

use serde::Serialize;

use eco_core::SimulationResult;
use eco_types::{AgentSnapshot, MarketReport};

use crate::error::EngineError;

/// Everything worth keeping from a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    /// Seed the population was drawn from.
    pub seed: u64,
    /// How and when the run ended.
    pub result: SimulationResult,
    /// Market activity over the whole run.
    pub market: MarketReport,
    /// Every agent, richest first.
    pub agents: Vec<AgentSnapshot>,
}

impl FinalReport {
    /// Assemble the report, ordering agents by cash descending.
    pub fn new(
        seed: u64,
        result: SimulationResult,
        market: MarketReport,
        mut agents: Vec<AgentSnapshot>,
    ) -> Self {
        agents.sort_by(|a, b| b.cash.cmp(&a.cash).then_with(|| a.name.cmp(&b.name)));
        Self {
            seed,
            result,
            market,
            agents,
        }
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
