//! The tick driver: one round of actions for every agent.
//!
//! [`Economy`] owns the agents and handles to the two shared markets.
//! [`Economy::run_tick`] lets every agent act concurrently and returns only
//! once all of them (and every message they waited on) are done, then
//! collects the market's report for the interval.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use eco_agents::{Agent, AgentContext, AgentError};
use eco_market::{LaborMarket, Market, MarketError, MarketHandle};
use eco_types::{AgentSnapshot, MarketReport};

use crate::config::MarketSettings;

/// Errors that can occur while running a tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// An agent's actions failed.
    #[error("agent {agent} failed: {source}")]
    Agent {
        /// Name of the failing agent.
        agent: String,
        /// The underlying agent error.
        source: AgentError,
    },

    /// The market stopped answering.
    #[error("market error: {source}")]
    Market {
        /// The underlying market error.
        #[from]
        source: MarketError,
    },
}

/// Totals for one completed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    /// The tick number that just ran, starting at 1.
    pub tick: u64,
    /// Number of agents that acted.
    pub agents: usize,
    /// Units bought by all agents.
    pub bought: u64,
    /// Units wanted but not bought.
    pub unmet: u64,
    /// Units produced.
    pub produced: u64,
    /// Units sent to market.
    pub sent: u64,
    /// Workers hired.
    pub hired: u64,
    /// Workers still waiting on the labor market.
    pub labor_waiting: usize,
    /// Market activity during this tick.
    pub market: MarketReport,
    /// Wall-clock milliseconds the tick took.
    pub duration_ms: u64,
}

/// Build the shared collaborators for a new economy.
pub fn start_markets(settings: &MarketSettings) -> AgentContext {
    AgentContext {
        market: Market::spawn(settings.market_config()),
        labor: Arc::new(LaborMarket::new()),
        response_timeout: settings.response_timeout(),
    }
}

/// A running economy.
#[derive(Debug)]
pub struct Economy {
    tick: u64,
    agents: Vec<Agent>,
    context: AgentContext,
    totals: MarketReport,
}

impl Economy {
    /// Wrap agents created against `context`.
    pub fn new(context: AgentContext, agents: Vec<Agent>) -> Self {
        Self {
            tick: 0,
            agents,
            context,
            totals: MarketReport::default(),
        }
    }

    /// Last completed tick.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The agents, in creation order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// The goods market.
    pub const fn market(&self) -> &MarketHandle {
        &self.context.market
    }

    /// The labor market.
    pub fn labor(&self) -> &LaborMarket {
        &self.context.labor
    }

    /// Market activity accumulated over every completed tick.
    pub fn market_totals(&self) -> &MarketReport {
        &self.totals
    }

    /// Let every agent act once, concurrently, and wait for all of them.
    pub async fn run_tick(&mut self) -> Result<TickSummary, TickError> {
        let started = Instant::now();
        let tick = self.tick.saturating_add(1);

        let results = join_all(self.agents.iter_mut().map(|agent| agent.act(tick))).await;

        let mut summary = TickSummary {
            tick,
            agents: self.agents.len(),
            bought: 0,
            unmet: 0,
            produced: 0,
            sent: 0,
            hired: 0,
            labor_waiting: 0,
            market: MarketReport::default(),
            duration_ms: 0,
        };
        for (agent, result) in self.agents.iter().zip(results) {
            let activity = result.map_err(|source| TickError::Agent {
                agent: agent.name().to_owned(),
                source,
            })?;
            summary.bought = summary.bought.saturating_add(activity.bought);
            summary.unmet = summary.unmet.saturating_add(activity.unmet);
            summary.produced = summary.produced.saturating_add(activity.produced);
            summary.sent = summary.sent.saturating_add(activity.sent);
            summary.hired = summary.hired.saturating_add(activity.hired);
        }

        summary.market = self.context.market.report().await?;
        summary.labor_waiting = self.context.labor.len().await;
        summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        absorb(&mut self.totals, &summary.market);
        self.tick = tick;

        debug!(
            tick,
            bought = summary.bought,
            unmet = summary.unmet,
            produced = summary.produced,
            sold = summary.market.sold,
            stock = summary.market.stock,
            duration_ms = summary.duration_ms,
            "tick complete"
        );
        Ok(summary)
    }

    /// Report records for every agent.
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents.iter().map(Agent::snapshot).collect()
    }

    /// Drain every agent's mailbox, stop the market, and return the
    /// market totals for the whole run.
    pub async fn shutdown(&mut self) -> Result<MarketReport, TickError> {
        for agent in &mut self.agents {
            agent.shutdown().await;
        }
        let last = self.context.market.report().await?;
        absorb(&mut self.totals, &last);
        self.context.market.quit().await;
        info!(
            agents = self.agents.len(),
            sold = self.totals.sold,
            stock = self.totals.stock,
            "economy shut down"
        );
        Ok(self.totals.clone())
    }
}

/// Fold one interval's report into the running totals.
fn absorb(totals: &mut MarketReport, report: &MarketReport) {
    totals.sold = totals.sold.saturating_add(report.sold);
    totals.received = totals.received.saturating_add(report.received);
    totals.total_cash_flow = totals.total_cash_flow.saturating_add(report.total_cash_flow);
    totals.stock = report.stock;
    totals.average_price = if totals.sold == 0 {
        Decimal::ZERO
    } else {
        totals
            .total_cash_flow
            .checked_div(Decimal::from(totals.sold))
            .unwrap_or(Decimal::ZERO)
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use eco_agents::{AgentParams, Orchard};
    use eco_types::{ConsumableKind, Demand};
    use rust_decimal_macros::dec;

    use super::*;

    fn consumer(name: &str, cash: Decimal) -> AgentParams {
        AgentParams {
            name: name.to_owned(),
            cash,
            greed: 0,
            seeks_wage: true,
            need_scale: 1,
            expectation_scale: 4,
            demands: vec![Demand::new(ConsumableKind::apple(), 0)],
            producers: Vec::new(),
        }
    }

    fn supplier(name: &str) -> AgentParams {
        AgentParams {
            name: name.to_owned(),
            cash: dec!(500),
            greed: 4,
            seeks_wage: false,
            need_scale: 0,
            expectation_scale: 0,
            demands: Vec::new(),
            producers: vec![Box::new(Orchard::standard())],
        }
    }

    #[test]
    fn absorb_recomputes_average() {
        let mut totals = MarketReport::default();
        absorb(
            &mut totals,
            &MarketReport {
                sold: 2,
                received: 10,
                total_cash_flow: dec!(14),
                average_price: dec!(7),
                stock: 8,
            },
        );
        absorb(
            &mut totals,
            &MarketReport {
                sold: 2,
                received: 0,
                total_cash_flow: dec!(6),
                average_price: dec!(3),
                stock: 6,
            },
        );
        assert_eq!(totals.sold, 4);
        assert_eq!(totals.received, 10);
        assert_eq!(totals.total_cash_flow, dec!(20));
        assert_eq!(totals.average_price, dec!(5));
        assert_eq!(totals.stock, 6);
    }

    #[tokio::test]
    async fn ticks_advance_and_summaries_add_up() {
        let context = start_markets(&MarketSettings::default());
        let agents = vec![
            Agent::spawn(consumer("Smith", dec!(100)), context.clone()),
            Agent::spawn(supplier("Ohio"), context.clone()),
        ];
        let mut economy = Economy::new(context, agents);

        // Tick 1: the worker queues up, nothing is produced yet.
        let first = economy.run_tick().await.unwrap();
        assert_eq!(first.tick, 1);
        assert_eq!(first.agents, 2);
        assert_eq!(economy.tick(), 1);

        let mut produced = first.produced;
        let mut received = first.market.received;
        for _ in 0..3 {
            let summary = economy.run_tick().await.unwrap();
            produced += summary.produced;
            received += summary.market.received;
            assert_eq!(summary.sent, summary.produced);
        }
        assert!(produced > 0);
        assert_eq!(received, produced);
        assert_eq!(economy.tick(), 4);

        let totals = economy.shutdown().await.unwrap();
        assert_eq!(totals.received, produced);
        let held: u64 = economy
            .snapshots()
            .iter()
            .map(|s| u64::try_from(s.consumables).unwrap())
            .sum();
        assert_eq!(held + totals.stock, produced);
        assert_eq!(totals.sold, held);
        assert!(economy.market().is_closed());
    }

    #[tokio::test]
    async fn empty_economy_still_ticks() {
        let context = start_markets(&MarketSettings::default());
        let mut economy = Economy::new(context, Vec::new());
        let summary = economy.run_tick().await.unwrap();
        assert_eq!(summary.agents, 0);
        assert_eq!(summary.market, MarketReport::default());
        economy.shutdown().await.unwrap();
    }
}
