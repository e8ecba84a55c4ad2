//! Bounded simulation loop.
//!
//! [`run_simulation`] drives [`Economy::run_tick`] until either the tick
//! limit or the wall-clock limit is reached, pausing for the configured
//! interval between ticks. Shutting the economy down is left to the caller
//! so it can take final snapshots first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SimulationConfig;
use crate::tick::{Economy, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
}

/// Result of the simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock milliseconds the run took.
    pub elapsed_ms: i64,
}

/// Callback invoked after each tick completes.
pub trait TickCallback {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, economy: &Economy);
}

/// A tick callback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _economy: &Economy) {}
}

/// Logs a one-line summary of every tick at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCallback;

impl TickCallback for LogCallback {
    fn on_tick(&mut self, summary: &TickSummary, _economy: &Economy) {
        info!(
            tick = summary.tick,
            bought = summary.bought,
            unmet = summary.unmet,
            produced = summary.produced,
            hired = summary.hired,
            labor_waiting = summary.labor_waiting,
            sold = summary.market.sold,
            received = summary.market.received,
            cash_flow = %summary.market.total_cash_flow,
            average_price = %summary.market.average_price,
            stock = summary.market.stock,
            "tick"
        );
    }
}

/// Run ticks until a bound in `bounds` is reached.
///
/// A zero bound means unlimited. The wall-clock bound is checked before
/// each tick, the tick bound after each tick.
pub async fn run_simulation(
    economy: &mut Economy,
    bounds: &SimulationConfig,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let started_at = Utc::now();
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = bounds.max_ticks,
        max_real_time_seconds = bounds.max_real_time_seconds,
        tick_interval_ms = bounds.tick_interval_ms,
        agents = economy.agents().len(),
        "Simulation starting"
    );

    let end_reason = loop {
        if time_limit_reached(started_at, bounds.max_real_time_seconds) {
            info!(
                max_seconds = bounds.max_real_time_seconds,
                "Real-time limit reached"
            );
            break SimulationEndReason::MaxRealTimeReached;
        }

        let summary = economy.run_tick().await?;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&summary, economy);
        last_summary = Some(summary);

        if bounds.max_ticks > 0 && total_ticks >= bounds.max_ticks {
            info!(
                tick = total_ticks,
                max_ticks = bounds.max_ticks,
                "Tick limit reached"
            );
            break SimulationEndReason::MaxTicksReached;
        }

        if bounds.tick_interval_ms > 0 {
            tokio::time::sleep(bounds.tick_interval()).await;
        }
    };

    Ok(SimulationResult {
        end_reason,
        final_summary: last_summary,
        total_ticks,
        started_at,
        elapsed_ms: Utc::now()
            .signed_duration_since(started_at)
            .num_milliseconds(),
    })
}

fn time_limit_reached(started_at: DateTime<Utc>, max_seconds: u64) -> bool {
    if max_seconds == 0 {
        return false;
    }
    let elapsed = Utc::now().signed_duration_since(started_at).num_seconds();
    u64::try_from(elapsed).is_ok_and(|secs| secs >= max_seconds)
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        elapsed_ms = result.elapsed_ms,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        final_stock = result.final_summary.as_ref().map(|s| s.market.stock),
        "Simulation ended"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::MarketSettings;
    use crate::tick::start_markets;

    /// Counts ticks seen by the callback.
    #[derive(Default)]
    struct Counting {
        ticks: Vec<u64>,
    }

    impl TickCallback for Counting {
        fn on_tick(&mut self, summary: &TickSummary, _economy: &Economy) {
            self.ticks.push(summary.tick);
        }
    }

    fn empty_economy() -> Economy {
        Economy::new(start_markets(&MarketSettings::default()), Vec::new())
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_tick_limit() {
        let mut economy = empty_economy();
        let bounds = SimulationConfig {
            max_ticks: 5,
            max_real_time_seconds: 0,
            tick_interval_ms: 100,
        };
        let mut callback = Counting::default();
        let result = run_simulation(&mut economy, &bounds, &mut callback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(result.final_summary.as_ref().map(|s| s.tick), Some(5));
        assert_eq!(callback.ticks, vec![1, 2, 3, 4, 5]);
        log_simulation_end(&result);
        economy.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn stops_at_time_limit() {
        let mut economy = empty_economy();
        let bounds = SimulationConfig {
            max_ticks: 0,
            max_real_time_seconds: 1,
            tick_interval_ms: 50,
        };
        let result = run_simulation(&mut economy, &bounds, &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::MaxRealTimeReached);
        assert!(result.total_ticks > 0);
        assert!(result.elapsed_ms >= 1000);
        economy.shutdown().await.unwrap();
    }

    #[test]
    fn zero_time_limit_is_unlimited() {
        assert!(!time_limit_reached(Utc::now(), 0));
        let long_ago = Utc::now()
            .checked_sub_signed(chrono::TimeDelta::seconds(30))
            .unwrap();
        assert!(time_limit_reached(long_ago, 10));
        assert!(!time_limit_reached(Utc::now(), 10));
    }
}
