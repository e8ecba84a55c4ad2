//! Agents and their per-tick actions.
//!
//! An [`Agent`] owns its plans (demands, producers, hired labor, unsold
//! production) and drives them once per tick. Its cash and held goods live
//! in a [`SharedState`] that only the agent's mailbox processor writes; the
//! agent reads them and asks for changes by sending transactions, exactly
//! like any other counterparty.
//!
//! # Tick order
//!
//! 1. Reset demands to this tick's appetite.
//! 2. Place one order per demand and tally what could not be bought.
//! 3. Employers hire one worker if any is waiting, produce with every
//!    worker hired so far, and send the output to market.
//! 4. Idle wage seekers put themselves on the labor market once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use eco_market::{
    InventoryLot, LaborContract, LaborMarket, Mailbox, MarketHandle, Order, Transaction,
    TransactionKind, mailbox,
};
use eco_types::{AgentId, AgentSnapshot, Demand};

use crate::error::AgentError;
use crate::inventory::InventoryAccumulator;
use crate::processor::spawn_processor;
use crate::producer::Producer;
use crate::state::{AgentState, SharedState, lock};

/// Shared collaborators every agent needs.
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// The goods market.
    pub market: MarketHandle,
    /// The labor market.
    pub labor: Arc<LaborMarket>,
    /// Bound on every response-required request the agent makes.
    pub response_timeout: Duration,
}

/// Everything needed to create an agent.
#[derive(Debug)]
pub struct AgentParams {
    /// Display name.
    pub name: String,
    /// Starting cash.
    pub cash: Decimal,
    /// Markup coefficient used when selling.
    pub greed: u32,
    /// Whether the agent works for wages instead of employing others.
    pub seeks_wage: bool,
    /// Per-tick appetite multiplier.
    pub need_scale: u32,
    /// Per-tick expectation multiplier.
    pub expectation_scale: u32,
    /// Goods the agent wants each tick.
    pub demands: Vec<Demand>,
    /// Recipes the agent can run with hired labor.
    pub producers: Vec<Box<dyn Producer>>,
}

/// What an agent did during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickActivity {
    /// Units bought.
    pub bought: u64,
    /// Units wanted but not bought.
    pub unmet: u64,
    /// Workers hired.
    pub hired: u64,
    /// Units produced.
    pub produced: u64,
    /// Units sent to market.
    pub sent: u64,
}

/// Lifetime counters for reporting.
#[derive(Debug, Clone, Default)]
struct Counters {
    sent_to_market: u64,
    produced: u64,
    production_cycles: u64,
    wages_paid: Decimal,
    hired: u64,
    unmet_demand: u64,
}

/// One participant in the economy.
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    name: String,
    greed: u32,
    seeks_wage: bool,
    need_scale: u32,
    expectation_scale: u32,
    demands: Vec<Demand>,
    producers: Vec<Box<dyn Producer>>,
    inventory: HashMap<String, InventoryAccumulator>,
    labor_contracts: Vec<LaborContract>,
    employment_sought: bool,
    counters: Counters,
    state: SharedState,
    mailbox: Mailbox,
    processor: Option<JoinHandle<()>>,
    context: AgentContext,
}

impl Agent {
    /// Create an agent and start its mailbox processor.
    pub fn spawn(params: AgentParams, context: AgentContext) -> Self {
        let id = AgentId::new();
        let (mailbox, receiver) = mailbox(id);
        let state = Arc::new(Mutex::new(AgentState::with_cash(params.cash)));
        let processor = spawn_processor(params.name.clone(), receiver, Arc::clone(&state));
        debug!(agent = %params.name, %id, cash = %params.cash, seeks_wage = params.seeks_wage, "agent started");

        Self {
            id,
            name: params.name,
            greed: params.greed,
            seeks_wage: params.seeks_wage,
            need_scale: params.need_scale,
            expectation_scale: params.expectation_scale,
            demands: params.demands,
            producers: params.producers,
            inventory: HashMap::new(),
            labor_contracts: Vec::new(),
            employment_sought: false,
            counters: Counters::default(),
            state,
            mailbox,
            processor: Some(processor),
            context,
        }
    }

    /// The agent's identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for sending this agent transactions.
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Whether this agent works for wages.
    pub const fn seeks_wage(&self) -> bool {
        self.seeks_wage
    }

    /// Current demands.
    pub fn demands(&self) -> &[Demand] {
        &self.demands
    }

    /// Number of workers this agent has hired.
    pub const fn workforce(&self) -> usize {
        self.labor_contracts.len()
    }

    /// Cash on hand as of now.
    pub fn cash(&self) -> Decimal {
        lock(&self.state).cash
    }

    /// Copy of the agent's mutable state.
    pub fn state(&self) -> AgentState {
        lock(&self.state).clone()
    }

    /// Run one tick of actions.
    pub async fn act(&mut self, tick: u64) -> Result<TickActivity, AgentError> {
        let mut activity = TickActivity::default();
        self.reset_demands();
        let (bought, unmet) = self.fill_demands().await?;
        activity.bought = bought;
        activity.unmet = unmet;

        if !self.seeks_wage {
            if self.seek_labor().await {
                activity.hired = 1;
            }
            activity.produced = self.produce().await?;
            activity.sent = self.send_to_market()?;
        }

        if self.seeks_wage && !self.employment_sought && !lock(&self.state).employed {
            self.context
                .labor
                .append(LaborContract::new(self.name.as_str(), self.mailbox.clone()))
                .await;
            self.employment_sought = true;
        }

        debug!(
            agent = %self.name,
            tick,
            bought = activity.bought,
            unmet = activity.unmet,
            produced = activity.produced,
            sent = activity.sent,
            "agent acted"
        );
        Ok(activity)
    }

    /// Reset every demand to `expectation_scale * need_scale * kind.scale`.
    pub fn reset_demands(&mut self) {
        for demand in &mut self.demands {
            demand.reset(self.expectation_scale, self.need_scale);
        }
    }

    /// Order every outstanding demand from the market.
    ///
    /// Returns `(bought, unmet)` unit counts. Cash is re-read before each
    /// order so a second demand sees what the first one spent.
    pub async fn fill_demands(&mut self) -> Result<(u64, u64), AgentError> {
        let mut bought: u64 = 0;
        let mut unmet: u64 = 0;

        for demand in &mut self.demands {
            if demand.is_met() {
                continue;
            }
            let cash = lock(&self.state).cash;
            let order = Order::new(
                self.name.as_str(),
                demand.kind.key(),
                demand.quantity,
                cash,
                self.mailbox.clone(),
            );
            let outcome = self.context.market.place_order(order).await?;
            let got = outcome.fulfilled();
            let remaining = demand.fulfill(got);

            debug!(
                agent = %self.name,
                kind = %demand.kind.key,
                got,
                remaining,
                outcome = ?outcome,
                "demand order settled"
            );
            bought = bought.saturating_add(u64::from(got));
            unmet = unmet.saturating_add(u64::from(remaining));
        }

        self.counters.unmet_demand = self.counters.unmet_demand.saturating_add(unmet);
        Ok((bought, unmet))
    }

    /// Hire the longest-waiting worker, if any. Returns whether one was hired.
    pub async fn seek_labor(&mut self) -> bool {
        let Some(contract) = self.context.labor.shift().await else {
            debug!(agent = %self.name, "sought labor but there was none");
            return false;
        };

        let notice = Transaction::new(
            TransactionKind::Employment { employed: true },
            self.name.as_str(),
            format!("{} has hired {}", self.name, contract.worker_name),
        );
        if let Err(err) = contract.mailbox.post(notice) {
            warn!(agent = %self.name, worker = %contract.worker_name, error = %err, "could not notify hired worker");
        }
        info!(employer = %self.name, worker = %contract.worker_name, "worker hired");
        self.labor_contracts.push(contract);
        self.counters.hired = self.counters.hired.saturating_add(1);
        true
    }

    /// Run one production cycle per hired worker for every affordable
    /// producer. Returns the number of units produced.
    ///
    /// Each cycle's cost is debited from the agent's own mailbox first; a
    /// refused debit skips the cycle and the worker goes unpaid for it.
    pub async fn produce(&mut self) -> Result<u64, AgentError> {
        if self.labor_contracts.is_empty() {
            debug!(agent = %self.name, "has no labor");
            return Ok(0);
        }

        let cash = lock(&self.state).cash;
        let mut produced: u64 = 0;

        for producer in &self.producers {
            if producer.estimate()? > cash {
                debug!(agent = %self.name, producer = producer.key(), cash = %cash, "cannot afford a production cycle");
                continue;
            }

            for contract in &self.labor_contracts {
                let cycle = producer.produce()?;
                let memo = format!("cost to produce {} {}", producer.rate(), producer.kind().key);
                let reply = self
                    .mailbox
                    .request(
                        TransactionKind::Debit {
                            amount: cycle.total_cost,
                            units: Vec::new(),
                        },
                        producer.key(),
                        memo,
                        self.context.response_timeout,
                    )
                    .await;
                if !reply.is_accepted() {
                    debug!(agent = %self.name, cost = %cycle.total_cost, reply = ?reply, "production cost refused");
                    continue;
                }

                let wages = Transaction::new(
                    TransactionKind::Credit {
                        amount: cycle.total_wage,
                    },
                    self.name.as_str(),
                    format!("wages for producing {} {}", producer.rate(), producer.kind().key),
                );
                if let Err(err) = contract.mailbox.post(wages) {
                    warn!(agent = %self.name, worker = %contract.worker_name, error = %err, "wages could not be delivered");
                }

                let count = u64::try_from(cycle.units.len()).unwrap_or(u64::MAX);
                self.inventory
                    .entry(producer.kind().key.clone())
                    .or_insert_with(|| InventoryAccumulator::new(producer.kind().clone()))
                    .add(cycle.units, cycle.total_cost)?;

                produced = produced.saturating_add(count);
                self.counters.produced = self.counters.produced.saturating_add(count);
                self.counters.production_cycles = self.counters.production_cycles.saturating_add(1);
                self.counters.wages_paid = self
                    .counters
                    .wages_paid
                    .checked_add(cycle.total_wage)
                    .ok_or_else(|| AgentError::overflow("wages paid"))?;
            }
        }

        if produced > 0 {
            debug!(agent = %self.name, produced, "production finished");
        }
        Ok(produced)
    }

    /// Push all unsold production to the market. Returns units sent.
    pub fn send_to_market(&mut self) -> Result<u64, AgentError> {
        let mut sent: u64 = 0;
        for (key, accumulated) in std::mem::take(&mut self.inventory) {
            if accumulated.is_empty() {
                continue;
            }
            let unit_price = accumulated.unit_price(self.greed)?;
            let cost_basis = accumulated.cost_basis()?;
            let count = u64::try_from(accumulated.len()).unwrap_or(u64::MAX);

            self.context.market.push(InventoryLot {
                originator: self.id,
                originator_name: self.name.clone(),
                kind_key: key,
                units: accumulated.units,
                unit_price,
                cost_basis,
                seller: self.mailbox.clone(),
            });
            sent = sent.saturating_add(count);
        }
        self.counters.sent_to_market = self.counters.sent_to_market.saturating_add(sent);
        if sent > 0 {
            debug!(agent = %self.name, sent, "sent goods to market");
        }
        Ok(sent)
    }

    /// Point-in-time report record, read under the state lock.
    pub fn snapshot(&self) -> AgentSnapshot {
        let state = lock(&self.state);
        AgentSnapshot {
            id: self.id,
            name: self.name.clone(),
            greed: self.greed,
            cash: state.cash,
            consumables: state.consumables.len(),
            sent_to_market: self.counters.sent_to_market,
            produced: self.counters.produced,
            revenue: state.revenue,
            wages_paid: self.counters.wages_paid,
            hired: self.counters.hired,
            unmet_demand: self.counters.unmet_demand,
            employed: state.employed,
        }
    }

    /// Production cycles run so far.
    pub const fn production_cycles(&self) -> u64 {
        self.counters.production_cycles
    }

    /// Stop the mailbox processor once everything already sent is applied.
    pub async fn shutdown(&mut self) {
        let Some(processor) = self.processor.take() else {
            return;
        };
        if !self.mailbox.quit() {
            debug!(agent = %self.name, "mailbox already closed");
        }
        if let Err(err) = processor.await {
            warn!(agent = %self.name, error = %err, "mailbox processor ended abnormally");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use eco_market::{Market, MarketConfig};
    use eco_types::{ConsumableKind, KEY_APPLE};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::producer::Orchard;

    fn context() -> AgentContext {
        AgentContext {
            market: Market::spawn(MarketConfig::default()),
            labor: Arc::new(LaborMarket::new()),
            response_timeout: Duration::from_secs(1),
        }
    }

    fn supplier(cash: Decimal, greed: u32) -> AgentParams {
        AgentParams {
            name: String::from("Ohio"),
            cash,
            greed,
            seeks_wage: false,
            need_scale: 0,
            expectation_scale: 0,
            demands: Vec::new(),
            producers: vec![Box::new(Orchard::standard())],
        }
    }

    fn consumer(cash: Decimal, need: u32, expectation: u32) -> AgentParams {
        AgentParams {
            name: String::from("Smith"),
            cash,
            greed: 0,
            seeks_wage: true,
            need_scale: need,
            expectation_scale: expectation,
            demands: vec![Demand::new(ConsumableKind::apple(), 0)],
            producers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn wage_seeker_queues_for_work_once() {
        let ctx = context();
        let mut worker = Agent::spawn(consumer(dec!(10), 1, 1), ctx.clone());
        worker.act(1).await.unwrap();
        worker.act(2).await.unwrap();
        assert_eq!(ctx.labor.len().await, 1);
        worker.shutdown().await;
        ctx.market.quit().await;
    }

    #[tokio::test]
    async fn employer_hires_produces_and_sells() {
        let ctx = context();
        let mut worker = Agent::spawn(consumer(Decimal::ZERO, 1, 1), ctx.clone());
        let mut employer = Agent::spawn(supplier(dec!(200), 20), ctx.clone());

        worker.act(1).await.unwrap();
        let activity = employer.act(1).await.unwrap();
        assert_eq!(activity.hired, 1);
        assert_eq!(activity.produced, 10);
        assert_eq!(activity.sent, 10);

        // Cost 60.00 of which 50.00 is wages; price 6.00 + 20 * 0.25.
        assert_eq!(employer.cash(), dec!(140));
        let lots = ctx.market.lots(KEY_APPLE);
        assert_eq!(lots.len(), 1);
        let lot = lots.first().unwrap();
        assert_eq!(lot.unit_count(), 10);
        assert_eq!(lot.cost_basis, dec!(6));
        assert_eq!(lot.unit_price, dec!(11));

        worker.shutdown().await;
        employer.shutdown().await;
        let w = worker.snapshot();
        assert_eq!(w.cash, dec!(50));
        assert!(w.employed);
        let e = employer.snapshot();
        assert_eq!(e.hired, 1);
        assert_eq!(e.produced, 10);
        assert_eq!(e.sent_to_market, 10);
        assert_eq!(e.wages_paid, dec!(50));
        ctx.market.quit().await;
    }

    #[tokio::test]
    async fn employer_without_cash_skips_production() {
        let ctx = context();
        let mut worker = Agent::spawn(consumer(Decimal::ZERO, 1, 1), ctx.clone());
        let mut employer = Agent::spawn(supplier(dec!(59.99), 20), ctx.clone());

        worker.act(1).await.unwrap();
        let activity = employer.act(1).await.unwrap();
        assert_eq!(activity.hired, 1);
        assert_eq!(activity.produced, 0);
        assert_eq!(employer.cash(), dec!(59.99));
        assert_eq!(ctx.market.stock(), 0);

        worker.shutdown().await;
        employer.shutdown().await;
        ctx.market.quit().await;
    }

    #[tokio::test]
    async fn consumer_buys_what_it_can_afford_and_tallies_the_rest() {
        let ctx = context();
        let mut worker = Agent::spawn(consumer(Decimal::ZERO, 1, 1), ctx.clone());
        let mut employer = Agent::spawn(supplier(dec!(200), 20), ctx.clone());
        worker.act(1).await.unwrap();
        employer.act(1).await.unwrap();

        // 10 apples at 11.00 each. Wants 3 * 5 = 15, has 30.00 -> buys 2.
        let mut buyer = Agent::spawn(consumer(dec!(30), 3, 5), ctx.clone());
        let activity = buyer.act(2).await.unwrap();
        assert_eq!(activity.bought, 2);
        assert_eq!(activity.unmet, 13);
        assert_eq!(buyer.cash(), dec!(8));

        buyer.shutdown().await;
        worker.shutdown().await;
        employer.shutdown().await;

        let b = buyer.snapshot();
        assert_eq!(b.consumables, 2);
        assert_eq!(b.unmet_demand, 13);
        // Sale proceeds reached the seller.
        assert_eq!(employer.snapshot().revenue, dec!(22));
        assert_eq!(ctx.market.stock(), 8);
        ctx.market.quit().await;
    }

    #[tokio::test]
    async fn demands_reset_every_tick() {
        let ctx = context();
        let mut agent = Agent::spawn(consumer(Decimal::ZERO, 2, 3), ctx.clone());
        agent.reset_demands();
        assert_eq!(agent.demands().first().unwrap().quantity, 6);
        let activity = agent.act(1).await.unwrap();
        assert_eq!(activity.unmet, 6);
        let activity = agent.act(2).await.unwrap();
        assert_eq!(activity.unmet, 6);
        assert_eq!(agent.snapshot().unmet_demand, 12);
        agent.shutdown().await;
        ctx.market.quit().await;
    }
}
