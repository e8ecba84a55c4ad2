//! Agent spawner for seeding the economy.
//!
//! At startup the spawner draws a population from [`PopulationConfig`]:
//! suppliers that run an orchard and hire labor, and consumers that buy
//! apples and offer themselves as workers. All randomness comes from a
//! [`StdRng`] seeded with `population.seed`, so a seed reproduces the same
//! names, cash, appetites, and greed.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::info;

use eco_agents::{Agent, AgentContext, AgentParams, Orchard, Producer};
use eco_core::{OrchardConfig, PopulationConfig};
use eco_types::{ConsumableKind, Demand};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in pool of agent names. Names are dealt from a shuffled copy;
/// once the pool runs out, later agents get a numeric suffix.
const NAME_POOL: &[&str] = &[
    "Abbott", "Baker", "Carver", "Dalton", "Ellis", "Fletcher", "Garner", "Harper",
    "Ingram", "Jarvis", "Keller", "Lowell", "Mercer", "Norris", "Osborne", "Porter",
    "Quinn", "Rowan", "Sawyer", "Tanner", "Upton", "Vance", "Walker", "Yates",
    "Archer", "Booth", "Chandler", "Draper", "Everett", "Forrester", "Gale", "Hayward",
    "Irving", "Joiner", "Knox", "Lambert", "Miller", "Nash", "Orchard", "Prescott",
    "Reeve", "Slater", "Thatcher", "Usher", "Vaughn", "Weaver", "Wright", "York",
];

/// Deal `count` distinct names.
fn deal_names(rng: &mut StdRng, count: usize) -> Vec<String> {
    let mut pool: Vec<&str> = NAME_POOL.to_vec();
    pool.shuffle(rng);

    let mut names = Vec::with_capacity(count);
    for (i, base) in pool.iter().cycle().take(count).enumerate() {
        let round = i.checked_div(pool.len()).unwrap_or(0);
        if round == 0 {
            names.push((*base).to_owned());
        } else {
            names.push(format!("{base} {}", round.saturating_add(1)));
        }
    }
    names
}

// -----------------------------------------------------------------------
// Population
// -----------------------------------------------------------------------

/// Draw the starting population, suppliers first.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if the orchard settings describe an
/// invalid producer.
pub fn plan_population(
    population: &PopulationConfig,
    orchard: &OrchardConfig,
) -> Result<Vec<AgentParams>, EngineError> {
    let mut rng = StdRng::seed_from_u64(population.seed);
    let total = usize::try_from(population.agent_count).unwrap_or(usize::MAX);
    let suppliers = usize::try_from(population.supplier_count).unwrap_or(usize::MAX);
    let names = deal_names(&mut rng, total);

    let mut plans = Vec::with_capacity(total);
    for (i, name) in names.into_iter().enumerate() {
        let plan = if i < suppliers {
            supplier(&mut rng, name, population, orchard)?
        } else {
            consumer(&mut rng, name, population)
        };
        plans.push(plan);
    }
    Ok(plans)
}

fn supplier(
    rng: &mut StdRng,
    name: String,
    population: &PopulationConfig,
    orchard: &OrchardConfig,
) -> Result<AgentParams, EngineError> {
    let cash = rng.random_range(population.supplier_cash_min..=population.supplier_cash_max);
    let greed = rng.random_range(population.greed_min..=population.greed_max);
    let producer: Box<dyn Producer> =
        Box::new(Orchard::new(orchard.rate, orchard.cost, orchard.wage)?);
    Ok(AgentParams {
        name,
        cash: Decimal::from(cash),
        greed,
        seeks_wage: false,
        need_scale: 0,
        expectation_scale: 0,
        demands: Vec::new(),
        producers: vec![producer],
    })
}

fn consumer(rng: &mut StdRng, name: String, population: &PopulationConfig) -> AgentParams {
    let cash = rng.random_range(population.consumer_cash_min..=population.consumer_cash_max);
    let need_scale = rng.random_range(population.need_scale_min..=population.need_scale_max);
    let expectation_scale =
        rng.random_range(population.expectation_scale_min..=population.expectation_scale_max);
    AgentParams {
        name,
        cash: Decimal::from(cash),
        greed: 0,
        seeks_wage: true,
        need_scale,
        expectation_scale,
        demands: vec![Demand::new(ConsumableKind::apple(), 0)],
        producers: Vec::new(),
    }
}

/// Start every planned agent against the shared `context`.
pub fn spawn_agents(plans: Vec<AgentParams>, context: &AgentContext) -> Vec<Agent> {
    let agents: Vec<Agent> = plans
        .into_iter()
        .map(|plan| Agent::spawn(plan, context.clone()))
        .collect();
    let employers = agents.iter().filter(|a| !a.seeks_wage()).count();
    info!(
        agents = agents.len(),
        employers,
        workers = agents.len().saturating_sub(employers),
        "Agents spawned"
    );
    agents
}
