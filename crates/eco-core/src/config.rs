//! Configuration loading and typed config structures for the Eco simulation.
//!
//! The configuration lives in `eco-config.yaml` in the working directory.
//! Every field has a default, so an empty or missing file yields a runnable
//! economy. Two environment variables override the file:
//!
//! - `ECO_MAX_TICKS` overrides `simulation.max_ticks`
//! - `ECO_SEED` overrides `population.seed`

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use eco_market::MarketConfig;

/// Environment variable overriding `simulation.max_ticks`.
pub const ENV_MAX_TICKS: &str = "ECO_MAX_TICKS";

/// Environment variable overriding `population.seed`.
pub const ENV_SEED: &str = "ECO_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level economy configuration, mirroring `eco-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Run bounds and pacing.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// How many agents to create and how to randomize them.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Market actor tuning.
    #[serde(default)]
    pub market: MarketSettings,

    /// Economics of the orchard every supplier runs.
    #[serde(default)]
    pub orchard: OrchardConfig,
}

impl EconomyConfig {
    /// Load configuration from a YAML file, apply environment overrides,
    /// and validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment overrides,
    /// and validate.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ECO_MAX_TICKS` and `ECO_SEED` as looked up by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_TICKS) {
            self.simulation.max_ticks =
                raw.trim().parse().map_err(|_parse| ConfigError::Invalid {
                    field: "simulation.max_ticks",
                    reason: format!("{ENV_MAX_TICKS}={raw} is not a tick count"),
                })?;
        }
        if let Some(raw) = lookup(ENV_SEED) {
            self.population.seed = raw.trim().parse().map_err(|_parse| ConfigError::Invalid {
                field: "population.seed",
                reason: format!("{ENV_SEED}={raw} is not a seed"),
            })?;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.max_ticks == 0 && sim.max_real_time_seconds == 0 {
            return Err(invalid(
                "simulation",
                "max_ticks and max_real_time_seconds cannot both be unlimited",
            ));
        }

        let pop = &self.population;
        if pop.supplier_count > pop.agent_count {
            return Err(invalid(
                "population.supplier_count",
                format!(
                    "{} suppliers exceed {} agents",
                    pop.supplier_count, pop.agent_count
                ),
            ));
        }
        check_range("population.consumer_cash", pop.consumer_cash_min, pop.consumer_cash_max)?;
        check_range("population.supplier_cash", pop.supplier_cash_min, pop.supplier_cash_max)?;
        check_range("population.need_scale", pop.need_scale_min, pop.need_scale_max)?;
        check_range(
            "population.expectation_scale",
            pop.expectation_scale_min,
            pop.expectation_scale_max,
        )?;
        check_range("population.greed", pop.greed_min, pop.greed_max)?;

        if self.market.order_queue_capacity == 0 {
            return Err(invalid("market.order_queue_capacity", "must be positive"));
        }
        if self.market.response_timeout_ms == 0 {
            return Err(invalid("market.response_timeout_ms", "must be positive"));
        }

        let orchard = &self.orchard;
        if orchard.rate == 0 {
            return Err(invalid("orchard.rate", "must be positive"));
        }
        if orchard.cost.is_sign_negative() {
            return Err(invalid("orchard.cost", "must not be negative"));
        }
        if orchard.wage.is_sign_negative() {
            return Err(invalid("orchard.wage", "must not be negative"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn check_range(field: &'static str, min: u32, max: u32) -> Result<(), ConfigError> {
    if min > max {
        return Err(invalid(field, format!("min {min} is above max {max}")));
    }
    Ok(())
}

/// Run bounds and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Stop after this many ticks (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Stop after this many wall-clock seconds (0 = unlimited).
    #[serde(default = "default_max_real_time_seconds")]
    pub max_real_time_seconds: u64,

    /// Pause between ticks, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl SimulationConfig {
    /// Pause between ticks.
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            max_real_time_seconds: default_max_real_time_seconds(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Population size and the ranges agents are drawn from.
///
/// Every range is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Seed for the agent generator.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Total number of agents.
    #[serde(default = "default_agent_count")]
    pub agent_count: u32,

    /// How many of those agents are suppliers.
    #[serde(default = "default_supplier_count")]
    pub supplier_count: u32,

    /// Lowest starting cash for a consumer.
    #[serde(default = "default_consumer_cash_min")]
    pub consumer_cash_min: u32,

    /// Highest starting cash for a consumer.
    #[serde(default = "default_consumer_cash_max")]
    pub consumer_cash_max: u32,

    /// Lowest consumer need scale.
    #[serde(default = "default_need_scale_min")]
    pub need_scale_min: u32,

    /// Highest consumer need scale.
    #[serde(default = "default_need_scale_max")]
    pub need_scale_max: u32,

    /// Lowest consumer expectation scale.
    #[serde(default = "default_expectation_scale_min")]
    pub expectation_scale_min: u32,

    /// Highest consumer expectation scale.
    #[serde(default = "default_expectation_scale_max")]
    pub expectation_scale_max: u32,

    /// Lowest starting cash for a supplier.
    #[serde(default = "default_supplier_cash_min")]
    pub supplier_cash_min: u32,

    /// Highest starting cash for a supplier.
    #[serde(default = "default_supplier_cash_max")]
    pub supplier_cash_max: u32,

    /// Lowest supplier greed.
    #[serde(default = "default_greed_min")]
    pub greed_min: u32,

    /// Highest supplier greed.
    #[serde(default = "default_greed_max")]
    pub greed_max: u32,
}

impl PopulationConfig {
    /// Number of consumers (agents that are not suppliers).
    pub const fn consumer_count(&self) -> u32 {
        self.agent_count.saturating_sub(self.supplier_count)
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            agent_count: default_agent_count(),
            supplier_count: default_supplier_count(),
            consumer_cash_min: default_consumer_cash_min(),
            consumer_cash_max: default_consumer_cash_max(),
            need_scale_min: default_need_scale_min(),
            need_scale_max: default_need_scale_max(),
            expectation_scale_min: default_expectation_scale_min(),
            expectation_scale_max: default_expectation_scale_max(),
            supplier_cash_min: default_supplier_cash_min(),
            supplier_cash_max: default_supplier_cash_max(),
            greed_min: default_greed_min(),
            greed_max: default_greed_max(),
        }
    }
}

/// Market actor tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSettings {
    /// Orders that can wait before submitters block.
    #[serde(default = "default_order_queue_capacity")]
    pub order_queue_capacity: usize,

    /// Milliseconds any party waits for an accept/reject reply.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

impl MarketSettings {
    /// Bound on every response-required request.
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Settings for [`eco_market::Market::spawn`].
    pub const fn market_config(&self) -> MarketConfig {
        MarketConfig {
            order_queue_capacity: self.order_queue_capacity,
            response_timeout: self.response_timeout(),
        }
    }
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            order_queue_capacity: default_order_queue_capacity(),
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

/// Orchard economics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchardConfig {
    /// Apples per worker per tick.
    #[serde(default = "default_orchard_rate")]
    pub rate: u32,

    /// Material cost per apple.
    #[serde(default = "default_orchard_cost")]
    pub cost: Decimal,

    /// Wage per apple.
    #[serde(default = "default_orchard_wage")]
    pub wage: Decimal,
}

impl Default for OrchardConfig {
    fn default() -> Self {
        Self {
            rate: default_orchard_rate(),
            cost: default_orchard_cost(),
            wage: default_orchard_wage(),
        }
    }
}

const fn default_max_ticks() -> u64 {
    100
}

const fn default_max_real_time_seconds() -> u64 {
    10
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_seed() -> u64 {
    42
}

const fn default_agent_count() -> u32 {
    10
}

const fn default_supplier_count() -> u32 {
    3
}

const fn default_consumer_cash_min() -> u32 {
    20
}

const fn default_consumer_cash_max() -> u32 {
    200
}

const fn default_need_scale_min() -> u32 {
    10
}

const fn default_need_scale_max() -> u32 {
    20
}

const fn default_expectation_scale_min() -> u32 {
    20
}

const fn default_expectation_scale_max() -> u32 {
    50
}

const fn default_supplier_cash_min() -> u32 {
    200
}

const fn default_supplier_cash_max() -> u32 {
    1000
}

const fn default_greed_min() -> u32 {
    20
}

const fn default_greed_max() -> u32 {
    200
}

const fn default_order_queue_capacity() -> usize {
    100
}

const fn default_response_timeout_ms() -> u64 {
    1000
}

const fn default_orchard_rate() -> u32 {
    10
}

const fn default_orchard_cost() -> Decimal {
    Decimal::ONE
}

const fn default_orchard_wage() -> Decimal {
    Decimal::from_parts(5, 0, 0, false, 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    fn parse_without_env(yaml: &str) -> Result<EconomyConfig, ConfigError> {
        let mut config: EconomyConfig = serde_yml::from_str(yaml)?;
        config.apply_overrides(no_env)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn default_config_is_valid() {
        let config = EconomyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.max_ticks, 100);
        assert_eq!(config.population.agent_count, 10);
        assert_eq!(config.population.supplier_count, 3);
        assert_eq!(config.population.consumer_count(), 7);
        assert_eq!(config.market.order_queue_capacity, 100);
        assert_eq!(config.market.response_timeout(), Duration::from_secs(1));
        assert_eq!(config.orchard.rate, 10);
        assert_eq!(config.orchard.cost, dec!(1));
        assert_eq!(config.orchard.wage, dec!(5));
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
simulation:
  max_ticks: 25
  max_real_time_seconds: 0
  tick_interval_ms: 5
population:
  seed: 7
  agent_count: 6
  supplier_count: 2
  greed_min: 1
  greed_max: 4
market:
  order_queue_capacity: 16
  response_timeout_ms: 250
orchard:
  rate: 4
  cost: 0.5
  wage: 2
";
        let config = parse_without_env(yaml).unwrap();
        assert_eq!(config.simulation.max_ticks, 25);
        assert_eq!(config.simulation.tick_interval(), Duration::from_millis(5));
        assert_eq!(config.population.seed, 7);
        assert_eq!(config.population.consumer_count(), 4);
        assert_eq!(config.population.greed_max, 4);
        // Untouched fields keep their defaults.
        assert_eq!(config.population.need_scale_min, 10);
        let market = config.market.market_config();
        assert_eq!(market.order_queue_capacity, 16);
        assert_eq!(market.response_timeout, Duration::from_millis(250));
        assert_eq!(config.orchard.cost, dec!(0.5));
    }

    #[test]
    fn parse_minimal_and_empty_yaml() {
        let config = parse_without_env("population:\n  seed: 9\n").unwrap();
        assert_eq!(config.population.seed, 9);
        assert_eq!(config.simulation.max_ticks, 100);
        assert!(EconomyConfig::parse("").is_ok());
    }

    #[test]
    fn env_overrides_win() {
        let mut config = EconomyConfig::default();
        config
            .apply_overrides(|key| match key {
                ENV_MAX_TICKS => Some(String::from("12")),
                ENV_SEED => Some(String::from(" 99 ")),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.simulation.max_ticks, 12);
        assert_eq!(config.population.seed, 99);
    }

    #[test]
    fn malformed_override_is_rejected() {
        let mut config = EconomyConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_SEED).then(|| String::from("lots")))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "population.seed",
                ..
            }
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse_without_env("population:\n  agent_count: 2\n  supplier_count: 3\n").is_err());
        assert!(parse_without_env("population:\n  greed_min: 9\n  greed_max: 3\n").is_err());
        assert!(parse_without_env("market:\n  order_queue_capacity: 0\n").is_err());
        assert!(parse_without_env("orchard:\n  rate: 0\n").is_err());
        assert!(parse_without_env("orchard:\n  wage: -1\n").is_err());
        assert!(
            parse_without_env("simulation:\n  max_ticks: 0\n  max_real_time_seconds: 0\n")
                .is_err()
        );
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = parse_without_env("simulation: [not, a, map]").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("eco-config.yaml");
        if path.exists() {
            let config = EconomyConfig::from_file(&path);
            assert!(config.is_ok(), "failed to load project config: {config:?}");
        }
    }
}
