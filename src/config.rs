//! Engine configuration from the environment

use crate::processors::{RandomTurnIds, SequentialTurnIds, TurnTracker};
use std::str::FromStr;
use thiserror::Error;

pub const MAX_CHAIN_DEPTH_VAR: &str = "AGENT_EVENTS_MAX_CHAIN_DEPTH";
pub const MAX_CHAIN_STEPS_VAR: &str = "AGENT_EVENTS_MAX_CHAIN_STEPS";
pub const COST_PER_INPUT_TOKEN_VAR: &str = "AGENT_EVENTS_COST_PER_INPUT_TOKEN";
pub const COST_PER_OUTPUT_TOKEN_VAR: &str = "AGENT_EVENTS_COST_PER_OUTPUT_TOKEN";
pub const TURN_IDS_VAR: &str = "AGENT_EVENTS_TURN_IDS";

pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 100;
pub const DEFAULT_MAX_CHAIN_STEPS: usize = 10_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// How turn identifiers are generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnIdMode {
    #[default]
    Random,
    /// Reproducible ids for replays and tests
    Sequential,
}

impl FromStr for TurnIdMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(TurnIdMode::Random),
            "sequential" => Ok(TurnIdMode::Sequential),
            other => Err(format!("expected `random` or `sequential`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_chain_depth: usize,
    pub max_chain_steps: usize,
    pub cost_per_input_token: f64,
    pub cost_per_output_token: f64,
    pub turn_ids: TurnIdMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            max_chain_steps: DEFAULT_MAX_CHAIN_STEPS,
            cost_per_input_token: 0.0,
            cost_per_output_token: 0.0,
            turn_ids: TurnIdMode::Random,
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a set variable that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first variable that does not
    /// parse, or a negative or non-finite token rate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_chain_depth: parse(&lookup, MAX_CHAIN_DEPTH_VAR)?.unwrap_or(defaults.max_chain_depth),
            max_chain_steps: parse(&lookup, MAX_CHAIN_STEPS_VAR)?.unwrap_or(defaults.max_chain_steps),
            cost_per_input_token: parse_rate(&lookup, COST_PER_INPUT_TOKEN_VAR)?
                .unwrap_or(defaults.cost_per_input_token),
            cost_per_output_token: parse_rate(&lookup, COST_PER_OUTPUT_TOKEN_VAR)?
                .unwrap_or(defaults.cost_per_output_token),
            turn_ids: parse(&lookup, TURN_IDS_VAR)?.unwrap_or(defaults.turn_ids),
        })
    }

    /// A turn tracker with this configuration's id source and token rates
    pub fn turn_tracker(&self) -> TurnTracker {
        let tracker = TurnTracker::new().with_costs(self.cost_per_input_token, self.cost_per_output_token);
        match self.turn_ids {
            TurnIdMode::Random => tracker.with_turn_ids(RandomTurnIds),
            TurnIdMode::Sequential => tracker.with_turn_ids(SequentialTurnIds::new()),
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: value.clone(),
            reason: e.to_string(),
        })
}

fn parse_rate(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<f64>, ConfigError> {
    let rate: Option<f64> = parse(lookup, var)?;
    match rate {
        Some(r) if !r.is_finite() || r < 0.0 => Err(ConfigError::Invalid {
            var,
            value: r.to_string(),
            reason: "must be a finite, non-negative number".to_string(),
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_chain_depth, 100);
        assert_eq!(config.max_chain_steps, 10_000);
        assert_eq!(config.turn_ids, TurnIdMode::Random);
    }

    #[test]
    fn test_reads_every_variable() {
        let config = EngineConfig::from_lookup(lookup(&[
            (MAX_CHAIN_DEPTH_VAR, "8"),
            (MAX_CHAIN_STEPS_VAR, " 64 "),
            (COST_PER_INPUT_TOKEN_VAR, "0.000003"),
            (COST_PER_OUTPUT_TOKEN_VAR, "0.000015"),
            (TURN_IDS_VAR, "Sequential"),
        ]))
        .unwrap();
        assert_eq!(config.max_chain_depth, 8);
        assert_eq!(config.max_chain_steps, 64);
        assert!((config.cost_per_output_token - 0.000_015).abs() < 1e-12);
        assert_eq!(config.turn_ids, TurnIdMode::Sequential);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[(MAX_CHAIN_DEPTH_VAR, "  ")])).unwrap();
        assert_eq!(config.max_chain_depth, DEFAULT_MAX_CHAIN_DEPTH);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = EngineConfig::from_lookup(lookup(&[(MAX_CHAIN_DEPTH_VAR, "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: MAX_CHAIN_DEPTH_VAR, .. }));

        let err = EngineConfig::from_lookup(lookup(&[(TURN_IDS_VAR, "uuid")])).unwrap_err();
        assert!(err.to_string().contains(TURN_IDS_VAR));

        let err =
            EngineConfig::from_lookup(lookup(&[(COST_PER_INPUT_TOKEN_VAR, "-1")])).unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_turn_tracker_uses_configured_source() {
        use crate::processor::Processor;

        let config = EngineConfig {
            turn_ids: TurnIdMode::Sequential,
            cost_per_input_token: 2.0,
            ..EngineConfig::default()
        };
        let state = config.turn_tracker().initial_state();
        assert!((state.cost_per_input_token - 2.0).abs() < f64::EPSILON);
    }
}
