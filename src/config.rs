use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::types::WeightConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub import_dir: PathBuf,
    pub feed_url: Option<String>,
    pub weights: WeightConfig,
    pub seed: Option<u64>,
}

pub fn load() -> Result<Config> {
    Config::from_lookup(|key| env::var(key).ok())
}

impl Config {
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("LOTTERY_DB_PATH").unwrap_or_else(|| "data/lottery.db".to_string());
        let import_dir = lookup("LOTTERY_IMPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("json_data"));
        let feed_url = lookup("LOTTERY_FEED_URL").filter(|url| !url.trim().is_empty());

        let defaults = WeightConfig::default();
        let weights = WeightConfig {
            base_frequency: float_var(&lookup, "LOTTERY_WEIGHT_BASE", defaults.base_frequency)?,
            recency_hot: float_var(&lookup, "LOTTERY_WEIGHT_HOT", defaults.recency_hot)?,
            delay_cold: float_var(&lookup, "LOTTERY_WEIGHT_COLD", defaults.delay_cold)?,
            pair_affinity: float_var(&lookup, "LOTTERY_WEIGHT_PAIR", defaults.pair_affinity)?,
        };
        weights.validate().context("invalid LOTTERY_WEIGHT_* settings")?;

        let seed = match lookup("LOTTERY_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("LOTTERY_SEED must be an integer, got {:?}", raw))?,
            ),
            None => None,
        };

        Ok(Config {
            database_url,
            import_dir,
            feed_url,
            weights,
            seed,
        })
    }
}

fn float_var<F>(lookup: &F, key: &str, default: f64) -> Result<f64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, "data/lottery.db");
        assert_eq!(config.import_dir, PathBuf::from("json_data"));
        assert_eq!(config.feed_url, None);
        assert_eq!(config.weights, WeightConfig::default());
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("LOTTERY_DB_PATH", "/tmp/l.db"),
            ("LOTTERY_FEED_URL", "http://localhost:8080/draws"),
            ("LOTTERY_WEIGHT_HOT", "2.5"),
            ("LOTTERY_WEIGHT_PAIR", "0"),
            ("LOTTERY_SEED", "7"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "/tmp/l.db");
        assert_eq!(config.feed_url.as_deref(), Some("http://localhost:8080/draws"));
        assert_eq!(config.weights.recency_hot, 2.5);
        assert_eq!(config.weights.pair_affinity, 0.0);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_bad_values_name_the_variable() {
        let err = config_from(&[("LOTTERY_WEIGHT_COLD", "cold")]).unwrap_err();
        assert!(format!("{:#}", err).contains("LOTTERY_WEIGHT_COLD"));

        assert!(config_from(&[("LOTTERY_WEIGHT_BASE", "-1")]).is_err());
        assert!(config_from(&[("LOTTERY_SEED", "abc")]).is_err());
    }
}
