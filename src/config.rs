use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::identity::SeasonTag;
use crate::stats::{Situation, Stat};

/// Replaces a whole normalized name when `pattern` occurs in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameOverride {
    pub pattern: String,
    pub canonical: String,
}

impl NameOverride {
    pub fn new(pattern: &str, canonical: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            canonical: canonical.to_string(),
        }
    }
}

/// Recency weight per season. Projection only; raw aggregates stay unweighted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonWeights(BTreeMap<SeasonTag, u32>);

impl SeasonWeights {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self(
            entries
                .into_iter()
                .map(|(season, w)| (SeasonTag::new(season), w))
                .collect(),
        )
    }

    pub fn get(&self, season: &SeasonTag) -> Option<u32> {
        self.0.get(season).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SeasonTag, u32)> + '_ {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SeasonWeights {
    fn default() -> Self {
        Self::new([("20152016", 4), ("20142015", 2), ("20132014", 1)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Statistic enumeration, in output column order.
    #[serde(default = "default_stats")]
    pub stats: Vec<Stat>,
    /// Pure rate statistics: never summed across splits or averaged across seasons.
    #[serde(default = "default_rate_stats")]
    pub rate_stats: Vec<Stat>,
    #[serde(default)]
    pub season_weights: SeasonWeights,
    #[serde(default = "default_name_overrides")]
    pub name_overrides: Vec<NameOverride>,
    /// Strength states unioned into the power-play columns.
    #[serde(default = "default_power_play_situations")]
    pub power_play_situations: Vec<Situation>,
}

fn default_stats() -> Vec<Stat> {
    Stat::ALL.to_vec()
}

fn default_rate_stats() -> Vec<Stat> {
    vec![Stat::ShootingPct]
}

fn default_name_overrides() -> Vec<NameOverride> {
    vec![
        NameOverride::new("Alexander Ovechkin", "Alex Ovechkin"),
        NameOverride::new("Pierre-Alexandre Parenteau", "Pa Parenteau"),
        NameOverride::new("Michael Cammalleri", "Mike Cammalleri"),
        NameOverride::new("Mathew Dumba", "Matt Dumba"),
        NameOverride::new("Christopher Tanev", "Chris Tanev"),
    ]
}

fn default_power_play_situations() -> Vec<Situation> {
    vec![Situation::FiveOnFour, Situation::FiveOnThree]
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            stats: default_stats(),
            rate_stats: default_rate_stats(),
            season_weights: SeasonWeights::default(),
            name_overrides: default_name_overrides(),
            power_play_situations: default_power_play_situations(),
        }
    }
}

static BUILTIN: Lazy<ValuationConfig> = Lazy::new(ValuationConfig::default);

impl ValuationConfig {
    /// Shared built-in configuration.
    pub fn builtin() -> &'static ValuationConfig {
        &BUILTIN
    }

    /// Read a JSON config file; omitted fields keep their built-in defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = serde_json::from_str::<ValuationConfig>(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> std::result::Result<(), ValuationError> {
        if self.stats.is_empty() {
            return Err(ValuationError::Config("statistic enumeration is empty".into()));
        }
        if self.season_weights.is_empty() {
            return Err(ValuationError::Config("no season weights configured".into()));
        }
        if let Some((season, _)) = self.season_weights.iter().find(|(_, w)| *w == 0) {
            return Err(ValuationError::Config(format!(
                "season {season} has a zero weight"
            )));
        }
        if let Some(o) = self.name_overrides.iter().find(|o| o.pattern.trim().is_empty()) {
            return Err(ValuationError::Config(format!(
                "name override for {:?} has an empty pattern",
                o.canonical
            )));
        }
        Ok(())
    }

    pub fn is_rate(&self, stat: Stat) -> bool {
        self.rate_stats.contains(&stat)
    }

    /// The enumeration without rate statistics. Columns of the projected table and
    /// the default ranking set.
    pub fn summable_stats(&self) -> Vec<Stat> {
        self.stats
            .iter()
            .copied()
            .filter(|s| !self.is_rate(*s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let raw = r#"{"season_weights": {"20252026": 3, "20242025": 1}}"#;
        let cfg: ValuationConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.stats, Stat::ALL.to_vec());
        assert_eq!(cfg.season_weights.get(&SeasonTag::new("20252026")), Some(3));
        assert_eq!(cfg.season_weights.get(&SeasonTag::new("20152016")), None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_weight_is_rejected() {
        let cfg = ValuationConfig {
            season_weights: SeasonWeights::new([("20152016", 0)]),
            ..ValuationConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ValuationError::Config(_))));
    }

    #[test]
    fn summable_stats_skip_rate_columns() {
        let cfg = ValuationConfig::builtin();
        let stats = cfg.summable_stats();
        assert!(!stats.contains(&Stat::ShootingPct));
        assert_eq!(stats.len(), Stat::ALL.len() - 1);
    }
}
