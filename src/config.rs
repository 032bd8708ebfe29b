use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ingest::ColumnNames;
use crate::models::Stage;
use crate::score::UnscoredPolicy;
use crate::target::TargetStrategy;

const DEFAULT_STAGES: &[&str] = &[
    "PlanoVoo",
    "ProjetoFast",
    "PontoPartida",
    "AcoesComerciais",
    "PainelVendas",
    "Engajamento",
    "VisualMerchandising",
    "ModeloAtendimento",
    "EvolucaoComercial",
    "Qualidade",
    "Meta",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    /// CSV file holding the stage, relative to the data directory.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub cycle_scoped: bool,
    #[serde(default)]
    pub wildcard: bool,
    #[serde(default)]
    pub columns: ColumnNames,
}

impl StageConfig {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            file: None,
            cycle_scoped: false,
            wildcard: false,
            columns: ColumnNames::default(),
        }
    }

    pub fn stage(&self) -> Stage {
        Stage {
            name: self.name.clone(),
            cycle_scoped: self.cycle_scoped,
            wildcard: self.wildcard,
        }
    }

    pub fn file_name(&self) -> String {
        self.file
            .clone()
            .unwrap_or_else(|| format!("{}.csv", self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub strategy: TargetStrategy,
    /// Year of month-named cycles under the duration strategy, unless the strategy sets one.
    #[serde(default)]
    pub season_year: Option<i32>,
    /// Fixed offset used to decide what "today" is for the duration baseline.
    #[serde(default)]
    pub utc_offset_hours: i32,
    #[serde(default)]
    pub unscored: UnscoredPolicy,
}

fn default_title() -> String {
    "Circuito MiniPreço".to_string()
}

fn default_stages() -> Vec<StageConfig> {
    DEFAULT_STAGES.iter().map(|name| StageConfig::named(name)).collect()
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            stages: default_stages(),
            strategy: TargetStrategy::default(),
            season_year: None,
            utc_offset_hours: 0,
            unscored: UnscoredPolicy::default(),
        }
    }
}

impl CircuitConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: CircuitConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name.as_str()) {
                return Err(ConfigError::DuplicateStage(stage.name.clone()));
            }
        }

        self.offset().map(|_| ())
    }

    fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_hours
            .checked_mul(3_600)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidOffset(self.utc_offset_hours))
    }

    /// The configured strategy with the top-level season year filled in.
    pub fn target_strategy(&self) -> TargetStrategy {
        match self.strategy {
            TargetStrategy::Duration { unit, season_year } => TargetStrategy::Duration {
                unit,
                season_year: season_year.or(self.season_year),
            },
            TargetStrategy::WeightBudget => TargetStrategy::WeightBudget,
        }
    }

    /// Calendar date of `now` in the circuit's time zone.
    pub fn local_date(&self, now: DateTime<Utc>) -> Result<NaiveDate, ConfigError> {
        Ok(now.with_timezone(&self.offset()?).date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::DurationUnit;
    use chrono::TimeZone;

    #[test]
    fn empty_object_uses_defaults() {
        let config = CircuitConfig::from_json("{}").unwrap();
        assert_eq!(config, CircuitConfig::default());
        assert_eq!(config.stages.len(), 11);
        assert_eq!(config.stages[0].file_name(), "PlanoVoo.csv");
    }

    #[test]
    fn stage_flags_and_strategy_parse() {
        let config = CircuitConfig::from_json(
            r#"{
                "stages": [
                    {"name": "PainelVendas"},
                    {"name": "VisualMerchandising", "cycle_scoped": true, "file": "vm.csv"},
                    {"name": "Meta", "wildcard": true, "columns": {"score": "Minutos"}}
                ],
                "strategy": {"kind": "duration", "unit": "hours", "season_year": 2025},
                "utc_offset_hours": -3,
                "unscored": "keep"
            }"#,
        )
        .unwrap();

        assert!(config.stages[1].stage().cycle_scoped);
        assert_eq!(config.stages[1].file_name(), "vm.csv");
        assert!(config.stages[2].stage().wildcard);
        assert_eq!(config.stages[2].columns.score.as_deref(), Some("Minutos"));
        assert_eq!(
            config.strategy,
            TargetStrategy::Duration {
                unit: DurationUnit::Hours,
                season_year: Some(2025)
            }
        );
        assert_eq!(config.unscored, UnscoredPolicy::Keep);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            CircuitConfig::from_json(r#"{"stages": []}"#),
            Err(ConfigError::NoStages)
        ));
        assert!(matches!(
            CircuitConfig::from_json(r#"{"stages": [{"name": "Meta"}, {"name": "Meta"}]}"#),
            Err(ConfigError::DuplicateStage(name)) if name == "Meta"
        ));
        assert!(matches!(
            CircuitConfig::from_json(r#"{"utc_offset_hours": 30}"#),
            Err(ConfigError::InvalidOffset(30))
        ));
        assert!(matches!(
            CircuitConfig::from_json(r#"{"utc_offset_hours": 700000}"#),
            Err(ConfigError::InvalidOffset(700000))
        ));
        assert!(matches!(
            CircuitConfig::from_json(r#"{"utc_offset_hours": -2147483648}"#),
            Err(ConfigError::InvalidOffset(i32::MIN))
        ));
        assert!(matches!(
            CircuitConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn top_level_season_year_reaches_the_duration_strategy() {
        let config = CircuitConfig::from_json(
            r#"{"season_year": 2024, "strategy": {"kind": "duration", "unit": "days"}}"#,
        )
        .unwrap();
        assert_eq!(config.season_year, Some(2024));
        assert_eq!(
            config.target_strategy(),
            TargetStrategy::Duration {
                unit: DurationUnit::Days,
                season_year: Some(2024)
            }
        );

        let nested = CircuitConfig::from_json(
            r#"{"season_year": 2024, "strategy": {"kind": "duration", "unit": "days", "season_year": 2025}}"#,
        )
        .unwrap();
        assert_eq!(
            nested.target_strategy(),
            TargetStrategy::Duration {
                unit: DurationUnit::Days,
                season_year: Some(2025)
            }
        );

        let budget = CircuitConfig::from_json(r#"{"season_year": 2024}"#).unwrap();
        assert_eq!(budget.target_strategy(), TargetStrategy::WeightBudget);
    }

    #[test]
    fn local_date_applies_the_offset() {
        let config = CircuitConfig {
            utc_offset_hours: -3,
            ..CircuitConfig::default()
        };
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 2, 0, 0).unwrap();
        assert_eq!(
            config.local_date(now).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
        );
    }
}
