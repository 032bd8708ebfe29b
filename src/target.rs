use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{cycle_year, days_in_month, is_current_cycle, parse_cycle};
use crate::models::{Dataset, PeriodSelection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Days,
    Hours,
}

impl DurationUnit {
    fn per_day(self) -> f64 {
        match self {
            DurationUnit::Days => 1.0,
            DurationUnit::Hours => 24.0,
        }
    }

    /// Earned scores are minutes; this converts them into the target's unit.
    fn minutes_per_unit(self) -> f64 {
        match self {
            DurationUnit::Days => 1_440.0,
            DurationUnit::Hours => 60.0,
        }
    }
}

/// How the finish line of a cycle is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetStrategy {
    #[default]
    WeightBudget,
    /// The length of the cycle's month; stores start from the time already elapsed.
    Duration {
        unit: DurationUnit,
        #[serde(default)]
        season_year: Option<i32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Resolution {
    pub target: f64,
    pub baseline: f64,
}

impl TargetStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            TargetStrategy::WeightBudget => "weight_budget",
            TargetStrategy::Duration { .. } => "duration",
        }
    }

    pub fn uses_clock(&self) -> bool {
        matches!(self, TargetStrategy::Duration { .. })
    }

    pub fn resolve_target(
        &self,
        dataset: &Dataset,
        cycle: &str,
        periods: &PeriodSelection,
        today: NaiveDate,
    ) -> Resolution {
        match *self {
            TargetStrategy::WeightBudget => Resolution {
                target: stage_weights(dataset, cycle, periods).values().sum(),
                baseline: 0.0,
            },
            TargetStrategy::Duration { unit, season_year } => {
                let Some(month) = parse_cycle(cycle) else {
                    return Resolution::default();
                };
                let year = cycle_year(month, season_year, today);
                let days = days_in_month(year, month.month).unwrap_or(0);
                let baseline = if is_current_cycle(cycle, season_year, today) {
                    f64::from(today.day()) * unit.per_day()
                } else {
                    0.0
                };
                Resolution {
                    target: f64::from(days) * unit.per_day(),
                    baseline,
                }
            }
        }
    }

    pub fn position(&self, scalar_total: f64, resolution: Resolution) -> f64 {
        match self {
            TargetStrategy::WeightBudget => scalar_total,
            TargetStrategy::Duration { unit, .. } => {
                scalar_total / unit.minutes_per_unit() + resolution.baseline
            }
        }
    }
}

/// A cycle-scoped stage counts once, at its largest per-period weight, when the
/// selection touches the cycle.
pub fn stage_weights(
    dataset: &Dataset,
    cycle: &str,
    periods: &PeriodSelection,
) -> BTreeMap<String, f64> {
    let touched = dataset
        .periods_of(cycle)
        .into_iter()
        .any(|period| periods.contains(period));
    let cycle_scoped: BTreeSet<&str> = dataset
        .stages
        .iter()
        .filter(|stage| stage.cycle_scoped)
        .map(|stage| stage.name.as_str())
        .collect();
    let competitive: BTreeSet<&str> = dataset
        .stages
        .iter()
        .filter(|stage| !stage.wildcard)
        .map(|stage| stage.name.as_str())
        .collect();

    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    for record in dataset.weights.iter().filter(|w| w.cycle == cycle) {
        let stage = record.stage.as_str();
        if !competitive.contains(stage) {
            continue;
        }

        if cycle_scoped.contains(stage) {
            if touched {
                let entry = weights.entry(record.stage.clone()).or_insert(0.0);
                *entry = entry.max(record.weight);
            }
        } else if periods.contains(&record.period) {
            *weights.entry(record.stage.clone()).or_insert(0.0) += record.weight;
        }
    }
    weights
}
