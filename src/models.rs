use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Period label that selects every period of a cycle.
pub const ALL_PERIODS: &str = "ALL";

/// Label the circuit sheets use for "every period".
const ALL_PERIODS_LOCAL: &str = "Todos";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Store {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    /// Measured once per cycle and repeated on every period of that cycle.
    pub cycle_scoped: bool,
    /// Shown alongside the standings but never counted toward totals or targets.
    pub wildcard: bool,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cycle_scoped: false,
            wildcard: false,
        }
    }

    pub fn cycle_scoped(mut self) -> Self {
        self.cycle_scoped = true;
        self
    }

    pub fn wildcard(mut self) -> Self {
        self.wildcard = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CycleKey {
    pub cycle: String,
    pub period: String,
}

impl CycleKey {
    pub fn new(cycle: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            cycle: cycle.into(),
            period: period.into(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.cycle, self.period)
    }
}

/// Which periods of a cycle a query covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodSelection {
    All,
    Only(BTreeSet<String>),
}

impl PeriodSelection {
    /// An empty list, or one containing the `ALL` sentinel, selects every period.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut periods = BTreeSet::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.eq_ignore_ascii_case(ALL_PERIODS) || label.eq_ignore_ascii_case(ALL_PERIODS_LOCAL)
            {
                return PeriodSelection::All;
            }
            if !label.is_empty() {
                periods.insert(label.to_string());
            }
        }

        if periods.is_empty() {
            PeriodSelection::All
        } else {
            PeriodSelection::Only(periods)
        }
    }

    pub fn single(period: impl Into<String>) -> Self {
        PeriodSelection::Only(BTreeSet::from([period.into()]))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, PeriodSelection::All)
    }

    pub fn contains(&self, period: &str) -> bool {
        match self {
            PeriodSelection::All => true,
            PeriodSelection::Only(periods) => periods.contains(period),
        }
    }
}

/// One source row of one stage after column mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub store: Store,
    pub stage: String,
    pub cycle: String,
    pub period: String,
    pub value: Option<f64>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageWeightRecord {
    pub stage: String,
    pub cycle: String,
    pub period: String,
    pub weight: f64,
}

/// One merged row per (store, cycle, period). `values` is aligned with `Dataset::stages`
/// and keeps `None` wherever a stage had no usable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedRow {
    pub store: Store,
    pub cycle: String,
    pub period: String,
    pub values: Vec<Option<f64>>,
}

/// A consolidated, ordered dataset snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub stages: Vec<Stage>,
    pub rows: Vec<ConsolidatedRow>,
    pub weights: Vec<StageWeightRecord>,
    /// Every (cycle, period) pair present in `rows`, in calendar order.
    pub periods: Vec<CycleKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageScore {
    pub stage: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedScore {
    pub store: Store,
    pub competitive: Vec<StageScore>,
    pub wildcard: Vec<StageScore>,
    /// Sum of competitive stages in source units.
    pub scalar_total: f64,
    /// What gets compared to the target; equals `scalar_total` under the weight budget.
    pub position: f64,
    pub target: f64,
    pub progress_pct: f64,
    pub remaining: f64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub cycle: String,
    pub periods: PeriodSelection,
    pub strategy: String,
    pub target: f64,
    pub baseline: f64,
    /// Set when the strategy resolved no target and the best position stood in for it.
    pub target_fallback: bool,
    pub scores: Vec<AggregatedScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeTier {
    Gold,
    Silver,
    Bronze,
    Recognition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodiumEntry {
    pub rank: u32,
    pub store: Store,
    pub position: f64,
    pub progress_pct: f64,
    pub prize: PrizeTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Podium {
    /// False when nobody reached the target and `entries` holds the current top three.
    pub crossed_finish: bool,
    pub entries: Vec<PodiumEntry>,
}
