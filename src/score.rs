use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Dataset, PeriodSelection, StageScore, Store};

/// Display of stages with no value in the selection. Totals count them as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscoredPolicy {
    #[default]
    Zero,
    Keep,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreTotals {
    pub store: Store,
    pub competitive: Vec<StageScore>,
    pub wildcard: Vec<StageScore>,
    pub scalar_total: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    max: Option<f64>,
    seen: bool,
}

impl Accumulator {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.max = Some(self.max.map_or(value, |m| m.max(value)));
            self.seen = true;
        }
    }

    fn value(&self, cycle_scoped: bool, policy: UnscoredPolicy) -> Option<f64> {
        if !self.seen {
            return match policy {
                UnscoredPolicy::Zero => Some(0.0),
                UnscoredPolicy::Keep => None,
            };
        }
        if cycle_scoped {
            self.max
        } else {
            Some(self.sum)
        }
    }
}

/// Cycle-scoped stages carry one value per cycle and are counted once.
pub fn aggregate(
    dataset: &Dataset,
    cycle: &str,
    periods: &PeriodSelection,
    policy: UnscoredPolicy,
) -> Vec<StoreTotals> {
    if dataset.stages.is_empty() {
        return Vec::new();
    }

    let mut by_store: BTreeMap<&Store, Vec<Accumulator>> = BTreeMap::new();
    for row in dataset
        .rows
        .iter()
        .filter(|row| row.cycle == cycle && periods.contains(&row.period))
    {
        let accumulators = by_store
            .entry(&row.store)
            .or_insert_with(|| vec![Accumulator::default(); dataset.stages.len()]);
        for (acc, value) in accumulators.iter_mut().zip(&row.values) {
            acc.add(*value);
        }
    }

    by_store
        .into_iter()
        .map(|(store, accumulators)| {
            let mut competitive = Vec::new();
            let mut wildcard = Vec::new();
            let mut scalar_total = 0.0;

            for (stage, acc) in dataset.stages.iter().zip(&accumulators) {
                let score = StageScore {
                    stage: stage.name.clone(),
                    value: acc.value(stage.cycle_scoped, policy),
                };
                if stage.wildcard {
                    wildcard.push(score);
                } else {
                    scalar_total += score.value.unwrap_or(0.0);
                    competitive.push(score);
                }
            }

            StoreTotals {
                store: store.clone(),
                competitive,
                wildcard,
                scalar_total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsolidatedRow, CycleKey, Stage};

    fn row(key: &str, cycle: &str, period: &str, values: &[Option<f64>]) -> ConsolidatedRow {
        ConsolidatedRow {
            store: Store {
                key: key.to_string(),
                name: format!("Loja {key}"),
            },
            cycle: cycle.to_string(),
            period: period.to_string(),
            values: values.to_vec(),
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            stages: vec![
                Stage::new("PainelVendas"),
                Stage::new("VisualMerchandising").cycle_scoped(),
                Stage::new("Meta").wildcard(),
            ],
            rows: vec![
                row("A", "Março", "S1", &[Some(10.0), Some(50.0), Some(5.0)]),
                row("A", "Março", "S2", &[Some(15.0), Some(50.0), None]),
                row("B", "Março", "S1", &[None, None, Some(40.0)]),
                row("C", "Abril", "S1", &[Some(99.0), None, None]),
            ],
            weights: Vec::new(),
            periods: vec![
                CycleKey::new("Março", "S1"),
                CycleKey::new("Março", "S2"),
                CycleKey::new("Abril", "S1"),
            ],
        }
    }

    fn totals_for<'a>(totals: &'a [StoreTotals], key: &str) -> &'a StoreTotals {
        totals.iter().find(|t| t.store.key == key).unwrap()
    }

    #[test]
    fn sums_periods_and_counts_cycle_scoped_once() {
        let totals = aggregate(&dataset(), "Março", &PeriodSelection::All, UnscoredPolicy::Zero);
        assert_eq!(totals.len(), 2);

        let a = totals_for(&totals, "A");
        assert_eq!(a.competitive[0].value, Some(25.0));
        assert_eq!(a.competitive[1].value, Some(50.0));
        assert_eq!(a.wildcard[0].value, Some(5.0));
        assert_eq!(a.scalar_total, 75.0);
    }

    #[test]
    fn wildcard_only_store_totals_zero() {
        let totals = aggregate(&dataset(), "Março", &PeriodSelection::All, UnscoredPolicy::Zero);
        let b = totals_for(&totals, "B");
        assert_eq!(b.scalar_total, 0.0);
        assert_eq!(b.wildcard[0].value, Some(40.0));
        assert_eq!(b.competitive[0].value, Some(0.0));
    }

    #[test]
    fn keep_policy_preserves_unscored_stages() {
        let totals = aggregate(&dataset(), "Março", &PeriodSelection::All, UnscoredPolicy::Keep);
        let b = totals_for(&totals, "B");
        assert_eq!(b.competitive[0].value, None);
        assert_eq!(b.competitive[1].value, None);
        assert_eq!(b.scalar_total, 0.0);
    }

    #[test]
    fn period_subset_filters_rows() {
        let totals = aggregate(
            &dataset(),
            "Março",
            &PeriodSelection::single("S2"),
            UnscoredPolicy::Zero,
        );
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].scalar_total, 65.0);
    }

    #[test]
    fn unknown_cycle_or_period_is_empty() {
        let data = dataset();
        assert!(aggregate(&data, "Junho", &PeriodSelection::All, UnscoredPolicy::Zero).is_empty());
        assert!(
            aggregate(&data, "Março", &PeriodSelection::single("S9"), UnscoredPolicy::Zero)
                .is_empty()
        );
        assert!(
            aggregate(&Dataset::default(), "Março", &PeriodSelection::All, UnscoredPolicy::Zero)
                .is_empty()
        );
    }
}
