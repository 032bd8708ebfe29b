use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calendar::{cmp_cycles, cmp_periods, fold};
use crate::error::StageError;
use crate::models::{
    ConsolidatedRow, CycleKey, Dataset, PeriodSelection, ScoreRecord, Stage, StageWeightRecord,
    Store,
};

// Compared against headers after `calendar::fold`.
const STORE_KEY_ALIASES: &[&str] = &["loja_key", "store_key", "loja"];
const STORE_NAME_ALIASES: &[&str] = &["nomeloja", "nome_exibicao", "store_name"];
const CYCLE_ALIASES: &[&str] = &["ciclo", "cycle"];
const PERIOD_ALIASES: &[&str] = &["periodo", "period"];
const SCORE_ALIASES: &[&str] = &["nota", "score", "pontos"];
const WEIGHT_ALIASES: &[&str] = &["pesodaetapa", "peso", "weight"];

/// Per-stage header overrides for sheets that don't use the usual column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub store_key: Option<String>,
    pub store_name: Option<String>,
    pub cycle: Option<String>,
    pub period: Option<String>,
    pub score: Option<String>,
    pub weight: Option<String>,
}

/// A parsed table, cells kept as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct StageSheet {
    pub stage: Stage,
    pub columns: ColumnNames,
    pub table: RowSet,
}

impl StageSheet {
    pub fn new(stage: Stage, table: RowSet) -> Self {
        Self {
            stage,
            columns: ColumnNames::default(),
            table,
        }
    }
}

struct ColumnIndex {
    store_key: usize,
    store_name: usize,
    cycle: usize,
    period: usize,
    score: usize,
    weight: Option<usize>,
}

struct StageLoad {
    records: Vec<ScoreRecord>,
    weighted: bool,
}

/// Merges every usable stage sheet into one dataset. Sheets that cannot be mapped are
/// logged and left out; when none survive the result is an empty dataset.
pub fn ingest(sheets: &[StageSheet]) -> Dataset {
    let mut stages: Vec<Stage> = Vec::new();
    let mut loads: Vec<StageLoad> = Vec::new();

    for sheet in sheets {
        let outcome = if stages.iter().any(|s| s.name == sheet.stage.name) {
            Err(StageError::Duplicate {
                stage: sheet.stage.name.clone(),
            })
        } else {
            read_stage(sheet)
        };

        match outcome {
            Ok(load) => {
                debug!(stage = %sheet.stage.name, rows = load.records.len(), "stage sheet mapped");
                stages.push(sheet.stage.clone());
                loads.push(load);
            }
            Err(err) => warn!(error = %err, "dropping stage from this load"),
        }
    }

    if stages.is_empty() {
        warn!("no usable stage sheets, dataset is empty");
        return Dataset::default();
    }

    let weights = weight_records(&stages, &loads);
    let mut rows = merge(stages.len(), &loads);
    propagate_cycle_scoped(&stages, &mut rows);
    rows.sort_by(row_order);

    let mut periods: Vec<CycleKey> = rows
        .iter()
        .map(|row| CycleKey::new(row.cycle.clone(), row.period.clone()))
        .collect();
    periods.dedup();

    info!(
        stages = stages.len(),
        rows = rows.len(),
        periods = periods.len(),
        "dataset consolidated"
    );

    Dataset {
        stages,
        rows,
        weights,
        periods,
    }
}

fn read_stage(sheet: &StageSheet) -> Result<StageLoad, StageError> {
    let columns = resolve_columns(sheet)?;
    let stage = &sheet.stage.name;
    let mut records = Vec::with_capacity(sheet.table.rows.len());

    for (line, row) in sheet.table.rows.iter().enumerate() {
        let cell = |idx: usize| row.get(idx).map(|value| value.trim()).unwrap_or("");

        let key = cell(columns.store_key);
        let cycle = cell(columns.cycle);
        let period = cell(columns.period);
        if key.is_empty() || cycle.is_empty() || period.is_empty() {
            debug!(stage = %stage, line = line + 2, "skipping row without store, cycle or period");
            continue;
        }
        let name = match cell(columns.store_name) {
            "" => key,
            name => name,
        };

        records.push(ScoreRecord {
            store: Store {
                key: key.to_string(),
                name: name.to_string(),
            },
            stage: stage.clone(),
            cycle: cycle.to_string(),
            period: period.to_string(),
            value: parse_number(cell(columns.score)),
            weight: columns.weight.and_then(|idx| parse_number(cell(idx))),
        });
    }

    Ok(StageLoad {
        records,
        weighted: columns.weight.is_some(),
    })
}

fn resolve_columns(sheet: &StageSheet) -> Result<ColumnIndex, StageError> {
    if sheet.table.headers.is_empty() {
        return Err(StageError::EmptySheet {
            stage: sheet.stage.name.clone(),
        });
    }

    let headers: Vec<String> = sheet.table.headers.iter().map(|h| fold(h)).collect();
    let names = &sheet.columns;
    let required = |column: &'static str, wanted: &Option<String>, aliases: &[&str]| {
        locate(&headers, wanted.as_deref(), aliases).ok_or_else(|| StageError::MissingColumn {
            stage: sheet.stage.name.clone(),
            column,
        })
    };

    Ok(ColumnIndex {
        store_key: required("store key", &names.store_key, STORE_KEY_ALIASES)?,
        store_name: required("store name", &names.store_name, STORE_NAME_ALIASES)?,
        cycle: required("cycle", &names.cycle, CYCLE_ALIASES)?,
        period: required("period", &names.period, PERIOD_ALIASES)?,
        score: required("score", &names.score, SCORE_ALIASES)?,
        weight: locate(&headers, names.weight.as_deref(), WEIGHT_ALIASES),
    })
}

fn locate(headers: &[String], wanted: Option<&str>, aliases: &[&str]) -> Option<usize> {
    match wanted {
        Some(name) => {
            let name = fold(name);
            headers.iter().position(|h| *h == name)
        }
        None => aliases
            .iter()
            .find_map(|alias| headers.iter().position(|h| h == alias)),
    }
}

/// Reads a contribution or weight cell. Blank, textual and non-finite cells are missing.
/// Accepts decimal commas and either thousands separator.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) => trimmed.replace(',', "."),
        _ => trimmed.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn weight_records(stages: &[Stage], loads: &[StageLoad]) -> Vec<StageWeightRecord> {
    let mut sums: BTreeMap<(usize, &str, &str), f64> = BTreeMap::new();

    for (idx, (stage, load)) in stages.iter().zip(loads).enumerate() {
        if stage.wildcard || !load.weighted {
            continue;
        }
        for record in &load.records {
            *sums
                .entry((idx, record.cycle.as_str(), record.period.as_str()))
                .or_default() += record.weight.unwrap_or(0.0);
        }
    }

    let mut records: Vec<(usize, StageWeightRecord)> = sums
        .into_iter()
        .map(|((idx, cycle, period), weight)| {
            (
                idx,
                StageWeightRecord {
                    stage: stages[idx].name.clone(),
                    cycle: cycle.to_string(),
                    period: period.to_string(),
                    weight,
                },
            )
        })
        .collect();

    records.sort_by(|(ia, a), (ib, b)| {
        ia.cmp(ib)
            .then_with(|| cmp_cycles(&a.cycle, &b.cycle))
            .then_with(|| cmp_periods(&a.period, &b.period))
    });
    records.into_iter().map(|(_, record)| record).collect()
}

fn merge(stage_count: usize, loads: &[StageLoad]) -> Vec<ConsolidatedRow> {
    let mut merged: HashMap<(Store, String, String), Vec<Option<f64>>> = HashMap::new();

    for (idx, load) in loads.iter().enumerate() {
        for record in &load.records {
            let values = merged
                .entry((
                    record.store.clone(),
                    record.cycle.clone(),
                    record.period.clone(),
                ))
                .or_insert_with(|| vec![None; stage_count]);

            values[idx] = match (values[idx], record.value) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            };
        }
    }

    merged
        .into_iter()
        .map(|((store, cycle, period), values)| ConsolidatedRow {
            store,
            cycle,
            period,
            values,
        })
        .collect()
}

/// Rewrites each cycle-scoped stage to the largest value seen for the store in that
/// cycle, on every period row of the cycle.
fn propagate_cycle_scoped(stages: &[Stage], rows: &mut [ConsolidatedRow]) {
    for (idx, stage) in stages.iter().enumerate() {
        if !stage.cycle_scoped {
            continue;
        }

        let mut best: HashMap<(Store, String), f64> = HashMap::new();
        for row in rows.iter() {
            if let Some(value) = row.values[idx] {
                best.entry((row.store.clone(), row.cycle.clone()))
                    .and_modify(|current| *current = current.max(value))
                    .or_insert(value);
            }
        }

        for row in rows.iter_mut() {
            row.values[idx] = best.get(&(row.store.clone(), row.cycle.clone())).copied();
        }
        debug!(stage = %stage.name, store_cycles = best.len(), "cycle-scoped stage propagated");
    }
}

fn row_order(a: &ConsolidatedRow, b: &ConsolidatedRow) -> Ordering {
    cmp_cycles(&a.cycle, &b.cycle)
        .then_with(|| cmp_periods(&a.period, &b.period))
        .then_with(|| a.store.name.cmp(&b.store.name))
        .then_with(|| a.store.key.cmp(&b.store.key))
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    /// Cycles in calendar order.
    pub fn cycles(&self) -> Vec<&str> {
        let mut cycles: Vec<&str> = self.periods.iter().map(|key| key.cycle.as_str()).collect();
        cycles.dedup();
        cycles
    }

    pub fn periods_of(&self, cycle: &str) -> Vec<&str> {
        self.periods
            .iter()
            .filter(|key| key.cycle == cycle)
            .map(|key| key.period.as_str())
            .collect()
    }

    pub fn period_labels(&self) -> Vec<String> {
        self.periods.iter().map(CycleKey::label).collect()
    }

    /// First and last selected period of `cycle`, in catalog order.
    pub fn period_range(&self, cycle: &str, selection: &PeriodSelection) -> Option<(&str, &str)> {
        let selected: Vec<&str> = self
            .periods_of(cycle)
            .into_iter()
            .filter(|period| selection.contains(period))
            .collect();
        Some((selected.first().copied()?, selected.last().copied()?))
    }

    /// Total weight each competitive stage carries across the whole dataset, in stage order.
    pub fn stage_weight_totals(&self) -> Vec<(String, f64)> {
        self.stages
            .iter()
            .filter(|stage| !stage.wildcard)
            .filter_map(|stage| {
                let mut records = self.weights.iter().filter(|w| w.stage == stage.name).peekable();
                records.peek()?;
                Some((stage.name.clone(), records.map(|w| w.weight).sum()))
            })
            .collect()
    }
}
