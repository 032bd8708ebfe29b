use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::{Dataset, Leaderboard, PeriodSelection};
use crate::rank::rank_stores;
use crate::score::{aggregate, UnscoredPolicy};
use crate::target::TargetStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub cycle: String,
    pub periods: PeriodSelection,
    pub strategy: TargetStrategy,
    /// Reference date for the duration baseline, already in the circuit's time zone.
    pub as_of: NaiveDate,
}

impl Query {
    pub fn new(cycle: impl Into<String>, periods: PeriodSelection, as_of: NaiveDate) -> Self {
        Self {
            cycle: cycle.into(),
            periods,
            strategy: TargetStrategy::WeightBudget,
            as_of,
        }
    }

    pub fn with_strategy(mut self, strategy: TargetStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    cycle: String,
    periods: PeriodSelection,
    strategy: TargetStrategy,
    as_of: Option<NaiveDate>,
}

impl From<&Query> for CacheKey {
    fn from(query: &Query) -> Self {
        Self {
            cycle: query.cycle.clone(),
            periods: query.periods.clone(),
            strategy: query.strategy,
            // Only the duration strategy reads the clock.
            as_of: query.strategy.uses_clock().then_some(query.as_of),
        }
    }
}

pub fn compute_leaderboard(
    dataset: &Dataset,
    query: &Query,
    unscored: UnscoredPolicy,
) -> Leaderboard {
    let totals = aggregate(dataset, &query.cycle, &query.periods, unscored);
    if totals.is_empty() {
        return Leaderboard {
            cycle: query.cycle.clone(),
            periods: query.periods.clone(),
            strategy: query.strategy.label().to_string(),
            target: 0.0,
            baseline: 0.0,
            target_fallback: false,
            scores: Vec::new(),
        };
    }

    let resolution = query
        .strategy
        .resolve_target(dataset, &query.cycle, &query.periods, query.as_of);
    let ranking = rank_stores(totals, &query.strategy, resolution);

    Leaderboard {
        cycle: query.cycle.clone(),
        periods: query.periods.clone(),
        strategy: query.strategy.label().to_string(),
        target: ranking.target,
        baseline: resolution.baseline,
        target_fallback: ranking.target_fallback,
        scores: ranking.scores,
    }
}

/// One dataset snapshot plus memoized standings. Not synchronised.
#[derive(Debug, Default)]
pub struct Engine {
    dataset: Dataset,
    unscored: UnscoredPolicy,
    generation: u64,
    cache: HashMap<CacheKey, Arc<Leaderboard>>,
}

impl Engine {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            ..Self::default()
        }
    }

    pub fn with_unscored_policy(mut self, unscored: UnscoredPolicy) -> Self {
        self.unscored = unscored;
        self.cache.clear();
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn load(&mut self, dataset: Dataset) {
        let dropped = self.cache.len();
        self.dataset = dataset;
        self.cache.clear();
        self.generation += 1;
        info!(generation = self.generation, dropped, "dataset snapshot replaced");
    }

    pub fn leaderboard(&mut self, query: &Query) -> Arc<Leaderboard> {
        let key = CacheKey::from(query);
        if let Some(hit) = self.cache.get(&key) {
            debug!(cycle = %query.cycle, "standings served from cache");
            return Arc::clone(hit);
        }

        debug!(cycle = %query.cycle, strategy = query.strategy.label(), "computing standings");
        let board = Arc::new(compute_leaderboard(&self.dataset, query, self.unscored));
        self.cache.insert(key, Arc::clone(&board));
        board
    }

    pub fn warm_all_periods(&mut self, strategy: TargetStrategy, as_of: NaiveDate) -> usize {
        let keys = self.dataset.periods.clone();
        for key in &keys {
            let periods = PeriodSelection::single(key.period.clone());
            let query = Query::new(key.cycle.clone(), periods, as_of).with_strategy(strategy);
            self.leaderboard(&query);
        }
        info!(primed = keys.len(), cached = self.cache.len(), "standings cache warmed");
        keys.len()
    }
}
