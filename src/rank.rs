use std::cmp::Ordering;

use crate::models::{AggregatedScore, Leaderboard, Podium, PodiumEntry, PrizeTier, Store};
use crate::score::StoreTotals;
use crate::target::{Resolution, TargetStrategy};

const FALLBACK_PODIUM_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub scores: Vec<AggregatedScore>,
    pub target: f64,
    pub target_fallback: bool,
}

/// Dense rank, best position first. Without a target the best position stands in.
pub fn rank_stores(
    totals: Vec<StoreTotals>,
    strategy: &TargetStrategy,
    resolution: Resolution,
) -> Ranking {
    let mut positioned: Vec<(StoreTotals, f64)> = totals
        .into_iter()
        .map(|totals| {
            let position = strategy.position(totals.scalar_total, resolution);
            (totals, position)
        })
        .collect();

    let (target, target_fallback) = if resolution.target > 0.0 {
        (resolution.target, false)
    } else {
        let best = positioned.iter().map(|(_, p)| *p).fold(0.0, f64::max);
        (best, true)
    };

    positioned.sort_by(|(a, pa), (b, pb)| {
        pb.partial_cmp(pa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.store.name.cmp(&b.store.name))
            .then_with(|| a.store.key.cmp(&b.store.key))
    });

    let mut rank = 0;
    let mut previous: Option<f64> = None;
    let scores = positioned
        .into_iter()
        .map(|(totals, position)| {
            if previous != Some(position) {
                rank += 1;
                previous = Some(position);
            }
            AggregatedScore {
                store: totals.store,
                competitive: totals.competitive,
                wildcard: totals.wildcard,
                scalar_total: totals.scalar_total,
                position,
                target,
                progress_pct: progress_pct(position, target),
                remaining: (target - position).max(0.0),
                rank,
            }
        })
        .collect();

    Ranking {
        scores,
        target,
        target_fallback,
    }
}

pub fn progress_pct(position: f64, target: f64) -> f64 {
    if target > 0.0 {
        position / target * 100.0
    } else {
        0.0
    }
}

pub fn prize_tier(rank: u32) -> PrizeTier {
    match rank {
        1 => PrizeTier::Gold,
        2 | 3 => PrizeTier::Silver,
        4 | 5 => PrizeTier::Bronze,
        _ => PrizeTier::Recognition,
    }
}

impl AggregatedScore {
    pub fn finished(&self) -> bool {
        self.progress_pct >= 100.0
    }

    pub fn stage_value(&self, stage: &str) -> Option<Option<f64>> {
        self.competitive
            .iter()
            .chain(&self.wildcard)
            .find(|score| score.stage == stage)
            .map(|score| score.value)
    }
}

impl Leaderboard {
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn finishers(&self) -> impl Iterator<Item = &AggregatedScore> {
        self.scores.iter().filter(|score| score.finished())
    }

    /// Stores that crossed the finish line, or the current top three when none did.
    pub fn podium(&self) -> Podium {
        let finishers: Vec<&AggregatedScore> = self.finishers().collect();
        let crossed_finish = !finishers.is_empty();
        let chosen = if crossed_finish {
            finishers
        } else {
            self.scores.iter().take(FALLBACK_PODIUM_SIZE).collect()
        };

        Podium {
            crossed_finish,
            entries: chosen
                .into_iter()
                .map(|score| PodiumEntry {
                    rank: score.rank,
                    store: score.store.clone(),
                    position: score.position,
                    progress_pct: score.progress_pct,
                    prize: prize_tier(score.rank),
                })
                .collect(),
        }
    }

    pub fn leader(&self) -> Option<&AggregatedScore> {
        self.scores.first()
    }

    pub fn store(&self, name_or_key: &str) -> Option<&AggregatedScore> {
        self.scores
            .iter()
            .find(|score| score.store.name == name_or_key)
            .or_else(|| self.scores.iter().find(|score| score.store.key == name_or_key))
    }

    /// Best stores for one stage, unscored stores last.
    pub fn stage_leaders(&self, stage: &str, limit: usize) -> Vec<(&Store, Option<f64>)> {
        let mut leaders: Vec<(&Store, Option<f64>)> = self
            .scores
            .iter()
            .filter_map(|score| Some((&score.store, score.stage_value(stage)?)))
            .collect();

        leaders.sort_by(|(sa, a), (sb, b)| {
            let by_value = match (a, b) {
                (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_value.then_with(|| sa.name.cmp(&sb.name))
        });
        leaders.truncate(limit);
        leaders
    }
}
