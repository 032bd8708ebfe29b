use std::fmt::Write;

use crate::models::{Dataset, Leaderboard, PeriodSelection, PrizeTier};
use crate::target::stage_weights;

#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub stage: String,
    pub wildcard: bool,
    pub scored_stores: usize,
    pub average: f64,
    pub weight: Option<f64>,
}

pub fn summarize_stages(dataset: &Dataset, board: &Leaderboard) -> Vec<StageSummary> {
    let weights = stage_weights(dataset, &board.cycle, &board.periods);

    dataset
        .stages
        .iter()
        .map(|stage| {
            let values: Vec<f64> = board
                .scores
                .iter()
                .filter_map(|score| score.stage_value(&stage.name).flatten())
                .collect();
            StageSummary {
                stage: stage.name.clone(),
                wildcard: stage.wildcard,
                scored_stores: values.len(),
                average: if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                },
                weight: weights.get(&stage.name).copied(),
            }
        })
        .collect()
}

pub fn period_caption(dataset: &Dataset, cycle: &str, periods: &PeriodSelection) -> String {
    match dataset.period_range(cycle, periods) {
        Some((first, last)) if first == last => format!("{cycle} - {first}"),
        Some((first, last)) => format!("{cycle} - {first} → {last}"),
        None => "period not set".to_string(),
    }
}

fn prize_label(prize: PrizeTier) -> &'static str {
    match prize {
        PrizeTier::Gold => "Bônus Ouro + Folga",
        PrizeTier::Silver => "Bônus Prata",
        PrizeTier::Bronze => "Bônus Bronze",
        PrizeTier::Recognition => "Reconhecimento + Plano de Ação",
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

pub fn build_report(title: &str, dataset: &Dataset, board: &Leaderboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {title}");
    let _ = writeln!(
        output,
        "Standings for {} (target {:.1}, {} strategy)",
        period_caption(dataset, &board.cycle, &board.periods),
        board.target,
        board.strategy
    );
    if board.baseline > 0.0 {
        let _ = writeln!(output, "Elapsed baseline: {:.1}", board.baseline);
    }
    if board.target_fallback {
        let _ = writeln!(output, "No target configured; the leader's position stands in.");
    }

    if board.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No stores scored for this selection.");
        return output;
    }

    if let Some(leader) = board.leader() {
        let _ = writeln!(
            output,
            "Leader: {} at {:.1}%",
            leader.store.name, leader.progress_pct
        );
    }

    let podium = board.podium();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Podium");
    if podium.crossed_finish {
        for entry in &podium.entries {
            let _ = writeln!(
                output,
                "- #{} {}: {:.1} ({:.1}%) - {}",
                entry.rank,
                entry.store.name,
                entry.position,
                entry.progress_pct,
                prize_label(entry.prize)
            );
        }
    } else {
        let _ = writeln!(output, "No store crossed the finish line. Current top 3:");
        for entry in &podium.entries {
            let _ = writeln!(
                output,
                "- #{} {}: {:.1} ({:.1}%)",
                entry.rank, entry.store.name, entry.position, entry.progress_pct
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Classification");
    let competitive: Vec<&str> = board.scores[0]
        .competitive
        .iter()
        .map(|s| s.stage.as_str())
        .collect();
    let wildcard: Vec<&str> = board.scores[0]
        .wildcard
        .iter()
        .map(|s| s.stage.as_str())
        .collect();

    let mut header = String::from("| Rank | Store |");
    for stage in &competitive {
        let _ = write!(header, " {stage} |");
    }
    header.push_str(" Total | Progress | Remaining |");
    for stage in &wildcard {
        let _ = write!(header, " {stage} (wildcard) |");
    }
    let columns = header.matches('|').count() - 1;
    let _ = writeln!(output, "{header}");
    let _ = writeln!(output, "|{}", "---|".repeat(columns));

    for score in &board.scores {
        let mut line = format!("| {} | {} |", score.rank, score.store.name);
        for stage in &score.competitive {
            let _ = write!(line, " {} |", cell(stage.value));
        }
        let _ = write!(
            line,
            " {:.1} | {:.1}% | {:.1} |",
            score.position, score.progress_pct, score.remaining
        );
        for stage in &score.wildcard {
            let _ = write!(line, " {} |", cell(stage.value));
        }
        let _ = writeln!(output, "{line}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Stage Mix");
    for summary in summarize_stages(dataset, board) {
        let weight = summary
            .weight
            .map_or_else(|| "no weight".to_string(), |w| format!("weight {w:.1}"));
        let kind = if summary.wildcard { ", wildcard" } else { "" };
        let _ = writeln!(
            output,
            "- {}{}: {} stores scored (avg {:.1}, {})",
            summary.stage, kind, summary.scored_stores, summary.average, weight
        );
    }

    output
}
