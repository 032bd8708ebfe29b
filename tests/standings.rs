use chrono::NaiveDate;

use circuit_standings::{
    compute_leaderboard, ingest, Dataset, DurationUnit, Engine, Leaderboard, PeriodSelection,
    Query, RowSet, Stage, StageSheet, TargetStrategy, UnscoredPolicy,
};

const HEADERS: [&str; 6] = ["loja_key", "NomeLoja", "Ciclo", "Período", "Nota", "PesoDaEtapa"];

fn sheet(stage: Stage, rows: &[[&str; 6]]) -> StageSheet {
    StageSheet::new(
        stage,
        RowSet {
            headers: HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        },
    )
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
}

fn standings(dataset: &Dataset, cycle: &str, periods: PeriodSelection) -> Leaderboard {
    compute_leaderboard(
        dataset,
        &Query::new(cycle, periods, as_of()),
        UnscoredPolicy::Zero,
    )
}

fn scenario_dataset(c_score: &str) -> Dataset {
    ingest(&[sheet(
        Stage::new("PainelVendas"),
        &[
            ["A", "Loja A", "March", "W1", "120", "100"],
            ["B", "Loja B", "March", "W1", "100", ""],
            ["C", "Loja C", "March", "W1", c_score, ""],
        ],
    )])
}

#[test]
fn three_store_weight_budget_scenario() {
    let board = standings(&scenario_dataset("40"), "March", PeriodSelection::All);

    assert_eq!(board.target, 100.0);
    let rows: Vec<(&str, u32, f64)> = board
        .scores
        .iter()
        .map(|s| (s.store.name.as_str(), s.rank, s.progress_pct))
        .collect();
    assert_eq!(
        rows,
        vec![("Loja A", 1, 120.0), ("Loja B", 2, 100.0), ("Loja C", 3, 40.0)]
    );

    let finishers: Vec<&str> = board.finishers().map(|s| s.store.name.as_str()).collect();
    assert_eq!(finishers, vec!["Loja A", "Loja B"]);
    assert_eq!(board.store("Loja C").map(|s| s.remaining), Some(60.0));
}

#[test]
fn cycle_scoped_scenario_shows_value_on_every_period() {
    let dataset = ingest(&[
        sheet(
            Stage::new("Engajamento").cycle_scoped(),
            &[["X", "Loja X", "March", "W1", "50", ""]],
        ),
        sheet(
            Stage::new("PainelVendas"),
            &[
                ["X", "Loja X", "March", "W1", "5", ""],
                ["X", "Loja X", "March", "W2", "7", ""],
            ],
        ),
    ]);

    for period in ["W1", "W2"] {
        let row = dataset
            .rows
            .iter()
            .find(|row| row.cycle == "March" && row.period == period)
            .unwrap();
        assert_eq!(row.values[0], Some(50.0), "period {period}");
    }

    let board = standings(&dataset, "March", PeriodSelection::All);
    assert_eq!(board.scores[0].scalar_total, 62.0);
}

#[test]
fn empty_cycle_is_an_empty_result() {
    let dataset = scenario_dataset("40");
    let board = standings(&dataset, "April", PeriodSelection::All);
    assert!(board.is_empty());
    assert_eq!(board.target, 0.0);
    assert!(board.podium().entries.is_empty());

    let nothing = standings(&ingest(&[]), "March", PeriodSelection::All);
    assert!(nothing.is_empty());
}

#[test]
fn repeated_queries_are_identical() {
    let dataset = scenario_dataset("40");
    let first = serde_json::to_string(&standings(&dataset, "March", PeriodSelection::All)).unwrap();
    for _ in 0..10 {
        let again =
            serde_json::to_string(&standings(&dataset, "March", PeriodSelection::All)).unwrap();
        assert_eq!(again, first);
    }
}

#[test]
fn equal_totals_order_and_rank_agree() {
    let dataset = ingest(&[sheet(
        Stage::new("PainelVendas"),
        &[
            ["K1", "Zebra", "March", "W1", "30", "100"],
            ["K2", "Alpaca", "March", "W1", "30", ""],
            ["K3", "Mula", "March", "W1", "50", ""],
            ["K4", "Burro", "March", "W1", "30", ""],
            ["K5", "Cabra", "March", "W1", "10", ""],
        ],
    )]);
    let board = standings(&dataset, "March", PeriodSelection::All);

    let rows: Vec<(&str, u32)> = board
        .scores
        .iter()
        .map(|s| (s.store.name.as_str(), s.rank))
        .collect();
    assert_eq!(
        rows,
        vec![("Mula", 1), ("Alpaca", 2), ("Burro", 2), ("Zebra", 2), ("Cabra", 3)]
    );

    let ranks: Vec<u32> = board.scores.iter().map(|s| s.rank).collect();
    let mut distinct = ranks.clone();
    distinct.dedup();
    assert_eq!(distinct, vec![1, 2, 3]);
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn wildcard_only_store_scores_zero_but_stays_visible() {
    let dataset = ingest(&[
        sheet(
            Stage::new("PainelVendas"),
            &[["A", "Loja A", "March", "W1", "80", "100"]],
        ),
        sheet(
            Stage::new("Meta").wildcard(),
            &[
                ["W", "Loja W", "March", "W1", "500", "900"],
                ["A", "Loja A", "March", "W1", "1", "900"],
            ],
        ),
    ]);
    let board = standings(&dataset, "March", PeriodSelection::All);

    assert_eq!(board.target, 100.0);
    let w = board.store("Loja W").unwrap();
    assert_eq!(w.scalar_total, 0.0);
    assert_eq!(w.progress_pct, 0.0);
    assert_eq!(w.rank, 2);
    assert_eq!(w.stage_value("Meta"), Some(Some(500.0)));

    let a = board.store("Loja A").unwrap();
    assert_eq!(a.scalar_total, 80.0);
    assert!(dataset.weights.iter().all(|w| w.stage != "Meta"));
}

#[test]
fn raising_a_contribution_never_hurts() {
    let before = standings(&scenario_dataset("40"), "March", PeriodSelection::All);
    let after = standings(&scenario_dataset("110"), "March", PeriodSelection::All);

    let c_before = before.store("Loja C").unwrap();
    let c_after = after.store("Loja C").unwrap();
    assert_eq!(before.target, after.target);
    assert!(c_after.progress_pct >= c_before.progress_pct);
    assert!(c_after.rank <= c_before.rank);
    assert_eq!(c_after.rank, 2);
}

#[test]
fn finisher_boundary_is_inclusive() {
    let board = standings(&scenario_dataset("99"), "March", PeriodSelection::All);
    let b = board.store("Loja B").unwrap();
    let c = board.store("Loja C").unwrap();

    assert_eq!(b.progress_pct, 100.0);
    assert!(b.finished());
    assert!(!c.finished());

    let podium = board.podium();
    assert!(podium.crossed_finish);
    assert!(podium.entries.iter().all(|e| e.store.name != "Loja C"));
}

#[test]
fn period_subset_uses_its_own_weights() {
    let dataset = ingest(&[sheet(
        Stage::new("PainelVendas"),
        &[
            ["A", "Loja A", "March", "W1", "20", "40"],
            ["A", "Loja A", "March", "W2", "30", "60"],
            ["B", "Loja B", "March", "W2", "60", ""],
        ],
    )]);

    let week_two = standings(&dataset, "March", PeriodSelection::from_labels(["W2"]));
    assert_eq!(week_two.target, 60.0);
    assert_eq!(week_two.scores[0].store.name, "Loja B");
    assert_eq!(week_two.scores[0].progress_pct, 100.0);

    let whole = standings(&dataset, "March", PeriodSelection::from_labels(["ALL"]));
    assert_eq!(whole.target, 100.0);
    assert_eq!(whole.scores[0].store.name, "Loja B");
    assert_eq!(whole.scores[1].scalar_total, 50.0);
}

#[test]
fn duration_strategy_adds_elapsed_days_for_current_month() {
    let dataset = ingest(&[sheet(
        Stage::new("PainelVendas"),
        &[
            ["A", "Loja A", "Março", "S1", "1440", ""],
            ["B", "Loja B", "Março", "S1", "0", ""],
        ],
    )]);
    let strategy = TargetStrategy::Duration {
        unit: DurationUnit::Days,
        season_year: Some(2025),
    };
    let mut engine = Engine::new(dataset);

    let board = engine.leaderboard(
        &Query::new("Março", PeriodSelection::All, as_of()).with_strategy(strategy),
    );
    assert_eq!(board.target, 31.0);
    assert_eq!(board.baseline, 12.0);
    assert_eq!(board.scores[0].position, 13.0);
    assert_eq!(board.scores[1].position, 12.0);
    assert_eq!(board.scores[0].remaining, 18.0);

    let later = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
    let past = engine.leaderboard(
        &Query::new("Março", PeriodSelection::All, later).with_strategy(strategy),
    );
    assert_eq!(past.baseline, 0.0);
    assert_eq!(past.scores[0].position, 1.0);
}
