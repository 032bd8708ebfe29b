use std::io;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use circuit_standings::report;
use circuit_standings::sheets::load_stage_sheets;
use circuit_standings::{
    ingest, CircuitConfig, DurationUnit, Engine, PeriodSelection, Query, TargetStrategy,
};

#[derive(Parser)]
#[command(name = "circuit-standings")]
#[command(about = "Consolidates circuit stage sheets and ranks stores", long_about = None)]
struct Cli {
    /// Directory holding one CSV file per stage
    #[arg(long, global = true, default_value = ".")]
    data: PathBuf,
    /// Circuit configuration (JSON); the built-in stage list is used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Selection {
    /// Cycle to rank; defaults to the latest cycle in the data
    #[arg(long)]
    cycle: Option<String>,
    /// Period to include, repeatable; omit or pass ALL for the whole cycle
    #[arg(long = "period")]
    periods: Vec<String>,
    /// Overrides the configured target strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
    /// Reference date for the elapsed-time baseline (YYYY-MM-DD)
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    WeightBudget,
    DurationDays,
    DurationHours,
}

#[derive(Subcommand)]
enum Commands {
    /// List the cycles and periods found in the data
    Periods,
    /// Print the full classification
    Rank {
        #[command(flatten)]
        selection: Selection,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Print the standings as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the stores that crossed the finish line
    Podium {
        #[command(flatten)]
        selection: Selection,
    },
    /// Print the best stores of one stage
    Stage {
        #[command(flatten)]
        selection: Selection,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print one store's standing and stage breakdown
    Store {
        #[command(flatten)]
        selection: Selection,
        #[arg(long)]
        name: String,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        selection: Selection,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Precompute the standings of every period
    Warm {
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = match &cli.config {
        Some(path) => CircuitConfig::load(path)
            .with_context(|| format!("failed to load circuit config {}", path.display()))?,
        None => CircuitConfig::default(),
    };
    let today = config.local_date(Utc::now())?;

    let sheets = load_stage_sheets(&cli.data, &config);
    let dataset = ingest(&sheets);
    if dataset.is_empty() {
        println!("No stage data found in {}.", cli.data.display());
        return Ok(());
    }
    let mut engine = Engine::new(dataset).with_unscored_policy(config.unscored);

    match cli.command {
        Commands::Periods => {
            for cycle in engine.dataset().cycles() {
                println!("{cycle}: {}", engine.dataset().periods_of(cycle).join(", "));
            }
        }
        Commands::Rank {
            selection,
            limit,
            json,
        } => {
            let query = build_query(&engine, &config, &selection, today)?;
            let board = engine.leaderboard(&query);

            if json {
                println!("{}", serde_json::to_string_pretty(&*board)?);
                return Ok(());
            }
            if board.is_empty() {
                println!("No stores scored for this selection.");
                return Ok(());
            }

            println!(
                "Standings for {} (target {:.1}):",
                report::period_caption(engine.dataset(), &board.cycle, &board.periods),
                board.target
            );
            for score in board.scores.iter().take(limit) {
                println!(
                    "- #{} {} total {:.1} position {:.1} progress {:.1}% remaining {:.1}",
                    score.rank,
                    score.store.name,
                    score.scalar_total,
                    score.position,
                    score.progress_pct,
                    score.remaining
                );
            }
        }
        Commands::Podium { selection } => {
            let query = build_query(&engine, &config, &selection, today)?;
            let board = engine.leaderboard(&query);
            let podium = board.podium();

            if podium.entries.is_empty() {
                println!("No stores scored for this selection.");
            } else if !podium.crossed_finish {
                println!("No store crossed the finish line. Current top 3:");
            } else {
                println!("Stores past the finish line:");
            }
            for entry in &podium.entries {
                println!(
                    "- #{} {} {:.1} ({:.1}%) {:?}",
                    entry.rank, entry.store.name, entry.position, entry.progress_pct, entry.prize
                );
            }
        }
        Commands::Stage {
            selection,
            name,
            limit,
        } => {
            let query = build_query(&engine, &config, &selection, today)?;
            let board = engine.leaderboard(&query);
            let leaders = board.stage_leaders(&name, limit);

            if leaders.is_empty() {
                println!("No data for stage {name} in this selection.");
                return Ok(());
            }
            println!("Top {} for stage {name}:", leaders.len());
            for (store, value) in leaders {
                match value {
                    Some(value) => println!("- {} {:.1}", store.name, value),
                    None => println!("- {} not scored", store.name),
                }
            }
        }
        Commands::Store { selection, name } => {
            let query = build_query(&engine, &config, &selection, today)?;
            let board = engine.leaderboard(&query);
            let Some(score) = board.store(&name) else {
                println!("Store {name} has no standing in this selection.");
                return Ok(());
            };

            println!(
                "{} rank #{} total {:.1} progress {:.1}%",
                score.store.name, score.rank, score.scalar_total, score.progress_pct
            );
            for stage in score.competitive.iter() {
                println!("- {}: {}", stage.stage, format_value(stage.value));
            }
            for stage in score.wildcard.iter() {
                println!("- {} (wildcard): {}", stage.stage, format_value(stage.value));
            }
        }
        Commands::Report { selection, out } => {
            let query = build_query(&engine, &config, &selection, today)?;
            let board = engine.leaderboard(&query);
            let report = report::build_report(&config.title, engine.dataset(), &board);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Warm { strategy, as_of } => {
            let strategy = resolve_strategy(&config, strategy);
            let primed = engine.warm_all_periods(strategy, as_of.unwrap_or(today));
            println!("Primed {primed} period standings.");
        }
    }

    Ok(())
}

fn resolve_strategy(config: &CircuitConfig, arg: Option<StrategyArg>) -> TargetStrategy {
    let configured = config.target_strategy();
    let season_year = match configured {
        TargetStrategy::Duration { season_year, .. } => season_year,
        TargetStrategy::WeightBudget => config.season_year,
    };
    match arg {
        None => configured,
        Some(StrategyArg::WeightBudget) => TargetStrategy::WeightBudget,
        Some(StrategyArg::DurationDays) => TargetStrategy::Duration {
            unit: DurationUnit::Days,
            season_year,
        },
        Some(StrategyArg::DurationHours) => TargetStrategy::Duration {
            unit: DurationUnit::Hours,
            season_year,
        },
    }
}

fn build_query(
    engine: &Engine,
    config: &CircuitConfig,
    selection: &Selection,
    today: NaiveDate,
) -> anyhow::Result<Query> {
    let cycle = match &selection.cycle {
        Some(cycle) => cycle.clone(),
        None => engine
            .dataset()
            .cycles()
            .last()
            .map(|cycle| cycle.to_string())
            .context("no cycles found in the data")?,
    };

    Ok(Query::new(
        cycle,
        PeriodSelection::from_labels(&selection.periods),
        selection.as_of.unwrap_or(today),
    )
    .with_strategy(resolve_strategy(config, selection.strategy)))
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "not scored".to_string(), |v| format!("{v:.1}"))
}
