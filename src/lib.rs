//! Standings engine for a multi-stage store incentive circuit.
//!
//! Stage sheets are consolidated into one table per (store, cycle, period), a finish
//! line is resolved for the selected cycle and periods, and stores are ranked by their
//! competitive total against it.

pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod models;
pub mod rank;
pub mod report;
pub mod score;
pub mod sheets;
pub mod target;

pub use config::CircuitConfig;
pub use engine::{compute_leaderboard, Engine, Query};
pub use ingest::{ingest, ColumnNames, RowSet, StageSheet};
pub use models::{Dataset, Leaderboard, PeriodSelection, Stage, ALL_PERIODS};
pub use score::UnscoredPolicy;
pub use target::{DurationUnit, TargetStrategy};
