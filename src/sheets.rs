use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::CircuitConfig;
use crate::ingest::{RowSet, StageSheet};

/// Reads one CSV table. Semicolon-separated exports are detected from the header line.
pub fn read_table(path: &Path) -> anyhow::Result<RowSet> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

    let header_line = raw.lines().next().unwrap_or("");
    let delimiter = if header_line.matches(';').count() > header_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header row of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("malformed row in {}", path.display()))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    Ok(RowSet { headers, rows })
}

/// Loads every configured stage found in `dir`. Missing or unreadable files only drop
/// their own stage.
pub fn load_stage_sheets(dir: &Path, config: &CircuitConfig) -> Vec<StageSheet> {
    let mut sheets = Vec::new();

    for stage in &config.stages {
        let path = dir.join(stage.file_name());
        if !path.exists() {
            warn!(stage = %stage.name, path = %path.display(), "stage sheet not found");
            continue;
        }

        match read_table(&path) {
            Ok(table) => sheets.push(StageSheet {
                stage: stage.stage(),
                columns: stage.columns.clone(),
                table,
            }),
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(stage = %stage.name, error = %reason, "stage sheet unreadable");
            }
        }
    }

    info!(found = sheets.len(), configured = config.stages.len(), "stage sheets loaded");
    sheets
}
