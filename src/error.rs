use thiserror::Error;

/// Why a single stage sheet was left out of a dataset load.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("stage {stage} has no header row")]
    EmptySheet { stage: String },
    #[error("stage {stage} is missing required column {column}")]
    MissingColumn { stage: String, column: &'static str },
    #[error("stage {stage} was supplied more than once")]
    Duplicate { stage: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read circuit config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid circuit config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("circuit config lists no stages")]
    NoStages,
    #[error("stage {0} is listed more than once")]
    DuplicateStage(String),
    #[error("utc offset of {0} hours is out of range")]
    InvalidOffset(i32),
}
