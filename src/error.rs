use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlSyncError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Failed to prepare statement: {0}")]
    PrepareError(String),

    #[error(
        "Parameter count mismatch: statement needs {needed} positional values, {remaining} remain"
    )]
    ParameterCountMismatch { needed: usize, remaining: usize },

    #[error("Parameter binding error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    StepError(String),

    #[error("Failed to finalize statement: {0}")]
    FinalizeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlSyncError {
    /// True when the error came from stepping a statement (constraint violations and the like).
    #[must_use]
    pub fn is_step_error(&self) -> bool {
        matches!(self, SqlSyncError::StepError(_))
    }
}

impl From<serde_json::Error> for SqlSyncError {
    fn from(err: serde_json::Error) -> Self {
        SqlSyncError::ConfigError(format!("invalid options document: {err}"))
    }
}
