use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("ledger error: {0}")]
    Ledger(#[from] ballot_ledger::LedgerError),

    #[error("config error: {0}")]
    Config(String),

    #[error("no ledger at {}; run `ballotd init` first", .0.display())]
    NotInitialized(PathBuf),

    #[error("a ledger already exists at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("invalid arguments: {0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
