//! Central error type. One variant per failure class the operator can see.

use thiserror::Error;

/// Convenience result alias used across the workspace.
pub type Result<T> = std::result::Result<T, OfferwatchError>;

/// All Offerwatch errors.
///
/// Candidate-scoped variants (`TemplateNotFound`, `Render`, `Transport`)
/// are caught at the dispatcher boundary and become `Failed` ledger
/// outcomes. `SourceRead`, `Schema`, and `Ledger` abort the current cycle.
#[derive(Debug, Error)]
pub enum OfferwatchError {
    /// The data source could not be read (missing, locked, malformed).
    #[error("source read: {0}")]
    SourceRead(String),

    /// The data source header is missing required columns.
    #[error("schema: {0}")]
    Schema(String),

    /// A role has neither its own template nor a `default` entry.
    #[error("no template for role '{0}' and no default entry")]
    TemplateNotFound(String),

    /// Template rendering failed.
    #[error("render: {0}")]
    Render(String),

    /// The transport rejected or could not deliver a message.
    #[error("transport: {0}")]
    Transport(String),

    /// The audit ledger could not be written. Fatal to the cycle: losing
    /// the record of an attempted send risks a duplicate on the next run.
    #[error("ledger: {0}")]
    Ledger(String),

    /// Configuration could not be read or parsed.
    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
