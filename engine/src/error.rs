//! Error types for the encounter and dice engine.

use thiserror::Error;

/// A dice expression that does not follow the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("dice syntax: {0}")]
    Syntax(String),
}

impl DiceError {
    pub(crate) fn syntax(reason: impl Into<String>) -> Self {
        DiceError::Syntax(reason.into())
    }
}

/// Refusals from roster operations. These are expected outcomes the UI
/// reports as a status line, never panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    /// Index does not address an entry.
    #[error("no entry at index {0}")]
    NoEntry(usize),

    /// Entry has no known maximum HP.
    #[error("hp not available for {0}")]
    HpUnavailable(String),

    /// HP formula missing, malformed or out of bounds.
    #[error("hp formula not supported: {0:?}")]
    FormulaUnsupported(String),

    /// Neither a dex score nor a custom initiative is known.
    #[error("initiative not available for {0}")]
    InitUnavailable(String),

    /// Damage and healing amounts must be positive.
    #[error("invalid amount {0}")]
    InvalidAmount(i64),

    /// Record id not present in the catalog.
    #[error("unknown catalog record {0}")]
    UnknownRecord(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreasureError {
    #[error("invalid cr {0:?}")]
    InvalidCr(String),

    #[error("count must be >= 1, got {0}")]
    InvalidCount(usize),

    #[error("no catalog entries match {0}")]
    NoCandidates(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("no {0} found in catalog")]
    Empty(&'static str),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml error on {name}: {source}")]
    Yaml {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
}
