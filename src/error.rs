//! Error types for trueno-design
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People).
//! Every validation failure names the offending conditions so the metadata
//! table can be fixed without re-running under a debugger.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input data violates a precondition (metadata, expression table)
    Validation,
    /// Missing or malformed parameters
    Configuration,
    /// Reading or writing tables failed
    Io,
}

/// trueno-design error types
#[derive(Error, Debug)]
pub enum Error {
    /// Conditions referenced in metadata but absent from the expression table
    #[error(
        "Conditions in metadata but missing from expression table: {}",
        .conditions.join(", ")
    )]
    MissingConditions {
        /// Missing condition names, in metadata order
        conditions: Vec<String>,
    },

    /// Metadata column with no entry in the schema mapping
    #[error("Unknown metadata column: {0:?}\nExpected one of: condName, isTs, is1stLast, prevCol, del.t")]
    UnknownMetadataColumn(String),

    /// Metadata column given more than once
    #[error("Duplicate metadata column: {0:?}")]
    DuplicateMetadataColumn(String),

    /// Required metadata column absent
    #[error("Missing required metadata column: {0:?}")]
    MissingMetadataColumn(String),

    /// Metadata cell that cannot be parsed
    #[error("Invalid value {value:?} in metadata column {column:?} for condition {condition:?}")]
    InvalidMetadataValue {
        /// Condition of the offending row (row number if the name itself is missing)
        condition: String,
        /// Source column name
        column: String,
        /// Raw cell text
        value: String,
    },

    /// Condition listed more than once in metadata
    #[error("Duplicate condition in metadata: {0:?}")]
    DuplicateCondition(String),

    /// Predecessor references naming unknown conditions
    #[error(
        "Dangling predecessor reference(s): {}\nprevCol names a condition that is not in the metadata",
        .references.join(", ")
    )]
    DanglingPredecessor {
        /// Unknown predecessor names, in metadata order
        references: Vec<String>,
    },

    /// Predecessor links forming a cycle
    #[error("Cyclic predecessor chain: {}", .cycle.join(" -> "))]
    CyclicPredecessor {
        /// Conditions on the cycle, in link order
        cycle: Vec<String>,
    },

    /// Linked sample without a time delta
    #[error("Condition {condition:?} has a predecessor but no del.t")]
    MissingTimeDelta {
        /// Offending condition
        condition: String,
    },

    /// Zero effective time delta (del.t and delta_t_min both zero)
    #[error("Zero time delta between {from:?} and {to:?}\nSet delta_t_min > 0 to floor coincident samples")]
    DegenerateTimeDelta {
        /// Earlier sample
        from: String,
        /// Later sample
        to: String,
    },

    /// Expression table does not have the expected layout
    #[error("Invalid expression table: {0}")]
    InvalidExpressionTable(String),

    /// Invalid configuration parameter
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage error (CSV/Parquet adapters)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Malformed JSON configuration
    #[error("Configuration error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Classify the error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::Json(_) => ErrorKind::Configuration,
            Self::StorageError(_) | Self::Io(_) | Self::Arrow(_) => ErrorKind::Io,
            Self::MissingConditions { .. }
            | Self::UnknownMetadataColumn(_)
            | Self::DuplicateMetadataColumn(_)
            | Self::MissingMetadataColumn(_)
            | Self::InvalidMetadataValue { .. }
            | Self::DuplicateCondition(_)
            | Self::DanglingPredecessor { .. }
            | Self::CyclicPredecessor { .. }
            | Self::MissingTimeDelta { .. }
            | Self::DegenerateTimeDelta { .. }
            | Self::InvalidExpressionTable(_) => ErrorKind::Validation,
        }
    }
}
