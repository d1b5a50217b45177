//! # trueno-design: Design/Response Matrices for Network Inference
//!
//! **Version**: 0.1.0
//!
//! trueno-design turns time-course and steady-state gene-expression
//! measurements plus experiment metadata into two aligned matrices:
//!
//! - **design**: predictor-side expression snapshot per assembled sample
//! - **response**: equal to design for steady-state samples, a
//!   finite-difference estimate `x(t) + tau · dx/dt` for time-series samples
//!
//! ## Pipeline
//!
//! ```text
//! raw metadata ──> normalize ──> segment ──> assemble ──> (design, response)
//!                     │             │            │
//!               schema mapping  gap breaking  finite differences
//!               column checks   roles/cycles  column alignment
//! ```
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke**: fail closed on unknown columns, dangling links and cycles
//! - **Jidoka**: no partial output; every failure aborts the whole computation
//! - **Heijunka**: pure functions, no shared state between invocations
//!
//! ## Example Usage
//!
//! ```rust
//! use arrow::array::StringArray;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use std::sync::Arc;
//! use trueno_design::{DesignResponseCalculator, DesignResponseConfig, ExpressionTable};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let expression = ExpressionTable::from_columns(
//!     "gene",
//!     vec!["g1".to_string()],
//!     vec![("A".to_string(), vec![2.0]), ("B".to_string(), vec![4.0])],
//! )?;
//!
//! let metadata = RecordBatch::try_new(
//!     Arc::new(Schema::new(vec![
//!         Field::new("condName", DataType::Utf8, false),
//!         Field::new("prevCol", DataType::Utf8, true),
//!         Field::new("del.t", DataType::Utf8, true),
//!     ])),
//!     vec![
//!         Arc::new(StringArray::from(vec!["A", "B"])),
//!         Arc::new(StringArray::from(vec![None, Some("A")])),
//!         Arc::new(StringArray::from(vec![None, Some("10")])),
//!     ],
//! )?;
//!
//! let calculator = DesignResponseCalculator::new(DesignResponseConfig::default())?;
//! let result = calculator.calculate(&metadata, &expression)?;
//! assert_eq!(result.column_names(), vec!["A"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod assembly;
pub mod config;
pub mod error;
pub mod expression;
pub mod metadata;
pub mod segmentation;
pub mod storage;

pub use assembly::DesignResponse;
pub use config::{DesignResponseConfig, TerminalPolicy};
pub use error::{Error, ErrorKind, Result};
pub use expression::ExpressionTable;
pub use metadata::{FirstLast, MetadataColumn, SampleRecord};
pub use segmentation::{SampleRole, Segment, Segmentation};

use arrow::record_batch::RecordBatch;
use tracing::info;

/// Design/response calculator bound to one validated configuration.
///
/// Holds no tables and no file paths; every call is independent.
#[derive(Debug, Clone, Copy)]
pub struct DesignResponseCalculator {
    config: DesignResponseConfig,
}

impl DesignResponseCalculator {
    /// Create a calculator
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a parameter is out of range
    pub fn new(config: DesignResponseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &DesignResponseConfig {
        &self.config
    }

    /// Normalize and segment metadata without assembling matrices.
    ///
    /// # Errors
    ///
    /// Returns any normalization or segmentation error
    pub fn segment(
        &self,
        metadata: &RecordBatch,
        expression: &ExpressionTable,
    ) -> Result<Segmentation> {
        let records = crate::metadata::normalize(metadata, expression)?;
        crate::segmentation::segment(records, self.config.delta_t_max(), self.config.delta_t_min())
    }

    /// Compute design and response matrices.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Metadata columns or values are invalid
    /// - A metadata condition is missing from the expression table
    /// - Predecessor links dangle or form a cycle
    /// - A time delta is zero after flooring
    #[tracing::instrument(skip_all, fields(
        delta_t_min = self.config.delta_t_min(),
        delta_t_max = self.config.delta_t_max(),
        tau = self.config.tau()
    ))]
    pub fn calculate(
        &self,
        metadata: &RecordBatch,
        expression: &ExpressionTable,
    ) -> Result<DesignResponse> {
        let segmentation = self.segment(metadata, expression)?;
        let result = crate::assembly::assemble(
            &segmentation,
            expression,
            self.config.tau(),
            self.config.terminal_policy(),
        )?;
        info!(
            steady_state = segmentation.count(SampleRole::SteadyState),
            segments = segmentation.segments().len(),
            pairs = result.num_pairs(),
            "design/response computed"
        );
        Ok(result)
    }
}

/// Compute design and response matrices in one call.
///
/// Equivalent to `DesignResponseCalculator::new(*config)?.calculate(..)`.
///
/// # Errors
///
/// Returns any configuration, validation or assembly error
pub fn calculate_design_and_response(
    metadata: &RecordBatch,
    expression: &ExpressionTable,
    config: &DesignResponseConfig,
) -> Result<DesignResponse> {
    DesignResponseCalculator::new(*config)?.calculate(metadata, expression)
}
