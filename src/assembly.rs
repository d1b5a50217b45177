//! Matrix Assembler
//!
//! Emits one (design, response) column pair per assembled sample and stacks
//! them into two record batches with a shared column index.
//!
//! ## Response Reconstruction
//!
//! For a sample at time `t` with successor at `t + Δ`:
//!
//! ```text
//! dx/dt    ≈ (x(t + Δ) - x(t)) / Δ
//! response = x(t) + tau · dx/dt
//! ```
//!
//! with `Δ` floored at `delta_t_min`. Steady-state samples have zero
//! derivative, so response = design.
//!
//! Column order follows metadata order; a branching sample emits one pair per
//! successor, in metadata order.

use crate::config::TerminalPolicy;
use crate::expression::ExpressionTable;
use crate::segmentation::{ClassifiedSample, SampleRole, Segmentation};
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tracing::debug;

/// Aligned design and response matrices.
///
/// Both batches carry the expression table's feature column first, followed
/// by one `Float64` column per assembled pair. The two schemas are identical.
#[derive(Debug, Clone)]
pub struct DesignResponse {
    design: RecordBatch,
    response: RecordBatch,
}

impl DesignResponse {
    /// Design matrix (predictor snapshots).
    #[must_use]
    pub const fn design(&self) -> &RecordBatch {
        &self.design
    }

    /// Response matrix (targets).
    #[must_use]
    pub const fn response(&self) -> &RecordBatch {
        &self.response
    }

    /// Shared schema.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.design.schema()
    }

    /// Column labels, excluding the feature column.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.design
            .schema_ref()
            .fields()
            .iter()
            .skip(1)
            .map(|field| field.name().as_str())
            .collect()
    }

    /// Number of assembled pairs.
    #[must_use]
    pub fn num_pairs(&self) -> usize {
        self.design.num_columns() - 1
    }

    /// Number of feature rows.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.design.num_rows()
    }

    /// Split into `(design, response)`.
    #[must_use]
    pub fn into_parts(self) -> (RecordBatch, RecordBatch) {
        (self.design, self.response)
    }
}

/// One assembled column pair
struct ColumnPair {
    label: String,
    design: ArrayRef,
    response: ArrayRef,
}

/// Build design and response matrices from a segmentation.
///
/// # Errors
///
/// Returns error if:
/// - A sample has no expression column ([`Error::MissingConditions`])
/// - A link has zero effective time delta ([`Error::DegenerateTimeDelta`])
#[tracing::instrument(skip_all, fields(samples = segmentation.samples().len(), tau = tau))]
pub fn assemble(
    segmentation: &Segmentation,
    expression: &ExpressionTable,
    tau: f64,
    terminal_policy: TerminalPolicy,
) -> Result<DesignResponse> {
    let samples = segmentation.samples();
    let mut pairs = Vec::with_capacity(samples.len());

    for sample in samples {
        let current = lookup(expression, sample.condition_name())?;

        match sample.role() {
            role if role.has_successor() => {
                for &next_idx in sample.successors() {
                    let next = &samples[next_idx];
                    let delta_t = effective_delta_t(sample, next, segmentation.delta_t_min())?;
                    let next_values = lookup(expression, next.condition_name())?;
                    let response = finite_difference(current, next_values, tau, delta_t)?;
                    pairs.push(ColumnPair {
                        label: sample.condition_name().to_string(),
                        design: Arc::clone(current),
                        response,
                    });
                }
            }
            SampleRole::SeriesTail if terminal_policy == TerminalPolicy::Exclude => {}
            _ => pairs.push(steady_pair(sample, current)),
        }
    }

    let result = build_matrices(expression, pairs)?;
    debug!(
        pairs = result.num_pairs(),
        features = result.num_features(),
        "design/response assembled"
    );
    Ok(result)
}

fn lookup<'a>(expression: &'a ExpressionTable, condition: &str) -> Result<&'a ArrayRef> {
    expression
        .column(condition)
        .ok_or_else(|| Error::MissingConditions {
            conditions: vec![condition.to_string()],
        })
}

fn steady_pair(sample: &ClassifiedSample, current: &ArrayRef) -> ColumnPair {
    ColumnPair {
        label: sample.condition_name().to_string(),
        design: Arc::clone(current),
        response: Arc::clone(current),
    }
}

/// `max(delta_t, delta_t_min)`, rejecting a zero denominator.
fn effective_delta_t(
    sample: &ClassifiedSample,
    next: &ClassifiedSample,
    delta_t_min: f64,
) -> Result<f64> {
    let delta_t = next
        .record()
        .delta_t()
        .ok_or_else(|| Error::MissingTimeDelta {
            condition: next.condition_name().to_string(),
        })?
        .max(delta_t_min);

    if delta_t > 0.0 {
        Ok(delta_t)
    } else {
        Err(Error::DegenerateTimeDelta {
            from: sample.condition_name().to_string(),
            to: next.condition_name().to_string(),
        })
    }
}

/// `x(t) + (tau / Δ) · (x(t + Δ) - x(t))`, elementwise; nulls propagate.
fn finite_difference(
    current: &ArrayRef,
    next: &ArrayRef,
    tau: f64,
    delta_t: f64,
) -> Result<ArrayRef> {
    let current = as_f64(current)?;
    let next = as_f64(next)?;
    let scale = tau / delta_t;

    let response: Float64Array = current
        .iter()
        .zip(next.iter())
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(scale.mul_add(y - x, x)),
            _ => None,
        })
        .collect();

    Ok(Arc::new(response))
}

fn as_f64(array: &ArrayRef) -> Result<&Float64Array> {
    array
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| {
            Error::InvalidExpressionTable(format!(
                "expected Float64 column, found {:?}",
                array.data_type()
            ))
        })
}

fn build_matrices(expression: &ExpressionTable, pairs: Vec<ColumnPair>) -> Result<DesignResponse> {
    let mut fields = Vec::with_capacity(pairs.len() + 1);
    let mut design = Vec::with_capacity(pairs.len() + 1);
    let mut response = Vec::with_capacity(pairs.len() + 1);

    fields.push(Field::new(expression.feature_column_name(), DataType::Utf8, false));
    design.push(Arc::clone(expression.features()));
    response.push(Arc::clone(expression.features()));

    for pair in pairs {
        fields.push(Field::new(pair.label, DataType::Float64, true));
        design.push(pair.design);
        response.push(pair.response);
    }

    let schema = Arc::new(Schema::new(fields));
    Ok(DesignResponse {
        design: RecordBatch::try_new(Arc::clone(&schema), design)?,
        response: RecordBatch::try_new(schema, response)?,
    })
}
