//! Expression table (features x conditions)
//!
//! Backed by an Arrow `RecordBatch`:
//! - column 0: feature identifiers (`Utf8`)
//! - columns 1..: one `Float64` vector per condition
//!
//! Numeric columns of other types are cast to `Float64` once, at construction.
//! The table is never mutated afterwards.

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Immutable gene-expression matrix keyed by condition name.
#[derive(Debug, Clone)]
pub struct ExpressionTable {
    batch: RecordBatch,
    columns: FxHashMap<String, usize>,
}

impl ExpressionTable {
    /// Wrap a record batch as an expression table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExpressionTable`] if:
    /// - The batch has no columns
    /// - The feature column is not a string column
    /// - A condition column cannot be cast to `Float64`
    /// - Two condition columns share a name
    pub fn try_new(batch: RecordBatch) -> Result<Self> {
        if batch.num_columns() == 0 {
            return Err(Error::InvalidExpressionTable(
                "table has no feature identifier column".to_string(),
            ));
        }

        let schema = batch.schema();
        let feature_field = schema.field(0);
        let features = cast(batch.column(0), &DataType::Utf8).map_err(|e| {
            Error::InvalidExpressionTable(format!(
                "feature column {:?} is not textual: {e}",
                feature_field.name()
            ))
        })?;
        if features.null_count() > 0 {
            return Err(Error::InvalidExpressionTable(format!(
                "feature column {:?} contains missing identifiers",
                feature_field.name()
            )));
        }

        let mut fields = Vec::with_capacity(batch.num_columns());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());
        let mut columns = FxHashMap::default();

        fields.push(Field::new(feature_field.name(), DataType::Utf8, false));
        arrays.push(features);

        for (idx, field) in schema.fields().iter().enumerate().skip(1) {
            let values = match field.data_type() {
                DataType::Float64 => Arc::clone(batch.column(idx)),
                _ => cast(batch.column(idx), &DataType::Float64).map_err(|e| {
                    Error::InvalidExpressionTable(format!(
                        "condition column {:?} is not numeric: {e}",
                        field.name()
                    ))
                })?,
            };

            if columns.insert(field.name().clone(), idx).is_some() {
                return Err(Error::InvalidExpressionTable(format!(
                    "duplicate condition column {:?}",
                    field.name()
                )));
            }
            fields.push(Field::new(field.name(), DataType::Float64, true));
            arrays.push(values);
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self { batch, columns })
    }

    /// Build a table from feature ids and named condition vectors.
    ///
    /// Convenient for tests and small in-memory inputs.
    ///
    /// ```rust
    /// use trueno_design::ExpressionTable;
    ///
    /// let table = ExpressionTable::from_columns(
    ///     "gene",
    ///     vec!["g1".to_string(), "g2".to_string()],
    ///     vec![("cond1".to_string(), vec![1.0, 2.0])],
    /// )?;
    /// assert_eq!(table.num_features(), 2);
    /// assert!(table.contains("cond1"));
    /// # Ok::<(), trueno_design::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns error if a condition vector length differs from the feature count
    /// or a condition name repeats
    pub fn from_columns(
        feature_column: &str,
        features: Vec<String>,
        conditions: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let mut fields = vec![Field::new(feature_column, DataType::Utf8, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(features))];

        for (name, values) in conditions {
            fields.push(Field::new(name, DataType::Float64, true));
            arrays.push(Arc::new(Float64Array::from(values)));
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).map_err(|e| {
            Error::InvalidExpressionTable(format!("inconsistent column lengths: {e}"))
        })?;
        Self::try_new(batch)
    }

    /// Underlying record batch (feature column first).
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Name of the feature identifier column.
    #[must_use]
    pub fn feature_column_name(&self) -> &str {
        self.batch.schema_ref().field(0).name()
    }

    /// Feature identifier column.
    #[must_use]
    pub fn features(&self) -> &ArrayRef {
        self.batch.column(0)
    }

    /// Number of feature rows.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of condition columns.
    #[must_use]
    pub fn num_conditions(&self) -> usize {
        self.batch.num_columns() - 1
    }

    /// Condition names in table order.
    pub fn condition_names(&self) -> impl Iterator<Item = &str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .skip(1)
            .map(|field| field.name().as_str())
    }

    /// Whether a condition column exists.
    #[must_use]
    pub fn contains(&self, condition: &str) -> bool {
        self.columns.contains_key(condition)
    }

    /// Expression vector for a condition, as a shared array handle.
    #[must_use]
    pub fn column(&self, condition: &str) -> Option<&ArrayRef> {
        self.columns
            .get(condition)
            .map(|&idx| self.batch.column(idx))
    }

    /// Expression vector for a condition, typed.
    #[must_use]
    pub fn values(&self, condition: &str) -> Option<&Float64Array> {
        self.column(condition)
            .and_then(|array| array.as_any().downcast_ref::<Float64Array>())
    }
}
