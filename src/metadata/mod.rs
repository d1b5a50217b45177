//! Metadata Normalizer
//!
//! Turns a raw metadata table (source column names, loosely typed cells)
//! into canonical [`SampleRecord`]s and checks them against the expression
//! table.
//!
//! ## Source Schema
//!
//! ```text
//! condName | isTs  | is1stLast | prevCol | del.t
//! ---------+-------+-----------+---------+------
//! ss1      | FALSE | e         | NA      | NA
//! t0       | TRUE  | f         | NA      | NA
//! t10      | TRUE  | l         | t0      | 10
//! ```
//!
//! Only `condName` is required. Column order is free.

mod column;
mod record;

pub use column::{FirstLast, MetadataColumn};
pub use record::{SampleRecord, SampleRecordBuilder};

use crate::expression::ExpressionTable;
use crate::{Error, Result};
use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Cell values treated as missing
const MISSING_TOKENS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

/// Normalize a raw metadata table.
///
/// # Errors
///
/// Returns error if:
/// - A column is outside the schema mapping, repeated, or `condName` is absent
/// - A cell cannot be parsed, or a condition name repeats
/// - Any condition is missing from the expression table
#[tracing::instrument(skip_all, fields(rows = raw.num_rows()))]
pub fn normalize(raw: &RecordBatch, expression: &ExpressionTable) -> Result<Vec<SampleRecord>> {
    let columns = MetadataColumns::map(raw)?;
    let records = columns.records()?;
    check_conditions_present(&records, expression)?;

    let referenced: FxHashSet<&str> = records.iter().map(SampleRecord::condition_name).collect();
    let unreferenced = expression
        .condition_names()
        .filter(|name| !referenced.contains(name))
        .count();
    if unreferenced > 0 {
        debug!(unreferenced, "expression columns without metadata are ignored");
    }

    debug!(records = records.len(), "metadata normalized");
    Ok(records)
}

/// Fail if any metadata condition has no expression column.
///
/// # Errors
///
/// Returns [`Error::MissingConditions`] listing the missing names in metadata order
pub fn check_conditions_present(
    records: &[SampleRecord],
    expression: &ExpressionTable,
) -> Result<()> {
    let missing: Vec<String> = records
        .iter()
        .map(SampleRecord::condition_name)
        .filter(|name| !expression.contains(name))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingConditions {
            conditions: missing,
        })
    }
}

/// Source columns resolved against the schema mapping, cast to text
struct MetadataColumns {
    num_rows: usize,
    columns: FxHashMap<MetadataColumn, StringArray>,
}

impl MetadataColumns {
    fn map(raw: &RecordBatch) -> Result<Self> {
        let mut columns = FxHashMap::default();

        for (field, array) in raw.schema().fields().iter().zip(raw.columns()) {
            let column = MetadataColumn::from_source_name(field.name())?;
            let text = cast(array, &DataType::Utf8)?;
            let text = text
                .as_any()
                .downcast_ref::<StringArray>()
                .cloned()
                .ok_or_else(|| {
                    Error::InvalidMetadataValue {
                        condition: String::new(),
                        column: field.name().clone(),
                        value: format!("{:?}", array.data_type()),
                    }
                })?;
            if columns.insert(column, text).is_some() {
                return Err(Error::DuplicateMetadataColumn(field.name().clone()));
            }
        }

        if !columns.contains_key(&MetadataColumn::ConditionName) {
            return Err(Error::MissingMetadataColumn(
                MetadataColumn::ConditionName.source_name().to_string(),
            ));
        }

        Ok(Self {
            num_rows: raw.num_rows(),
            columns,
        })
    }

    fn cell(&self, column: MetadataColumn, row: usize) -> Option<&str> {
        let array = self.columns.get(&column)?;
        if array.is_null(row) {
            return None;
        }
        let value = array.value(row).trim();
        (!MISSING_TOKENS.contains(&value)).then_some(value)
    }

    fn records(&self) -> Result<Vec<SampleRecord>> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut records = Vec::with_capacity(self.num_rows);

        for row in 0..self.num_rows {
            let record = self.record(row)?;
            if !seen.insert(record.condition_name().to_string()) {
                return Err(Error::DuplicateCondition(record.condition_name().to_string()));
            }
            records.push(record);
        }

        Ok(records)
    }

    fn record(&self, row: usize) -> Result<SampleRecord> {
        let name = self
            .cell(MetadataColumn::ConditionName, row)
            .ok_or_else(|| Error::InvalidMetadataValue {
                condition: format!("row {}", row + 1),
                column: MetadataColumn::ConditionName.source_name().to_string(),
                value: String::new(),
            })?;
        let invalid = |column: MetadataColumn, value: &str| Error::InvalidMetadataValue {
            condition: name.to_string(),
            column: column.source_name().to_string(),
            value: value.to_string(),
        };

        let mut builder = SampleRecord::builder(name);

        if let Some(value) = self.cell(MetadataColumn::IsTimeSeries, row) {
            let flag =
                parse_bool(value).ok_or_else(|| invalid(MetadataColumn::IsTimeSeries, value))?;
            builder = builder.time_series(flag);
        }

        if let Some(value) = self.cell(MetadataColumn::IsFirstLast, row) {
            let position = value
                .parse::<FirstLast>()
                .map_err(|()| invalid(MetadataColumn::IsFirstLast, value))?;
            builder = builder.first_last(position);
        }

        if let Some(prev) = self.cell(MetadataColumn::PrevCondition, row) {
            builder = builder.prev_condition(prev);
        }

        if let Some(value) = self.cell(MetadataColumn::DeltaT, row) {
            let delta_t = value
                .parse::<f64>()
                .ok()
                .filter(|dt| dt.is_finite() && *dt >= 0.0)
                .ok_or_else(|| invalid(MetadataColumn::DeltaT, value))?;
            builder = builder.delta_t(delta_t);
        }

        Ok(builder.build())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "TRUE" | "True" | "true" | "T" | "1" | "yes" => Some(true),
        "FALSE" | "False" | "false" | "F" | "0" | "no" => Some(false),
        _ => None,
    }
}
