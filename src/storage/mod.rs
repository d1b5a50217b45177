//! Storage adapters (Arrow CSV / Parquet)
//!
//! Thin, table-specific readers and writers around the core transform:
//! - metadata table: delimited text, every column read as `Utf8`
//! - expression table: delimited text or Parquet, feature ids first
//! - design/response: delimited text or Parquet
//!
//! The delimiter follows the file extension: `.tsv` and `.txt` are
//! tab-separated, anything else is comma-separated. `NA`, `NaN` and empty
//! cells are read as nulls.

use crate::assembly::DesignResponse;
use crate::expression::ExpressionTable;
use crate::{Error, Result};
use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use regex::Regex;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Cells matching this pattern are read as null
const NULL_PATTERN: &str = r"^(|NA|NaN|nan|null)$";

/// Destination files for the two output matrices.
///
/// Both paths are required; there are no implicit defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Design matrix file
    pub design: PathBuf,
    /// Response matrix file
    pub response: PathBuf,
}

impl OutputPaths {
    /// Create output paths.
    #[must_use]
    pub fn new(design: impl Into<PathBuf>, response: impl Into<PathBuf>) -> Self {
        Self {
            design: design.into(),
            response: response.into(),
        }
    }
}

/// Field delimiter for a path, chosen from its extension.
#[must_use]
pub fn delimiter_for<P: AsRef<Path>>(path: P) -> u8 {
    match path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("tsv" | "txt") => b'\t',
        _ => b',',
    }
}

/// Load a raw metadata table; every column is read as text.
///
/// Column names are kept as written in the file; the metadata normalizer
/// maps them. A leading column with a blank header is a row index and is
/// dropped.
///
/// # Errors
/// Returns error if the file cannot be opened or parsed
pub fn load_metadata_csv<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let path = path.as_ref();
    let header = read_header(path)?;
    let schema = Arc::new(Schema::new(
        header
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    let mut batch = read_csv(path, Arc::clone(&schema))?;
    if schema.field(0).name().trim().is_empty() {
        debug!(path = %path.display(), "dropping row-index column");
        batch = batch.project(&(1..schema.fields().len()).collect::<Vec<_>>())?;
    }
    info!(path = %path.display(), rows = batch.num_rows(), "loaded metadata");
    Ok(batch)
}

/// Load an expression table from delimited text.
///
/// The first column holds feature identifiers; all other columns are read
/// as `Float64`.
///
/// # Errors
/// Returns error if the file cannot be parsed or a value is not numeric
pub fn load_expression_csv<P: AsRef<Path>>(path: P) -> Result<ExpressionTable> {
    let path = path.as_ref();
    let header = read_header(path)?;
    let schema = Arc::new(Schema::new(
        header
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let data_type = if idx == 0 {
                    DataType::Utf8
                } else {
                    DataType::Float64
                };
                Field::new(field.name(), data_type, idx != 0)
            })
            .collect::<Vec<_>>(),
    ));

    let batch = read_csv(path, schema)?;
    let table = ExpressionTable::try_new(batch)?;
    info!(
        path = %path.display(),
        features = table.num_features(),
        conditions = table.num_conditions(),
        "loaded expression table"
    );
    Ok(table)
}

/// Load an expression table from a Parquet file.
///
/// # Errors
/// Returns error if file cannot be read or parsed
pub fn load_expression_parquet<P: AsRef<Path>>(path: P) -> Result<ExpressionTable> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let file = File::open(path.as_ref())
        .map_err(|e| Error::StorageError(format!("Failed to open Parquet file: {e}")))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::StorageError(format!("Failed to parse Parquet file: {e}")))?;
    let schema = Arc::clone(builder.schema());

    let reader = builder
        .build()
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet reader: {e}")))?;

    // Read all batches into memory
    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| Error::StorageError(format!("Failed to read record batch: {e}")))?;
        batches.push(batch);
    }

    ExpressionTable::try_new(concat_batches(&schema, &batches)?)
}

/// Write one matrix as delimited text (header row, feature column first).
///
/// # Errors
/// Returns error if the file cannot be created or written
pub fn write_matrix_csv<P: AsRef<Path>>(path: P, batch: &RecordBatch) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_delimiter(delimiter_for(path))
        .build(file);
    writer.write(batch)?;
    Ok(())
}

/// Write one matrix as a Parquet file.
///
/// # Errors
/// Returns error if the file cannot be created or written
pub fn write_matrix_parquet<P: AsRef<Path>>(path: P, batch: &RecordBatch) -> Result<()> {
    use parquet::arrow::ArrowWriter;

    let file = File::create(path.as_ref())?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(batch)
        .map_err(|e| Error::StorageError(format!("Failed to write record batch: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::StorageError(format!("Failed to finish Parquet file: {e}")))?;
    Ok(())
}

/// Write design and response matrices.
///
/// Files ending in `.parquet` are written as Parquet, all others as
/// delimited text. Both matrices are staged next to their targets and only
/// renamed into place once both writes succeed; a failed write leaves
/// neither target file behind.
///
/// # Errors
/// Returns error if either file cannot be written
pub fn write_design_response(result: &DesignResponse, paths: &OutputPaths) -> Result<()> {
    let staged = [
        (&paths.design, staging_path(&paths.design), result.design()),
        (&paths.response, staging_path(&paths.response), result.response()),
    ];

    for (_, staging, batch) in &staged {
        if let Err(e) = write_matrix(staging, batch) {
            for (_, staging, _) in &staged {
                fs::remove_file(staging).ok();
            }
            return Err(e);
        }
    }

    for (path, staging, batch) in &staged {
        fs::rename(staging, path)?;
        info!(path = %path.display(), columns = batch.num_columns() - 1, "wrote matrix");
    }
    Ok(())
}

/// Write one matrix in the format its extension selects.
fn write_matrix(path: &Path, batch: &RecordBatch) -> Result<()> {
    if path.extension().is_some_and(|ext| ext == "parquet") {
        write_matrix_parquet(path, batch)
    } else {
        write_matrix_csv(path, batch)
    }
}

/// Hidden sibling of `path` that keeps its extension.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "matrix".into(), |name| name.to_string_lossy());
    path.with_file_name(format!(".partial.{name}"))
}

/// Column names from the header row.
fn read_header(path: &Path) -> Result<Schema> {
    let file = File::open(path)
        .map_err(|e| Error::StorageError(format!("Failed to open {}: {e}", path.display())))?;
    let (schema, _) = Format::default()
        .with_header(true)
        .with_delimiter(delimiter_for(path))
        .infer_schema(file, Some(0))?;

    if schema.fields().is_empty() {
        return Err(Error::StorageError(format!(
            "{} has no header row",
            path.display()
        )));
    }
    Ok(schema)
}

/// Read a whole delimited file against a fixed schema.
fn read_csv(path: &Path, schema: SchemaRef) -> Result<RecordBatch> {
    let file = File::open(path)?;
    let null_regex = Regex::new(NULL_PATTERN)
        .map_err(|e| Error::StorageError(format!("Invalid null pattern: {e}")))?;

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .with_delimiter(delimiter_for(path))
        .with_null_regex(null_regex)
        .build(file)?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }

    Ok(concat_batches(&schema, &batches)?)
}
