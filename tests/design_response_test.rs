//! End-to-end tests for design/response construction
//!
//! Covers the documented behaviours:
//! 1. Column presence (missing conditions fail before any output)
//! 2. Shape alignment of design and response
//! 3. Steady-state identity
//! 4. Gap breaking
//! 5. Finite-difference response
//! 6. Dangling references and cycles

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use trueno_design::{
    calculate_design_and_response, DesignResponseCalculator, DesignResponseConfig, Error,
    ErrorKind, ExpressionTable, SampleRole, TerminalPolicy,
};

/// Metadata row: (condName, isTs, is1stLast, prevCol, del.t)
type Row<'a> = (&'a str, &'a str, &'a str, Option<&'a str>, Option<&'a str>);

fn metadata(rows: &[Row<'_>]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("condName", DataType::Utf8, false),
        Field::new("isTs", DataType::Utf8, true),
        Field::new("is1stLast", DataType::Utf8, true),
        Field::new("prevCol", DataType::Utf8, true),
        Field::new("del.t", DataType::Utf8, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.0))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.1))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.2))),
        Arc::new(rows.iter().map(|r| r.3).collect::<StringArray>()),
        Arc::new(rows.iter().map(|r| r.4).collect::<StringArray>()),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

fn expression(columns: &[(&str, &[f64])]) -> ExpressionTable {
    let rows = columns.first().map_or(0, |(_, v)| v.len());
    ExpressionTable::from_columns(
        "gene",
        (1..=rows).map(|i| format!("gene{i}")).collect(),
        columns
            .iter()
            .map(|(name, values)| ((*name).to_string(), values.to_vec()))
            .collect(),
    )
    .unwrap()
}

fn values(batch: &RecordBatch, idx: usize) -> Vec<f64> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap()
        .values()
        .to_vec()
}

/// Mixed experiment: two steady-state samples, one three-point series
fn mixed_experiment() -> (RecordBatch, ExpressionTable) {
    let meta = metadata(&[
        ("ss1", "FALSE", "e", None, None),
        ("t0", "TRUE", "f", None, None),
        ("t10", "TRUE", "m", Some("t0"), Some("10")),
        ("t30", "TRUE", "l", Some("t10"), Some("20")),
        ("ss2", "FALSE", "e", Some("NA"), Some("NA")),
    ]);
    let expr = expression(&[
        ("ss1", &[1.0, 5.0]),
        ("t0", &[2.0, 0.0]),
        ("t10", &[4.0, 1.0]),
        ("t30", &[4.0, 3.0]),
        ("ss2", &[7.0, 8.0]),
    ]);
    (meta, expr)
}

#[test]
fn test_finite_difference_example() {
    let meta = metadata(&[
        ("A", "TRUE", "f", None, None),
        ("B", "TRUE", "l", Some("A"), Some("10")),
    ]);
    let expr = expression(&[("A", &[2.0]), ("B", &[4.0])]);
    let config = DesignResponseConfig::builder()
        .tau(45.0)
        .delta_t_min(0.0)
        .build()
        .unwrap();

    let result = calculate_design_and_response(&meta, &expr, &config).unwrap();

    assert_eq!(result.column_names(), vec!["A"]);
    assert_eq!(values(result.design(), 1), vec![2.0]);
    assert!((values(result.response(), 1)[0] - 11.0).abs() < 1e-9);
}

#[test]
fn test_mixed_experiment_layout() {
    let (meta, expr) = mixed_experiment();
    let result = calculate_design_and_response(&meta, &expr, &DesignResponseConfig::default())
        .unwrap();

    // Metadata order; series tail excluded by default
    assert_eq!(result.column_names(), vec!["ss1", "t0", "t10", "ss2"]);
    assert_eq!(result.num_features(), 2);

    // t0 -> t10: 2 + 45/10 * (4 - 2) = 11 ; 0 + 4.5 * 1 = 4.5
    let t0 = values(result.response(), 2);
    assert!((t0[0] - 11.0).abs() < 1e-9);
    assert!((t0[1] - 4.5).abs() < 1e-9);

    // t10 -> t30: 4 + 45/20 * 0 = 4 ; 1 + 2.25 * 2 = 5.5
    let t10 = values(result.response(), 3);
    assert!((t10[0] - 4.0).abs() < 1e-9);
    assert!((t10[1] - 5.5).abs() < 1e-9);
}

#[test]
fn test_shape_invariant() {
    let (meta, expr) = mixed_experiment();
    let result = calculate_design_and_response(&meta, &expr, &DesignResponseConfig::default())
        .unwrap();

    assert_eq!(result.design().schema(), result.response().schema());
    assert_eq!(result.design().num_rows(), expr.num_features());
    assert_eq!(result.response().num_rows(), expr.num_features());
    assert_eq!(result.design().column(0), expr.features());
    assert_eq!(result.response().column(0), expr.features());
}

#[test]
fn test_steady_state_identity() {
    let (meta, expr) = mixed_experiment();
    let result = calculate_design_and_response(&meta, &expr, &DesignResponseConfig::default())
        .unwrap();

    for idx in [1, 4] {
        assert_eq!(values(result.design(), idx), values(result.response(), idx));
    }
    assert_eq!(values(result.design(), 1), vec![1.0, 5.0]);
}

#[test]
fn test_terminal_samples_as_steady_state() {
    let (meta, expr) = mixed_experiment();
    let config = DesignResponseConfig::builder()
        .terminal_policy(TerminalPolicy::SteadyState)
        .build()
        .unwrap();
    let result = calculate_design_and_response(&meta, &expr, &config).unwrap();

    assert_eq!(result.column_names(), vec!["ss1", "t0", "t10", "t30", "ss2"]);
    assert_eq!(values(result.design(), 4), values(result.response(), 4));
}

#[test]
fn test_zero_delta_t_max_all_steady_state() {
    let (meta, expr) = mixed_experiment();
    let config = DesignResponseConfig::builder().delta_t_max(0.0).build().unwrap();
    let calculator = DesignResponseCalculator::new(config).unwrap();

    let segmentation = calculator.segment(&meta, &expr).unwrap();
    assert_eq!(segmentation.count(SampleRole::SteadyState), 5);

    let result = calculator.calculate(&meta, &expr).unwrap();
    assert_eq!(result.num_pairs(), 5);
    for idx in 1..=result.num_pairs() {
        assert_eq!(values(result.design(), idx), values(result.response(), idx));
    }
}

#[test]
fn test_gap_breaks_series() {
    let meta = metadata(&[
        ("t0", "TRUE", "f", None, None),
        ("t10", "TRUE", "m", Some("t0"), Some("10")),
        ("t500", "TRUE", "l", Some("t10"), Some("490")),
    ]);
    let expr = expression(&[("t0", &[1.0]), ("t10", &[2.0]), ("t500", &[9.0])]);
    let calculator = DesignResponseCalculator::new(DesignResponseConfig::default()).unwrap();

    let segmentation = calculator.segment(&meta, &expr).unwrap();
    assert_eq!(segmentation.sample("t10").unwrap().role(), SampleRole::SeriesTail);
    assert_eq!(segmentation.sample("t500").unwrap().role(), SampleRole::SteadyState);

    let result = calculator.calculate(&meta, &expr).unwrap();
    assert_eq!(result.column_names(), vec!["t0", "t500"]);
}

#[test]
fn test_missing_condition_fails() {
    let meta = metadata(&[
        ("cond1", "FALSE", "e", None, None),
        ("cond2", "FALSE", "e", None, None),
        ("cond3", "FALSE", "e", None, None),
    ]);
    let expr = expression(&[("cond1", &[1.0]), ("cond2", &[2.0])]);

    let err = calculate_design_and_response(&meta, &expr, &DesignResponseConfig::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("cond3"));
    assert!(matches!(err, Error::MissingConditions { .. }));
}

#[test]
fn test_dangling_reference_fails() {
    let meta = metadata(&[
        ("A", "TRUE", "f", None, None),
        ("B", "TRUE", "l", Some("X"), Some("10")),
    ]);
    let expr = expression(&[("A", &[1.0]), ("B", &[2.0])]);

    let err = calculate_design_and_response(&meta, &expr, &DesignResponseConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::DanglingPredecessor { ref references } if references == &["X"]));
    assert!(err.to_string().contains('X'));
}

#[test]
fn test_cycle_fails() {
    let meta = metadata(&[
        ("A", "TRUE", "m", Some("B"), Some("10")),
        ("B", "TRUE", "m", Some("A"), Some("10")),
    ]);
    let expr = expression(&[("A", &[1.0]), ("B", &[2.0])]);

    let err = calculate_design_and_response(&meta, &expr, &DesignResponseConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::CyclicPredecessor { .. }));
}

#[test]
fn test_invalid_config_rejected_before_processing() {
    let (meta, expr) = mixed_experiment();
    let config: DesignResponseConfig = serde_json::from_str(r#"{"delta_t_max": -1.0}"#).unwrap();

    let err = calculate_design_and_response(&meta, &expr, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_unreferenced_expression_columns_ignored() {
    let meta = metadata(&[("ss1", "FALSE", "e", None, None)]);
    let expr = expression(&[("ss1", &[1.0]), ("extra", &[2.0])]);

    let result = calculate_design_and_response(&meta, &expr, &DesignResponseConfig::default())
        .unwrap();
    assert_eq!(result.column_names(), vec!["ss1"]);
}

#[test]
fn test_repeated_calls_are_independent() {
    let (meta, expr) = mixed_experiment();
    let calculator = DesignResponseCalculator::new(DesignResponseConfig::default()).unwrap();

    let first = calculator.calculate(&meta, &expr).unwrap();
    let second = calculator.calculate(&meta, &expr).unwrap();
    assert_eq!(first.design(), second.design());
    assert_eq!(first.response(), second.response());
}

#[test]
fn test_response_nulls_follow_expression_nulls() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("gene", DataType::Utf8, false),
        Field::new("A", DataType::Float64, true),
        Field::new("B", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["g1", "g2"])),
            Arc::new(Float64Array::from(vec![Some(1.0), Some(2.0)])),
            Arc::new(Float64Array::from(vec![None, Some(3.0)])),
        ],
    )
    .unwrap();
    let expr = ExpressionTable::try_new(batch).unwrap();
    let meta = metadata(&[
        ("A", "TRUE", "f", None, None),
        ("B", "TRUE", "l", Some("A"), Some("1")),
    ]);

    let result = calculate_design_and_response(&meta, &expr, &DesignResponseConfig::default())
        .unwrap();
    let response = result.response().column(1);
    assert!(response.is_null(0));
    assert!(response.is_valid(1));
}
