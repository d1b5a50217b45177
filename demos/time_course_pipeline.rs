//! Time-course pipeline: metadata + expression files to design/response files
//!
//! This example demonstrates:
//! - Loading a metadata table and an expression table from delimited text
//! - Inspecting the segmentation (steady-state samples, series, gap breaks)
//! - Writing design and response matrices
//!
//! Run with: RUST_LOG=debug cargo run --example time_course_pipeline

use std::fs;
use tracing_subscriber::EnvFilter;
use trueno_design::storage::{
    load_expression_csv, load_metadata_csv, write_design_response, OutputPaths,
};
use trueno_design::{DesignResponseCalculator, DesignResponseConfig, SampleRole};

const METADATA: &str = "\
condName\tisTs\tis1stLast\tprevCol\tdel.t
wt_ss\tFALSE\te\tNA\tNA
ko_ss\tFALSE\te\tNA\tNA
heat_0\tTRUE\tf\tNA\tNA
heat_15\tTRUE\tm\theat_0\t15
heat_30\tTRUE\tm\theat_15\t15
heat_240\tTRUE\tl\theat_30\t210
";

const EXPRESSION: &str = "\
gene,wt_ss,ko_ss,heat_0,heat_15,heat_30,heat_240
hsp70,1.2,1.1,1.0,4.8,7.9,2.3
hsf1,3.4,0.2,3.3,3.6,3.9,3.5
actb,9.8,9.9,9.7,9.8,9.6,9.9
";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== trueno-design Time-Course Pipeline ===\n");

    let dir = std::env::temp_dir().join("trueno_design_demo");
    fs::create_dir_all(&dir)?;
    let meta_path = dir.join("metadata.tsv");
    let expr_path = dir.join("expression.csv");
    fs::write(&meta_path, METADATA)?;
    fs::write(&expr_path, EXPRESSION)?;

    let metadata = load_metadata_csv(&meta_path)?;
    let expression = load_expression_csv(&expr_path)?;
    println!(
        "Loaded {} metadata rows, {} genes x {} conditions\n",
        metadata.num_rows(),
        expression.num_features(),
        expression.num_conditions()
    );

    let config = DesignResponseConfig::builder()
        .tau(45.0)
        .delta_t_max(110.0)
        .build()?;
    let calculator = DesignResponseCalculator::new(config)?;

    println!("Segmentation (delta_t_max = {}):", config.delta_t_max());
    let segmentation = calculator.segment(&metadata, &expression)?;
    for sample in segmentation.samples() {
        let marker = match sample.role() {
            SampleRole::SteadyState => "steady state",
            SampleRole::SeriesHead => "series head",
            SampleRole::SeriesInterior => "series interior",
            SampleRole::SeriesTail => "series tail (excluded)",
        };
        println!("  {:<10} {marker}", sample.condition_name());
    }
    println!("  ✓ {} segments\n", segmentation.segments().len());

    let result = calculator.calculate(&metadata, &expression)?;
    println!("Design/response columns: {:?}", result.column_names());

    let paths = OutputPaths::new(dir.join("design.tsv"), dir.join("response.tsv"));
    write_design_response(&result, &paths)?;
    println!("  ✓ Wrote {}", paths.design.display());
    println!("  ✓ Wrote {}", paths.response.display());

    Ok(())
}
