use density_report::order::ReferenceOrder;
use density_report::output::{OutputFormat, render};
use density_report::parser::{ParseKind, parse_source};
use density_report::pipeline::{collect, ordered_records};
use density_report::record::Accumulator;
use std::env;
use std::fs;

const DIMS_FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/dims.csv");
const WEIGHT_FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/weight.csv");

fn temp_path(name: &str) -> String {
    format!("{}/{}", env::temp_dir().display(), name)
}

async fn csv_report(dims: &str, weights: &str) -> anyhow::Result<String> {
    let acc = collect(dims, weights).await?;
    let records = ordered_records(acc, &ReferenceOrder::default());
    let bytes = render(&records, OutputFormat::Csv, false)?;
    Ok(String::from_utf8(bytes)?)
}

#[tokio::test]
async fn test_full_pipeline() {
    let report = csv_report(DIMS_FIXTURE, WEIGHT_FIXTURE).await.unwrap();

    assert_eq!(
        report,
        "1st gen,135,81374.00,602.77\n\
         4,137,62781.70,458.26\n\
         5S,112,55135.57,492.28\n\
         SE,112,55135.57,492.28\n\
         X,174,78395.55,450.55\n\
         Nexus One,130,,\n"
    );
}

#[tokio::test]
async fn test_single_model_scenario() {
    let dims = temp_path("density_report_it_single_dims.csv");
    let weights = temp_path("density_report_it_single_weight.csv");
    fs::write(&dims, "4:\n123.8 mm\n58.6 mm\n9.3 mm\n").unwrap();
    fs::write(&weights, "4:137 g\n").unwrap();

    let report = csv_report(&dims, &weights).await.unwrap();
    assert_eq!(report, "4,137,67468.52,492.47\n");

    fs::remove_file(&dims).unwrap();
    fs::remove_file(&weights).unwrap();
}

#[tokio::test]
async fn test_malformed_weight_aborts_report() {
    let weights = temp_path("density_report_it_bad_weight.csv");
    fs::write(&weights, "4:137 g\n4S:heavy\n").unwrap();

    let err = csv_report(DIMS_FIXTURE, &weights).await.unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("line 2"));
    assert!(chain.contains("4S"));

    fs::remove_file(&weights).unwrap();
}

#[tokio::test]
async fn test_malformed_dimension_aborts_report_at_its_line() {
    let dims = temp_path("density_report_it_bad_dims.csv");
    fs::write(&dims, "4:\n115.2 mm\nbad\n9.3 mm\n4S:\n115.2 mm\n58.6 mm\n9.3 mm\n").unwrap();

    let err = csv_report(&dims, WEIGHT_FIXTURE).await.unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("line 3: cannot read measurement for model '4'"));
    assert!(!chain.contains("line 5"));
    assert_eq!(chain.matches("expected a measurement").count(), 1);

    fs::remove_file(&dims).unwrap();
}

#[tokio::test]
async fn test_tied_volume_rounds_half_away_from_zero() {
    let dims = temp_path("density_report_it_tie_dims.csv");
    let weights = temp_path("density_report_it_tie_weight.csv");
    fs::write(&dims, "SE:\n109.5 mm\n62.1 mm\n7.3 mm\n").unwrap();
    fs::write(&weights, "SE:8 g\n").unwrap();

    // 49639.635 -> 49639.64, and 49639.64 / 8 = 6204.955 -> 6204.96
    let report = csv_report(&dims, &weights).await.unwrap();
    assert_eq!(report, "SE,8,49639.64,6204.96\n");

    fs::remove_file(&dims).unwrap();
    fs::remove_file(&weights).unwrap();
}

#[tokio::test]
async fn test_parse_source_lists_raw_entries() {
    let mut acc = Accumulator::new();
    let entries = parse_source(WEIGHT_FIXTURE, ParseKind::Weight, &mut acc)
        .await
        .unwrap();

    let lines: Vec<_> = entries.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "\"X\",174",
            "\"1st gen\",135",
            "\"4\",137",
            "\"5S and SE\",112",
            "\"Nexus One\",130",
        ]
    );
    assert_eq!(acc.len(), 6);
}

#[test]
fn test_unknown_parse_kind_is_rejected() {
    let err = "volumes".parse::<ParseKind>().unwrap_err();
    assert!(err.to_string().contains("volumes"));
}
