//! Report rendering and delivery.
//!
//! Supports the headerless CSV report, a JSON report, and writing either to
//! stdout or to a (optionally gzip-compressed) file.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use tracing::{debug, info};

use crate::record::{Fixed2, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Envelope for the JSON report.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<JsonRecord<'a>>,
}

/// A report row with every numeric column as a JSON number.
#[derive(Debug, Serialize)]
pub struct JsonRecord<'a> {
    pub model: &'a str,
    pub weight: Option<u32>,
    pub volume: Option<f64>,
    pub ratio: Option<f64>,
}

impl<'a> From<&'a Record> for JsonRecord<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            model: &record.model,
            weight: record.weight,
            volume: record.volume.map(Fixed2::to_f64),
            ratio: record.ratio.map(Fixed2::to_f64),
        }
    }
}

/// Writes one `model,weight,volume,ratio` row per record.
///
/// Missing values become empty fields and nothing is quoted, so labels are
/// written exactly as they appeared in the sources.
pub fn write_csv<W: Write>(records: &[Record], writer: W, with_header: bool) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(with_header)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the records as a pretty-printed JSON [`Report`].
pub fn write_json<W: Write>(records: &[Record], mut writer: W) -> Result<()> {
    let report = Report {
        generated_at: Utc::now(),
        records: records.iter().map(JsonRecord::from).collect(),
    };
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(())
}

/// Renders the records in `format` into memory.
pub fn render(records: &[Record], format: OutputFormat, with_header: bool) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Csv => write_csv(records, &mut buf, with_header)?,
        OutputFormat::Json => write_json(records, &mut buf)?,
    }
    debug!(bytes = buf.len(), ?format, "Report rendered");
    Ok(buf)
}

/// Sends a rendered report to stdout, or to `path` when one is given.
pub fn emit(report: &[u8], path: Option<&str>, gzip: bool) -> Result<()> {
    let Some(path) = path else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(report)?;
        stdout.flush()?;
        return Ok(());
    };

    let file = File::create(path).with_context(|| format!("cannot create output '{path}'"))?;
    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(report)?;
        encoder.finish()?;
    } else {
        let mut file = file;
        file.write_all(report)?;
        file.flush()?;
    }

    info!(path, gzip, bytes = report.len(), "Report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Accumulator, Fact};
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_records() -> Vec<Record> {
        let mut acc = Accumulator::new();
        acc.record_fact("4", Fact::Volume("67468.524".parse().unwrap()));
        acc.record_fact("4", Fact::Weight(137));
        acc.record_fact("4S", Fact::Weight(140));
        acc.record_fact("XR", Fact::Volume("100.5".parse().unwrap()));

        let mut records = acc.into_records();
        records.sort_by(|a, b| a.model.cmp(&b.model));
        records
    }

    #[test]
    fn test_csv_rows_without_header() {
        let bytes = render(&sample_records(), OutputFormat::Csv, false).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "4,137,67468.52,492.47\n4S,140,,\nXR,,100.50,\n");
    }

    #[test]
    fn test_csv_header_row() {
        let bytes = render(&sample_records(), OutputFormat::Csv, true).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().next(), Some("model,weight,volume,ratio"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_csv_does_not_quote_models() {
        let mut acc = Accumulator::new();
        acc.record_fact("Plus, Max", Fact::Weight(200));
        let bytes = render(&acc.into_records(), OutputFormat::Csv, false).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "Plus, Max,200,,\n");
    }

    #[test]
    fn test_json_report() {
        let bytes = render(&sample_records(), OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert!(value["generated_at"].is_string());
        let first = &value["records"][0];
        assert_eq!(first["model"], "4");
        assert_eq!(first["weight"], 137);
        assert_eq!(first["volume"], 67468.52);
        assert_eq!(first["ratio"], 492.47);
        assert_eq!(value["records"][2]["volume"], 100.5);
        assert!(value["records"][1]["volume"].is_null());
    }

    #[test]
    fn test_emit_writes_file() {
        let path = temp_path("density_report_test_emit.csv");
        let _ = fs::remove_file(&path);

        emit(b"4,137,67468.52,492.47\n", Some(&path), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "4,137,67468.52,492.47\n");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_emit_gzip_round_trips() {
        let path = temp_path("density_report_test_emit.csv.gz");
        let _ = fs::remove_file(&path);

        emit(b"X,174,,\n", Some(&path), true).unwrap();

        let mut decoder = GzDecoder::new(File::open(&path).unwrap());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert_eq!(text, "X,174,,\n");

        fs::remove_file(&path).unwrap();
    }
}
