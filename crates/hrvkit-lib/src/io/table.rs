use crate::batch::MetricsSink;
use crate::signal::MetricsRecord;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TABLE_HEADER: [&str; 8] = [
    "subject_id",
    "n",
    "mean_interval_ms",
    "mean_rate_bpm",
    "sdnn_ms",
    "rmssd_ms",
    "pnn20_pct",
    "pnn50_pct",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Writes the summary table to a file once the batch completes.
#[derive(Debug, Clone)]
pub struct TableSink {
    path: PathBuf,
    format: OutputFormat,
}

impl TableSink {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for TableSink {
    fn accept(&mut self, records: &[MetricsRecord]) -> Result<()> {
        match self.format {
            OutputFormat::Csv => write_metrics_csv(&self.path, records),
            OutputFormat::Json => write_metrics_json(&self.path, records),
        }
    }
}

pub fn write_metrics_csv(path: &Path, records: &[MetricsRecord]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_metrics_table(file, records)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Serialize records as CSV rows; missing values become empty cells.
pub fn write_metrics_table<W: Write>(out: W, records: &[MetricsRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(out);
    writer.write_record(TABLE_HEADER)?;
    for rec in records {
        writer.write_record(&[
            rec.subject_id.clone(),
            cell(rec.n),
            cell(rec.mean_interval_ms),
            decimal_cell(rec.mean_rate_bpm),
            decimal_cell(rec.sdnn_ms),
            decimal_cell(rec.rmssd_ms),
            decimal_cell(rec.pnn20_pct),
            decimal_cell(rec.pnn50_pct),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_metrics_json(path: &Path, records: &[MetricsRecord]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, records)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn decimal_cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_default()
}
