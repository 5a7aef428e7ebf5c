//! Sequential multi-subject processing.
//!
//! Each retained subject yields exactly one row, in input order. Fetch and
//! data failures are isolated to the subject that caused them and show up as
//! an all-null row plus an entry in [`BatchReport::failures`].

use crate::error::{FetchError, SubjectError};
use crate::metrics::hrv::{compute_metrics_with, EngineConfig};
use crate::signal::{BeatRecord, MetricsRecord};
use anyhow::Result;
use log::{debug, error, info, warn};

/// Supplies the beat sequence for a subject id.
pub trait BeatSource {
    fn fetch(&self, subject_id: &str) -> Result<Vec<BeatRecord>, FetchError>;
}

/// Receives the finished, ordered result table.
pub trait MetricsSink {
    fn accept(&mut self, records: &[MetricsRecord]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Ids not ending in this suffix are skipped.
    pub suffix: String,
    pub engine: EngineConfig,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            suffix: ".csv".into(),
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct SubjectFailure {
    pub subject_id: String,
    pub error: SubjectError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<MetricsRecord>,
    pub skipped: Vec<String>,
    pub failures: Vec<SubjectFailure>,
}

impl BatchReport {
    /// Number of subjects with reportable metrics.
    pub fn reported(&self) -> usize {
        self.records.iter().filter(|r| r.has_metrics()).count()
    }
}

pub fn is_valid_subject(subject_id: &str, suffix: &str) -> bool {
    subject_id.ends_with(suffix)
}

/// Fetch and evaluate a single subject.
pub fn process_subject<S: BeatSource + ?Sized>(
    subject_id: &str,
    source: &S,
    engine: &EngineConfig,
) -> Result<MetricsRecord, SubjectError> {
    let beats = source.fetch(subject_id)?;
    debug!("{}: {} beats loaded", subject_id, beats.len());
    Ok(compute_metrics_with(subject_id, &beats, engine)?)
}

/// Run every valid id through the metric engine and hand the table to `sink`.
///
/// Only a sink failure is returned as an error.
pub fn run_batch<S, K>(
    subject_ids: &[String],
    source: &S,
    sink: &mut K,
    options: &BatchOptions,
) -> Result<BatchReport>
where
    S: BeatSource + ?Sized,
    K: MetricsSink + ?Sized,
{
    info!("processing {} input file(s)", subject_ids.len());
    let mut report = BatchReport::default();
    for subject_id in subject_ids {
        if !is_valid_subject(subject_id, &options.suffix) {
            warn!(
                "skipping {}: expected a '{}' file",
                subject_id, options.suffix
            );
            report.skipped.push(subject_id.clone());
            continue;
        }
        match process_subject(subject_id, source, &options.engine) {
            Ok(record) => {
                info!(
                    "{}: n={} metrics={}",
                    subject_id,
                    record.n.unwrap_or_default(),
                    if record.has_metrics() {
                        "reported"
                    } else {
                        "insufficient"
                    }
                );
                debug!("{:?}", record);
                report.records.push(record);
            }
            Err(err) => {
                error!("{}: {}", subject_id, err);
                report.records.push(MetricsRecord::failed(subject_id.as_str()));
                report.failures.push(SubjectFailure {
                    subject_id: subject_id.clone(),
                    error: err,
                });
            }
        }
    }
    sink.accept(&report.records)?;
    info!(
        "processed {} subject(s): {} reported, {} failed, {} skipped",
        report.records.len(),
        report.reported(),
        report.failures.len(),
        report.skipped.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::signal::TimeUnit;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct MemorySource(HashMap<String, Vec<BeatRecord>>);

    impl BeatSource for MemorySource {
        fn fetch(&self, subject_id: &str) -> Result<Vec<BeatRecord>, FetchError> {
            self.0
                .get(subject_id)
                .cloned()
                .ok_or_else(|| FetchError::NotFound {
                    path: PathBuf::from(subject_id),
                })
        }
    }

    #[derive(Default)]
    struct VecSink {
        calls: usize,
        rows: Vec<MetricsRecord>,
    }

    impl MetricsSink for VecSink {
        fn accept(&mut self, records: &[MetricsRecord]) -> Result<()> {
            self.calls += 1;
            self.rows = records.to_vec();
            Ok(())
        }
    }

    struct FailingSink;

    impl MetricsSink for FailingSink {
        fn accept(&mut self, _records: &[MetricsRecord]) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn rhythm(count: usize, spacing_s: f64) -> Vec<BeatRecord> {
        (0..count)
            .map(|i| BeatRecord::new(i as f64 * spacing_s, "N"))
            .collect()
    }

    fn source() -> MemorySource {
        let mut corrupt = rhythm(600, 0.8);
        corrupt[42].time = f64::NAN;
        MemorySource(HashMap::from([
            ("a.csv".to_string(), rhythm(501, 0.8)),
            ("b.csv".to_string(), rhythm(10, 1.0)),
            ("c.csv".to_string(), rhythm(601, 0.75)),
            ("corrupt.csv".to_string(), corrupt),
        ]))
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn one_row_per_valid_subject_in_order() {
        let mut sink = VecSink::default();
        let report = run_batch(
            &ids(&["a.csv", "readme.txt", "b.csv", "corrupt.csv", "missing.csv", "c.csv"]),
            &source(),
            &mut sink,
            &BatchOptions::default(),
        )
        .unwrap();

        assert_eq!(sink.calls, 1);
        let order: Vec<&str> = sink.rows.iter().map(|r| r.subject_id.as_str()).collect();
        assert_eq!(
            order,
            vec!["a.csv", "b.csv", "corrupt.csv", "missing.csv", "c.csv"]
        );
        assert_eq!(report.records, sink.rows);
        assert_eq!(report.skipped, vec!["readme.txt"]);
        assert_eq!(report.reported(), 2);

        assert_eq!(sink.rows[0].mean_rate_bpm, Some(75.0));
        assert_eq!(sink.rows[1].n, Some(9));
        assert!(!sink.rows[1].has_metrics());
        assert_eq!(sink.rows[2], MetricsRecord::failed("corrupt.csv"));
        assert_eq!(sink.rows[4].mean_rate_bpm, Some(80.0));
    }

    #[test]
    fn failures_keep_their_kind() {
        let mut sink = VecSink::default();
        let report = run_batch(
            &ids(&["corrupt.csv", "missing.csv"]),
            &source(),
            &mut sink,
            &BatchOptions::default(),
        )
        .unwrap();
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].subject_id, "corrupt.csv");
        match &report.failures[0].error {
            SubjectError::Data(err) => {
                assert!(matches!(err, DataError::NonFiniteTime { index: 42, .. }));
                assert_eq!(err.field(), "time");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            report.failures[1].error,
            SubjectError::Fetch(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn reordering_subjects_only_reorders_rows() {
        let forward = ids(&["a.csv", "b.csv", "c.csv"]);
        let reversed: Vec<String> = forward.iter().rev().cloned().collect();
        let src = source();
        let mut first = VecSink::default();
        let mut second = VecSink::default();
        run_batch(&forward, &src, &mut first, &BatchOptions::default()).unwrap();
        run_batch(&reversed, &src, &mut second, &BatchOptions::default()).unwrap();
        let mut back: Vec<MetricsRecord> = second.rows.into_iter().rev().collect();
        assert_eq!(first.rows, back);
        back.reverse();
        assert_eq!(back[0].subject_id, "c.csv");
    }

    #[test]
    fn engine_options_flow_through() {
        let src = MemorySource(HashMap::from([(
            "ms.csv".to_string(),
            (0..20)
                .map(|i| BeatRecord::new(i as f64 * 1000.0, "N"))
                .collect(),
        )]));
        let options = BatchOptions {
            suffix: ".csv".into(),
            engine: EngineConfig {
                time_unit: TimeUnit::Milliseconds,
                min_nn: 10,
            },
        };
        let mut sink = VecSink::default();
        let report = run_batch(&ids(&["ms.csv"]), &src, &mut sink, &options).unwrap();
        assert_eq!(report.records[0].mean_interval_ms, Some(1000));
        assert_eq!(report.records[0].mean_rate_bpm, Some(60.0));
    }

    #[test]
    fn sink_failure_is_returned() {
        let err = run_batch(
            &ids(&["a.csv"]),
            &source(),
            &mut FailingSink,
            &BatchOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn empty_batch_still_calls_sink() {
        let mut sink = VecSink::default();
        let report = run_batch(&[], &source(), &mut sink, &BatchOptions::default()).unwrap();
        assert_eq!(sink.calls, 1);
        assert!(report.records.is_empty());
    }
}
