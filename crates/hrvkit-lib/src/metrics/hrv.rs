//! Time-domain HRV over annotated beat sequences.
//!
//! Only normal-to-normal ("NN") intervals contribute. Successive differences
//! are taken only across runs of three consecutive normal beats. Output
//! rounding reproduces the published reference tables:
//!
//! * the mean rate is derived from the mean interval *after* it has been
//!   rounded to whole milliseconds;
//! * pNN20/pNN50 divide by the NN count `n`, not by the number of defined
//!   successive differences.
//!
//! Both are kept for output compatibility with existing result sets.

use crate::error::DataError;
use crate::signal::{BeatRecord, IntervalPair, MetricsRecord, TimeUnit};
use serde::{Deserialize, Serialize};

/// Minimum number of NN intervals required before metrics are reported.
pub const MIN_NN_INTERVALS: usize = 500;

/// Intervals are snapped to this many decimal places of a millisecond so that
/// unit conversion noise cannot push an exact 20/50 ms difference over the
/// strict threshold.
const INTERVAL_DECIMALS: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Unit of `BeatRecord::time`.
    pub time_unit: TimeUnit,
    /// Reporting gate: below this NN count all metric fields are null.
    pub min_nn: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_unit: TimeUnit::Seconds,
            min_nn: MIN_NN_INTERVALS,
        }
    }
}

/// Rounded NN statistics before the reporting gate is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NnStats {
    pub n: usize,
    /// Number of NN intervals followed by another NN interval.
    pub m: usize,
    /// Unrounded mean NN interval.
    pub mean_ms: f64,
    pub mean_interval_ms: i64,
    pub mean_rate_bpm: Option<f64>,
    pub sdnn_ms: Option<f64>,
    pub rmssd_ms: Option<f64>,
    pub pnn20_pct: f64,
    pub pnn50_pct: f64,
}

/// Compute the HRV summary for one subject using the default configuration.
pub fn compute_metrics(
    subject_id: &str,
    beats: &[BeatRecord],
) -> Result<MetricsRecord, DataError> {
    compute_metrics_with(subject_id, beats, &EngineConfig::default())
}

pub fn compute_metrics_with(
    subject_id: &str,
    beats: &[BeatRecord],
    cfg: &EngineConfig,
) -> Result<MetricsRecord, DataError> {
    validate_beats(beats, cfg.time_unit)?;
    let pairs = interval_pairs(beats, cfg.time_unit);
    let n = pairs.iter().filter(|p| p.is_nn()).count();
    let stats = match nn_statistics(&pairs) {
        Some(stats) if n >= cfg.min_nn => stats,
        _ => return Ok(MetricsRecord::insufficient(subject_id, n)),
    };
    check_finite(&stats)?;
    Ok(MetricsRecord {
        subject_id: subject_id.to_string(),
        n: Some(stats.n),
        mean_interval_ms: Some(stats.mean_interval_ms),
        mean_rate_bpm: stats.mean_rate_bpm,
        sdnn_ms: stats.sdnn_ms,
        rmssd_ms: stats.rmssd_ms,
        pnn20_pct: Some(stats.pnn20_pct),
        pnn50_pct: Some(stats.pnn50_pct),
    })
}

/// Reject records that would otherwise turn into NaN arithmetic downstream.
pub fn validate_beats(beats: &[BeatRecord], unit: TimeUnit) -> Result<(), DataError> {
    for (index, beat) in beats.iter().enumerate() {
        if !beat.time.is_finite() {
            return Err(DataError::NonFiniteTime {
                index,
                value: beat.time,
            });
        }
        if beat.kind.trim().is_empty() {
            return Err(DataError::MissingType { index });
        }
    }
    let scale = unit.to_ms();
    for (index, w) in beats.windows(2).enumerate() {
        if !((w[1].time - w[0].time) * scale).is_finite() {
            return Err(DataError::NonFiniteInterval { index });
        }
    }
    Ok(())
}

fn check_finite(stats: &NnStats) -> Result<(), DataError> {
    let values = [
        ("mean_interval_ms", Some(stats.mean_ms)),
        ("mean_rate_bpm", stats.mean_rate_bpm),
        ("sdnn_ms", stats.sdnn_ms),
        ("rmssd_ms", stats.rmssd_ms),
    ];
    for (statistic, value) in values {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(DataError::NonFiniteStatistic { statistic });
        }
    }
    Ok(())
}

fn snap_interval(interval_ms: f64) -> f64 {
    let snapped = round_to(interval_ms, INTERVAL_DECIMALS);
    if snapped.is_finite() {
        snapped
    } else {
        interval_ms
    }
}

/// Derive one [`IntervalPair`] per beat that has a successor.
pub fn interval_pairs(beats: &[BeatRecord], unit: TimeUnit) -> Vec<IntervalPair> {
    let scale = unit.to_ms();
    let raw: Vec<(f64, String)> = beats
        .windows(2)
        .map(|w| {
            (
                snap_interval((w[1].time - w[0].time) * scale),
                format!("{}{}", w[0].kind, w[1].kind),
            )
        })
        .collect();
    raw.iter()
        .enumerate()
        .map(|(i, (interval, pair_type))| {
            let next = raw.get(i + 1);
            IntervalPair {
                interval: *interval,
                pair_type: pair_type.clone(),
                next_interval: next.map(|(iv, _)| *iv),
                next_pair_type: next.map(|(_, ty)| ty.clone()),
            }
        })
        .collect()
}

/// Statistics over the NN subset of `pairs`; `None` when there are no NN pairs.
pub fn nn_statistics(pairs: &[IntervalPair]) -> Option<NnStats> {
    let nn: Vec<&IntervalPair> = pairs.iter().filter(|p| p.is_nn()).collect();
    let n = nn.len();
    if n == 0 {
        return None;
    }
    let n_f = n as f64;
    let mean = nn.iter().map(|p| p.interval).sum::<f64>() / n_f;
    let mean_interval_ms = round_to(mean, 0) as i64;
    let mean_rate_bpm = if mean_interval_ms == 0 {
        None
    } else {
        Some(round_to((1000.0 / mean_interval_ms as f64) * 60.0, 1))
    };
    let sdnn_ms = if n > 1 {
        let var = nn.iter().map(|p| (p.interval - mean).powi(2)).sum::<f64>() / (n_f - 1.0);
        Some(round_to(var.sqrt(), 1))
    } else {
        None
    };

    let diffs: Vec<f64> = nn.iter().filter_map(|p| p.diff()).collect();
    let m = diffs.len();
    let rmssd_ms = if m > 0 {
        let mean_sq = diffs.iter().map(|d| d * d).sum::<f64>() / m as f64;
        Some(round_to(mean_sq.sqrt(), 1))
    } else {
        None
    };
    let over = |threshold: f64| diffs.iter().filter(|d| d.abs() > threshold).count() as f64;
    let pnn20_pct = round_to(100.0 * over(20.0) / n_f, 1);
    let pnn50_pct = round_to(100.0 * over(50.0) / n_f, 1);

    Some(NnStats {
        n,
        m,
        mean_ms: mean,
        mean_interval_ms,
        mean_rate_bpm,
        sdnn_ms,
        rmssd_ms,
        pnn20_pct,
        pnn50_pct,
    })
}

/// Round half to even at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
