use serde::{Deserialize, Serialize};

/// Beat-type code for a normal sinus beat.
pub const NORMAL_BEAT: &str = "N";

/// One annotated heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatRecord {
    /// Timestamp of the beat, in the unit selected by [`TimeUnit`].
    pub time: f64,
    /// Annotation code (`"N"` for normal beats).
    #[serde(rename = "type")]
    pub kind: String,
}

impl BeatRecord {
    pub fn new(time: f64, kind: impl Into<String>) -> Self {
        Self {
            time,
            kind: kind.into(),
        }
    }

    pub fn is_normal(&self) -> bool {
        self.kind == NORMAL_BEAT
    }
}

/// Unit of the `time` column in beat records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    /// Factor converting a timestamp difference in this unit to milliseconds.
    pub fn to_ms(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1000.0,
            TimeUnit::Milliseconds => 1.0,
        }
    }
}

/// Interval between beat `i` and beat `i + 1`, plus the look-ahead to the
/// following interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalPair {
    /// Interval length in milliseconds.
    pub interval: f64,
    /// Concatenated type codes of the two beats, e.g. `"NN"` or `"NV"`.
    pub pair_type: String,
    /// Interval formed by beats `i + 1` and `i + 2`, if beat `i + 2` exists.
    pub next_interval: Option<f64>,
    pub next_pair_type: Option<String>,
}

impl IntervalPair {
    pub fn is_nn(&self) -> bool {
        self.pair_type == "NN"
    }

    pub fn next_is_nn(&self) -> bool {
        self.next_pair_type.as_deref() == Some("NN")
    }

    /// Successive difference, defined only when the following pair is also NN.
    pub fn diff(&self) -> Option<f64> {
        if self.next_is_nn() {
            self.next_interval.map(|next| self.interval - next)
        } else {
            None
        }
    }
}

/// Per-subject HRV summary row.
///
/// `n` is `None` only when the subject could not be processed at all; the six
/// metric fields are `None` whenever fewer NN intervals than the reporting
/// threshold were found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub subject_id: String,
    pub n: Option<usize>,
    pub mean_interval_ms: Option<i64>,
    pub mean_rate_bpm: Option<f64>,
    pub sdnn_ms: Option<f64>,
    pub rmssd_ms: Option<f64>,
    pub pnn20_pct: Option<f64>,
    pub pnn50_pct: Option<f64>,
}

impl MetricsRecord {
    /// Record with a known NN count and no reported metrics.
    pub fn insufficient(subject_id: impl Into<String>, n: usize) -> Self {
        Self {
            n: Some(n),
            ..Self::failed(subject_id)
        }
    }

    /// All-null record used when a subject fails to load or compute.
    pub fn failed(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            n: None,
            mean_interval_ms: None,
            mean_rate_bpm: None,
            sdnn_ms: None,
            rmssd_ms: None,
            pnn20_pct: None,
            pnn50_pct: None,
        }
    }

    pub fn has_metrics(&self) -> bool {
        self.mean_interval_ms.is_some()
    }
}
