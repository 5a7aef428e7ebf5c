use crate::batch::BeatSource;
use crate::error::FetchError;
use crate::signal::BeatRecord;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::warn;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Reads `<root>/<subject_id>` as a `time,type` CSV file.
#[derive(Debug, Clone)]
pub struct CsvBeatSource {
    root: PathBuf,
}

impl CsvBeatSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BeatSource for CsvBeatSource {
    fn fetch(&self, subject_id: &str) -> Result<Vec<BeatRecord>, FetchError> {
        read_beats_csv(&self.root.join(subject_id))
    }
}

/// Load an annotated beat file.
///
/// Extra columns are ignored. Empty or non-numeric `time` cells are kept as
/// NaN and empty `type` cells as `""` so the metric engine can report them.
pub fn read_beats_csv(path: &Path) -> Result<Vec<BeatRecord>, FetchError> {
    if !path.is_file() {
        return Err(FetchError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_err = |source: csv::Error| FetchError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(file);
    let headers = reader.headers().map_err(csv_err)?.clone();
    let time_idx = locate_column(&headers, "time").ok_or_else(|| FetchError::MissingColumn {
        path: path.to_path_buf(),
        column: "time",
    })?;
    let type_idx = locate_column(&headers, "type").ok_or_else(|| FetchError::MissingColumn {
        path: path.to_path_buf(),
        column: "type",
    })?;

    let mut beats = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let time = record
            .get(time_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(f64::NAN);
        let kind = record.get(type_idx).unwrap_or_default().to_string();
        beats.push(BeatRecord { time, kind });
    }
    Ok(beats)
}

/// File names of the regular files in `dir`, sorted so batch order is stable.
///
/// Symlinks are followed. Entries that are not files or whose names are not
/// valid UTF-8 are dropped with a warning.
pub fn list_subject_ids(dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        let is_file = match fs::metadata(&path) {
            Ok(meta) => meta.is_file(),
            Err(err) => {
                warn!("skipping {}: {}", path.display(), err);
                continue;
            }
        };
        if !is_file {
            warn!("skipping {}: not a regular file", path.display());
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => ids.push(name),
            Err(raw) => warn!("skipping {:?}: file name is not valid UTF-8", raw),
        }
    }
    ids.sort();
    Ok(ids)
}

fn locate_column(headers: &StringRecord, requested: &str) -> Option<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
}
