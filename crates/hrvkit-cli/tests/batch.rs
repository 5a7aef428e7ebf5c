use assert_cmd::cargo::cargo_bin_cmd;
use hrvkit_lib::signal::MetricsRecord;
use std::{error::Error, fs, path::PathBuf};
use tempfile::tempdir;

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .expect("crates dir")
        .parent()
        .expect("workspace root")
        .to_path_buf()
}

fn dataset_dir() -> String {
    workspace_root()
        .join("test_data/dataset")
        .to_string_lossy()
        .to_string()
}

#[test]
fn batch_writes_summary_table() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let out = temp.path().join("fantasia.csv");

    let mut cmd = cargo_bin_cmd!("hrvkit");
    cmd.args([
        "batch",
        "--input-dir",
        &dataset_dir(),
        "--out",
        out.to_str().expect("utf8 path"),
    ]);
    cmd.assert().success();

    let contents = fs::read_to_string(&out)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "subject_id,n,mean_interval_ms,mean_rate_bpm,sdnn_ms,rmssd_ms,pnn20_pct,pnn50_pct",
            "f1o01.csv,627,851,70.5,34.9,48.5,70.8,33.0",
            "f1y05.csv,719,948,63.3,16.5,23.6,45.8,1.3",
            "f2o09.csv,,,,,,,",
            "f2y02.csv,7,,,,,,",
        ]
    );
    Ok(())
}

#[test]
fn batch_reads_config_and_flags_override() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let out = temp.path().join("summary.json");
    let config = temp.path().join("batch.toml");
    fs::write(
        &config,
        format!(
            "input_dir = {:?}\noutput = {:?}\nmin_nn = 5\n",
            dataset_dir(),
            temp.path().join("unused.csv").to_string_lossy()
        ),
    )?;

    let mut cmd = cargo_bin_cmd!("hrvkit");
    cmd.args([
        "batch",
        "--config",
        config.to_str().expect("utf8 path"),
        "--out",
        out.to_str().expect("utf8 path"),
        "--format",
        "json",
    ]);
    cmd.assert().success();

    assert!(!temp.path().join("unused.csv").exists());
    let rows: Vec<MetricsRecord> = serde_json::from_str(&fs::read_to_string(&out)?)?;
    assert_eq!(rows.len(), 4);
    // the lowered gate now reports the short recording
    let short = &rows[3];
    assert_eq!(short.subject_id, "f2y02.csv");
    assert_eq!(short.n, Some(7));
    assert!(short.mean_interval_ms.is_some());
    assert_eq!(rows[2], MetricsRecord::failed("f2o09.csv"));
    Ok(())
}

#[test]
fn batch_suffix_filter_skips_everything() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let out = temp.path().join("empty.csv");
    let mut cmd = cargo_bin_cmd!("hrvkit");
    cmd.args([
        "batch",
        "--input-dir",
        &dataset_dir(),
        "--out",
        out.to_str().expect("utf8 path"),
        "--suffix",
        ".tsv",
    ]);
    cmd.assert().success();
    let contents = fs::read_to_string(&out)?;
    assert_eq!(contents.lines().count(), 1);
    Ok(())
}

#[test]
fn batch_requires_existing_directory() {
    let temp = tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("hrvkit");
    cmd.args([
        "batch",
        "--input-dir",
        temp.path().join("missing").to_str().unwrap(),
        "--out",
        temp.path().join("out.csv").to_str().unwrap(),
    ]);
    cmd.assert().failure();

    let mut cmd = cargo_bin_cmd!("hrvkit");
    cmd.args(["batch", "--input-dir", &dataset_dir()]);
    cmd.assert().failure();
}
