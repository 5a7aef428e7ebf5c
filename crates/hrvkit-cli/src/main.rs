use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use hrvkit_lib::{
    batch::run_batch,
    config::{read_config, BatchConfig},
    io::{
        beats::{list_subject_ids, read_beats_csv, CsvBeatSource},
        table::{OutputFormat, TableSink},
    },
    metrics::hrv::{compute_metrics_with, EngineConfig},
    signal::TimeUnit,
};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "hrvkit",
    version,
    about = "Time-domain HRV summaries from annotated beat files"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TimeUnitArg {
    #[value(name = "s")]
    Seconds,
    #[value(name = "ms")]
    Milliseconds,
}

impl From<TimeUnitArg> for TimeUnit {
    fn from(arg: TimeUnitArg) -> Self {
        match arg {
            TimeUnitArg::Seconds => TimeUnit::Seconds,
            TimeUnitArg::Milliseconds => TimeUnit::Milliseconds,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute HRV metrics for a single `time,type` beat file and print JSON
    Metrics {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value = "s")]
        time_unit: TimeUnitArg,
        #[arg(long, default_value_t = hrvkit_lib::MIN_NN_INTERVALS)]
        min_nn: usize,
    },
    /// Process every beat file in a directory into one summary table
    Batch {
        /// TOML file with batch settings; flags below take precedence
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Required file-name suffix for subject files
        #[arg(long)]
        suffix: Option<String>,
        #[arg(long, value_enum)]
        time_unit: Option<TimeUnitArg>,
        #[arg(long)]
        min_nn: Option<usize>,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level.as_str())).init();
    match cli.command {
        Commands::Metrics {
            input,
            time_unit,
            min_nn,
        } => cmd_metrics(
            &input,
            &EngineConfig {
                time_unit: time_unit.into(),
                min_nn,
            },
        )?,
        Commands::Batch {
            config,
            input_dir,
            out,
            suffix,
            time_unit,
            min_nn,
            format,
        } => {
            let mut cfg = match config {
                Some(path) => read_config(&path)?,
                None => BatchConfig::default(),
            };
            if input_dir.is_some() {
                cfg.input_dir = input_dir;
            }
            if out.is_some() {
                cfg.output = out;
            }
            if let Some(suffix) = suffix {
                cfg.suffix = suffix;
            }
            if let Some(unit) = time_unit {
                cfg.time_unit = unit.into();
            }
            if let Some(min_nn) = min_nn {
                cfg.min_nn = min_nn;
            }
            if let Some(format) = format {
                cfg.format = format.into();
            }
            cmd_batch(&cfg)?
        }
    }
    Ok(())
}

fn subject_id_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn cmd_metrics(input: &Path, engine: &EngineConfig) -> Result<()> {
    let beats = read_beats_csv(input)?;
    let record = compute_metrics_with(&subject_id_for(input), &beats, engine)?;
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}

fn cmd_batch(cfg: &BatchConfig) -> Result<()> {
    let input_dir = cfg
        .input_dir
        .as_deref()
        .ok_or_else(|| anyhow!("no input directory given (use --input-dir or a config file)"))?;
    let output = cfg
        .output
        .as_deref()
        .ok_or_else(|| anyhow!("no output file given (use --out or a config file)"))?;
    let ids = list_subject_ids(input_dir)?;
    if ids.is_empty() {
        anyhow::bail!("{} contains no files", input_dir.display());
    }
    info!("input directory: {}", input_dir.display());

    let source = CsvBeatSource::new(input_dir);
    let mut sink = TableSink::new(output, cfg.format);
    let report = run_batch(&ids, &source, &mut sink, &cfg.batch_options())
        .with_context(|| format!("writing summary to {}", output.display()))?;
    info!(
        "wrote {} row(s) to {}",
        report.records.len(),
        output.display()
    );
    Ok(())
}
