//! Binary entrypoint: read one JSON document, write one JSON document to stdout.
//!
//! - `analyze`: DiffSummary in, AnalysisReport out.
//! - `score`: ChangeFeatures in, RiskPrediction out.
//! - `prioritize`: PrioritizeInput in, ranked PrioritizedTest list out
//!   (or a TestPlan with `--plan`).
//!
//! Failures are written to stdout as an ErrorOutput and exit with status 1.
//! Logs go to stderr, filtered by `IMPACT_ENGINE_LOG` (default `warn`).

use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use impact_engine::types::ErrorOutput;
use impact_engine::{ChangeFeatures, Config, DiffSummary, Engine, EngineError, PrioritizeInput};

#[derive(Debug, Parser)]
#[command(name = "impact-engine", version, about = "Change risk scoring and test prioritization")]
struct Cli {
  /// TOML config file.
  #[arg(long, global = true, env = "IMPACT_ENGINE_CONFIG")]
  config: Option<PathBuf>,

  /// XGBoost JSON dump; overrides `model_path` from the config file.
  #[arg(long, global = true, env = "IMPACT_ENGINE_MODEL")]
  model: Option<PathBuf>,

  /// Read input from a file instead of stdin.
  #[arg(long, global = true)]
  input: Option<PathBuf>,

  /// Pretty-print the output JSON.
  #[arg(long, global = true)]
  pretty: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Extract features from a diff summary, then score and classify them.
  Analyze,
  /// Score and classify pre-extracted change features.
  Score,
  /// Rank test candidates against a risk verdict.
  Prioritize {
    /// Emit the full plan (selection, counts, risk context).
    #[arg(long)]
    plan: bool,
  },
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_env("IMPACT_ENGINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let pretty = cli.pretty;
  if let Err(e) = run(cli) {
    let mut out = ErrorOutput::new(e.kind(), e.to_string());
    if let EngineError::Extraction { field, .. } = &e {
      out = out.with_field(field.clone());
    }
    tracing::error!(kind = e.kind(), "{}", e);
    let _ = write_json(&out, pretty);
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<(), EngineError> {
  let mut config = match &cli.config {
    Some(path) => Config::from_file(path)?,
    None => Config::default(),
  };
  if let Some(model) = cli.model {
    config.model_path = Some(model);
  }
  let engine = Engine::new(config);
  let raw = read_input(cli.input.as_ref())?;

  match cli.command {
    Command::Analyze => {
      let summary: DiffSummary = serde_json::from_str(&raw)?;
      write_json(&engine.analyze(&summary)?, cli.pretty)
    }
    Command::Score => {
      let features: ChangeFeatures = serde_json::from_str(&raw)?;
      write_json(&engine.assess(&features)?, cli.pretty)
    }
    Command::Prioritize { plan } => {
      let input: PrioritizeInput = serde_json::from_str(&raw)?;
      if plan {
        write_json(&engine.plan(&input.candidates, &input.verdict)?, cli.pretty)
      } else {
        write_json(&engine.prioritize(&input.candidates, &input.verdict)?, cli.pretty)
      }
    }
  }
}

fn read_input(path: Option<&PathBuf>) -> Result<String, EngineError> {
  match path {
    Some(p) => Ok(std::fs::read_to_string(p)?),
    None => {
      let mut raw = String::new();
      io::stdin().lock().read_to_string(&mut raw)?;
      Ok(raw)
    }
  }
}

fn write_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), EngineError> {
  let json = if pretty {
    serde_json::to_vec_pretty(value)?
  } else {
    serde_json::to_vec(value)?
  };
  let mut out = io::stdout().lock();
  out.write_all(&json)?;
  writeln!(out)?;
  Ok(())
}
