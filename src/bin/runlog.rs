//! `runlog` command line: record a finished job as a tracking run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runlog::{
    log_experiment, ExperimentReport, MemoryTrackingClient, MlflowClient, RunLogger,
    TrackingClient, TrackingConfig,
};

#[derive(Parser)]
#[command(name = "runlog")]
#[command(about = "Log runs to an MLflow-compatible tracking server", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[arg(long, short, global = true, help = "Show debug output")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ConfigArgs {
    #[arg(long, short, help = "YAML config file")]
    config: PathBuf,

    #[arg(long, help = "Override tracking_uri from the config file")]
    tracking_uri: Option<String>,

    #[arg(long, help = "Override experiment_name from the config file")]
    experiment: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a run and log params, metrics and an artifacts directory")]
    Log {
        #[command(flatten)]
        config: ConfigArgs,

        #[arg(long, help = "Run name")]
        run_name: String,

        #[arg(long, help = "JSON object of parameters")]
        params: Option<PathBuf>,

        #[arg(long, help = "JSON object of metrics (numbers or arrays of numbers)")]
        metrics: Option<PathBuf>,

        #[arg(long, help = "Directory uploaded as the run's artifacts")]
        artifacts: PathBuf,

        #[arg(long, help = "Log to an in-memory backend instead of the server")]
        dry_run: bool,
    },

    #[command(about = "Validate the config and resolve the experiment")]
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn load_config(args: &ConfigArgs) -> Result<TrackingConfig> {
    let mut config = TrackingConfig::from_yaml_file(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?
        .with_env_overrides()?;
    if let Some(uri) = &args.tracking_uri {
        config = config.with_tracking_uri(uri);
    }
    if let Some(name) = &args.experiment {
        config = config.with_experiment_name(name);
    }
    config.validate()?;
    Ok(config)
}

fn cmd_log(
    config: TrackingConfig,
    report: &ExperimentReport,
    dry_run: bool,
) -> Result<()> {
    let run_id = if dry_run {
        let mut client = MemoryTrackingClient::new();
        let run_id = log_experiment(&mut client, config, report)?;
        println!("dry run: {} calls", client.calls().len());
        run_id
    } else {
        let client = MlflowClient::new(&config)?;
        log_experiment(client, config, report)?
    };
    println!("{run_id}");
    Ok(())
}

fn cmd_check<C: TrackingClient>(client: C, config: TrackingConfig) -> Result<()> {
    let name = config.experiment_name().to_string();
    let logger = RunLogger::new(client, config)?;
    println!("experiment '{name}' -> {}", logger.experiment_id());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "runlog=debug" } else { "runlog=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::Log {
            config,
            run_name,
            params,
            metrics,
            artifacts,
            dry_run,
        } => {
            let config = load_config(&config)?;
            let mut report = ExperimentReport::new(run_name, artifacts);
            if let Some(path) = params {
                report = report
                    .params_from_json_file(&path)
                    .with_context(|| format!("failed to read params {}", path.display()))?;
            }
            if let Some(path) = metrics {
                report = report
                    .metrics_from_json_file(&path)
                    .with_context(|| format!("failed to read metrics {}", path.display()))?;
            }
            cmd_log(config, &report, dry_run)?;
        }
        Commands::Check { config } => {
            let config = load_config(&config)?;
            let client = MlflowClient::new(&config)?;
            cmd_check(client, config)?;
        }
    }

    Ok(())
}
