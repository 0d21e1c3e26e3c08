//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - runs the pipeline once per requested institution
//! - writes report JSON and prints summaries

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{CheckArgs, Cli, Command, ConfigSource, RunArgs, ShowArgs};
use crate::error::AppError;
use crate::io::config::{config_path, load_institution_config};
use crate::io::report::{default_report_path, read_report_json, write_report_json};
use crate::report::{format_config_summary, format_report_summary, format_row_errors};

pub mod pipeline;

/// Skipped CSV rows listed in the terminal summary before eliding the rest.
const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Entry point for the `odds` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `odds --bank FED ...` behaves like `odds run --bank FED ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Check(args) => handle_check(args),
        Command::Show(args) => handle_show(args),
    }
}

/// Logs go to stderr so report output on stdout stays clean.
///
/// `RUST_LOG` wins over the verbosity flags when set.
fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "rate_odds=debug"
    } else if quiet {
        "rate_odds=warn"
    } else {
        "rate_odds=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) is a no-op.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// One institution to run: its config path and its quote file.
#[derive(Debug, Clone, PartialEq)]
struct Job {
    label: String,
    config: PathBuf,
    quotes: PathBuf,
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let run_date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let jobs = plan_jobs(&args)?;
    if args.output.is_some() && jobs.len() > 1 {
        return Err(AppError::new(2, "`--output` can only be used with a single institution."));
    }

    let mut failures: Vec<(String, AppError)> = Vec::new();
    for job in &jobs {
        if let Err(err) = run_job(job, &args, run_date) {
            error!(institution = %job.label, exit_code = err.exit_code(), "{err}");
            failures.push((job.label.clone(), err));
        }
    }

    match failures.len() {
        0 => Ok(()),
        // A single failure keeps its own exit code.
        1 if jobs.len() == 1 => Err(failures.remove(0).1),
        _ => {
            let exit_code = failures.iter().map(|(_, e)| e.exit_code()).max().unwrap_or(1);
            let names: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
            Err(AppError::new(
                exit_code,
                format!("{} of {} institution run(s) failed: {}", failures.len(), jobs.len(), names.join(", ")),
            ))
        }
    }
}

fn run_job(job: &Job, args: &RunArgs, run_date: NaiveDate) -> Result<(), AppError> {
    let out = pipeline::run_pipeline(&job.config, &job.quotes, run_date, args.data_source.as_deref())?;

    let path = match &args.output {
        Some(path) => path.clone(),
        None => default_report_path(&args.output_dir, out.config.id()),
    };
    write_report_json(&path, &out.report)?;
    info!(institution = out.config.id(), path = %path.display(), "report written");

    if !args.no_summary {
        println!("{}", format_report_summary(&out.report));
        let skipped = format_row_errors(&out.ingest.row_errors, MAX_ROW_ERRORS_SHOWN);
        if !skipped.is_empty() {
            println!("{skipped}");
        }
    }
    Ok(())
}

/// Pair each config with its quote file, in argument order.
fn plan_jobs(args: &RunArgs) -> Result<Vec<Job>, AppError> {
    let configs = config_paths(&args.source);
    if configs.len() != args.quotes.len() {
        return Err(AppError::new(
            2,
            format!(
                "Got {} institution(s) but {} quote file(s); pass one `--quotes` per institution.",
                configs.len(),
                args.quotes.len()
            ),
        ));
    }
    Ok(configs
        .into_iter()
        .zip(args.quotes.iter())
        .map(|((label, config), quotes)| Job {
            label,
            config,
            quotes: quotes.clone(),
        })
        .collect())
}

fn config_paths(source: &ConfigSource) -> Vec<(String, PathBuf)> {
    match &source.config {
        Some(path) => vec![(path.display().to_string(), path.clone())],
        None => source
            .banks
            .iter()
            .map(|code| (code.trim().to_ascii_uppercase(), config_path(&source.config_dir, code)))
            .collect(),
    }
}

fn handle_check(args: CheckArgs) -> Result<(), AppError> {
    let mut first_err: Option<AppError> = None;
    for (label, path) in config_paths(&args.source) {
        match load_institution_config(&path) {
            Ok(config) => {
                println!("ok   {}", path.display());
                print!("{}", format_config_summary(&config));
            }
            Err(err) => {
                println!("FAIL {label}: {err}");
                first_err.get_or_insert(err);
            }
        }
    }
    first_err.map_or(Ok(()), Err)
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = read_report_json(&args.report)?;
    if args.json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::new(2, format!("Failed to render report JSON: {e}")))?;
        println!("{text}");
    } else {
        println!("{}", format_report_summary(&report));
    }
    Ok(())
}

/// Rewrite argv so that a bare flag list defaults to `odds run`.
///
/// Rules:
/// - `odds --bank FED ...`       -> `odds run --bank FED ...`
/// - `odds --help/--version/-h`  -> unchanged (show top-level help/version)
/// - `odds`                      -> unchanged (clap prints usage)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    let is_subcommand = matches!(arg1.as_str(), "run" | "check" | "show");
    let is_global_flag = matches!(arg1.as_str(), "-v" | "--verbose" | "-q" | "--quiet");
    if is_top_level_help_or_version || is_subcommand || is_global_flag {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
    }
    argv
}
