//! Command-line parsing for the `odds` binary.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! engine and I/O code. Dispatch lives in `app`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "odds",
    version,
    about = "Central-bank policy probabilities from rate futures"
)]
pub struct Cli {
    /// More log output (debug level).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute next-meeting probabilities and write one report per institution.
    Run(RunArgs),
    /// Validate institution configs without reading any quotes.
    Check(CheckArgs),
    /// Print a previously written report JSON.
    Show(ShowArgs),
}

/// Where institution configs come from.
#[derive(Debug, Args, Clone)]
pub struct ConfigSource {
    /// Institution code(s), e.g. `--bank FED --bank ECB`. Each loads `<config-dir>/<code>.yaml`.
    #[arg(short, long = "bank", value_name = "CODE", required_unless_present = "config")]
    pub banks: Vec<String>,

    /// Explicit config file (instead of `--bank`).
    #[arg(long, value_name = "YAML", conflicts_with = "banks")]
    pub config: Option<PathBuf>,

    /// Directory holding `<code>.yaml` configs.
    #[arg(long, env = "RATE_ODDS_CONFIG_DIR", default_value = "configs")]
    pub config_dir: PathBuf,
}

/// Options for `odds run`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Quote CSV(s), one per institution, in the same order as `--bank`.
    #[arg(long, value_name = "CSV", required = true)]
    pub quotes: Vec<PathBuf>,

    /// Run date (YYYY-MM-DD). Meetings before this date are ignored. Defaults to today.
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Override the data-source label written into report metadata.
    #[arg(long, value_name = "LABEL")]
    pub data_source: Option<String>,

    /// Exact report path (single institution only).
    #[arg(short, long, value_name = "JSON")]
    pub output: Option<PathBuf>,

    /// Directory for `<code>.json` reports.
    #[arg(long, env = "RATE_ODDS_OUTPUT_DIR", default_value = "out")]
    pub output_dir: PathBuf,

    /// Do not print the terminal summary.
    #[arg(long)]
    pub no_summary: bool,
}

/// Options for `odds check`.
#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: ConfigSource,
}

/// Options for `odds show`.
#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Report JSON produced by `odds run`.
    #[arg(value_name = "JSON")]
    pub report: PathBuf,

    /// Print the raw JSON instead of the summary.
    #[arg(long)]
    pub json: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_multiple_banks() {
        let cli = Cli::try_parse_from([
            "odds", "run", "--bank", "FED", "--bank", "ECB", "--quotes", "a.csv", "--quotes", "b.csv", "--date",
            "2026-10-16", "-q",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(cli.quiet);
        assert_eq!(args.source.banks, vec!["FED", "ECB"]);
        assert_eq!(args.quotes.len(), 2);
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2026, 10, 16));
    }

    #[test]
    fn bank_or_config_is_required() {
        assert!(Cli::try_parse_from(["odds", "check"]).is_err());
        assert!(Cli::try_parse_from(["odds", "check", "--config", "x.yaml"]).is_ok());
        assert!(Cli::try_parse_from(["odds", "check", "--config", "x.yaml", "--bank", "FED"]).is_err());
    }

    #[test]
    fn bad_dates_are_rejected() {
        let res = Cli::try_parse_from(["odds", "run", "--bank", "FED", "--quotes", "a.csv", "--date", "16/10/2026"]);
        assert!(res.is_err());
    }
}
