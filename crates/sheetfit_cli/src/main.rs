//! `sheetfit` command-line entry point.

mod cli;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sheetfit_io_fs::{EnumFileOutcome, ReportFit, expand_preset_paths, fit_files, plan_fit_tasks};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, build_fit_config};
use crate::config::load_file_config;

const N_EXIT_FILE_FAILED: u8 = 1;
const N_EXIT_CONFIGURATION: u8 = 2;

fn init_tracing(n_verbose: u8) {
    let c_level_default = match n_verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(c_level_default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Collect input paths; `None` when nothing was requested.
fn resolve_inputs(args: &Args, default_files: &[String]) -> Result<Option<Vec<PathBuf>>> {
    let l_paths = if args.use_defaults {
        expand_preset_paths(default_files).context("failed to expand default_files")?
    } else {
        args.files.clone()
    };
    Ok(if l_paths.is_empty() {
        None
    } else {
        Some(l_paths)
    })
}

fn print_report(report: &ReportFit) {
    for outcome in &report.outcomes {
        match &outcome.outcome {
            EnumFileOutcome::Success { path_file_out, .. } => {
                println!(
                    "OK   {} -> {}",
                    outcome.path_file_in.display(),
                    path_file_out.display()
                );
            }
            EnumFileOutcome::Failure(err) => {
                eprintln!("FAIL {err}");
            }
        }
    }
    for warning in &report.warnings {
        eprintln!("WARN {warning}");
    }
    println!("{report}");
}

fn run(args: &Args) -> Result<ExitCode> {
    let file_cfg = load_file_config(args.config.as_deref())?;
    let config = build_fit_config(args, &file_cfg).context("invalid configuration")?;

    let Some(l_paths_in) = resolve_inputs(args, &file_cfg.default_files)? else {
        eprintln!("No input files. Pass FILES... or --use-defaults with `default_files` configured.");
        return Ok(ExitCode::from(N_EXIT_FILE_FAILED));
    };
    let l_tasks = plan_fit_tasks(&l_paths_in, args.output.as_deref())?;
    info!(n_files = l_tasks.len(), "starting fit run");

    let report = fit_files(&l_tasks, &config)?;
    print_report(&report);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(N_EXIT_FILE_FAILED)
    })
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(N_EXIT_CONFIGURATION)
        }
    }
}
