//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the fit / sweep pipeline
//! - prints reports
//! - writes optional exports
//! - re-prints exported reports

use clap::Parser;

use crate::cli::{Command, FitArgs, InputArgs, ModelArgs, ShowArgs, SimulateArgs, SweepArgs};
use crate::data::{SampleConfig, generate_sample};
use crate::error::AppError;
use crate::io::{ColumnSpec, XColumn};

pub mod pipeline;

use pipeline::RunConfig;

/// Entry point for the `gfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Sweep(args) => handle_sweep(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config(&args.input, &args.model, args.lagrange, !args.quiet);
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_fit_summary(&run.report));

    if let Some(path) = &args.export {
        crate::io::write_report_json(path, &run.report)?;
        eprintln!("Wrote {}", path.display());
    }

    Ok(())
}

fn handle_sweep(args: SweepArgs) -> Result<(), AppError> {
    let config = run_config(&args.input, &args.model, 1.0, false);
    let (observations, points) = pipeline::run_sweep(&config, &args.lagrange)?;

    println!(
        "{}",
        crate::report::format_sweep_table(&points, config.model.param_names(), &observations.labels)
    );
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        model: args.model,
        params: args.params,
        n_samples: args.samples,
        x_start: args.x_start,
        x_step: args.x_step,
        noise: args.noise,
        seed: args.seed,
        labels: ["y0".to_string(), "y1".to_string()],
    };
    let sample = generate_sample(&config)?;
    crate::io::write_observations_csv(&args.output, &sample)?;
    eprintln!("Wrote {} samples to {}", sample.n_samples(), args.output.display());
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = crate::io::read_report_json(&args.report)?;
    println!("{}", crate::report::format_fit_summary(&report));
    Ok(())
}

pub fn run_config(input: &InputArgs, model: &ModelArgs, lagrange: f64, verbose: bool) -> RunConfig {
    let x = match &input.date_col {
        Some(name) => XColumn::Date(name.clone()),
        None => XColumn::Numeric(input.x_col.clone()),
    };
    RunConfig {
        csv: input.csv.clone(),
        columns: ColumnSpec {
            x,
            y0: input.y0_col.clone(),
            y1: input.y1_col.clone(),
        },
        model: model.model,
        p0: model.p0.clone(),
        bounds: model.bounds.clone(),
        norm: model.norm,
        lagrange,
        tol: model.tol,
        verbose,
    }
}
