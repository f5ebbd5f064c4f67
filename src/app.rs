//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the fit configuration
//! - generates synthetic data
//! - runs the fitting pipeline
//! - prints reports

use clap::Parser;
use serde::Serialize;

use crate::cli::{Command, FitArgs, InspectArgs, SignalArgs, SynthArgs};
use crate::data::{DEFAULT_TRUTH, SyntheticSpec, generate_cube, pick_flat_pixels};
use crate::domain::FitConfig;
use crate::error::AppError;
use crate::io::{load_config, to_json_pretty};

pub mod pipeline;

/// Entry point for the `odmr-fit` binary.
pub fn run() -> Result<(), AppError> {
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Synth(args) => handle_synth(args),
        Command::Inspect(args) => handle_inspect(args),
        Command::Config => {
            println!("{}", to_json_pretty(&FitConfig::default())?);
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthReport<'a> {
    synthetic: &'a SyntheticSpec,
    config: &'a FitConfig,
    output: &'a pipeline::FitOutput,
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let mut config = fit_config_from_args(&args.fit)?;
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;

    let flat_pixels = pick_flat_pixels(args.rows * args.cols, args.flat_fraction, args.signal.seed)?;
    let spec = synthetic_spec(&args.signal, args.rows, args.cols, flat_pixels);
    let (cube, axis) = generate_cube(&spec)?;
    let cube = if args.normalize { cube.normalized_by_max() } else { cube };

    let output = pipeline::fit_cube(&cube, &axis, &config)?;

    if args.fit.json {
        let report = SynthReport {
            synthetic: &spec,
            config: &config,
            output: &output,
        };
        println!("{}", to_json_pretty(&report)?);
    } else {
        println!("{}", crate::report::format_run_summary(&cube, &axis, &output, &config));
    }
    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.fit)?;
    let flat_pixels = if args.flat { vec![0] } else { Vec::new() };
    let spec = synthetic_spec(&args.signal, 1, 1, flat_pixels);
    let (cube, axis) = generate_cube(&spec)?;

    let inspection = crate::fit::inspect_pixel(cube.trace(0, 0), &axis, &config)?;

    if args.fit.json {
        println!("{}", to_json_pretty(&inspection)?);
    } else {
        println!("{}", crate::report::format_inspection(&inspection, &axis));
    }
    Ok(())
}

/// Load the configured `FitConfig` and apply command-line overrides.
pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    config.validate()?;
    Ok(config)
}

fn synthetic_spec(signal: &SignalArgs, rows: usize, cols: usize, flat_pixels: Vec<usize>) -> SyntheticSpec {
    SyntheticSpec {
        rows,
        cols,
        samples: signal.samples,
        freq_min: signal.freq_min,
        freq_max: signal.freq_max,
        truth: DEFAULT_TRUTH,
        noise_std: signal.noise,
        flat_pixels,
        seed: signal.seed,
    }
}

/// Rewrite argv so a bare `odmr-fit` runs `odmr-fit synth`.
///
/// Rules:
/// - `odmr-fit`                       -> `odmr-fit synth`
/// - `odmr-fit --rows 4 ...`          -> `odmr-fit synth --rows 4 ...`
/// - `odmr-fit --help/--version/-h`   -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("synth".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "synth".to_string());
    }
    argv
}
