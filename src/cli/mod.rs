//! Command-line parsing for the ODMR double-Lorentzian fitter.
//!
//! Argument parsing and command dispatch stay separate from the fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "odmr-fit", version, about = "Per-pixel double-Lorentzian fitting of ODMR cubes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a synthetic cube, fit every pixel, and print the run report.
    Synth(SynthArgs),
    /// Fit one synthetic pixel and print every intermediate step.
    Inspect(InspectArgs),
    /// Print the default fit configuration as JSON.
    Config,
}

/// Shape and noise of the synthetic signal.
#[derive(Debug, Args, Clone)]
pub struct SignalArgs {
    /// Samples per trace.
    #[arg(long, default_value_t = 100)]
    pub samples: usize,

    /// Lowest swept frequency (GHz).
    #[arg(long, default_value_t = 2.85)]
    pub freq_min: f64,

    /// Highest swept frequency (GHz).
    #[arg(long, default_value_t = 2.89)]
    pub freq_max: f64,

    /// Standard deviation of additive Gaussian noise.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Random seed for noise and flat-pixel selection.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options shared by every fitting command.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Fit config JSON; fields not named keep their defaults.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Override the configured epoch count.
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Print machine-readable JSON instead of the text report.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Grid rows.
    #[arg(long, default_value_t = 8)]
    pub rows: usize,

    /// Grid columns.
    #[arg(long, default_value_t = 8)]
    pub cols: usize,

    /// Fraction of pixels that carry no resonance.
    #[arg(long, default_value_t = 0.1)]
    pub flat_fraction: f64,

    /// Divide every trace by its own maximum before fitting.
    #[arg(long)]
    pub normalize: bool,

    /// Override the configured batch size.
    #[arg(long)]
    pub batch_size: Option<usize>,

    #[command(flatten)]
    pub signal: SignalArgs,

    #[command(flatten)]
    pub fit: FitArgs,
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    /// Generate a flat (noise-only) pixel instead of a resonant one.
    #[arg(long)]
    pub flat: bool,

    #[command(flatten)]
    pub signal: SignalArgs,

    #[command(flatten)]
    pub fit: FitArgs,
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
    fn parses_synth_overrides() {
        let cli = Cli::parse_from([
            "odmr-fit", "synth", "--rows", "2", "--cols", "3", "--noise", "0", "--epochs", "10", "--json",
        ]);
        match cli.command {
            Command::Synth(args) => {
                assert_eq!((args.rows, args.cols), (2, 3));
                assert_eq!(args.signal.noise, 0.0);
                assert_eq!(args.fit.epochs, Some(10));
                assert!(args.fit.json);
                assert!(args.fit.config.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_config_subcommand() {
        let cli = Cli::parse_from(["odmr-fit", "config"]);
        assert!(matches!(cli.command, Command::Config));
    }
}
