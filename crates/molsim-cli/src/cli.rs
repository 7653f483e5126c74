use clap::{Args, Parser, Subcommand, ValueEnum};
use molsim::engine::minimizer::MinimizationAlgorithm;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "molsim CLI - Time-stepped molecular dynamics and energy minimization over plain-text structure files.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run time-stepped molecular dynamics over a structure file.
    Run(RunArgs),
    /// Relax a structure to a local potential-energy minimum.
    Minimize(MinimizeArgs),
    /// Print composition and energy information about a structure file.
    Info(InfoArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the final structure; omit to discard the end geometry.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Number of integration steps.
    #[arg(short, long, default_value_t = 1000, value_name = "INT")]
    pub steps: u64,

    /// Integration time step.
    #[arg(short, long, default_value_t = 1e-3, value_name = "FLOAT")]
    pub timestep: f64,

    /// Thermostat target temperature in Kelvin; 0 disables the thermostat.
    #[arg(short = 'T', long, default_value_t = 0.0, value_name = "FLOAT")]
    pub temperature: f64,

    /// Apply the velocity-rescale thermostat every N steps.
    #[arg(long, default_value_t = 1, value_name = "INT")]
    pub thermostat_interval: u64,

    /// Draw initial velocities from a Maxwell-Boltzmann distribution at this
    /// temperature before the run.
    #[arg(long, value_name = "FLOAT")]
    pub init_velocities: Option<f64>,

    /// Seed for the initial-velocity distribution.
    #[arg(long, default_value_t = 0, value_name = "INT")]
    pub seed: u64,

    /// Override the built-in force-field parameters with a TOML file.
    #[arg(long, value_name = "PATH")]
    pub forcefield: Option<PathBuf>,

    /// Export the per-step (kinetic, potential) energy history as CSV.
    #[arg(long, value_name = "PATH")]
    pub energy_csv: Option<PathBuf>,
}

/// Arguments for the `minimize` subcommand.
#[derive(Args, Debug)]
pub struct MinimizeArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the relaxed structure; omit to discard it.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Descent algorithm.
    #[arg(short, long, value_enum, default_value_t = AlgorithmArg::SteepestDescent)]
    pub algorithm: AlgorithmArg,

    /// Convergence tolerance on the maximum per-atom force norm.
    #[arg(long, default_value_t = 1e-4, value_name = "FLOAT")]
    pub tolerance: f64,

    /// Iteration cap.
    #[arg(long, default_value_t = 500, value_name = "INT")]
    pub max_iterations: u64,

    /// Initial displacement scale of the adaptive line search.
    #[arg(long, default_value_t = 0.01, value_name = "FLOAT")]
    pub step_size: f64,

    /// Override the built-in force-field parameters with a TOML file.
    #[arg(long, value_name = "PATH")]
    pub forcefield: Option<PathBuf>,
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Path to the input structure file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Override the built-in force-field parameters with a TOML file.
    #[arg(long, value_name = "PATH")]
    pub forcefield: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmArg {
    SteepestDescent,
    ConjugateGradient,
}

impl From<AlgorithmArg> for MinimizationAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::SteepestDescent => MinimizationAlgorithm::SteepestDescent,
            AlgorithmArg::ConjugateGradient => MinimizationAlgorithm::ConjugateGradient,
        }
    }
}
