/// This module governs the command line interface
mod commands;
mod configuration;
mod error;
mod input;
mod styles;
mod telemetry;

use clap::{ArgEnum, Parser, Subcommand};
use configuration::Configuration;
use error::AppError;
use std::path::PathBuf;
use styles::Styles;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct App {
    #[clap(arg_enum, short, long, default_value = "info")]
    log_level: LogLevel,
    /// Directory receiving the results and the log, overriding the configuration
    #[clap(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ArgEnum)]
pub(crate) enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{}", level)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ArgEnum)]
pub(crate) enum ProjectionArg {
    Species,
    Atoms,
}

#[derive(Subcommand)]
enum Command {
    /// Print a summary of one or more calculations
    Inspect {
        /// Path or glob pattern of the OUTCAR files
        pattern: String,
        /// DOSCAR read alongside, a sibling DOSCAR is used when absent
        #[clap(long, parse(from_os_str))]
        doscar: Option<PathBuf>,
    },
    /// Write the density of states of a calculation to `dos.csv`
    Dos {
        #[clap(parse(from_os_str))]
        outcar: PathBuf,
        #[clap(parse(from_os_str))]
        doscar: PathBuf,
        #[clap(arg_enum, long)]
        projection: Option<ProjectionArg>,
        /// Species or atom labels drawn in the projection
        #[clap(long, use_value_delimiter = true)]
        select: Vec<String>,
        /// Sum the orbitals of each projected curve
        #[clap(long)]
        total_projected: bool,
        /// Measure energies from the Fermi level
        #[clap(long)]
        fermi_shift: bool,
        /// Merge the spin channels of polarised runs
        #[clap(long)]
        no_spin: bool,
    },
    /// Write the band diagram of a band structure calculation to `bands.csv`
    Bands {
        #[clap(parse(from_os_str))]
        outcar: PathBuf,
        /// Measure energies from the valence band maximum
        #[clap(long)]
        vbm_shift: bool,
        /// Report the bands holding the band edges
        #[clap(long)]
        highlight: bool,
        /// Names of the high symmetry points along the path
        #[clap(long, use_value_delimiter = true)]
        kpoints: Vec<String>,
    },
    /// Run the defect studies described by one or more study files
    Study {
        #[clap(required = true, parse(from_os_str))]
        files: Vec<PathBuf>,
        /// Name of the material when several studies are compared
        #[clap(long)]
        material: Option<String>,
    },
}

pub fn run() -> color_eyre::Result<()> {
    let cli = App::parse();
    let config = Configuration::build()?;

    let output = cli
        .output
        .unwrap_or_else(|| config.output.directory.clone());
    std::fs::create_dir_all(&output).map_err(|source| AppError::OutputDirectory {
        path: output.clone(),
        source,
    })?;

    let (subscriber, _guard) = telemetry::get_subscriber(cli.log_level, &output);
    telemetry::init_subscriber(subscriber)?;
    tracing::debug!("Writing results to {}", output.display());

    let styles = Styles::for_stdout();
    let term = console::Term::stdout();

    match cli.command {
        Command::Inspect { pattern, doscar } => {
            commands::inspect(&pattern, doscar.as_deref(), &term, &styles)
        }
        Command::Dos {
            outcar,
            doscar,
            projection,
            select,
            total_projected,
            fermi_shift,
            no_spin,
        } => commands::dos(
            &outcar,
            &doscar,
            commands::DosOptions {
                projection,
                select,
                total_projected,
                fermi_shift,
                display_spin: !no_spin,
            },
            &output,
        ),
        Command::Bands {
            outcar,
            vbm_shift,
            highlight,
            kpoints,
        } => commands::bands(&outcar, vbm_shift, highlight, kpoints, &output, &term, &styles),
        Command::Study { files, material } => {
            commands::study(&files, material, &config, &output, &term, &styles)
        }
    }
}
