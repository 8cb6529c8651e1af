use color_eyre::eyre::eyre;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::{env, path::PathBuf};

#[derive(Debug, Deserialize)]
pub(crate) struct Configuration {
    pub(crate) output: OutputConfiguration,
    pub(crate) grid: GridConfiguration,
    pub(crate) alignment: AlignmentConfiguration,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OutputConfiguration {
    pub(crate) directory: PathBuf,
}

/// Sampling of the Fermi level
#[derive(Debug, Deserialize)]
pub(crate) struct GridConfiguration {
    pub(crate) formation_points: usize,
    pub(crate) transition_points: usize,
    pub(crate) report_points: usize,
    /// Upper end of the default windows as a multiple of the largest gap
    pub(crate) fermi_margin: f64,
    pub(crate) lower_transition_bound: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlignmentConfiguration {
    pub(crate) scan_points: usize,
}

impl Configuration {
    pub(crate) fn build() -> color_eyre::Result<Self> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("output.directory", "results")?
            .set_default("grid.formation_points", 10_000_i64)?
            .set_default("grid.transition_points", 30_000_i64)?
            .set_default("grid.report_points", 100_000_i64)?
            .set_default("grid.fermi_margin", 1.05)?
            .set_default("grid.lower_transition_bound", -0.5)?
            .set_default("alignment.scan_points", 100_i64)?
            .add_source(File::with_name(".config/default").required(false))
            .add_source(File::with_name(&format!(".config/{}", run_mode)).required(false))
            .add_source(Environment::with_prefix("DEFECT").separator("__"))
            .build()?;

        s.try_deserialize()
            .map_err(|e| eyre!(format!("Failed to deserialize the config file: {:?}", e)))
    }
}
