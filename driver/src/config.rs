use std::path::Path;

use pic_kinetics::pipeline::PipelineConfig;
use pic_kinetics::Float;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Number of time steps to run.
    pub steps: usize,
    pub seed: u64,
    pub n_particles: usize,
    /// Mover storage as a fraction of the particle count.
    pub mover_fraction: f64,
    /// Width of the initial momentum distribution in units of `m c`.
    pub u_thermal: Float,
    pub grid: GridConfig,
    pub species: SpeciesConfig,
    #[serde(default)]
    pub fields: FieldConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    /// Interior cells along each axis.
    pub cells: [usize; 3],
    pub spacing: [Float; 3],
    pub dt: Float,
    pub cvac: Float,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub q: Float,
    pub m: Float,
}

/// Uniform electric and magnetic field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldConfig {
    pub e: [Float; 3],
    pub cb: [Float; 3],
}

pub fn read_config() -> Result<Config, config::ConfigError> {
    let path = Path::new("driver/config/config.toml");
    let path = if path.exists() {
        path
    } else {
        Path::new("config/config.toml")
    };
    config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("PIC").separator("__"))
        .build()?
        .try_deserialize()
}
