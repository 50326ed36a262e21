//! Configuration types for the grid creator.
//!
//! Everything has a default, so a missing or partial `grid_creator.yaml`
//! is fine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::params::GridMethod;

/// File looked up in the working directory at start-up.
pub const CONFIG_FILE_NAME: &str = "grid_creator.yaml";

/// Defaults used to pre-fill the form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Grid step in arcseconds
    #[serde(default = "default_grid_step")]
    pub grid_step: f64,

    /// Gridding method selected when the window opens
    #[serde(default)]
    pub method: GridMethod,

    /// Largest side of the preview image, in pixels
    #[serde(default = "default_preview_size")]
    pub preview_size: u32,
}

fn default_grid_step() -> f64 {
    1.0
}

fn default_preview_size() -> u32 {
    512
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            grid_step: default_grid_step(),
            method: GridMethod::default(),
            preview_size: default_preview_size(),
        }
    }
}

/// On-disk format of the intermediate grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntermediateFormat {
    /// Surfer 7 binary grid (`.grd`)
    #[default]
    Surfer,
    /// NetCDF grid (`.nc`), requires the `netcdf` feature
    Netcdf,
}

/// Configuration for the pipeline itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Keep the intermediate grid next to the source file after conversion
    #[serde(default = "default_keep_intermediate")]
    pub keep_intermediate: bool,

    #[serde(default)]
    pub intermediate_format: IntermediateFormat,
}

fn default_keep_intermediate() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keep_intermediate: default_keep_intermediate(),
            intermediate_format: IntermediateFormat::default(),
        }
    }
}

/// Configuration for the minimum-curvature solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Iteration cap per pyramid level
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Stop a level once its residual norm has dropped by this factor
    #[serde(default = "default_convergence_limit")]
    pub convergence_limit: f64,
}

fn default_max_iterations() -> usize {
    2000
}

fn default_convergence_limit() -> f64 {
    1.0e-6
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            convergence_limit: default_convergence_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Main application configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub form: FormConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub surface: SurfaceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reads `grid_creator.yaml` from `dir` if it exists, otherwise returns the defaults.
    ///
    /// A file that exists but cannot be parsed is reported and ignored; this
    /// runs before logging is set up, so the report goes to stderr.
    pub fn load_or_default<P: AsRef<Path>>(dir: P) -> Self {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Self::default();
        }
        match Self::from_yaml(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
