//! Form state behind the window: the five inputs, the discovered attribute
//! names, and what happens on "Generate".

use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::dataset::read_attribute_names;
use crate::error::{ErrorKind, PipelineError};
use crate::params::{GridMethod, GridParameters, Region};
use crate::pipeline::{GridPipeline, PipelineOutcome};
use crate::raster::OutputRaster;

/// What the window should tell the user after "Generate".
#[derive(Debug, Clone)]
pub enum FormOutcome {
    /// A required input is missing; nothing was run.
    Warning(String),
    Success {
        output: PathBuf,
        raster: OutputRaster,
    },
    /// The save dialog was dismissed after the intermediate grid was written.
    Cancelled { intermediate: PathBuf },
    Failure { kind: ErrorKind, message: String },
}

/// Editable region bounds, applied only when `enabled`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionInput {
    pub enabled: bool,
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Default for RegionInput {
    fn default() -> Self {
        Self {
            enabled: false,
            west: -180.0,
            east: 180.0,
            south: -90.0,
            north: 90.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub source: Option<PathBuf>,
    pub attributes: Vec<String>,
    pub elevation: Option<String>,
    pub grid_step: f64,
    pub method: GridMethod,
    pub region: RegionInput,
}

impl FormState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            source: None,
            attributes: Vec::new(),
            elevation: None,
            grid_step: config.form.grid_step,
            method: config.form.method,
            region: RegionInput::default(),
        }
    }

    /// Sets the source file and repopulates the attribute selector, first attribute selected.
    ///
    /// On a read failure the selector is cleared and the error returned for display.
    pub fn select_source(&mut self, path: &Path) -> Result<(), PipelineError> {
        self.source = Some(path.to_path_buf());
        match read_attribute_names(path) {
            Ok(names) => {
                log::info!("{} has attributes {:?}", path.display(), names);
                self.elevation = names.first().cloned();
                self.attributes = names;
                Ok(())
            }
            Err(source) => {
                self.attributes.clear();
                self.elevation = None;
                Err(PipelineError::DataLoad {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Snapshot of the inputs. Fails with a validation error when no source is selected.
    pub fn to_parameters(&self) -> Result<GridParameters, PipelineError> {
        let source = self
            .source
            .as_deref()
            .ok_or_else(|| PipelineError::validation("Please select a points file."))?;
        let params = GridParameters::new(
            source,
            self.elevation.clone().unwrap_or_default(),
            self.grid_step,
            self.method,
        )?;
        Ok(if self.region.enabled {
            let r = self.region;
            params.with_region(Region::new(r.west, r.east, r.south, r.north))
        } else {
            params
        })
    }

    /// Validates the inputs and runs the pipeline synchronously.
    pub fn generate<F>(&self, config: &AppConfig, choose_destination: F) -> FormOutcome
    where
        F: FnOnce(&Path) -> Option<PathBuf>,
    {
        let params = match self.to_parameters() {
            Ok(params) => params,
            Err(PipelineError::Validation(msg)) => return FormOutcome::Warning(msg),
            Err(e) => {
                return FormOutcome::Failure {
                    kind: e.kind(),
                    message: e.report(),
                }
            }
        };

        let mut pipeline = GridPipeline::new(config);
        match pipeline.run(&params, choose_destination) {
            Ok(PipelineOutcome::Completed { output, raster, .. }) => FormOutcome::Success { output, raster },
            Ok(PipelineOutcome::Cancelled { intermediate }) => FormOutcome::Cancelled { intermediate },
            Err(PipelineError::Validation(msg)) => FormOutcome::Warning(msg),
            Err(e) => FormOutcome::Failure {
                kind: e.kind(),
                message: e.report(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_without_source_warns() {
        let config = AppConfig::default();
        let form = FormState::new(&config);
        let mut asked = false;
        let outcome = form.generate(&config, |_| {
            asked = true;
            None
        });
        assert!(matches!(outcome, FormOutcome::Warning(ref m) if m == "Please select a points file."));
        assert!(!asked);
    }

    #[test]
    fn test_defaults_come_from_config() {
        let mut config = AppConfig::default();
        config.form.grid_step = 30.0;
        config.form.method = GridMethod::Triangulate;
        let form = FormState::new(&config);
        assert_eq!(form.grid_step, 30.0);
        assert_eq!(form.method, GridMethod::Triangulate);
        assert!(!form.region.enabled);
    }

    #[test]
    fn test_select_source_preselects_first_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pts.csv");
        std::fs::write(&path, "lon,lat,depth,quality\n1,2,3,4\n").unwrap();

        let mut form = FormState::new(&AppConfig::default());
        form.select_source(&path).unwrap();
        assert_eq!(form.attributes, vec!["depth", "quality"]);
        assert_eq!(form.elevation.as_deref(), Some("depth"));
    }

    #[test]
    fn test_select_unreadable_source_clears_attributes() {
        let mut form = FormState::new(&AppConfig::default());
        form.attributes = vec!["old".to_string()];
        let err = form.select_source(Path::new("/nonexistent/pts.gpkg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
        assert!(form.attributes.is_empty());
        assert!(form.elevation.is_none());
    }

    #[test]
    fn test_region_applied_only_when_enabled() {
        let mut form = FormState::new(&AppConfig::default());
        form.source = Some(PathBuf::from("pts.csv"));
        assert_eq!(form.to_parameters().unwrap().region(), None);

        form.region = RegionInput {
            enabled: true,
            west: 1.0,
            east: 2.0,
            south: 3.0,
            north: 4.0,
        };
        assert_eq!(
            form.to_parameters().unwrap().region(),
            Some(Region::new(1.0, 2.0, 3.0, 4.0))
        );
    }
}
