//! The gridding pipeline: points in, GeoTIFF out.
//!
//! A run moves through `Idle -> Validated -> Loaded -> Gridded -> Converted
//! -> Done`. Any error stops the run in `Failed`; files already written stay
//! on disk.

use std::path::{Path, PathBuf};

use crate::config::{AppConfig, PipelineConfig, SurfaceConfig};
use crate::dataset::load_dataset;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::grid_io::{grid_store, GridStore};
use crate::gridding::{infer_region, Grid};
use crate::params::{GridParameters, Region, Spacing};
use crate::raster::{write_geotiff, OutputRaster};
use crate::utils::{default_output_path, intermediate_path, XyzPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validated,
    Loaded,
    Gridded,
    Converted,
    Done,
    Failed,
}

/// Result of a run that did not fail.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Completed {
        output: PathBuf,
        /// `None` when the intermediate grid was removed after conversion.
        intermediate: Option<PathBuf>,
        raster: OutputRaster,
    },
    /// The destination dialog was dismissed. Only the intermediate grid was written.
    Cancelled { intermediate: PathBuf },
}

/// Loads the dataset and extracts the working table for the selected attribute.
pub fn load_points(params: &GridParameters) -> Result<Vec<XyzPoint>> {
    let dataset = load_dataset(params.source()).map_err(|source| PipelineError::DataLoad {
        path: params.source().to_path_buf(),
        source,
    })?;
    let points = dataset.xyz(params.elevation())?;
    if points.is_empty() {
        return Err(PipelineError::attribute(params.elevation(), "has no usable values"));
    }
    Ok(points)
}

/// The supplied region if there is one, otherwise the point extent snapped to the spacing.
pub fn resolve_region(params: &GridParameters, points: &[XyzPoint], spacing: Spacing) -> Result<Region> {
    match params.region() {
        Some(region) if region.is_degenerate() => Err(PipelineError::configuration(format!(
            "region {} must have west < east and south < north",
            region
        ))),
        Some(region) => Ok(region),
        None => Ok(infer_region(points, spacing)?),
    }
}

/// Reads the intermediate grid back and writes it as a GeoTIFF at `destination`.
pub fn convert_to_geotiff(store: &dyn GridStore, intermediate: &Path, destination: &Path) -> Result<OutputRaster> {
    let grid = store.read(intermediate).map_err(|e| PipelineError::RasterWrite {
        path: intermediate.to_path_buf(),
        source: e.into(),
    })?;
    let raster = OutputRaster::from_grid(&grid);
    write_geotiff(&raster, destination).map_err(|source| PipelineError::RasterWrite {
        path: destination.to_path_buf(),
        source,
    })?;
    Ok(raster)
}

fn advance(stage: &mut Stage, next: Stage) {
    log::debug!("Pipeline stage {:?} -> {:?}", stage, next);
    *stage = next;
}

pub struct GridPipeline {
    config: PipelineConfig,
    surface: SurfaceConfig,
    store: Option<Box<dyn GridStore>>,
    stage: Stage,
    failure: Option<(Stage, ErrorKind)>,
}

impl GridPipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.pipeline.clone(),
            surface: config.surface.clone(),
            store: None,
            stage: Stage::Idle,
            failure: None,
        }
    }

    /// Uses `store` for the intermediate grid instead of the configured format.
    pub fn with_store(mut self, store: Box<dyn GridStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Last stage reached before the failure, and the kind of error.
    pub fn failure(&self) -> Option<(Stage, ErrorKind)> {
        self.failure
    }

    /// Runs every step. `choose_destination` receives the default output
    /// path and returns the chosen one, or `None` to stop after gridding.
    pub fn run<F>(&mut self, params: &GridParameters, choose_destination: F) -> Result<PipelineOutcome>
    where
        F: FnOnce(&Path) -> Option<PathBuf>,
    {
        self.stage = Stage::Idle;
        self.failure = None;
        let result = self.execute(params, choose_destination);
        if let Err(e) = &result {
            log::error!("Pipeline failed after {:?}: {}", self.stage, e.report());
            self.failure = Some((self.stage, e.kind()));
            self.stage = Stage::Failed;
        }
        result
    }

    fn execute<F>(&mut self, params: &GridParameters, choose_destination: F) -> Result<PipelineOutcome>
    where
        F: FnOnce(&Path) -> Option<PathBuf>,
    {
        let configured;
        let store: &dyn GridStore = match &self.store {
            Some(store) => store.as_ref(),
            None => {
                configured = grid_store(self.config.intermediate_format)?;
                configured.as_ref()
            }
        };
        let spacing = Spacing::from_arcseconds(params.step_arcsec())?;
        advance(&mut self.stage, Stage::Validated);

        log::info!(
            "Loading '{}' from {}",
            params.elevation(),
            params.source().display()
        );
        let points = load_points(params)?;
        advance(&mut self.stage, Stage::Loaded);

        let region = resolve_region(params, &points, spacing)?;
        let gridder = params.method().gridder(&self.surface);
        log::info!(
            "Gridding {} points with {} over {} at {}\"",
            points.len(),
            gridder.name(),
            region,
            params.step_arcsec()
        );
        let grid: Grid = gridder.grid(&points, &region, spacing)?;

        let intermediate = intermediate_path(params.source(), params.method(), params.step_arcsec(), store.extension());
        store
            .write(&grid, &intermediate)
            .map_err(|source| PipelineError::IntermediateWrite {
                path: intermediate.clone(),
                source,
            })?;
        log::info!(
            "Wrote {} x {} intermediate grid to {}",
            grid.width(),
            grid.height(),
            intermediate.display()
        );
        advance(&mut self.stage, Stage::Gridded);

        let Some(output) = choose_destination(&default_output_path(&intermediate)) else {
            log::info!("No destination chosen, stopping after the intermediate grid");
            return Ok(PipelineOutcome::Cancelled { intermediate });
        };

        let raster = convert_to_geotiff(store, &intermediate, &output)?;
        advance(&mut self.stage, Stage::Converted);
        log::info!("Wrote GeoTIFF {}", output.display());

        let intermediate = if self.config.keep_intermediate {
            Some(intermediate)
        } else {
            if let Err(e) = std::fs::remove_file(&intermediate) {
                log::warn!("Could not remove {}: {}", intermediate.display(), e);
            }
            None
        };
        advance(&mut self.stage, Stage::Done);

        Ok(PipelineOutcome::Completed {
            output,
            intermediate,
            raster,
        })
    }
}
