use std::path::PathBuf;

use pyo3::{exceptions::PyValueError, prelude::*};

use crate::config::AppConfig;
use crate::dataset::read_attribute_names;
use crate::params::{GridMethod, GridParameters};
use crate::pipeline::{GridPipeline, PipelineOutcome};

impl FromPyObject<'_> for GridMethod {
    fn extract_bound(ob: &Bound<'_, PyAny>) -> PyResult<Self> {
        let s = ob.extract::<&str>()?;
        s.parse::<GridMethod>()
            .map_err(|_| PyValueError::new_err("The valid values for `method` include 'minimal_curvature' and 'triangulate'."))
    }
}

#[pyfunction(signature=(path))]
/// Lists the attribute names of a point file
///
/// Arguments:
///     path: str
///         path to a .gpkg, .shp or .csv point file
///
/// Returns:
///     names: [str]
///         attribute names in file order
fn read_columns(path: PathBuf) -> PyResult<Vec<String>> {
    read_attribute_names(&path).map_err(|e| PyValueError::new_err(format!("Error loading points: {}", e)))
}

#[pyfunction(signature=(points_path, elevation, grid_step=1.0, method=GridMethod::MinimalCurvature, output_path=None))]
/// Grids a point file and writes the result as a GeoTIFF
///
/// Arguments:
///     points_path: str
///         path to a .gpkg, .shp or .csv point file
///     elevation: str
///         attribute holding the values to grid
///     grid_step: float
///         grid spacing in arcseconds. Defaults to 1.0
///     method: str
///         either 'minimal_curvature' or 'triangulate'. Defaults to 'minimal_curvature'
///     output_path: str
///         where to write the GeoTIFF. Defaults to the intermediate grid path with a .tif extension
///
/// Returns:
///     path: str
///         the GeoTIFF that was written
fn generate_geotiff(
    points_path: PathBuf,
    elevation: String,
    grid_step: f64,
    method: GridMethod,
    output_path: Option<PathBuf>,
) -> PyResult<PathBuf> {
    let config = AppConfig::load_or_default(".");
    let params = GridParameters::new(points_path, elevation, grid_step, method)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    let outcome = GridPipeline::new(&config)
        .run(&params, |default| {
            Some(output_path.unwrap_or_else(|| default.to_path_buf()))
        })
        .map_err(|e| PyValueError::new_err(e.report()))?;

    match outcome {
        PipelineOutcome::Completed { output, .. } => Ok(output),
        PipelineOutcome::Cancelled { intermediate } => Err(PyValueError::new_err(format!(
            "No output written, intermediate grid left at {}",
            intermediate.display()
        ))),
    }
}

/// A Python module implemented in Rust.
#[pymodule]
fn grid_creator(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(read_columns, m)?)?;
    m.add_function(wrap_pyfunction!(generate_geotiff, m)?)?;
    Ok(())
}
