//! On-disk hand-off format for the intermediate grid.
//!
//! The gridding step writes through a [`GridStore`] and the conversion step
//! reads the same file back through the same store.

#[cfg(feature = "netcdf")]
mod netcdf;
mod surfer;

use std::path::Path;

use thiserror::Error;

use crate::config::IntermediateFormat;
use crate::error::PipelineError;
use crate::gridding::{Grid, GriddingError};

#[cfg(feature = "netcdf")]
pub use self::netcdf::NetcdfGridStore;
pub use surfer::SurferGridStore;

#[derive(Error, Debug)]
pub enum GridStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid grid file: {0}")]
    Format(String),

    #[error(transparent)]
    Shape(#[from] GriddingError),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] ::netcdf::Error),
}

pub type Result<T> = std::result::Result<T, GridStoreError>;

/// Reads and writes [`Grid`]s in one file format.
pub trait GridStore {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn write(&self, grid: &Grid, path: &Path) -> Result<()>;

    fn read(&self, path: &Path) -> Result<Grid>;
}

/// The store for the configured intermediate format.
pub fn grid_store(format: IntermediateFormat) -> std::result::Result<Box<dyn GridStore>, PipelineError> {
    match format {
        IntermediateFormat::Surfer => Ok(Box::new(SurferGridStore)),
        #[cfg(feature = "netcdf")]
        IntermediateFormat::Netcdf => Ok(Box::new(NetcdfGridStore)),
        #[cfg(not(feature = "netcdf"))]
        IntermediateFormat::Netcdf => Err(PipelineError::configuration(
            "the netcdf intermediate format needs a build with the `netcdf` feature",
        )),
    }
}

/// Rebuilds an axis from its origin and step the way [`Grid::from_region`] does.
pub(crate) fn axis(origin: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| origin + i as f64 * step).collect()
}
