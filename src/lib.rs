pub mod config;
pub mod dataset;
pub mod error;
pub mod form;
pub mod grid_io;
pub mod gridding;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod raster;
pub mod transformation;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use config::AppConfig;
pub use error::{ErrorKind, PipelineError, Result};
pub use params::{GridMethod, GridParameters, Region, Spacing};
pub use pipeline::{GridPipeline, PipelineOutcome, Stage};
