//! Error types for the gridding pipeline.
//!
//! Each layer (dataset readers, gridding engine, grid store, raster writer)
//! has its own error enum; `PipelineError` composes them into the six kinds
//! the form controller distinguishes.

use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::DatasetError;
use crate::grid_io::GridStoreError;
use crate::gridding::GriddingError;
use crate::raster::RasterError;

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    DataLoad,
    Attribute,
    Configuration,
    Gridding,
    RasterWrite,
}

/// Errors that can abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input is missing. Shown to the user as a warning.
    #[error("{0}")]
    Validation(String),

    /// The point dataset could not be read.
    #[error("failed to load point dataset '{}'", .path.display())]
    DataLoad {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },

    /// The selected elevation attribute is absent or has no numeric values.
    #[error("attribute '{name}' {reason}")]
    Attribute { name: String, reason: String },

    /// A parameter or configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The gridding procedure could not produce a surface.
    #[error("gridding failed: {0}")]
    Gridding(#[from] GriddingError),

    /// The intermediate grid could not be written next to the source file.
    #[error("failed to write intermediate grid '{}'", .path.display())]
    IntermediateWrite {
        path: PathBuf,
        #[source]
        source: GridStoreError,
    },

    /// The intermediate grid could not be read back or the raster could not be written.
    #[error("failed to write raster '{}'", .path.display())]
    RasterWrite {
        path: PathBuf,
        #[source]
        source: RasterError,
    },
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn attribute(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::DataLoad { .. } => ErrorKind::DataLoad,
            Self::Attribute { .. } => ErrorKind::Attribute,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Gridding(_) | Self::IntermediateWrite { .. } => ErrorKind::Gridding,
            Self::RasterWrite { .. } => ErrorKind::RasterWrite,
        }
    }

    /// Renders the error together with its chain of sources, one per line.
    pub fn report(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str("\n  caused by: ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
