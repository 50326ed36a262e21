//! Parameter types shared by the form and the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SurfaceConfig;
use crate::error::{PipelineError, Result};
use crate::gridding::{Gridder, GriddingError, MinimumCurvature, Triangulation, MAX_NODES};

const ARCSECONDS_PER_DEGREE: f64 = 3600.0;

/// Tolerance used when snapping coordinates to multiples of the spacing.
pub(crate) const SNAP_TOLERANCE: f64 = 1.0e-8;

/// The gridding procedures offered by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMethod {
    /// Block-median pre-filter followed by a minimum-curvature surface.
    #[default]
    MinimalCurvature,
    /// Delaunay triangulation resampled onto the lattice.
    Triangulate,
}

impl GridMethod {
    pub const ALL: [GridMethod; 2] = [GridMethod::MinimalCurvature, GridMethod::Triangulate];

    /// Label shown in the method selector.
    pub fn label(&self) -> &'static str {
        match self {
            GridMethod::MinimalCurvature => "Minimal Curvature",
            GridMethod::Triangulate => "Triangulate",
        }
    }

    /// Lowercase, underscore-separated name used in derived file names.
    pub fn slug(&self) -> &'static str {
        match self {
            GridMethod::MinimalCurvature => "minimal_curvature",
            GridMethod::Triangulate => "triangulate",
        }
    }

    /// The gridding procedure associated with this method.
    pub fn gridder(&self, surface: &SurfaceConfig) -> Box<dyn Gridder> {
        match self {
            GridMethod::MinimalCurvature => Box::new(MinimumCurvature::new(
                surface.max_iterations,
                surface.convergence_limit,
            )),
            GridMethod::Triangulate => Box::new(Triangulation),
        }
    }
}

impl fmt::Display for GridMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for GridMethod {
    type Err = PipelineError;

    /// Accepts either the label or the slug, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "minimal_curvature" | "minimum_curvature" | "surface" => Ok(GridMethod::MinimalCurvature),
            "triangulate" | "triangulation" => Ok(GridMethod::Triangulate),
            _ => Err(PipelineError::configuration(format!(
                "unknown gridding method '{}', expected 'Minimal Curvature' or 'Triangulate'",
                s
            ))),
        }
    }
}

/// Grid increments in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacing {
    pub x_inc: f64,
    pub y_inc: f64,
}

impl Spacing {
    /// Converts a grid step in arcseconds to degrees, the same in both axes.
    pub fn from_arcseconds(step_arcsec: f64) -> Result<Self> {
        if !step_arcsec.is_finite() || step_arcsec <= 0.0 {
            return Err(PipelineError::configuration(format!(
                "grid step must be a positive number of arcseconds, got {}",
                step_arcsec
            )));
        }
        let inc = step_arcsec / ARCSECONDS_PER_DEGREE;
        Ok(Self {
            x_inc: inc,
            y_inc: inc,
        })
    }
}

/// Rectangular geographic extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Region {
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self {
            west,
            east,
            south,
            north,
        }
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// A region is usable when all edges are finite and both extents are positive.
    pub fn is_degenerate(&self) -> bool {
        let finite = [self.west, self.east, self.south, self.north]
            .iter()
            .all(|v| v.is_finite());
        !finite || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Number of gridline-registered nodes along x and y.
    ///
    /// Counts are worked out in floating point and rejected with
    /// [`GriddingError::TooLarge`] when the lattice would exceed [`MAX_NODES`].
    pub fn node_counts(&self, spacing: Spacing) -> std::result::Result<(usize, usize), GriddingError> {
        let nx = (self.width() / spacing.x_inc).round() + 1.0;
        let ny = (self.height() / spacing.y_inc).round() + 1.0;
        let limit = MAX_NODES as f64;
        if !nx.is_finite() || !ny.is_finite() || nx.max(0.0) * ny.max(0.0) > limit {
            return Err(GriddingError::TooLarge { nx, ny });
        }
        Ok((nx.max(0.0) as usize, ny.max(0.0) as usize))
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let tol_x = self.width().abs() * SNAP_TOLERANCE;
        let tol_y = self.height().abs() * SNAP_TOLERANCE;
        x >= self.west - tol_x && x <= self.east + tol_x && y >= self.south - tol_y && y <= self.north + tol_y
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.west, self.east, self.south, self.north)
    }
}

/// Everything the pipeline needs, captured from the form at submit time.
#[derive(Debug, Clone, PartialEq)]
pub struct GridParameters {
    source: PathBuf,
    elevation: String,
    step_arcsec: f64,
    method: GridMethod,
    region: Option<Region>,
}

impl GridParameters {
    /// Builds the parameter set. Only the presence of a source path is
    /// checked here; everything else is validated by the pipeline step that
    /// uses it.
    pub fn new(
        source: impl Into<PathBuf>,
        elevation: impl Into<String>,
        step_arcsec: f64,
        method: GridMethod,
    ) -> Result<Self> {
        let source = source.into();
        if source.as_os_str().is_empty() {
            return Err(PipelineError::validation("Please select a points file."));
        }
        Ok(Self {
            source,
            elevation: elevation.into(),
            step_arcsec,
            method,
            region: None,
        })
    }

    /// Grid over an explicit region instead of the inferred one.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn elevation(&self) -> &str {
        &self.elevation
    }

    pub fn step_arcsec(&self) -> f64 {
        self.step_arcsec
    }

    pub fn method(&self) -> GridMethod {
        self.method
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }
}
