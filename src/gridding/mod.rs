//! Interpolation of scattered points onto a regular lattice.
//!
//! Two procedures are provided behind the [`Gridder`] trait:
//! - [`MinimumCurvature`]: block-median pre-filter, then a minimum-curvature
//!   surface solved coarse-to-fine.
//! - [`Triangulation`]: Delaunay triangulation with linear interpolation
//!   inside each triangle.
//!
//! Grids are gridline registered: the outermost nodes sit on the region edges.

mod blockmedian;
mod surface;
mod triangulate;

use thiserror::Error;

use crate::params::{Region, Spacing, SNAP_TOLERANCE};
use crate::utils::XyzPoint;

pub use blockmedian::blockmedian;
pub use surface::MinimumCurvature;
pub use triangulate::Triangulation;

/// Upper bound on lattice size, guards against a step far too small for the extent.
pub const MAX_NODES: usize = 200_000_000;

#[derive(Error, Debug)]
pub enum GriddingError {
    #[error("need at least {required} points to grid, found {found}")]
    TooFewPoints { found: usize, required: usize },

    #[error("points are collinear or coincident, no surface can be fitted")]
    Collinear,

    #[error("degenerate region: {0}")]
    DegenerateRegion(String),

    #[error("grid of {nx:.0} x {ny:.0} nodes is too large")]
    TooLarge { nx: f64, ny: f64 },

    #[error("triangulation failed: {0}")]
    Triangulation(String),

    #[error("grid shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// A gridding procedure: scattered points in, lattice over `region` out.
pub trait Gridder {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    fn grid(&self, points: &[XyzPoint], region: &Region, spacing: Spacing) -> Result<Grid, GriddingError>;
}

/// Gridline-registered lattice of `f32` values.
///
/// `values` is row-major with `x.len()` columns; row 0 is the southernmost
/// row, so `values[row * width + col]` sits at `(x[col], y[row])`. NaN marks
/// nodes without a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    x: Vec<f64>,
    y: Vec<f64>,
    values: Vec<f32>,
}

impl Grid {
    pub fn new(x: Vec<f64>, y: Vec<f64>, values: Vec<f32>) -> Result<Self, GriddingError> {
        if x.is_empty() || y.is_empty() {
            return Err(GriddingError::ShapeMismatch("grid axes must not be empty".to_string()));
        }
        if values.len() != x.len() * y.len() {
            return Err(GriddingError::ShapeMismatch(format!(
                "{} values for a {} x {} grid",
                values.len(),
                x.len(),
                y.len()
            )));
        }
        Ok(Self { x, y, values })
    }

    /// An all-NaN lattice covering `region` at `spacing`.
    pub fn from_region(region: &Region, spacing: Spacing) -> Result<Self, GriddingError> {
        if region.is_degenerate() {
            return Err(GriddingError::DegenerateRegion(format!(
                "{} has no positive extent",
                region
            )));
        }
        let (nx, ny) = region.node_counts(spacing)?;
        if nx < 2 || ny < 2 {
            return Err(GriddingError::DegenerateRegion(format!(
                "{} holds fewer than two nodes per axis at this spacing",
                region
            )));
        }

        let x = (0..nx).map(|i| region.west + i as f64 * spacing.x_inc).collect();
        let y = (0..ny).map(|j| region.south + j as f64 * spacing.y_inc).collect();
        Ok(Self {
            x,
            y,
            values: vec![f32::NAN; nx * ny],
        })
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.x.len()
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.y.len()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    #[inline]
    pub fn value(&self, col: usize, row: usize) -> f32 {
        self.values[row * self.width() + col]
    }

    /// Iterates over rows from south to north.
    pub fn rows(&self) -> std::slice::Chunks<'_, f32> {
        self.values.chunks(self.width())
    }

    /// `(min, max)` of the longitude axis.
    pub fn x_range(&self) -> (f64, f64) {
        axis_range(&self.x)
    }

    /// `(min, max)` of the latitude axis.
    pub fn y_range(&self) -> (f64, f64) {
        axis_range(&self.y)
    }

    /// `(min, max)` of the finite values, `None` when every node is NaN.
    pub fn z_range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Column and row spacing, recovered from the axes.
    pub fn spacing(&self) -> Spacing {
        let (x0, x1) = self.x_range();
        let (y0, y1) = self.y_range();
        Spacing {
            x_inc: if self.width() > 1 { (x1 - x0) / (self.width() - 1) as f64 } else { 0.0 },
            y_inc: if self.height() > 1 { (y1 - y0) / (self.height() - 1) as f64 } else { 0.0 },
        }
    }

    pub fn region(&self) -> Region {
        let (west, east) = self.x_range();
        let (south, north) = self.y_range();
        Region::new(west, east, south, north)
    }

    pub fn count_nan(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

fn axis_range(axis: &[f64]) -> (f64, f64) {
    axis.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Snaps `value / inc` down (or up) to an integer, treating values within
/// tolerance of a multiple as lying on it.
fn snap(value: f64, inc: f64, up: bool) -> f64 {
    let q = value / inc;
    let nearest = q.round();
    let k = if (q - nearest).abs() <= SNAP_TOLERANCE {
        nearest
    } else if up {
        q.ceil()
    } else {
        q.floor()
    };
    k * inc
}

/// Smallest region aligned to `spacing` that contains every point.
pub fn infer_region(points: &[XyzPoint], spacing: Spacing) -> Result<Region, GriddingError> {
    if points.is_empty() {
        return Err(GriddingError::TooFewPoints {
            found: 0,
            required: 3,
        });
    }
    let mut xmin = f64::INFINITY;
    let mut xmax = f64::NEG_INFINITY;
    let mut ymin = f64::INFINITY;
    let mut ymax = f64::NEG_INFINITY;
    for p in points {
        xmin = xmin.min(p.x);
        xmax = xmax.max(p.x);
        ymin = ymin.min(p.y);
        ymax = ymax.max(p.y);
    }

    let region = Region::new(
        snap(xmin, spacing.x_inc, false),
        snap(xmax, spacing.x_inc, true),
        snap(ymin, spacing.y_inc, false),
        snap(ymax, spacing.y_inc, true),
    );
    if region.is_degenerate() {
        return Err(GriddingError::DegenerateRegion(format!(
            "points span {} which has no area",
            region
        )));
    }
    log::debug!("Inferred region {} from point extent", region);
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spacing(inc: f64) -> Spacing {
        Spacing { x_inc: inc, y_inc: inc }
    }

    #[test]
    fn test_infer_region_snaps_outward() {
        let points = [XyzPoint::new(0.13, 0.21, 0.0), XyzPoint::new(0.87, 0.64, 1.0)];
        let region = infer_region(&points, spacing(0.25)).unwrap();
        assert_eq!(region, Region::new(0.0, 1.0, 0.0, 0.75));
    }

    #[test]
    fn test_infer_region_keeps_aligned_edges() {
        let inc = 1.0 / 3600.0;
        // 10 arcseconds expressed through a division, so not an exact multiple in binary
        let points = [
            XyzPoint::new(10.0 * inc, 20.0 * inc, 0.0),
            XyzPoint::new(30.0 * inc, 40.0 * inc, 0.0),
        ];
        let region = infer_region(&points, spacing(inc)).unwrap();
        let (nx, ny) = region.node_counts(spacing(inc)).unwrap();
        assert_eq!((nx, ny), (21, 21));
    }

    #[test]
    fn test_infer_region_single_meridian_is_degenerate() {
        let points = [XyzPoint::new(1.0, 0.0, 0.0), XyzPoint::new(1.0, 1.0, 0.0)];
        assert!(matches!(
            infer_region(&points, spacing(0.5)),
            Err(GriddingError::DegenerateRegion(_))
        ));
    }

    #[test]
    fn test_grid_axes_follow_region() {
        let region = Region::new(10.0, 10.5, 60.0, 60.25);
        let grid = Grid::from_region(&region, spacing(0.125)).unwrap();
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.x()[4], 10.5);
        assert_eq!(grid.y()[0], 60.0);
        assert_eq!(grid.count_nan(), 15);
        assert_eq!(grid.z_range(), None);
        assert_eq!(grid.region(), region);
    }

    #[test]
    fn test_grid_rejects_bad_shape() {
        let result = Grid::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0; 3]);
        assert!(matches!(result, Err(GriddingError::ShapeMismatch(_))));
    }

    #[test]
    fn test_tiny_region_is_degenerate() {
        let region = Region::new(0.0, 0.1, 0.0, 1.0);
        assert!(matches!(
            Grid::from_region(&region, spacing(1.0)),
            Err(GriddingError::DegenerateRegion(_))
        ));
    }
}
