use spade::{DelaunayTriangulation, FloatTriangulation, HasPosition, Point2, Triangulation as _};

use super::{Grid, Gridder, GriddingError};
use crate::params::{Region, Spacing};
use crate::utils::XyzPoint;

/// Triangulation vertex carrying the elevation.
#[derive(Debug, Clone, Copy)]
struct Sample {
    position: Point2<f64>,
    z: f64,
}

impl HasPosition for Sample {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

/// Delaunay triangulation resampled linearly onto the lattice.
///
/// Nodes outside the convex hull of the points are NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct Triangulation;

impl Gridder for Triangulation {
    fn name(&self) -> &'static str {
        "triangulation"
    }

    fn grid(&self, points: &[XyzPoint], region: &Region, spacing: Spacing) -> Result<Grid, GriddingError> {
        if points.len() < 3 {
            return Err(GriddingError::TooFewPoints {
                found: points.len(),
                required: 3,
            });
        }
        let mut grid = Grid::from_region(region, spacing)?;

        let mut triangulation: DelaunayTriangulation<Sample> = DelaunayTriangulation::new();
        for p in points {
            triangulation
                .insert(Sample {
                    position: Point2::new(p.x, p.y),
                    z: p.z,
                })
                .map_err(|e| GriddingError::Triangulation(format!("{:?} at ({}, {})", e, p.x, p.y)))?;
        }

        let duplicates = points.len() - triangulation.num_vertices();
        if duplicates > 0 {
            log::warn!("{} points share a position with another point, the last one wins", duplicates);
        }
        if triangulation.num_inner_faces() == 0 {
            return Err(GriddingError::Collinear);
        }
        log::debug!(
            "Triangulated {} vertices into {} triangles",
            triangulation.num_vertices(),
            triangulation.num_inner_faces()
        );

        let interpolator = triangulation.barycentric();
        let width = grid.width();
        let (xs, ys) = (grid.x().to_vec(), grid.y().to_vec());
        for (k, value) in grid.values_mut().iter_mut().enumerate() {
            let position = Point2::new(xs[k % width], ys[k / width]);
            *value = interpolator
                .interpolate(|v| v.data().z, position)
                .map_or(f32::NAN, |z| z as f32);
        }
        Ok(grid)
    }
}
