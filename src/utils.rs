use std::path::{Path, PathBuf};

use crate::params::GridMethod;

/// One row of the working table: longitude, latitude and the selected elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XyzPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl XyzPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Renders a grid step the way it appears in file names (`1.0`, `30.0`, `0.5`).
pub fn format_step(step_arcsec: f64) -> String {
    format!("{:?}", step_arcsec)
}

/// Path of the intermediate grid, a sibling of the source file:
/// `<source without extension>_<method>_<step>s.<extension>`.
pub fn intermediate_path(source: &Path, method: GridMethod, step_arcsec: f64, extension: &str) -> PathBuf {
    let stem = source.with_extension("");
    let mut name = stem.into_os_string();
    name.push(format!("_{}_{}s.{}", method.slug(), format_step(step_arcsec), extension));
    PathBuf::from(name)
}

/// Default destination offered by the save dialog: the intermediate path with a `.tif` extension.
pub fn default_output_path(intermediate: &Path) -> PathBuf {
    intermediate.with_extension("tif")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_step() {
        assert_eq!(format_step(1.0), "1.0");
        assert_eq!(format_step(30.0), "30.0");
        assert_eq!(format_step(0.5), "0.5");
    }

    #[test]
    fn test_intermediate_path() {
        let path = intermediate_path(
            Path::new("/data/survey/points.gpkg"),
            GridMethod::MinimalCurvature,
            1.0,
            "grd",
        );
        assert_eq!(path, PathBuf::from("/data/survey/points_minimal_curvature_1.0s.grd"));

        let path = intermediate_path(Path::new("points.csv"), GridMethod::Triangulate, 30.0, "nc");
        assert_eq!(path, PathBuf::from("points_triangulate_30.0s.nc"));
    }

    #[test]
    fn test_default_output_path_keeps_step() {
        let out = default_output_path(Path::new("/data/points_triangulate_0.5s.grd"));
        assert_eq!(out, PathBuf::from("/data/points_triangulate_0.5s.tif"));
    }
}
