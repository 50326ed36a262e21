//! Point dataset readers.
//!
//! This module loads point features with named numeric attributes from:
//! - GeoPackage feature tables (`.gpkg`)
//! - ESRI shapefiles with a `.dbf` attribute table (`.shp`)
//! - Delimited text with longitude/latitude columns (`.csv`)
//!
//! All readers produce the same [`PointDataset`]: one longitude/latitude per
//! feature plus the attribute columns in file order.

mod delimited;
mod geopackage;
mod shp;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::PipelineError;
use crate::utils::XyzPoint;

pub use delimited::read_delimited;
pub use geopackage::read_geopackage;
pub use shp::read_shapefile;

/// Errors that can occur while reading a point dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GeoPackage error: {0}")]
    GeoPackage(String),

    #[error("shapefile error: {0}")]
    Shapefile(String),

    #[error("unsupported point dataset format: {0}")]
    UnsupportedFormat(String),

    #[error("missing required columns: {0}")]
    MissingColumns(String),

    #[error("feature {index}: {reason}")]
    InvalidGeometry { index: usize, reason: String },

    #[error("dataset contains no point features")]
    Empty,
}

impl From<rusqlite::Error> for DatasetError {
    fn from(e: rusqlite::Error) -> Self {
        DatasetError::GeoPackage(e.to_string())
    }
}

impl From<shapefile::Error> for DatasetError {
    fn from(e: shapefile::Error) -> Self {
        DatasetError::Shapefile(e.to_string())
    }
}

/// A named attribute column. Null and non-numeric cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// True when at least one cell holds a number.
    pub fn is_numeric(&self) -> bool {
        self.values.iter().any(|v| v.is_some())
    }
}

/// Point features loaded from a file. Immutable once built.
#[derive(Debug, Clone)]
pub struct PointDataset {
    source: PathBuf,
    lon: Vec<f64>,
    lat: Vec<f64>,
    attributes: Vec<Attribute>,
}

impl PointDataset {
    /// Builds a dataset, checking that every column has one value per point.
    pub fn new(
        source: impl Into<PathBuf>,
        lon: Vec<f64>,
        lat: Vec<f64>,
        attributes: Vec<Attribute>,
    ) -> Result<Self, DatasetError> {
        if lon.is_empty() {
            return Err(DatasetError::Empty);
        }
        if lat.len() != lon.len() {
            return Err(DatasetError::MissingColumns(format!(
                "{} longitudes but {} latitudes",
                lon.len(),
                lat.len()
            )));
        }
        if let Some(bad) = attributes.iter().find(|a| a.values.len() != lon.len()) {
            return Err(DatasetError::MissingColumns(format!(
                "attribute '{}' has {} values for {} points",
                bad.name,
                bad.values.len(),
                lon.len()
            )));
        }
        Ok(Self {
            source: source.into(),
            lon,
            lat,
            attributes,
        })
    }

    /// Number of point features.
    #[inline]
    pub fn len(&self) -> usize {
        self.lon.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lon.is_empty()
    }

    /// Attribute names in file order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Builds the (longitude, latitude, elevation) working table for `elevation`.
    ///
    /// Rows with a null elevation or non-finite values are skipped. An
    /// attribute that is absent, or has no numeric values at all, is an
    /// `AttributeError`.
    pub fn xyz(&self, elevation: &str) -> Result<Vec<XyzPoint>, PipelineError> {
        let attribute = self
            .attribute(elevation)
            .ok_or_else(|| PipelineError::attribute(elevation, "is not present in the dataset"))?;
        if !attribute.is_numeric() {
            return Err(PipelineError::attribute(elevation, "has no numeric values"));
        }

        let points: Vec<XyzPoint> = self
            .lon
            .iter()
            .zip(&self.lat)
            .zip(&attribute.values)
            .filter_map(|((&x, &y), &z)| {
                let z = z?;
                (x.is_finite() && y.is_finite() && z.is_finite()).then(|| XyzPoint::new(x, y, z))
            })
            .collect();

        let skipped = self.len() - points.len();
        if skipped > 0 {
            log::warn!(
                "Skipped {} of {} points in {} without a usable '{}' value",
                skipped,
                self.len(),
                self.source.display(),
                elevation
            );
        }
        Ok(points)
    }
}

/// Supported input formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    GeoPackage,
    Shapefile,
    Delimited,
}

impl DatasetFormat {
    /// Extensions offered by the file picker, every one accepted by [`DatasetFormat::from_path`].
    pub const EXTENSIONS: [&'static str; 4] = ["gpkg", "shp", "csv", "txt"];

    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "gpkg" => Ok(DatasetFormat::GeoPackage),
            "shp" => Ok(DatasetFormat::Shapefile),
            "csv" | "txt" => Ok(DatasetFormat::Delimited),
            other => Err(DatasetError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }
}

/// Loads a point dataset, choosing the reader from the file extension.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<PointDataset, DatasetError> {
    let path = path.as_ref();
    let format = DatasetFormat::from_path(path)?;
    if !path.is_file() {
        return Err(DatasetError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let dataset = match format {
        DatasetFormat::GeoPackage => read_geopackage(path)?,
        DatasetFormat::Shapefile => read_shapefile(path)?,
        DatasetFormat::Delimited => read_delimited(path)?,
    };

    log::debug!(
        "Loaded {} points with attributes {:?} from {}",
        dataset.len(),
        dataset.attribute_names(),
        path.display()
    );
    Ok(dataset)
}

/// Reads just enough of a dataset to list its attribute names, for the elevation selector.
pub fn read_attribute_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>, DatasetError> {
    Ok(load_dataset(path)?.attribute_names())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PointDataset {
        PointDataset::new(
            "mem.csv",
            vec![10.0, 10.1, 10.2, f64::NAN],
            vec![60.0, 60.1, 60.2, 60.3],
            vec![
                Attribute::new("depth", vec![Some(1.0), None, Some(3.0), Some(4.0)]),
                Attribute::new("name", vec![None, None, None, None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_xyz_skips_null_and_non_finite_rows() {
        let points = sample().xyz("depth").unwrap();
        assert_eq!(points, vec![XyzPoint::new(10.0, 60.0, 1.0), XyzPoint::new(10.2, 60.2, 3.0)]);
    }

    #[test]
    fn test_xyz_missing_attribute() {
        let err = sample().xyz("height").unwrap_err();
        assert!(matches!(err, PipelineError::Attribute { ref name, .. } if name == "height"));
    }

    #[test]
    fn test_xyz_non_numeric_attribute() {
        let err = sample().xyz("name").unwrap_err();
        assert!(matches!(err, PipelineError::Attribute { .. }));
    }

    #[test]
    fn test_column_length_mismatch() {
        let result = PointDataset::new(
            "mem.csv",
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![Attribute::new("z", vec![Some(1.0)])],
        );
        assert!(matches!(result, Err(DatasetError::MissingColumns(_))));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DatasetFormat::from_path(Path::new("a.GPKG")).unwrap(), DatasetFormat::GeoPackage);
        assert_eq!(DatasetFormat::from_path(Path::new("a.shp")).unwrap(), DatasetFormat::Shapefile);
        assert_eq!(DatasetFormat::from_path(Path::new("a.csv")).unwrap(), DatasetFormat::Delimited);
        assert!(matches!(
            DatasetFormat::from_path(Path::new("a.las")),
            Err(DatasetError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_picker_extensions_are_all_readable() {
        for ext in DatasetFormat::EXTENSIONS {
            let path = PathBuf::from("points").with_extension(ext);
            assert!(DatasetFormat::from_path(&path).is_ok(), "{}", ext);
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_dataset("/nonexistent/points.csv");
        assert!(matches!(result, Err(DatasetError::Io(_))));
    }
}
