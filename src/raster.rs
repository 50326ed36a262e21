use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use thiserror::Error;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use crate::grid_io::GridStoreError;
use crate::gridding::Grid;
use crate::transformation::GeoTransform;

/// WGS 84 geographic coordinates.
pub const EPSG_WGS84: u16 = 4326;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const GEOG_ANGULAR_UNITS: u16 = 2054;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const ANGULAR_DEGREE: u16 = 9102;

const SAMPLE_FORMAT_IEEE_FLOAT: u16 = 3;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("could not read intermediate grid: {0}")]
    Intermediate(#[from] GridStoreError),

    #[error("raster has no georeferencing: {0}")]
    NotGeoreferenced(String),

    #[error("raster of {width} x {height} pixels cannot be written")]
    InvalidSize { width: usize, height: usize },

    #[error("unsupported sample type: {0}")]
    UnsupportedSampleType(String),
}

impl From<tiff::TiffError> for RasterError {
    fn from(e: tiff::TiffError) -> Self {
        RasterError::Tiff(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RasterError>;

/// Single-band raster in top-down row order, georeferenced in EPSG:4326.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRaster {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
    pub transform: GeoTransform,
}

impl OutputRaster {
    /// Repackages a grid: bounds from the axis extremes, rows reversed so
    /// row 0 is the northernmost.
    pub fn from_grid(grid: &Grid) -> Self {
        let (west, east) = grid.x_range();
        let (south, north) = grid.y_range();
        let (width, height) = (grid.width(), grid.height());

        let data = grid.rows().rev().flatten().copied().collect();
        Self {
            width,
            height,
            data,
            transform: GeoTransform::from_bounds(west, south, east, north, width, height),
        }
    }

    pub fn epsg(&self) -> u16 {
        EPSG_WGS84
    }

    #[inline]
    pub fn value(&self, col: usize, row: usize) -> f32 {
        self.data[row * self.width + col]
    }

    /// `(west, south, east, north)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.width, self.height)
    }
}

fn geo_keys(epsg: u16) -> [u16; 20] {
    [
        1, 1, 0, 4, // version 1.1.0, four keys
        GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC,
        GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
        GEOGRAPHIC_TYPE, 0, 1, epsg,
        GEOG_ANGULAR_UNITS, 0, 1, ANGULAR_DEGREE,
    ]
}

/// Writes a single-band Float32 GeoTIFF.
pub fn write_geotiff(raster: &OutputRaster, path: &Path) -> Result<()> {
    let (width, height) = match (u32::try_from(raster.width), u32::try_from(raster.height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(RasterError::InvalidSize {
                width: raster.width,
                height: raster.height,
            })
        }
    };

    let t = &raster.transform;
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image = encoder.new_image::<colortype::Gray32Float>(width, height)?;

    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &[t.a, -t.e, 0.0][..])?;
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &[0.0, 0.0, 0.0, t.c, t.f, 0.0][..])?;
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), &geo_keys(raster.epsg())[..])?;
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), "nan")?;
    image.write_data(&raster.data)?;

    log::debug!(
        "Wrote {} x {} GeoTIFF to {}",
        raster.width,
        raster.height,
        path.display()
    );
    Ok(())
}

/// Summary of a GeoTIFF read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTiffInfo {
    pub width: usize,
    pub height: usize,
    pub bands: u16,
    pub sample_format: u16,
    pub bits_per_sample: u16,
    pub epsg: Option<u16>,
    pub transform: GeoTransform,
    pub nodata: Option<String>,
}

impl GeoTiffInfo {
    fn from_decoder<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Self> {
        let (width, height) = decoder.dimensions()?;
        let bands = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as u16;
        let sample_format = decoder.get_tag_u32(Tag::SampleFormat).unwrap_or(1) as u16;
        let bits_per_sample = decoder.get_tag_u32(Tag::BitsPerSample).unwrap_or(8) as u16;

        let scale = decoder
            .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE))
            .map_err(|_| RasterError::NotGeoreferenced("missing ModelPixelScale".to_string()))?;
        let tiepoint = decoder
            .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT))
            .map_err(|_| RasterError::NotGeoreferenced("missing ModelTiepoint".to_string()))?;
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(RasterError::NotGeoreferenced("malformed geo tags".to_string()));
        }
        let transform = GeoTransform {
            a: scale[0],
            b: 0.0,
            c: tiepoint[3] - tiepoint[0] * scale[0],
            d: 0.0,
            e: -scale[1],
            f: tiepoint[4] + tiepoint[1] * scale[1],
        };

        let epsg = decoder
            .get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))
            .ok()
            .and_then(|keys| {
                keys.get(4..)?
                    .chunks_exact(4)
                    .find(|entry| entry[0] == GEOGRAPHIC_TYPE || entry[0] == 3072)
                    .map(|entry| entry[3])
            });
        let nodata = decoder
            .get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA))
            .ok()
            .map(|s| s.trim_end_matches('\0').to_string());

        Ok(Self {
            width: width as usize,
            height: height as usize,
            bands,
            sample_format,
            bits_per_sample,
            epsg,
            transform,
            nodata,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
        Self::from_decoder(&mut decoder)
    }

    pub fn is_float32(&self) -> bool {
        self.sample_format == SAMPLE_FORMAT_IEEE_FLOAT && self.bits_per_sample == 32
    }

    /// `(west, south, east, north)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.width, self.height)
    }

    /// One-line description for the form.
    pub fn summary(&self) -> String {
        let (w, s, e, n) = self.bounds();
        format!(
            "{} x {} px, {} band(s), EPSG:{}, bounds {:.6}/{:.6}/{:.6}/{:.6}",
            self.width,
            self.height,
            self.bands,
            self.epsg.map_or_else(|| "?".to_string(), |c| c.to_string()),
            w,
            e,
            s,
            n
        )
    }
}

/// Reads a single-band GeoTIFF written by [`write_geotiff`].
pub fn read_geotiff(path: &Path) -> Result<OutputRaster> {
    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    let info = GeoTiffInfo::from_decoder(&mut decoder)?;

    let data = match decoder.read_image()? {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        _ => {
            return Err(RasterError::UnsupportedSampleType(format!(
                "{}-bit samples with format {}",
                info.bits_per_sample, info.sample_format
            )))
        }
    };

    Ok(OutputRaster {
        width: info.width,
        height: info.height,
        data,
        transform: info.transform,
    })
}

/// Grayscale preview scaled to the finite value range, NaN black, fitted within `max_side`.
pub fn preview_image(raster: &OutputRaster, max_side: u32) -> GrayImage {
    let (lo, hi) = raster
        .data
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = if hi > lo { hi - lo } else { 1.0 };

    let mut img = GrayImage::new(raster.width as u32, raster.height as u32);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let v = raster.value(x as usize, y as usize);
        let level = if v.is_finite() {
            1.0 + 254.0 * (v - lo) / span
        } else {
            0.0
        };
        *pixel = Luma([level.round() as u8]);
    }

    if img.width() > max_side || img.height() > max_side {
        DynamicImage::ImageLuma8(img).thumbnail(max_side, max_side).to_luma8()
    } else {
        img
    }
}
