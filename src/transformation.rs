/// Affine transform from pixel `(col, row)` to `(lon, lat)`.
///
/// `lon = c + a * col + b * row`, `lat = f + d * col + e * row`. Pixel
/// `(0, 0)` is the top-left corner of the north-west pixel, so `e` is
/// negative for a north-up raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    /// North-up transform that stretches `width` x `height` pixels over the bounds.
    pub fn from_bounds(west: f64, south: f64, east: f64, north: f64, width: usize, height: usize) -> Self {
        Self {
            a: (east - west) / width as f64,
            b: 0.0,
            c: west,
            d: 0.0,
            e: -(north - south) / height as f64,
            f: north,
        }
    }

    /// Geographic position of pixel corner `(col, row)`.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.c + self.a * col + self.b * row,
            self.f + self.d * col + self.e * row,
        )
    }

    /// `(west, south, east, north)` covered by a `width` x `height` raster.
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (west, north) = self.apply(0.0, 0.0);
        let (east, south) = self.apply(width as f64, height as f64);
        (west, south, east, north)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bounds() {
        let t = GeoTransform::from_bounds(10.0, 60.0, 11.0, 60.5, 4, 2);
        assert_eq!(t.a, 0.25);
        assert_eq!(t.e, -0.25);
        assert_eq!((t.b, t.d), (0.0, 0.0));
        assert_eq!(t.apply(0.0, 0.0), (10.0, 60.5));
        assert_eq!(t.apply(4.0, 2.0), (11.0, 60.0));
    }

    #[test]
    fn test_bounds_round_trip() {
        let t = GeoTransform::from_bounds(-3.5, 40.0, -1.0, 42.0, 101, 81);
        let (w, s, e, n) = t.bounds(101, 81);
        assert!((w + 3.5).abs() < 1e-12);
        assert!((s - 40.0).abs() < 1e-12);
        assert!((e + 1.0).abs() < 1e-12);
        assert!((n - 42.0).abs() < 1e-12);
    }
}
