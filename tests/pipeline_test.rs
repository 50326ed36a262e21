//! End-to-end runs of the gridding pipeline on small CSV point files.

use std::io::Write;
use std::path::{Path, PathBuf};

use grid_creator::config::AppConfig;
use grid_creator::form::{FormOutcome, FormState};
use grid_creator::grid_io::{GridStore, SurferGridStore};
use grid_creator::raster::{read_geotiff, GeoTiffInfo};
use grid_creator::{ErrorKind, GridMethod, GridParameters, GridPipeline, PipelineOutcome, Stage};

/// Writes `lon,lat,<name>` rows to `points.csv` in `dir`.
fn write_csv(dir: &Path, name: &str, rows: &[(f64, f64, f64)]) -> PathBuf {
    let path = dir.join("points.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "lon,lat,{}", name).unwrap();
    for (x, y, z) in rows {
        writeln!(file, "{},{},{}", x, y, z).unwrap();
    }
    path
}

/// Ten scattered points over roughly 0.1 x 0.08 degrees.
fn scattered(z: impl Fn(f64, f64) -> f64) -> Vec<(f64, f64, f64)> {
    [
        (10.00, 45.00),
        (10.10, 45.00),
        (10.00, 45.08),
        (10.10, 45.08),
        (10.05, 45.04),
        (10.02, 45.06),
        (10.08, 45.02),
        (10.03, 45.01),
        (10.07, 45.07),
        (10.09, 45.05),
    ]
    .into_iter()
    .map(|(x, y)| (x, y, z(x, y)))
    .collect()
}

fn run(params: &GridParameters) -> (PathBuf, Option<PathBuf>) {
    let mut pipeline = GridPipeline::new(&AppConfig::default());
    match pipeline.run(params, |d| Some(d.to_path_buf())).unwrap() {
        PipelineOutcome::Completed {
            output, intermediate, ..
        } => (output, intermediate),
        other => panic!("unexpected outcome {:?}", other),
    }
}

fn same_bits(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

#[test]
fn test_empty_source_warns_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::default();
    let form = FormState::new(&config);

    let outcome = form.generate(&config, |_| Some(dir.path().join("out.tif")));
    assert!(matches!(outcome, FormOutcome::Warning(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_constant_surface_stays_constant() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(dir.path(), "depth", &scattered(|_, _| 5.0));
    let params = GridParameters::new(&source, "depth", 30.0, GridMethod::MinimalCurvature).unwrap();

    let (output, _) = run(&params);
    let raster = read_geotiff(&output).unwrap();
    assert!(raster.width > 1 && raster.height > 1);
    for v in &raster.data {
        assert!((v - 5.0).abs() < 1e-3, "value {} differs from 5.0", v);
    }
}

#[test]
fn test_collinear_points_fail_triangulation() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(
        dir.path(),
        "depth",
        &[(0.0, 0.0, 1.0), (0.01, 0.01, 2.0), (0.02, 0.02, 3.0)],
    );
    let params = GridParameters::new(&source, "depth", 3.6, GridMethod::Triangulate).unwrap();

    let mut pipeline = GridPipeline::new(&AppConfig::default());
    let err = pipeline.run(&params, |d| Some(d.to_path_buf())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Gridding);
    assert_eq!(pipeline.failure(), Some((Stage::Loaded, ErrorKind::Gridding)));
    assert!(!dir.path().join("points_triangulate_3.6s.grd").exists());
}

#[test]
fn test_output_is_single_band_float_wgs84() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(dir.path(), "depth", &scattered(|x, y| 100.0 * x - 50.0 * y));

    for method in GridMethod::ALL {
        let params = GridParameters::new(&source, "depth", 30.0, method).unwrap();
        let (output, intermediate) = run(&params);
        assert!(output.is_file());
        assert!(intermediate.unwrap().is_file());

        let info = GeoTiffInfo::read(&output).unwrap();
        assert_eq!(info.epsg, Some(4326));
        assert_eq!(info.bands, 1);
        assert!(info.is_float32());
    }
}

#[test]
fn test_missing_attribute_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(dir.path(), "depth", &scattered(|_, _| 1.0));
    let params = GridParameters::new(&source, "elevation", 30.0, GridMethod::Triangulate).unwrap();

    let mut pipeline = GridPipeline::new(&AppConfig::default());
    let err = pipeline.run(&params, |d| Some(d.to_path_buf())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Attribute);
    assert!(err.report().contains("elevation"));
}

#[test]
fn test_cancel_leaves_intermediate_only() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(dir.path(), "depth", &scattered(|x, _| x));
    let params = GridParameters::new(&source, "depth", 30.0, GridMethod::MinimalCurvature).unwrap();

    let mut pipeline = GridPipeline::new(&AppConfig::default());
    let outcome = pipeline.run(&params, |_| None).unwrap();
    let PipelineOutcome::Cancelled { intermediate } = outcome else {
        panic!("expected a cancelled run");
    };
    assert!(intermediate.is_file());
    assert!(!intermediate.with_extension("tif").exists());
}

#[test]
fn test_spacing_and_dimensions_follow_step() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(dir.path(), "depth", &scattered(|x, y| x + y));
    let params = GridParameters::new(&source, "depth", 30.0, GridMethod::Triangulate).unwrap();

    let (_, intermediate) = run(&params);
    let grid = SurferGridStore.read(&intermediate.unwrap()).unwrap();

    let inc = 30.0 / 3600.0;
    let spacing = grid.spacing();
    assert!((spacing.x_inc - inc).abs() < 1e-9);
    assert!((spacing.y_inc - inc).abs() < 1e-9);

    let region = grid.region();
    let nx = ((region.east - region.west) / inc).round() as usize + 1;
    let ny = ((region.north - region.south) / inc).round() as usize + 1;
    assert_eq!((grid.width(), grid.height()), (nx, ny));
}

#[test]
fn test_bounds_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(dir.path(), "depth", &scattered(|x, y| x * y));
    let params = GridParameters::new(&source, "depth", 30.0, GridMethod::MinimalCurvature).unwrap();

    let (output, intermediate) = run(&params);
    let grid = SurferGridStore.read(&intermediate.unwrap()).unwrap();
    let (west, east) = grid.x_range();
    let (south, north) = grid.y_range();

    let (w, s, e, n) = GeoTiffInfo::read(&output).unwrap().bounds();
    assert!((w - west).abs() < 1e-9);
    assert!((s - south).abs() < 1e-9);
    assert!((e - east).abs() < 1e-9);
    assert!((n - north).abs() < 1e-9);
}

#[test]
fn test_rows_are_flipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(dir.path(), "depth", &scattered(|_, y| 1000.0 * y));
    let params = GridParameters::new(&source, "depth", 30.0, GridMethod::Triangulate).unwrap();

    let (output, intermediate) = run(&params);
    let grid = SurferGridStore.read(&intermediate.unwrap()).unwrap();
    let raster = read_geotiff(&output).unwrap();

    let height = grid.height();
    for row in 0..height {
        for col in 0..grid.width() {
            let expected = grid.value(col, height - 1 - row);
            let actual = raster.value(col, row);
            assert!(
                expected.to_bits() == actual.to_bits() || (expected.is_nan() && actual.is_nan()),
                "mismatch at ({}, {})",
                col,
                row
            );
        }
    }
}

#[test]
fn test_repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(dir.path(), "depth", &scattered(|x, y| (x * 7.0).sin() + y));
    let params = GridParameters::new(&source, "depth", 30.0, GridMethod::MinimalCurvature).unwrap();

    let (first, _) = run(&params);
    let first = read_geotiff(&first).unwrap();
    let (second, _) = run(&params);
    let second = read_geotiff(&second).unwrap();

    assert_eq!((first.width, first.height), (second.width, second.height));
    assert_eq!(first.transform, second.transform);
    assert!(same_bits(&first.data, &second.data));
}

#[test]
fn test_tiny_step_is_reported_not_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_csv(dir.path(), "depth", &scattered(|x, y| x - y));

    for method in GridMethod::ALL {
        let params = GridParameters::new(&source, "depth", 1e-20, method).unwrap();
        let mut pipeline = GridPipeline::new(&AppConfig::default());
        let err = pipeline.run(&params, |d| Some(d.to_path_buf())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Gridding);
        assert!(err.report().contains("too large"), "{}", err.report());
    }
}
