//! Surfer 7 binary grids.
//!
//! ```text
//! "DSRB" size=4   version (i32)
//! "GRID" size=72  nRow, nCol (i32); xLL, yLL, xSize, ySize,
//!                 zMin, zMax, rotation, blank (f64)
//! "DATA" size     nRow * nCol f64, rows from south to north
//! ```
//!
//! All values are little-endian. Nodes equal to or above the blank value
//! are NaN.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use super::{axis, GridStore, GridStoreError, Result};
use crate::gridding::Grid;

const HEADER_TAG: &[u8; 4] = b"DSRB";
const GRID_TAG: &[u8; 4] = b"GRID";
const DATA_TAG: &[u8; 4] = b"DATA";
const VERSION: i32 = 2;
const GRID_SECTION_SIZE: i32 = 72;

/// Surfer's blanking value.
pub const BLANK_VALUE: f64 = 1.70141e38;

#[derive(Debug, Clone, Copy, Default)]
pub struct SurferGridStore;

#[derive(Debug, Clone, Copy)]
struct GridInfo {
    n_row: usize,
    n_col: usize,
    x_ll: f64,
    y_ll: f64,
    x_size: f64,
    y_size: f64,
}

fn write_section<W: Write>(w: &mut W, tag: &[u8; 4], size: usize) -> Result<()> {
    let size = i32::try_from(size)
        .map_err(|_| GridStoreError::Format(format!("section of {} bytes is too large", size)))?;
    w.write_all(tag)?;
    w.write_all(&size.to_le_bytes())?;
    Ok(())
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_count<R: Read>(r: &mut R, what: &str) -> Result<usize> {
    let n = read_i32(r)?;
    usize::try_from(n)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| GridStoreError::Format(format!("invalid {} {}", what, n)))
}

/// Returns the next section tag and size, or `None` at end of file.
fn next_section<R: Read>(r: &mut R) -> Result<Option<([u8; 4], usize)>> {
    let mut tag = [0u8; 4];
    match r.read_exact(&mut tag) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let size = read_i32(r)?;
    let size = usize::try_from(size)
        .map_err(|_| GridStoreError::Format(format!("negative section size {}", size)))?;
    Ok(Some((tag, size)))
}

impl GridStore for SurferGridStore {
    fn extension(&self) -> &'static str {
        "grd"
    }

    fn write(&self, grid: &Grid, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        let spacing = grid.spacing();
        let (z_min, z_max) = grid
            .z_range()
            .map_or((0.0, 0.0), |(lo, hi)| (f64::from(lo), f64::from(hi)));
        let n_row = i32::try_from(grid.height()).map_err(|_| GridStoreError::Format("too many rows".into()))?;
        let n_col = i32::try_from(grid.width()).map_err(|_| GridStoreError::Format("too many columns".into()))?;

        write_section(&mut w, HEADER_TAG, 4)?;
        w.write_all(&VERSION.to_le_bytes())?;

        write_section(&mut w, GRID_TAG, GRID_SECTION_SIZE as usize)?;
        w.write_all(&n_row.to_le_bytes())?;
        w.write_all(&n_col.to_le_bytes())?;
        for v in [
            grid.x()[0],
            grid.y()[0],
            spacing.x_inc,
            spacing.y_inc,
            z_min,
            z_max,
            0.0,
            BLANK_VALUE,
        ] {
            w.write_all(&v.to_le_bytes())?;
        }

        write_section(&mut w, DATA_TAG, grid.values().len() * 8)?;
        for &v in grid.values() {
            let v = if v.is_nan() { BLANK_VALUE } else { f64::from(v) };
            w.write_all(&v.to_le_bytes())?;
        }
        w.flush()?;

        log::debug!(
            "Wrote {} x {} Surfer grid to {}",
            grid.width(),
            grid.height(),
            path.display()
        );
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Grid> {
        let mut r = BufReader::new(File::open(path)?);

        match next_section(&mut r)? {
            Some((tag, 4)) if &tag == HEADER_TAG => {
                read_i32(&mut r)?;
            }
            _ => return Err(GridStoreError::Format("missing DSRB header".to_string())),
        }

        let mut info: Option<GridInfo> = None;
        let mut blank = BLANK_VALUE;
        while let Some((tag, size)) = next_section(&mut r)? {
            if &tag == GRID_TAG {
                if size < GRID_SECTION_SIZE as usize {
                    return Err(GridStoreError::Format(format!("GRID section of {} bytes", size)));
                }
                let n_row = read_count(&mut r, "row count")?;
                let n_col = read_count(&mut r, "column count")?;
                let x_ll = read_f64(&mut r)?;
                let y_ll = read_f64(&mut r)?;
                let x_size = read_f64(&mut r)?;
                let y_size = read_f64(&mut r)?;
                let _z_min = read_f64(&mut r)?;
                let _z_max = read_f64(&mut r)?;
                let _rotation = read_f64(&mut r)?;
                blank = read_f64(&mut r)?;
                std::io::copy(&mut (&mut r).take((size - GRID_SECTION_SIZE as usize) as u64), &mut std::io::sink())?;
                info = Some(GridInfo {
                    n_row,
                    n_col,
                    x_ll,
                    y_ll,
                    x_size,
                    y_size,
                });
            } else if &tag == DATA_TAG {
                let info = info.ok_or_else(|| GridStoreError::Format("DATA section before GRID".to_string()))?;
                let n = info.n_row * info.n_col;
                if size != n * 8 {
                    return Err(GridStoreError::Format(format!(
                        "DATA section holds {} bytes, expected {}",
                        size,
                        n * 8
                    )));
                }
                let mut values = Vec::with_capacity(n);
                for _ in 0..n {
                    let v = read_f64(&mut r)?;
                    values.push(if v >= blank { f32::NAN } else { v as f32 });
                }
                let grid = Grid::new(
                    axis(info.x_ll, info.x_size, info.n_col),
                    axis(info.y_ll, info.y_size, info.n_row),
                    values,
                )?;
                return Ok(grid);
            } else {
                // unknown sections (e.g. fault traces) are skipped
                std::io::copy(&mut (&mut r).take(size as u64), &mut std::io::sink())?;
            }
        }
        Err(GridStoreError::Format("no DATA section".to_string()))
    }
}
