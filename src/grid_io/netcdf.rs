//! NetCDF grids laid out like GMT's native format: `x` and `y` coordinate
//! variables and a `z(y, x)` float variable.

use std::path::Path;

use super::{GridStore, GridStoreError, Result};
use crate::gridding::Grid;

#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfGridStore;

impl GridStore for NetcdfGridStore {
    fn extension(&self) -> &'static str {
        "nc"
    }

    fn write(&self, grid: &Grid, path: &Path) -> Result<()> {
        let mut file = ::netcdf::create(path)?;
        file.add_dimension("x", grid.width())?;
        file.add_dimension("y", grid.height())?;
        file.add_attribute("Conventions", "COARDS")?;

        {
            let mut x_var = file.add_variable::<f64>("x", &["x"])?;
            x_var.put_attribute("long_name", "longitude")?;
            x_var.put_attribute("units", "degrees_east")?;
            x_var.put_values(grid.x(), ..)?;
        }
        {
            let mut y_var = file.add_variable::<f64>("y", &["y"])?;
            y_var.put_attribute("long_name", "latitude")?;
            y_var.put_attribute("units", "degrees_north")?;
            y_var.put_values(grid.y(), ..)?;
        }
        {
            let mut z_var = file.add_variable::<f32>("z", &["y", "x"])?;
            z_var.put_attribute("_FillValue", f32::NAN)?;
            z_var.put_values(grid.values(), ..)?;
        }

        log::debug!(
            "Wrote {} x {} NetCDF grid to {}",
            grid.width(),
            grid.height(),
            path.display()
        );
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Grid> {
        let file = ::netcdf::open(path)?;
        let variable = |name: &str| {
            file.variable(name)
                .ok_or_else(|| GridStoreError::Format(format!("variable '{}' not found", name)))
        };

        let x: Vec<f64> = variable("x")?.get_values(..)?;
        let y: Vec<f64> = variable("y")?.get_values(..)?;
        let values: Vec<f32> = variable("z")?.get_values(..)?;
        Ok(Grid::new(x, y, values)?)
    }
}
