use std::path::{Path, PathBuf};

use grid_creator::dataset::DatasetFormat;
use grid_creator::form::FormOutcome;
use grid_creator::raster::{preview_image, GeoTiffInfo, OutputRaster};

use crate::gui::app::{AppState, Preview};

/// Save dialog for the GeoTIFF, opened in the source directory with the derived name.
fn choose_destination(default: &Path) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new()
        .set_title("Save GeoTIFF")
        .add_filter("GeoTIFF", &["tif", "tiff"]);
    if let Some(dir) = default.parent() {
        dialog = dialog.set_directory(dir);
    }
    if let Some(name) = default.file_name() {
        dialog = dialog.set_file_name(name.to_string_lossy());
    }
    dialog.save_file()
}

fn message(level: rfd::MessageLevel, title: &str, description: &str) {
    rfd::MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

fn build_preview(ctx: &egui::Context, raster: &OutputRaster, output: &Path, max_side: u32) -> Preview {
    let img = preview_image(raster, max_side);
    let size = [img.width() as usize, img.height() as usize];
    let color_image = egui::ColorImage::from_gray(size, img.as_raw());
    let texture = ctx.load_texture("grid_preview", color_image, egui::TextureOptions::NEAREST);

    let summary = match GeoTiffInfo::read(output) {
        Ok(info) => info.summary(),
        Err(e) => {
            log::warn!("Could not read back {}: {}", output.display(), e);
            format!("{} x {} px", raster.width, raster.height)
        }
    };
    Preview { texture, summary }
}

/// Runs the form's "Generate" action and reports the outcome.
///
/// Blocks the window until the pipeline finishes.
pub fn run_generate(app_state: &mut AppState, ctx: &egui::Context) {
    app_state.status = None;
    let outcome = app_state.form.generate(&app_state.config, choose_destination);

    match outcome {
        FormOutcome::Warning(msg) => {
            log::warn!("{}", msg);
            message(rfd::MessageLevel::Warning, "Warning", &msg);
        }
        FormOutcome::Success { output, raster } => {
            app_state.preview = Some(build_preview(
                ctx,
                &raster,
                &output,
                app_state.config.form.preview_size,
            ));
            app_state.status = Some(format!("Wrote {}", output.display()));
            message(
                rfd::MessageLevel::Info,
                "Success",
                &format!("GeoTIFF created:\n{}", output.display()),
            );
        }
        FormOutcome::Cancelled { intermediate } => {
            app_state.status = Some(format!(
                "No GeoTIFF written. Intermediate grid kept at {}",
                intermediate.display()
            ));
        }
        FormOutcome::Failure { kind, message: text } => {
            message(rfd::MessageLevel::Error, &format!("{:?} error", kind), &text);
        }
    }
}

/// Opens the point-file picker and loads the attribute names of the chosen file.
pub fn pick_source(app_state: &mut AppState) {
    let Some(path) = rfd::FileDialog::new()
        .add_filter("Point files", &DatasetFormat::EXTENSIONS)
        .add_filter("GeoPackage", &["gpkg"])
        .add_filter("Shapefile", &["shp"])
        .add_filter("Delimited text", &["csv", "txt"])
        .pick_file()
    else {
        return;
    };

    if let Err(e) = app_state.form.select_source(&path) {
        log::error!("{}", e.report());
        message(rfd::MessageLevel::Error, "Could not read points", &e.report());
    }
}
