use grid_creator::params::GridMethod;

use crate::gui::app::AppState;
use crate::gui::pipeline::{pick_source, run_generate};

/// Source file row: picker button and the chosen file name.
fn ui_source_row(ui: &mut egui::Ui, app_state: &mut AppState) {
    ui.label("Points file");
    ui.horizontal(|ui| {
        if ui.button("Browse...").clicked() {
            pick_source(app_state);
        }
        let name = app_state
            .form
            .source
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "No file selected".to_string());
        ui.label(name);
    });
}

fn ui_elevation_combo(ui: &mut egui::Ui, app_state: &mut AppState) {
    ui.label("Elevation attribute");
    let selected = app_state.form.elevation.clone().unwrap_or_default();
    ui.add_enabled_ui(!app_state.form.attributes.is_empty(), |ui| {
        egui::ComboBox::from_id_source("elevation_combo")
            .selected_text(selected)
            .width(200.0)
            .show_ui(ui, |ui| {
                for name in &app_state.form.attributes {
                    ui.selectable_value(&mut app_state.form.elevation, Some(name.clone()), name.as_str());
                }
            });
    });
}

fn ui_method_combo(ui: &mut egui::Ui, app_state: &mut AppState) {
    ui.label("Method");
    egui::ComboBox::from_id_source("method_combo")
        .selected_text(app_state.form.method.label())
        .width(200.0)
        .show_ui(ui, |ui| {
            for method in GridMethod::ALL {
                ui.selectable_value(&mut app_state.form.method, method, method.label());
            }
        });
}

fn ui_region_group(ui: &mut egui::Ui, app_state: &mut AppState) {
    let region = &mut app_state.form.region;
    ui.checkbox(&mut region.enabled, "Custom region");
    if !region.enabled {
        return;
    }

    egui::Frame::group(ui.style()).show(ui, |ui| {
        egui::Grid::new("region_grid").num_columns(4).show(ui, |ui| {
            ui.label("West");
            ui.add(egui::DragValue::new(&mut region.west).speed(0.01).clamp_range(-180.0..=180.0));
            ui.label("East");
            ui.add(egui::DragValue::new(&mut region.east).speed(0.01).clamp_range(-180.0..=180.0));
            ui.end_row();
            ui.label("South");
            ui.add(egui::DragValue::new(&mut region.south).speed(0.01).clamp_range(-90.0..=90.0));
            ui.label("North");
            ui.add(egui::DragValue::new(&mut region.north).speed(0.01).clamp_range(-90.0..=90.0));
            ui.end_row();
        });
    });
}

pub fn populate_form_menu(app_state: &mut AppState, ui: &mut egui::Ui) {
    ui.heading("Grid Creator");
    ui.separator();

    ui_source_row(ui, app_state);
    ui.add_space(5.0);
    ui_elevation_combo(ui, app_state);

    ui.separator();

    ui.label("Grid step (arcsec)");
    ui.add(
        egui::DragValue::new(&mut app_state.form.grid_step)
            .speed(0.1)
            .clamp_range(0.0..=3600.0)
            .max_decimals(3),
    );
    ui.add_space(5.0);
    ui_method_combo(ui, app_state);

    ui.separator();

    ui_region_group(ui, app_state);

    ui.separator();

    ui.horizontal(|ui| {
        if ui.button("Generate").clicked() {
            let ctx = ui.ctx().clone();
            run_generate(app_state, &ctx);
        }
        if ui.button("Close").clicked() {
            app_state.should_close = true;
        }
    });

    if let Some(status) = &app_state.status {
        ui.add_space(5.0);
        ui.label(egui::RichText::new(status).weak());
    }

    if app_state.form.source.is_some() && app_state.form.attributes.is_empty() {
        ui.add_space(5.0);
        ui.label(
            egui::RichText::new("The selected file has no attributes.")
                .color(ui.style().visuals.error_fg_color),
        );
    }
}
