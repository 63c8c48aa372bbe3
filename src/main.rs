#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod data_api;
mod map;
mod ui;
mod vibe;

use config::DashboardConfig;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    let config = match DashboardConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return Err(eframe::Error::AppCreation(Box::new(e)));
        }
    };
    log::info!("Starting with {:?}", config);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::vec2(1600.0, 900.0))
            .with_min_inner_size(egui::vec2(640.0, 400.0))
            .with_title("Hexvibe")
            .with_resizable(true)
            .with_decorations(true),
        ..Default::default()
    };

    eframe::run_native(
        "Hexvibe",
        native_options,
        Box::new(|cc| Ok(Box::new(ui::dashboard_app::DashboardApp::new(cc, config)?))),
    )
}
