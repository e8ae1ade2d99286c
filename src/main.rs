//! Application entry point: Mic Detector.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Parse the stored microphone permission; an unknown value aborts.
//! 4. Create the [`tokio`] runtime used for offline analysis.
//! 5. Build the capture controller and its channels.
//! 6. Run [`eframe::run_native`], which blocks the main thread until the
//!    window is closed.

use anyhow::Context as _;
use eframe::egui;
use mic_detector::{
    app::DetectorApp,
    config::{AppConfig, AppPaths},
};

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Mic Detector")
        .with_inner_size([360.0, 240.0])
        .with_min_inner_size([300.0, 180.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Mic Detector starting up");

    // 2. Configuration
    let paths = AppPaths::new();
    let config = AppConfig::load_from(&paths.settings_file).unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Permission
    let permission = config
        .capture
        .permission()
        .context("invalid [capture] microphone_access in settings.toml")?;
    log::info!("microphone access: {permission}");

    // 4. Tokio runtime (analysis only needs the blocking pool)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 5. Capture controller + channels
    let (controller, channels) = DetectorApp::build_controller(&config, permission);

    // 6. Build the egui app and run it (blocks until the window is closed)
    let options = native_options(&config);
    let app = DetectorApp::new(controller, channels, rt.handle().clone(), config, paths);

    eframe::run_native(
        "Mic Detector",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("UI terminated with an error: {e}"))
}
