//! Mic detector window: egui/eframe application.
//!
//! # Architecture
//!
//! [`DetectorApp`] is the top-level [`eframe::App`].  It owns the
//! [`CaptureController`] and the [`AudioRecorder`] (both hold a live cpal
//! stream, so they stay on the UI thread) plus three channel endpoints:
//!
//! * `readings_rx` receives [`LevelReading`]s from the capture callback.
//! * `prompt_rx` receives [`PermissionPrompt`]s raised by the controller.
//! * `analysis_rx` receives offline [`RecordingAnalysis`] results computed on
//!   the tokio blocking pool.
//!
//! # Layout
//!
//! | Row | Content |
//! |-----|---------|
//! | Status | [`CaptureState::label`], green while streaming |
//! | Controls | Start/Stop Streaming, Record/Stop |
//! | Levels | volume, left/right RMS bars, dominant side |
//! | Recording | summary of the last analysed recording |
//! | Error | last error, dismissable |

use std::time::{Duration, Instant};

use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::audio::{BufferProcessor, CpalInputSource, Direction, LevelReading};
use crate::config::{AppConfig, AppPaths};
use crate::pipeline::{
    CaptureController, CaptureState, PermissionPrompt, PermissionStatus, PromptPermission,
};
use crate::recorder::{analyze_file, AudioRecorder, RecordingAnalysis};

/// Readings older than this are shown as "below threshold".
const READING_STALE_AFTER: Duration = Duration::from_millis(300);

/// Result of an offline analysis task, error already rendered for display.
type AnalysisResult = Result<RecordingAnalysis, String>;

// ---------------------------------------------------------------------------
// AppChannels
// ---------------------------------------------------------------------------

/// Receiving ends the app drains every frame.
pub struct AppChannels {
    pub readings_rx: mpsc::Receiver<LevelReading>,
    pub prompt_rx: mpsc::Receiver<PermissionPrompt>,
}

// ---------------------------------------------------------------------------
// DetectorApp
// ---------------------------------------------------------------------------

/// eframe application: the detector window.
pub struct DetectorApp {
    // ── Capture ──────────────────────────────────────────────────────────
    controller: CaptureController<CpalInputSource, PromptPermission>,
    readings_rx: mpsc::Receiver<LevelReading>,
    /// Most recent reading that passed the volume gate.
    last_reading: Option<LevelReading>,
    last_reading_at: Option<Instant>,

    // ── Permission ───────────────────────────────────────────────────────
    prompt_rx: mpsc::Receiver<PermissionPrompt>,
    /// Prompt currently shown in the permission dialog.
    pending_prompt: Option<PermissionPrompt>,

    // ── Recording ────────────────────────────────────────────────────────
    recorder: AudioRecorder<CpalInputSource>,
    analysis_tx: mpsc::Sender<AnalysisResult>,
    analysis_rx: mpsc::Receiver<AnalysisResult>,
    /// Summary of the last finished recording.
    last_analysis: Option<RecordingAnalysis>,
    analysing: bool,

    // ── Misc ─────────────────────────────────────────────────────────────
    runtime: Handle,
    config: AppConfig,
    paths: AppPaths,
    error_message: Option<String>,
    /// Set once the start-on-launch attempt has been made.
    launched: bool,
    /// Last known outer window position, saved on exit.
    window_position: Option<egui::Pos2>,
}

impl DetectorApp {
    /// Create a new [`DetectorApp`].
    ///
    /// * `controller` – capture lifecycle, idle.
    /// * `channels`   – reading and prompt receivers wired to `controller`.
    /// * `runtime`    – handle used for offline analysis.
    /// * `config`     – loaded configuration; updated when the user answers the
    ///   permission prompt.
    pub fn new(
        controller: CaptureController<CpalInputSource, PromptPermission>,
        channels: AppChannels,
        runtime: Handle,
        config: AppConfig,
        paths: AppPaths,
    ) -> Self {
        let recorder = AudioRecorder::new(CpalInputSource::new(
            config.capture.device.clone(),
            config.capture.buffer_frames,
        ));
        let (analysis_tx, analysis_rx) = mpsc::channel(4);

        Self {
            controller,
            readings_rx: channels.readings_rx,
            last_reading: None,
            last_reading_at: None,
            prompt_rx: channels.prompt_rx,
            pending_prompt: None,
            recorder,
            analysis_tx,
            analysis_rx,
            last_analysis: None,
            analysing: false,
            runtime,
            config,
            paths,
            error_message: None,
            launched: false,
            window_position: None,
        }
    }

    /// Build the controller and channels from `config`.
    pub fn build_controller(
        config: &AppConfig,
        permission: PermissionStatus,
    ) -> (
        CaptureController<CpalInputSource, PromptPermission>,
        AppChannels,
    ) {
        let (readings_tx, readings_rx) = mpsc::channel(64);
        let (prompt_tx, prompt_rx) = mpsc::channel(1);

        let controller = CaptureController::new(
            CpalInputSource::new(config.capture.device.clone(), config.capture.buffer_frames),
            PromptPermission::new(permission, prompt_tx),
            BufferProcessor::new(config.capture.threshold),
            readings_tx,
        );

        (
            controller,
            AppChannels {
                readings_rx,
                prompt_rx,
            },
        )
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain pending readings, keeping only the newest.
    fn poll_readings(&mut self) {
        while let Ok(reading) = self.readings_rx.try_recv() {
            self.last_reading = Some(reading);
            self.last_reading_at = Some(Instant::now());
        }
    }

    /// Pick up a new permission prompt and apply any answer to the controller.
    fn poll_permission(&mut self) {
        if self.pending_prompt.is_none() {
            if let Ok(prompt) = self.prompt_rx.try_recv() {
                self.pending_prompt = Some(prompt);
            }
        }

        if let Err(e) = self.controller.poll() {
            log::warn!("{e}");
            self.error_message = Some(e.to_string());
        }
    }

    /// Surface a writer thread that failed mid-recording.
    fn poll_recorder(&mut self) {
        if let Some(e) = self.recorder.take_writer_error() {
            self.error_message = Some(format!("Recording stopped: {e}"));
        }
    }

    fn poll_analysis(&mut self) {
        while let Ok(result) = self.analysis_rx.try_recv() {
            self.analysing = false;
            match result {
                Ok(analysis) => self.last_analysis = Some(analysis),
                Err(message) => self.error_message = Some(message),
            }
        }
    }

    // ── Actions ──────────────────────────────────────────────────────────

    fn toggle_streaming(&mut self) {
        match self.controller.toggle() {
            Ok(state) => {
                if !state.is_capturing() {
                    self.last_reading = None;
                    self.last_reading_at = None;
                }
            }
            Err(e) => {
                log::warn!("{e}");
                self.error_message = Some(e.to_string());
            }
        }
    }

    /// Answer the open permission prompt and remember the decision.
    fn answer_prompt(&mut self, granted: bool) {
        let Some(prompt) = self.pending_prompt.take() else {
            return;
        };
        prompt.answer(granted);

        let status = if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        self.config.capture.microphone_access = status.as_config_str().into();
        match self.config.save_to(&self.paths.settings_file) {
            Ok(()) => log::info!("microphone access saved as '{status}'"),
            Err(e) => log::warn!("could not save microphone access decision: {e}"),
        }
    }

    /// Start recording when idle; stop and analyse when recording.
    fn toggle_recording(&mut self, ctx: &egui::Context) {
        if self.recorder.is_recording() {
            match self.recorder.stop() {
                Ok(finished) => {
                    log::info!(
                        "recording saved: {} ({} frames)",
                        finished.path.display(),
                        finished.frames
                    );
                    self.spawn_analysis(finished.path, ctx.clone());
                }
                Err(e) => {
                    log::error!("{e}");
                    self.error_message = Some(e.to_string());
                }
            }
            return;
        }

        let path = self.config.recorder.output_path(&self.paths);
        let started = self
            .recorder
            .prepare(path)
            .and_then(|()| self.recorder.start());
        if let Err(e) = started {
            log::error!("{e}");
            self.error_message = Some(e.to_string());
        }
    }

    fn spawn_analysis(&mut self, path: std::path::PathBuf, ctx: egui::Context) {
        self.analysing = true;
        let tx = self.analysis_tx.clone();

        self.runtime.spawn_blocking(move || {
            let result = analyze_file(&path).map_err(|e| {
                log::error!("analysis of {} failed: {e}", path.display());
                e.to_string()
            });
            if tx.blocking_send(result).is_ok() {
                ctx.request_repaint();
            }
        });
    }

    // ── Panel renderers ──────────────────────────────────────────────────

    fn draw_status(&self, ui: &mut egui::Ui) {
        let state = self.controller.state();
        let color = match state {
            CaptureState::Capturing => egui::Color32::from_rgb(80, 200, 120),
            CaptureState::PermissionRequested => egui::Color32::from_rgb(230, 180, 60),
            CaptureState::Idle | CaptureState::PermissionDenied => {
                egui::Color32::from_rgb(255, 80, 80)
            }
        };
        ui.label(egui::RichText::new(state.label()).color(color).size(16.0));

        if let Some(hint) = permission_hint(self.controller.permission_status()) {
            ui.label(
                egui::RichText::new(hint)
                    .color(egui::Color32::from_rgb(140, 140, 140))
                    .size(11.0),
            );
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            let stream_label = if self.controller.state().is_capturing() {
                "Stop Streaming"
            } else {
                "Start Streaming"
            };
            let waiting = self.controller.state() == CaptureState::PermissionRequested;
            if ui
                .add_enabled(!waiting, egui::Button::new(stream_label))
                .clicked()
            {
                self.toggle_streaming();
            }

            if self.config.recorder.enabled {
                let record_label = if self.recorder.is_recording() {
                    "Stop Recording"
                } else {
                    "Record"
                };
                if ui
                    .add_enabled(!self.analysing, egui::Button::new(record_label))
                    .clicked()
                {
                    self.toggle_recording(ctx);
                }
                if self.recorder.is_recording() {
                    ui.label(egui::RichText::new("●").color(egui::Color32::from_rgb(255, 68, 68)));
                }
            }
        });
    }

    fn draw_levels(&self, ui: &mut egui::Ui) {
        if !self.controller.state().is_capturing() {
            return;
        }

        let fresh = self
            .last_reading_at
            .is_some_and(|t| t.elapsed() < READING_STALE_AFTER);

        match self.last_reading.filter(|_| fresh) {
            Some(reading) => {
                ui.label(format!("Volume: {:.4}", reading.volume));
                level_bar(ui, "L", reading.rms.left);
                level_bar(ui, "R", reading.rms.right);
                ui.label(dominant_side_text(reading.direction));
                ui.label(
                    egui::RichText::new(reading.direction.to_string())
                        .color(egui::Color32::from_rgb(68, 136, 255)),
                );
            }
            None => {
                ui.label(
                    egui::RichText::new(format!(
                        "Below threshold ({:.3})",
                        self.config.capture.threshold
                    ))
                    .color(egui::Color32::from_rgb(140, 140, 140)),
                );
            }
        }
    }

    fn draw_recording(&self, ui: &mut egui::Ui) {
        if self.analysing {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Analysing recording...");
            });
        } else if let Some(analysis) = &self.last_analysis {
            ui.label(
                egui::RichText::new(analysis_summary(analysis))
                    .color(egui::Color32::from_rgb(180, 180, 180))
                    .size(12.0),
            );
        }
    }

    fn draw_error(&mut self, ui: &mut egui::Ui) {
        let Some(message) = self.error_message.clone() else {
            return;
        };
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(message).color(egui::Color32::from_rgb(255, 136, 68)));
            if ui.small_button("x").clicked() {
                self.error_message = None;
            }
        });
    }

    /// Modal-style window asking for microphone access.
    fn draw_permission_dialog(&mut self, ctx: &egui::Context) {
        if self.pending_prompt.is_none() {
            return;
        }

        let mut answer = None;
        egui::Window::new("Microphone access")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Mic Detector needs access to your microphone to measure sound levels.");
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    if ui.button("Allow").clicked() {
                        answer = Some(true);
                    }
                    if ui.button("Deny").clicked() {
                        answer = Some(false);
                    }
                });
            });

        if let Some(granted) = answer {
            self.answer_prompt(granted);
        }
    }
}

/// Labelled horizontal RMS bar.
fn level_bar(ui: &mut egui::Ui, label: &str, rms: f32) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(
            egui::ProgressBar::new(rms.clamp(0.0, 1.0))
                .desired_width(220.0)
                .text(format!("{rms:.4}")),
        );
    });
}

/// Short dominant-side line shown under the level bars.
fn dominant_side_text(direction: Direction) -> String {
    format!("Dominant side: {}", direction.label())
}

/// Explains a stored refusal; `None` for any other permission state.
fn permission_hint(status: PermissionStatus) -> Option<String> {
    match status {
        PermissionStatus::Denied => Some(format!(
            "microphone_access = \"{status}\" in settings.toml; set it to \"ask\" to be prompted again"
        )),
        PermissionStatus::Granted | PermissionStatus::Undetermined => None,
    }
}

/// One-line description of a finished recording.
fn analysis_summary(analysis: &RecordingAnalysis) -> String {
    match analysis.rms {
        Some(rms) => format!(
            "Last recording: {:.1}s, L {:.4} / R {:.4}. {}",
            analysis.duration_secs, rms.left, rms.right, analysis.direction
        ),
        None => "Last recording: empty".into(),
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for DetectorApp {
    /// Called every frame by eframe.  Polls channels, then renders.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.launched {
            self.launched = true;
            if self.config.capture.start_on_launch {
                self.toggle_streaming();
            }
        }

        // --- Poll non-blocking channels ------------------------------------
        self.poll_readings();
        self.poll_permission();
        self.poll_analysis();
        self.poll_recorder();

        if let Some(rect) = ctx.input(|i| i.viewport().outer_rect) {
            self.window_position = Some(rect.min);
        }

        // --- Schedule repaints while live data is arriving -----------------
        if self.controller.state().is_capturing()
            || self.recorder.is_recording()
            || self.pending_prompt.is_some()
        {
            ctx.request_repaint_after(Duration::from_millis(33));
        } else if self.controller.state() == CaptureState::PermissionRequested {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_status(ui);
            ui.separator();
            self.draw_controls(ui, ctx);
            ui.add_space(6.0);
            self.draw_levels(ui);
            ui.add_space(6.0);
            self.draw_recording(ui);
            self.draw_error(ui);
        });

        self.draw_permission_dialog(ctx);
    }

    /// Stop the streams and persist the window position (best-effort).
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.recorder.is_recording() {
            if let Err(e) = self.recorder.stop() {
                log::warn!("recording did not finish cleanly: {e}");
            }
        }
        self.controller.stop();

        if let Some(pos) = self.window_position {
            self.config.ui.window_position = Some((pos.x, pos.y));
            if let Err(e) = self.config.save_to(&self.paths.settings_file) {
                log::warn!("could not save window position: {e}");
            }
        }
        log::info!("mic detector closing");
    }
}
