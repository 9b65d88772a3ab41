//! Interactive cloth viewer built with eframe/egui.
//!
//! This module defines [`ClothViewer`], which owns a [`Simulation`] and
//! its [`Scheduler`] and implements [`eframe::App`] to draw the sheet and
//! control the simulation through an egui UI. All projection and shading
//! happens here; the core only hands over positions, normals and indices.

use std::time::Duration;

use cloth_core::{
    ClothError, ClothFrame, Config, FrameReport, MonotonicTimeSource, PinSet, Renderer, Scheduler,
    Simulation, SimulationStatus,
};
use eframe::App;
use glam::{Quat, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Wall time simulated by the "Step" button.
const STEP_FRAME: Duration = Duration::from_nanos(16_666_667);

/// Points closer to the camera than this are not drawn.
const NEAR: f32 = 0.05;

const CLOTH_RGB: [f32; 3] = [90.0, 140.0, 220.0];
const AMBIENT: f32 = 0.25;

/// Owned copy of the last presented frame, in the shape the painter wants.
#[derive(Debug, Default)]
struct FrameSnapshot {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    triangles: Vec<u32>,
    report: FrameReport,
    frames: u64,
}

impl Renderer for FrameSnapshot {
    fn present(&mut self, frame: &ClothFrame<'_>) {
        self.positions.clear();
        self.positions
            .extend(frame.positions.chunks_exact(3).map(Vec3::from_slice));
        self.normals.clear();
        self.normals
            .extend(frame.normals.chunks_exact(3).map(Vec3::from_slice));
        self.triangles.clear();
        self.triangles.extend_from_slice(frame.triangles);
        self.report = frame.report;
        self.frames += 1;
    }
}

/// Orbit camera around `target`.
///
/// ### Fields
/// - `yaw`, `pitch` - Orbit angles in radians.
/// - `distance` - Distance from the camera to `target`.
/// - `zoom` - Screen-space magnification.
/// - `pan` - Screen-space offset in pixels.
#[derive(Debug, Clone, Copy)]
struct Camera {
    target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
    zoom: f32,
    pan: egui::Vec2,
}

impl Camera {
    /// A view that fits a sheet of side `extent` hanging below the origin.
    fn framing(extent: f32) -> Self {
        Self {
            target: Vec3::new(0.0, -0.35 * extent, 0.0),
            yaw: 0.6,
            pitch: 0.35,
            distance: 2.5 * extent,
            zoom: 1.0,
            pan: egui::vec2(0.0, 0.0),
        }
    }

    fn rotation(&self) -> Quat {
        Quat::from_rotation_x(self.pitch) * Quat::from_rotation_y(self.yaw)
    }
}

/// Main application state for the interactive viewer.
///
/// [`ClothViewer`] glues together:
/// - The simulation core: [`Simulation`] driven by a [`Scheduler`] over the
///   wall clock, presenting into a [`FrameSnapshot`].
/// - UI state (camera, light, edited configuration, run flag).
/// - eframe/egui callbacks for drawing and user interaction.
///
/// The typical per-frame update is:
/// 1. Handle UI interactions / input.
/// 2. If `running` is `true`, run one scheduler tick.
/// 3. Draw the shaded sheet, optionally the springs, and the pins.
pub struct ClothViewer {
    sim: Simulation,
    scheduler: Scheduler<MonotonicTimeSource>,
    snapshot: FrameSnapshot,
    /// Configuration being edited; applied with "Apply & reset".
    cfg: Config,

    rng: StdRng,

    running: bool,
    camera: Camera,
    light_yaw: f32,
    light_height: f32,
    show_springs: bool,
    shake_amplitude: f32,

    last_error: Option<ClothError>,
}

impl ClothViewer {
    /// Creates a viewer for a fresh simulation built from `cfg`.
    ///
    /// ### Parameters
    /// - `cfg` - Starting configuration.
    /// - `seed` - Seed for the random shake offsets.
    ///
    /// ### Errors
    /// Configuration errors from [`Simulation::new`].
    pub fn new(cfg: Config, seed: u64) -> Result<Self, ClothError> {
        let sim = Simulation::new(cfg.clone())?;
        let mut viewer = Self {
            sim,
            scheduler: Scheduler::new(MonotonicTimeSource::new()),
            snapshot: FrameSnapshot::default(),
            camera: Camera::framing(cfg.extent),
            cfg,
            rng: StdRng::seed_from_u64(seed),
            running: false,
            light_yaw: 0.8,
            light_height: 1.5,
            show_springs: false,
            shake_amplitude: 0.02,
            last_error: None,
        };
        viewer.present(FrameReport::default());
        Ok(viewer)
    }

    fn present(&mut self, report: FrameReport) {
        self.snapshot
            .present(&ClothFrame::from_source(&self.sim, report));
    }

    /// Records a failed advance and stops auto-running. The core has
    /// already logged it.
    fn handle(&mut self, result: Result<FrameReport, ClothError>) {
        if let Err(err) = result {
            self.running = false;
            self.last_error = Some(err);
        }
    }

    /// Restores the sheet to its starting state and stops auto-running.
    fn reset(&mut self) {
        self.running = false;
        self.scheduler.rebase();
        self.last_error = None;
        match self.sim.reset() {
            Ok(()) => self.present(FrameReport::default()),
            Err(err) => self.last_error = Some(err),
        }
    }

    /// Rebuilds the simulation from the edited configuration.
    ///
    /// An invalid configuration leaves the current simulation in place and
    /// is shown in the status bar.
    fn apply_config(&mut self) {
        match Simulation::new(self.cfg.clone()) {
            Ok(sim) => {
                self.sim = sim;
                self.camera.target = Camera::framing(self.cfg.extent).target;
                self.running = false;
                self.scheduler.rebase();
                self.last_error = None;
                self.present(FrameReport::default());
            }
            Err(err) => {
                ftlog::warn!("Rejected configuration: {err}");
                self.last_error = Some(err);
            }
        }
    }

    /// Advances the simulation by one nominal 60 Hz frame.
    fn step_once(&mut self) {
        let result = self.sim.advance(STEP_FRAME);
        if let Ok(report) = result {
            self.present(report);
        }
        self.handle(result);
    }

    /// Runs one scheduler tick if auto-running.
    fn tick(&mut self) {
        if !self.running {
            self.scheduler.rebase();
            return;
        }
        let result = self.scheduler.run_frame(&mut self.sim, &mut self.snapshot);
        self.handle(result);
    }

    /// Randomly displaces the free particles of the running sheet.
    fn shake(&mut self) {
        match self.sim.perturb(self.shake_amplitude, &mut self.rng) {
            Ok(()) => {
                let report = self.snapshot.report;
                self.present(report);
            }
            Err(err) => self.last_error = Some(err),
        }
    }

    /// Projects a world-space point onto the screen.
    ///
    /// The point is moved into camera space by the orbit rotation, pushed
    /// `distance` away from the eye, and perspective-divided. Screen space
    /// is scaled to the shorter side of `rect`, then `zoom` and `pan` apply.
    ///
    /// ### Parameters
    /// - `p` - World-space position.
    /// - `rect` - Screen-space rectangle representing the drawing area.
    ///
    /// ### Returns
    /// The screen position and the camera depth, or `None` if the point is
    /// behind the near plane.
    fn world_to_screen(&self, p: Vec3, rect: egui::Rect) -> Option<(egui::Pos2, f32)> {
        let v = self.camera.rotation() * (p - self.camera.target);
        let depth = self.camera.distance - v.z;
        if depth < NEAR {
            return None;
        }

        let scale = 0.5 * rect.width().min(rect.height()) * self.camera.zoom;
        let center = rect.center();
        let screen = egui::pos2(
            center.x + v.x / depth * scale + self.camera.pan.x,
            center.y - v.y / depth * scale + self.camera.pan.y,
        );
        Some((screen, depth))
    }

    fn light_dir(&self) -> Vec3 {
        Vec3::new(self.light_yaw.cos(), self.light_height, self.light_yaw.sin())
            .normalize_or(Vec3::Y)
    }

    /// Two-sided Lambert shading of the cloth colour.
    fn shade(&self, normal: Vec3, light: Vec3) -> egui::Color32 {
        let k = AMBIENT + (1.0 - AMBIENT) * normal.dot(light).abs().min(1.0);
        let [r, g, b] = CLOTH_RGB.map(|c| (c * k) as u8);
        egui::Color32::from_rgb(r, g, b)
    }

    /// Builds the shaded triangle mesh, sorted back to front.
    fn cloth_mesh(&self, rect: egui::Rect) -> egui::Mesh {
        let projected: Vec<Option<(egui::Pos2, f32)>> = self
            .snapshot
            .positions
            .iter()
            .map(|&p| self.world_to_screen(p, rect))
            .collect();

        let mut order: Vec<(f32, [usize; 3])> = self
            .snapshot
            .triangles
            .chunks_exact(3)
            .filter_map(|t| {
                let ids = [t[0] as usize, t[1] as usize, t[2] as usize];
                let mut depth = 0.0;
                for &i in &ids {
                    depth += projected.get(i).copied().flatten()?.1;
                }
                Some((depth, ids))
            })
            .collect();
        order.sort_by(|a, b| b.0.total_cmp(&a.0));

        let light = self.light_dir();
        let mut mesh = egui::Mesh::default();
        for (_, ids) in order {
            let base = mesh.vertices.len() as u32;
            for i in ids {
                if let Some((pos, _)) = projected[i] {
                    let n = self.snapshot.normals.get(i).copied().unwrap_or(Vec3::Y);
                    mesh.colored_vertex(pos, self.shade(n, light));
                }
            }
            mesh.add_triangle(base, base + 1, base + 2);
        }
        mesh
    }

    /// Helper to draw a labeled `usize` [`egui::DragValue`].
    fn labeled_drag_usize(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut usize,
        range: std::ops::RangeInclusive<usize>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Helper to draw a labeled `f32` [`egui::DragValue`].
    fn labeled_drag_f32(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut f32,
        range: std::ops::RangeInclusive<f32>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Builds the top panel UI (run controls, stepping, view options).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .button(if self.running { "⏸ Pause" } else { "▶ Run" })
                    .clicked()
                {
                    self.running = !self.running;
                }

                if ui.button("Step").clicked() {
                    self.running = false;
                    self.step_once();
                }

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                if ui.button("Shake").clicked() {
                    self.shake();
                }
                ui.add(
                    egui::DragValue::new(&mut self.shake_amplitude)
                        .prefix("amplitude = ")
                        .range(0.0..=0.2)
                        .speed(0.001),
                );

                ui.separator();
                ui.add(egui::Slider::new(&mut self.camera.zoom, 0.2..=10.0).text("Zoom"));
                ui.checkbox(&mut self.show_springs, "Springs");
            });
        });
    }

    /// Builds the bottom status bar (time, substeps, energy, status).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        let report = self.snapshot.report;
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("frame {}", self.snapshot.frames));
                ui.label(format!("t = {:.3} s", report.sim_time.as_secs_f64()));
                ui.label(format!("substeps/frame = {}", report.substeps));
                if !report.dropped.is_zero() {
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        format!("dropped {:.1} ms", report.dropped.as_secs_f64() * 1e3),
                    );
                }
                ui.separator();
                ui.label(format!("KE = {:.4} J", self.sim.kinetic_energy()));
                ui.label(format!("PE = {:.4} J", self.sim.potential_energy()));
                ui.separator();
                match self.sim.status() {
                    SimulationStatus::Running => ui.label("running"),
                    SimulationStatus::Diverged { substep, particle } => ui.colored_label(
                        egui::Color32::RED,
                        format!("diverged at substep {substep} (particle {particle})"),
                    ),
                };
                if let Some(err) = &self.last_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, err.to_string());
                }
            });
        });
    }

    /// Builds the right-hand configuration panel for simulation parameters.
    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Config");

                ui.separator();
                ui.label("Sheet");
                Self::labeled_drag_usize(ui, "size:", &mut self.cfg.size, 2..=128, 1.0);
                Self::labeled_drag_f32(ui, "extent:", &mut self.cfg.extent, 0.1..=10.0, 0.05);
                egui::ComboBox::from_label("pins")
                    .selected_text(match self.cfg.pins {
                        PinSet::None => "none",
                        PinSet::TopCorners => "top corners",
                        PinSet::TopRow => "top row",
                        PinSet::Indices(_) => "custom",
                    })
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.cfg.pins, PinSet::TopCorners, "top corners");
                        ui.selectable_value(&mut self.cfg.pins, PinSet::TopRow, "top row");
                        ui.selectable_value(&mut self.cfg.pins, PinSet::None, "none");
                    });

                ui.separator();
                ui.label("Material");
                Self::labeled_drag_f32(ui, "mass:", &mut self.cfg.mass, 0.001..=10.0, 0.01);
                Self::labeled_drag_f32(
                    ui,
                    "stiffness:",
                    &mut self.cfg.stiffness,
                    0.0..=5000.0,
                    1.0,
                );
                Self::labeled_drag_f32(ui, "damping:", &mut self.cfg.damping, 0.0..=50.0, 0.05);

                ui.separator();
                ui.label("Forces");
                Self::labeled_drag_f32(
                    ui,
                    "gravity.y:",
                    &mut self.cfg.gravity.y,
                    -50.0..=50.0,
                    0.1,
                );
                Self::labeled_drag_f32(
                    ui,
                    "wind.x:",
                    &mut self.cfg.external_force.x,
                    -5.0..=5.0,
                    0.01,
                );
                Self::labeled_drag_f32(
                    ui,
                    "wind.z:",
                    &mut self.cfg.external_force.z,
                    -5.0..=5.0,
                    0.01,
                );

                ui.separator();
                ui.label("Timing");
                Self::labeled_drag_f32(
                    ui,
                    "time_step:",
                    &mut self.cfg.time_step,
                    0.0001..=0.01,
                    0.0001,
                );
                ui.horizontal(|ui| {
                    ui.label("max substeps/frame:");
                    ui.add(
                        egui::DragValue::new(&mut self.cfg.max_substeps_per_frame)
                            .range(0..=10_000)
                            .speed(1.0),
                    );
                });
                Self::labeled_drag_usize(
                    ui,
                    "parallel chunk:",
                    &mut self.cfg.parallel_chunk_len,
                    0..=1 << 16,
                    16.0,
                );

                ui.separator();
                ui.label("Light");
                ui.add(
                    egui::Slider::new(
                        &mut self.light_yaw,
                        -std::f32::consts::PI..=std::f32::consts::PI,
                    )
                    .text("rotation"),
                );
                ui.add(egui::Slider::new(&mut self.light_height, -1.0..=3.0).text("height"));

                ui.separator();
                if ui.button("Apply & reset").clicked() {
                    self.apply_config();
                }
                if ui.button("Reset cfg to default").clicked() {
                    self.cfg = Config::default();
                }
            });
    }

    /// Builds the central panel where the cloth is drawn and the camera is driven.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            // Orbit with the primary button, pan with the secondary.
            if response.dragged_by(egui::PointerButton::Primary) {
                let delta = response.drag_delta();
                self.camera.yaw += delta.x * 0.01;
                self.camera.pitch = (self.camera.pitch + delta.y * 0.01).clamp(-1.5, 1.5);
            }
            if response.dragged_by(egui::PointerButton::Secondary) {
                self.camera.pan += response.drag_delta();
            }

            let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 && response.hovered() {
                let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                self.camera.zoom = (self.camera.zoom * factor).clamp(0.2, 10.0);
            }

            painter.add(egui::Shape::mesh(self.cloth_mesh(rect)));

            if self.show_springs {
                let stroke = egui::Stroke::new(0.5, egui::Color32::from_gray(200));
                for s in self.sim.springs() {
                    let a = self
                        .snapshot
                        .positions
                        .get(s.p)
                        .and_then(|&p| self.world_to_screen(p, rect));
                    let b = self
                        .snapshot
                        .positions
                        .get(s.q)
                        .and_then(|&p| self.world_to_screen(p, rect));
                    if let (Some((a, _)), Some((b, _))) = (a, b) {
                        painter.line_segment([a, b], stroke);
                    }
                }
            }

            for id in self.sim.grid().pinned_ids() {
                if let Some((p, _)) = self
                    .snapshot
                    .positions
                    .get(id)
                    .and_then(|&p| self.world_to_screen(p, rect))
                {
                    painter.circle_filled(p, 4.0, egui::Color32::RED);
                }
            }

            if self.running {
                ctx.request_repaint();
            }
        });
    }
}

impl App for ClothViewer {
    /// eframe callback that advances the simulation and builds all UI panels
    /// for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.tick();
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
    }
}
