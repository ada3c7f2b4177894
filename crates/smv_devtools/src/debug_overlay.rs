//! Debug overlay rendered via egui on top of the map.
//!
//! `egui_wgpu::Renderer::render()` needs a `RenderPass<'static>` while
//! `begin_render_pass` borrows the encoder, so drawing is split in phases:
//!
//!   1. `prepare()` -- run egui UI logic, produce tessellated primitives
//!   2. `upload()`  -- upload textures and update GPU buffers (borrows encoder mutably)
//!   3. `paint()`   -- render into a new render pass with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui no longer references
//!
//! UI logic only runs while `visible` (F3), but egui keeps receiving window
//! events so the overlay can take clicks when shown.

use smv_core::time::FrameTimer;
use winit::window::Window;

#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub entity_count: u32,
    pub emitted_quads: u32,
    /// Entities whose style code did not resolve in the last rebuild
    pub skipped_entities: u32,
    pub index_count: u32,
    /// "u16", "u32", or "-" while detached
    pub index_format_label: String,
    pub rebuild_count: u64,
    pub last_rebuild_ms: f64,
    pub stationary: bool,
    pub resolution: f64,
    pub rotation_degrees: f64,
    pub position_ticks: u64,
    pub style_ticks: u64,
    pub churn_paused: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayActions {
    /// User clicked the churn pause toggle
    pub toggle_churn_pause: bool,
    /// User asked for a rebuild on the next stationary frame
    pub force_rebuild: bool,
}

/// Text lines for the batch section of the overlay.
pub fn batch_lines(stats: &OverlayStats) -> Vec<String> {
    vec![
        format!("Entities: {}", stats.entity_count),
        format!(
            "Quads: {} ({} skipped)",
            stats.emitted_quads, stats.skipped_entities
        ),
        format!(
            "Indices: {} [{}]",
            stats.index_count, stats.index_format_label
        ),
        format!(
            "Rebuilds: {} (last {:.2} ms)",
            stats.rebuild_count, stats.last_rebuild_ms
        ),
        format!(
            "Viewport: {} | {:.1} m/px | {:.1} deg",
            if stats.stationary { "stationary" } else { "moving" },
            stats.resolution,
            stats.rotation_degrees
        ),
    ]
}

pub struct DebugOverlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl DebugOverlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: false,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        timer: &FrameTimer,
        stats: Option<OverlayStats>,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        OverlayActions,
    ) {
        let mut actions = OverlayActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if self.visible {
                egui::Window::new("Sprite Layer")
                    .default_pos([10.0, 10.0])
                    .show(ctx, |ui| {
                        ui.label(format!("FPS: {:.1}", timer.smoothed_fps));
                        ui.label(format!("Frame time: {:.2} ms", timer.smoothed_frame_time_ms));
                        ui.label(format!("Frame: {}", timer.frame_count));
                        let Some(ref stats) = stats else {
                            return;
                        };

                        ui.separator();
                        for line in batch_lines(stats) {
                            ui.label(line);
                        }
                        if ui.button("Force rebuild").clicked() {
                            actions.force_rebuild = true;
                        }

                        ui.separator();
                        ui.label(format!(
                            "Churn ticks: {} position / {} style",
                            stats.position_ticks, stats.style_ticks
                        ));
                        ui.horizontal(|ui| {
                            let pause_label = if stats.churn_paused {
                                "Resume churn"
                            } else {
                                "Pause churn"
                            };
                            if ui.button(pause_label).clicked() {
                                actions.toggle_churn_pause = true;
                            }
                            if stats.churn_paused {
                                ui.label("\u{23f8} PAUSED");
                            }
                        });
                    });
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Render into an existing render pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures that egui no longer needs. Call after rendering.
    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
