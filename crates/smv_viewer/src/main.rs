//! Sprite Map Viewer -- event loop and application entry point.
//!
//! winit drives everything through `ApplicationHandler`:
//!
//!   - `about_to_wait` polls the churn driver against the session clock and
//!     asks for a redraw when entities changed or the viewport is settling
//!   - `RedrawRequested` applies navigation input, runs the sprite layer's
//!     frame gate, then draws the map and the egui overlay
//!   - `resumed` / `suspended` attach and detach the GPU side; the entity
//!     store and the renderer's atlas survive across attachments
//!
//! The loop sleeps with `ControlFlow::WaitUntil` on the next churn deadline,
//! so an idle map with churn paused costs nothing.

mod config;
mod dataset;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use glam::DVec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use config::{load_session_config, SessionConfig, SESSION_PATH};
use dataset::{geographic_to_web_mercator, resolution_for_zoom, scatter_entities};
use smv_core::churn::ChurnDriver;
use smv_core::input::{InputState, Key, MouseBtn};
use smv_core::store::SpriteStore;
use smv_core::time::FrameTimer;
use smv_core::viewport::ViewportController;
use smv_devtools::{DebugOverlay, OverlayStats};
use smv_platform::window::PlatformConfig;
use smv_render::{GpuContext, MapLayer, RenderError, SpriteRenderer};

/// CSS pixels per second for keyboard panning.
const KEY_PAN_SPEED: f64 = 600.0;
/// Degrees per second for Q/E rotation.
const KEY_ROTATE_SPEED: f64 = 90.0;
const ZOOM_PER_NOTCH: f64 = 1.25;
/// Pixel-precise wheels (touchpads) report this many pixels per notch.
const PIXELS_PER_NOTCH: f64 = 50.0;
/// Keyboard motion after an idle sleep is capped to one short step.
const MAX_NAV_DT: f64 = 0.05;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.11,
    g: 0.11,
    b: 0.12,
    a: 1.0,
};

/// Window and GPU state, present only while attached.
struct ViewerState {
    window: Arc<Window>,
    gpu: GpuContext,
    debug_overlay: DebugOverlay,
}

struct App {
    platform: PlatformConfig,
    churn_enabled: bool,
    renderer: SpriteRenderer,
    store: SpriteStore,
    churn: ChurnDriver,
    viewport: ViewportController,
    input: InputState,
    timer: FrameTimer,
    needs_redraw: bool,
    state: Option<ViewerState>,
}

impl App {
    fn new(session: &SessionConfig) -> Result<Self, String> {
        let center =
            geographic_to_web_mercator(session.view.center_lon, session.view.center_lat);
        let renderer = SpriteRenderer::load(
            &PathBuf::from(&session.atlas_image),
            &PathBuf::from(&session.atlas_metadata),
            center,
        )
        .map_err(|e| e.to_string())?;

        let eligible = match session.style_filter {
            Some(filter) => renderer.atlas().eligible_codes(|code| filter.matches(code)),
            None => renderer.atlas().eligible_codes(|_| true),
        };
        log::info!(
            "{} of {} atlas styles eligible for assignment",
            eligible.len(),
            renderer.atlas().len()
        );

        let mut rng = match session.churn.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let entities =
            scatter_entities(session.entity_count, &session.bounds, &eligible, &mut rng)?;
        log::info!("Dataset: {} entities", entities.len());

        Ok(Self {
            platform: PlatformConfig::default(),
            churn_enabled: session.churn.enabled,
            renderer,
            store: SpriteStore::from_entities(entities),
            churn: ChurnDriver::new(&session.churn_config(), eligible),
            viewport: ViewportController::new(center, resolution_for_zoom(session.view.zoom)),
            input: InputState::new(),
            timer: FrameTimer::new(),
            needs_redraw: true,
            state: None,
        })
    }

    fn attach(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RenderError> {
        let window = smv_platform::window::create_window(event_loop, &self.platform)
            .map_err(RenderError::Surface)?;
        let gpu = GpuContext::new(window.clone())?;
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        self.renderer.initialize(&gpu)?;
        self.sync_viewport_size(&window);
        if self.churn_enabled {
            self.churn.start(self.timer.elapsed());
        }

        window.request_redraw();
        self.state = Some(ViewerState {
            window,
            gpu,
            debug_overlay,
        });
        Ok(())
    }

    /// Stops churn and releases GPU resources. Safe to call when detached.
    fn detach(&mut self) {
        self.churn.stop();
        self.renderer.teardown();
        self.state = None;
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.detach();
        event_loop.exit();
    }

    fn sync_viewport_size(&mut self, window: &Window) {
        let scale = window.scale_factor();
        let size = window.inner_size();
        self.viewport.resize(
            DVec2::new(size.width as f64 / scale, size.height as f64 / scale),
            scale,
        );
    }

    /// Feeds accumulated drag, wheel and held keys into the viewport.
    fn apply_navigation(&mut self) {
        let now = self.timer.elapsed();
        let dt = self.timer.real_dt.min(MAX_NAV_DT);

        let (dx, dy) = self.input.take_drag();
        self.viewport.pan_by_pixels(DVec2::new(dx, dy), now);

        let notches = self.input.take_scroll();
        if notches != 0.0 {
            let (mx, my) = self.input.mouse_position;
            self.viewport
                .zoom_about(ZOOM_PER_NOTCH.powf(notches), DVec2::new(mx, my), now);
        }

        let mut pan = DVec2::ZERO;
        if self.input.is_held(Key::Left) || self.input.is_held(Key::A) {
            pan.x += 1.0;
        }
        if self.input.is_held(Key::Right) || self.input.is_held(Key::D) {
            pan.x -= 1.0;
        }
        if self.input.is_held(Key::Up) || self.input.is_held(Key::W) {
            pan.y += 1.0;
        }
        if self.input.is_held(Key::Down) || self.input.is_held(Key::S) {
            pan.y -= 1.0;
        }
        self.viewport.pan_by_pixels(pan * KEY_PAN_SPEED * dt, now);

        let mut rotate = 0.0;
        if self.input.is_held(Key::Q) {
            rotate -= 1.0;
        }
        if self.input.is_held(Key::E) {
            rotate += 1.0;
        }
        self.viewport.rotate_by(rotate * KEY_ROTATE_SPEED * dt, now);
    }

    fn toggle_churn_pause(&mut self) {
        let paused = !self.churn.is_paused();
        self.churn.set_paused(paused, self.timer.elapsed());
    }

    fn overlay_stats(&self, stationary: bool) -> OverlayStats {
        let stats = self.renderer.stats();
        let index_format_label = match self.renderer.index_format() {
            Some(wgpu::IndexFormat::Uint16) => "u16",
            Some(wgpu::IndexFormat::Uint32) => "u32",
            None => "-",
        };
        OverlayStats {
            entity_count: self.store.len() as u32,
            emitted_quads: stats.emitted_quads as u32,
            skipped_entities: stats.skipped_entities as u32,
            index_count: stats.index_count,
            index_format_label: index_format_label.to_string(),
            rebuild_count: stats.rebuild_count,
            last_rebuild_ms: stats.last_rebuild.as_secs_f64() * 1000.0,
            stationary,
            resolution: self.viewport.resolution(),
            rotation_degrees: self.viewport.rotation_degrees(),
            position_ticks: self.churn.position_ticks,
            style_ticks: self.churn.style_ticks,
            churn_paused: self.churn.is_paused(),
        }
    }

    /// Edge-triggered input is cleared on every exit path so a toggle key
    /// fires once even when the frame is skipped.
    fn redraw(&mut self) -> Result<(), RenderError> {
        let result = self.draw_frame();
        self.input.end_frame();
        result
    }

    fn draw_frame(&mut self) -> Result<(), RenderError> {
        self.timer.begin_frame();
        self.apply_navigation();

        if self.input.is_just_pressed(Key::P) {
            self.toggle_churn_pause();
        }

        let viewport = self.viewport.state(self.timer.elapsed());
        let overlay_stats = self.overlay_stats(viewport.stationary);
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        if self.input.is_just_pressed(Key::F3) {
            state.debug_overlay.toggle();
        }
        if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
            return Ok(());
        }

        let layer_frame = self
            .renderer
            .on_frame(&state.gpu, &viewport, &mut self.store)?;
        self.needs_redraw = layer_frame.needs_redraw;

        let Some((output, view)) = state.gpu.begin_frame()? else {
            return Ok(());
        };

        let (egui_primitives, egui_textures_delta, overlay_actions) =
            state
                .debug_overlay
                .prepare(&state.window, &self.timer, Some(overlay_stats));

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
            pixels_per_point: state.window.scale_factor() as f32,
        };

        let mut encoder = state
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Map Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Layer Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            if let Some(draw) = &layer_frame.draw {
                self.renderer.encode(&mut render_pass, draw);
            }
        }

        state.debug_overlay.upload(
            &state.gpu.device,
            &state.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            state
                .debug_overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        state.debug_overlay.cleanup(&egui_textures_delta);

        state.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if overlay_actions.force_rebuild {
            self.store.mark_dirty();
            self.needs_redraw = true;
            log::info!("Rebuild requested from overlay");
        }
        if overlay_actions.toggle_churn_pause {
            self.toggle_churn_pause();
        }

        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        if let Err(err) = self.attach(event_loop) {
            log::error!("Failed to attach sprite layer: {err}");
            self.shutdown(event_loop);
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("Suspended, releasing GPU resources");
        self.detach();
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &self.state else {
            return;
        };

        let now = self.timer.elapsed();
        let tick = self.churn.tick(now, &mut self.store);
        if tick.changed() || self.needs_redraw || self.input.is_navigating() {
            state.window.request_redraw();
        }

        match self.churn.next_due() {
            Some(due) => event_loop.set_control_flow(ControlFlow::WaitUntil(
                Instant::now() + due.saturating_sub(now),
            )),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(physical_size) => {
                let (w, h) = (physical_size.width, physical_size.height);
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    let window = state.window.clone();
                    self.sync_viewport_size(&window);
                    window.request_redraw();
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let window = state.window.clone();
                self.sync_viewport_size(&window);
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(viewer_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => self.input.key_down(viewer_key),
                            ElementState::Released => self.input.key_up(viewer_key),
                        }
                        if self.input.is_just_pressed(Key::Escape) {
                            log::info!("Escape pressed, exiting.");
                            self.shutdown(event_loop);
                            return;
                        }
                        state.window.request_redraw();
                    }
                }
            }

            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let Some(btn) = map_mouse_button(button) else {
                    return;
                };
                match button_state {
                    ElementState::Pressed if !egui_consumed => self.input.mouse_down(btn),
                    ElementState::Released => self.input.mouse_up(btn),
                    _ => {}
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f64>(state.window.scale_factor());
                self.input.cursor_moved((logical.x, logical.y));
                if self.input.is_mouse_held(MouseBtn::Left) {
                    state.window.request_redraw();
                }
            }

            WindowEvent::MouseWheel { delta, .. } if !egui_consumed => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y as f64,
                    MouseScrollDelta::PixelDelta(p) => {
                        p.to_logical::<f64>(state.window.scale_factor()).y / PIXELS_PER_NOTCH
                    }
                };
                self.input.scroll(notches);
                state.window.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    log::error!("Frame failed: {err}");
                    self.shutdown(event_loop);
                }
            }

            _ => {}
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyQ => Some(Key::Q),
        KeyCode::KeyE => Some(Key::E),
        KeyCode::KeyP => Some(Key::P),
        _ => None,
    }
}

fn map_mouse_button(button: MouseButton) -> Option<MouseBtn> {
    match button {
        MouseButton::Left => Some(MouseBtn::Left),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Sprite Map Viewer starting...");

    let session_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(SESSION_PATH));
    let session = match load_session_config(&session_path) {
        Ok(session) => session,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };
    let mut app = match App::new(&session) {
        Ok(app) => app,
        Err(err) => {
            log::error!("Startup failed: {err}");
            std::process::exit(1);
        }
    };

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);
    event_loop.run_app(&mut app).expect("Event loop error");
}
