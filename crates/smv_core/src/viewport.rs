//! Viewport state handed to the sprite layer every frame, and the controller
//! that derives it from pan/zoom/rotate input.
//!
//! Resolution is world units per CSS pixel. The viewport counts as
//! `stationary` once no navigation input has arrived for the settle delay;
//! the sprite layer only rebuilds buffers while stationary.

use glam::DVec2;
use std::time::Duration;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub center: DVec2,
    pub resolution: f64,
    pub rotation_degrees: f64,
    pub pixel_ratio: f64,
    /// Viewport size in CSS pixels.
    pub size_px: DVec2,
    pub stationary: bool,
}

impl ViewportState {
    pub fn device_size(&self) -> DVec2 {
        self.size_px * self.pixel_ratio
    }
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    center: DVec2,
    resolution: f64,
    rotation_degrees: f64,
    pixel_ratio: f64,
    size_px: DVec2,
    min_resolution: f64,
    max_resolution: f64,
    settle_delay: Duration,
    last_interaction: Option<Duration>,
}

impl ViewportController {
    pub fn new(center: DVec2, resolution: f64) -> Self {
        Self {
            center,
            resolution,
            rotation_degrees: 0.0,
            pixel_ratio: 1.0,
            size_px: DVec2::new(1.0, 1.0),
            min_resolution: resolution.min(0.01),
            max_resolution: resolution.max(156_543.033_928_041),
            settle_delay: DEFAULT_SETTLE_DELAY,
            last_interaction: None,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn center(&self) -> DVec2 {
        self.center
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.rotation_degrees
    }

    /// Window resize or DPI change. Not an interaction: the camera transform
    /// absorbs it without a rebuild.
    pub fn resize(&mut self, size_px: DVec2, pixel_ratio: f64) {
        self.size_px = size_px.max(DVec2::ONE);
        if pixel_ratio > 0.0 {
            self.pixel_ratio = pixel_ratio;
        }
    }

    /// Drag the map content by a CSS pixel delta (y down).
    pub fn pan_by_pixels(&mut self, delta_px: DVec2, now: Duration) {
        if delta_px == DVec2::ZERO {
            return;
        }
        self.center -= self.screen_delta_to_world(delta_px, self.resolution);
        self.last_interaction = Some(now);
    }

    /// Zoom by `factor` (> 1 zooms in) keeping the world point under
    /// `anchor_px` fixed on screen.
    pub fn zoom_about(&mut self, factor: f64, anchor_px: DVec2, now: Duration) {
        if factor <= 0.0 || factor == 1.0 {
            return;
        }
        let from_center = anchor_px - self.size_px * 0.5;
        let anchor_world = self.center + self.screen_delta_to_world(from_center, self.resolution);
        self.resolution =
            (self.resolution / factor).clamp(self.min_resolution, self.max_resolution);
        self.center = anchor_world - self.screen_delta_to_world(from_center, self.resolution);
        self.last_interaction = Some(now);
    }

    pub fn rotate_by(&mut self, degrees: f64, now: Duration) {
        if degrees == 0.0 {
            return;
        }
        self.rotation_degrees = (self.rotation_degrees + degrees).rem_euclid(360.0);
        self.last_interaction = Some(now);
    }

    pub fn screen_to_world(&self, point_px: DVec2) -> DVec2 {
        self.center + self.screen_delta_to_world(point_px - self.size_px * 0.5, self.resolution)
    }

    pub fn is_stationary(&self, now: Duration) -> bool {
        self.last_interaction
            .is_none_or(|at| now.saturating_sub(at) >= self.settle_delay)
    }

    pub fn state(&self, now: Duration) -> ViewportState {
        ViewportState {
            center: self.center,
            resolution: self.resolution,
            rotation_degrees: self.rotation_degrees,
            pixel_ratio: self.pixel_ratio,
            size_px: self.size_px,
            stationary: self.is_stationary(now),
        }
    }

    /// Inverse of the camera's rotate + flip-y scale for a CSS pixel delta.
    fn screen_delta_to_world(&self, delta_px: DVec2, resolution: f64) -> DVec2 {
        let radians = -self.rotation_degrees.to_radians();
        let (sin, cos) = radians.sin_cos();
        let unrotated = DVec2::new(
            delta_px.x * cos - delta_px.y * sin,
            delta_px.x * sin + delta_px.y * cos,
        );
        DVec2::new(unrotated.x, -unrotated.y) * resolution
    }
}
