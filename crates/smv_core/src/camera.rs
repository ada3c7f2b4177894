//! Per-frame camera transform for the sprite layer.
//!
//! `model` maps reference-relative world coordinates to device pixels:
//!
//! ```text
//! T(device center) * R(rotation) * S(pr/res, -pr/res) * T(reference - center)
//! ```
//!
//! `projection` maps device pixels to clip space with y flipped. World y grows
//! north while device y grows down, so the negative y scale in `model` and the
//! negative y term in `projection` cancel out; dropping either one mirrors the
//! map vertically.

use crate::batch::SpriteVertex;
use crate::viewport::ViewportState;
use glam::{DMat3, DVec2, Mat3, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub model: Mat3,
    pub projection: Mat3,
}

impl CameraTransform {
    /// Rebuilds both matrices from scratch; nothing is cached between frames.
    pub fn new(viewport: &ViewportState, translation: DVec2) -> Self {
        let device_size = viewport.device_size();
        let scale = viewport.pixel_ratio / viewport.resolution;

        let model = DMat3::from_translation(device_size * 0.5)
            * DMat3::from_angle(viewport.rotation_degrees.to_radians())
            * DMat3::from_scale(DVec2::new(scale, -scale))
            * DMat3::from_translation(translation);

        let projection = Mat3::from_cols(
            Vec3::new(2.0 / device_size.x as f32, 0.0, 0.0),
            Vec3::new(0.0, -2.0 / device_size.y as f32, 0.0),
            Vec3::new(-1.0, 1.0, 1.0),
        );

        Self {
            model: model.as_mat3(),
            projection,
        }
    }

    pub fn world_to_device(&self, relative: Vec2) -> Vec2 {
        self.model.transform_point2(relative)
    }

    pub fn device_to_clip(&self, device: Vec2) -> Vec2 {
        self.projection.transform_point2(device)
    }

    /// Clip-space position of a sprite vertex, as the vertex shader computes it.
    pub fn clip_position(&self, vertex: &SpriteVertex) -> Vec2 {
        let anchor = self.world_to_device(Vec2::from(vertex.position));
        let corner = Vec2::from(vertex.offset) * Vec2::from(vertex.size);
        self.device_to_clip(anchor + corner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(center: DVec2) -> ViewportState {
        ViewportState {
            center,
            resolution: 10.0,
            rotation_degrees: 0.0,
            pixel_ratio: 2.0,
            size_px: DVec2::new(400.0, 300.0),
            stationary: true,
        }
    }

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn reference_point_lands_at_screen_center() {
        let camera = CameraTransform::new(&viewport(DVec2::ZERO), DVec2::ZERO);
        assert!(approx(camera.world_to_device(Vec2::ZERO), Vec2::new(400.0, 300.0)));
        assert!(approx(camera.device_to_clip(Vec2::new(400.0, 300.0)), Vec2::ZERO));
    }

    #[test]
    fn projection_maps_device_extent_to_clip_with_y_flip() {
        let camera = CameraTransform::new(&viewport(DVec2::ZERO), DVec2::ZERO);
        assert!(approx(camera.device_to_clip(Vec2::ZERO), Vec2::new(-1.0, 1.0)));
        assert!(approx(
            camera.device_to_clip(Vec2::new(800.0, 600.0)),
            Vec2::new(1.0, -1.0)
        ));
    }

    #[test]
    fn north_stays_up_and_east_stays_right() {
        let camera = CameraTransform::new(&viewport(DVec2::ZERO), DVec2::ZERO);
        let north = camera.device_to_clip(camera.world_to_device(Vec2::new(0.0, 100.0)));
        let east = camera.device_to_clip(camera.world_to_device(Vec2::new(100.0, 0.0)));
        assert!(north.y > 0.0 && north.x.abs() < 1e-5);
        assert!(east.x > 0.0 && east.y.abs() < 1e-5);
        // 100 world units at 10 units per CSS px = 10 CSS px = 20 device px.
        assert!(approx(
            camera.world_to_device(Vec2::new(0.0, 100.0)),
            Vec2::new(400.0, 280.0)
        ));
    }

    #[test]
    fn translation_shifts_by_pan_distance() {
        let reference = DVec2::new(5000.0, 5000.0);
        let current = DVec2::new(5100.0, 5000.0);
        let camera = CameraTransform::new(&viewport(current), reference - current);
        // Sprite at the old reference point now sits 100 units west of center.
        assert!(approx(
            camera.world_to_device(Vec2::ZERO),
            Vec2::new(380.0, 300.0)
        ));
    }

    #[test]
    fn rotation_turns_about_screen_center() {
        let mut rotated = viewport(DVec2::ZERO);
        rotated.rotation_degrees = 90.0;
        let camera = CameraTransform::new(&rotated, DVec2::ZERO);
        let device = camera.world_to_device(Vec2::new(100.0, 0.0));
        assert!(approx(device, Vec2::new(400.0, 320.0)));
    }

    #[test]
    fn top_left_corner_is_up_and_left_of_anchor() {
        let camera = CameraTransform::new(&viewport(DVec2::ZERO), DVec2::ZERO);
        let vertex = SpriteVertex {
            position: [0.0, 0.0],
            offset: [-0.5, -0.5],
            uv: [0.0, 0.0],
            size: [32.0, 32.0],
        };
        let clip = camera.clip_position(&vertex);
        assert!(clip.x < 0.0 && clip.y > 0.0);
        assert!(approx(clip, Vec2::new(-16.0 / 400.0, 16.0 / 300.0)));
    }
}
