use glam::Mat3;
use smv_core::camera::CameraTransform;

/// Uniform block matching the WGSL `CameraUniform`: two `mat3x3<f32>`, each
/// column padded to 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub model: [[f32; 4]; 3],
    pub projection: [[f32; 4]; 3],
}

impl CameraUniform {
    pub fn identity() -> Self {
        Self::from(&CameraTransform {
            model: Mat3::IDENTITY,
            projection: Mat3::IDENTITY,
        })
    }
}

impl From<&CameraTransform> for CameraUniform {
    fn from(camera: &CameraTransform) -> Self {
        Self {
            model: padded_columns(camera.model),
            projection: padded_columns(camera.projection),
        }
    }
}

fn padded_columns(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array_2d();
    [
        [cols[0][0], cols[0][1], cols[0][2], 0.0],
        [cols[1][0], cols[1][1], cols[1][2], 0.0],
        [cols[2][0], cols[2][1], cols[2][2], 0.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniform_is_two_padded_mat3() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 96);
    }

    #[test]
    fn columns_keep_order_and_padding() {
        let projection = Mat3::from_cols(
            Vec3::new(0.25, 0.0, 0.0),
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(-1.0, 1.0, 1.0),
        );
        let uniform = CameraUniform::from(&CameraTransform {
            model: Mat3::IDENTITY,
            projection,
        });
        assert_eq!(uniform.projection[0], [0.25, 0.0, 0.0, 0.0]);
        assert_eq!(uniform.projection[1], [0.0, -0.5, 0.0, 0.0]);
        assert_eq!(uniform.projection[2], [-1.0, 1.0, 1.0, 0.0]);
        assert_eq!(uniform.model, CameraUniform::identity().model);
    }
}
