use smv_core::batch::SpriteVertex;

/// Vertex buffer layout for `SpriteVertex`: four `vec2<f32>` attributes,
/// 32-byte stride.
pub fn sprite_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position, relative to the reference center
            wgpu::VertexAttribute {
                offset: std::mem::offset_of!(SpriteVertex, position) as wgpu::BufferAddress,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // corner offset
            wgpu::VertexAttribute {
                offset: std::mem::offset_of!(SpriteVertex, offset) as wgpu::BufferAddress,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: std::mem::offset_of!(SpriteVertex, uv) as wgpu::BufferAddress,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
            // sprite size in pixels
            wgpu::VertexAttribute {
                offset: std::mem::offset_of!(SpriteVertex, size) as wgpu::BufferAddress,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    }
}
