//! Batch builder: turns the sprite store into one vertex buffer and one index
//! buffer that draw every resolvable sprite in a single indexed call.
//!
//! Vertex positions are stored relative to a reference center so that f32
//! precision holds regardless of where on the map the sprites live. Each quad
//! replicates the sprite position on all four corners; the corner offset and
//! the pixel size expand it on the GPU, after the camera transform, so icons
//! keep a constant screen size at every zoom level.

use crate::atlas::AtlasIndex;
use crate::store::SpriteEntity;
use glam::DVec2;

pub const FLOATS_PER_VERTEX: usize = 8;
pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

/// Corner offsets in device pixels (y down), paired with `uv_corners()` order.
const CORNER_OFFSETS: [[f32; 2]; VERTICES_PER_QUAD] =
    [[-0.5, -0.5], [-0.5, 0.5], [0.5, -0.5], [0.5, 0.5]];

const QUAD_INDICES: [u32; INDICES_PER_QUAD] = [0, 1, 2, 2, 1, 3];

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub offset: [f32; 2],
    pub uv: [f32; 2],
    pub size: [f32; 2],
}

/// Index storage, narrowed to u16 whenever every vertex is addressable by it.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    pub fn from_u32(indices: Vec<u32>, vertex_count: usize) -> Self {
        if vertex_count <= u16::MAX as usize + 1 {
            Self::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            Self::U32(indices)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(indices) => indices.len(),
            Self::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, position: usize) -> Option<u32> {
        match self {
            Self::U16(indices) => indices.get(position).map(|&i| i as u32),
            Self::U32(indices) => indices.get(position).copied(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U16(indices) => bytemuck::cast_slice(indices),
            Self::U32(indices) => bytemuck::cast_slice(indices),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchGeometry {
    pub vertices: Vec<SpriteVertex>,
    pub indices: IndexData,
    pub triangle_count: u32,
    pub reference_center: DVec2,
    /// Entities dropped because their style code has no atlas entry.
    pub skipped: usize,
}

impl BatchGeometry {
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// The vertex buffer viewed as the flat float array uploaded to the GPU.
    pub fn vertex_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

pub fn rebuild(
    entities: &[SpriteEntity],
    atlas: &AtlasIndex,
    reference_center: DVec2,
) -> BatchGeometry {
    let mut vertices = Vec::with_capacity(entities.len() * VERTICES_PER_QUAD);
    let mut indices: Vec<u32> = Vec::with_capacity(entities.len() * INDICES_PER_QUAD);
    let mut skipped = 0usize;

    for entity in entities {
        let Some(style) = atlas.resolve(&entity.style_code) else {
            skipped += 1;
            continue;
        };

        let relative = entity.position - reference_center;
        let position = [relative.x as f32, relative.y as f32];
        let size = [style.width_px, style.height_px];
        // Bases come from what was emitted so far, never from the entity index.
        let base_index = vertices.len() as u32;

        for (offset, uv) in CORNER_OFFSETS.iter().zip(style.uv_corners()) {
            vertices.push(SpriteVertex {
                position,
                offset: *offset,
                uv,
                size,
            });
        }
        indices.extend(QUAD_INDICES.iter().map(|i| base_index + i));
    }

    let triangle_count = (indices.len() / 3) as u32;
    let indices = IndexData::from_u32(indices, vertices.len());
    BatchGeometry {
        vertices,
        indices,
        triangle_count,
        reference_center,
        skipped,
    }
}
