//! GPU side of the sprite layer.
//!
//! `SpriteRenderer` owns the atlas and the frame gate for the whole session,
//! but its GPU resources only exist between `initialize` and `teardown`. The
//! host may detach and re-attach any number of times; each attach re-uploads
//! the atlas and forces a rebuild on the next stationary frame.

use std::path::Path;

use glam::DVec2;
use smv_core::atlas::{load_atlas_metadata, AtlasIndex};
use smv_core::batch::{BatchGeometry, IndexData};
use smv_core::frame::{DrawCommand, FrameGate, FrameStats};
use smv_core::store::SpriteStore;
use smv_core::viewport::ViewportState;
use wgpu::util::DeviceExt;

use crate::camera::CameraUniform;
use crate::error::RenderError;
use crate::gpu_context::GpuContext;
use crate::sprite_pipeline::SpritePipeline;
use crate::texture::{load_atlas_image, Texture};

/// Smallest buffer allocation, in bytes.
const MIN_BUFFER_BYTES: u64 = 256;

/// A map layer with an explicit attach/detach lifecycle.
pub trait MapLayer {
    /// Allocates GPU resources. Calling it on an attached layer is a no-op.
    fn initialize(&mut self, gpu: &GpuContext) -> Result<(), RenderError>;

    /// Releases GPU resources. Calling it on a detached layer is a no-op.
    fn teardown(&mut self);

    fn is_attached(&self) -> bool;

    /// Runs the per-frame gate and uploads whatever it produced.
    fn on_frame(
        &mut self,
        gpu: &GpuContext,
        viewport: &ViewportState,
        store: &mut SpriteStore,
    ) -> Result<LayerFrame, RenderError>;

    /// Records the layer's draw into an open render pass.
    fn encode(&self, pass: &mut wgpu::RenderPass<'_>, draw: &DrawCommand);
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerFrame {
    pub draw: Option<DrawCommand>,
    /// The viewport is still moving; the host should schedule another frame.
    pub needs_redraw: bool,
}

struct GpuSpriteResources {
    pipeline: SpritePipeline,
    atlas_texture: Texture,
    atlas_bind_group: wgpu::BindGroup,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_capacity: u64,
    index_capacity: u64,
    index_format: wgpu::IndexFormat,
}

impl GpuSpriteResources {
    fn create(gpu: &GpuContext, atlas_image: &image::RgbaImage) -> Result<Self, RenderError> {
        let pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let atlas_texture = gpu.allocate("atlas texture", |device| {
            Texture::from_rgba(device, &gpu.queue, atlas_image, "Sprite Atlas")
        })?;
        let atlas_bind_group = pipeline.create_texture_bind_group(&gpu.device, &atlas_texture);

        let camera_buffer = gpu.allocate("camera uniform", |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[CameraUniform::identity()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        })?;
        let camera_bind_group = pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);

        let vertex_buffer = gpu.allocate("vertex buffer", |device| {
            create_vertex_buffer(device, MIN_BUFFER_BYTES)
        })?;
        let index_buffer = gpu.allocate("index buffer", |device| {
            create_index_buffer(device, MIN_BUFFER_BYTES)
        })?;

        Ok(Self {
            pipeline,
            atlas_texture,
            atlas_bind_group,
            camera_buffer,
            camera_bind_group,
            vertex_buffer,
            index_buffer,
            vertex_capacity: MIN_BUFFER_BYTES,
            index_capacity: MIN_BUFFER_BYTES,
            index_format: wgpu::IndexFormat::Uint16,
        })
    }

    /// Replaces both buffers' contents with the new batch.
    fn upload(&mut self, gpu: &GpuContext, geometry: &BatchGeometry) -> Result<(), RenderError> {
        let vertex_bytes = geometry.vertex_bytes();
        let index_bytes = geometry.indices.as_bytes();

        if let Some(capacity) = grown_capacity(self.vertex_capacity, vertex_bytes.len() as u64) {
            self.vertex_buffer.destroy();
            self.vertex_buffer =
                gpu.allocate("vertex buffer", |device| create_vertex_buffer(device, capacity))?;
            self.vertex_capacity = capacity;
            log::debug!("Sprite vertex buffer grown to {capacity} bytes");
        }
        if let Some(capacity) = grown_capacity(self.index_capacity, index_bytes.len() as u64) {
            self.index_buffer.destroy();
            self.index_buffer =
                gpu.allocate("index buffer", |device| create_index_buffer(device, capacity))?;
            self.index_capacity = capacity;
            log::debug!("Sprite index buffer grown to {capacity} bytes");
        }

        self.index_format = index_format(&geometry.indices);
        if !vertex_bytes.is_empty() {
            gpu.queue.write_buffer(&self.vertex_buffer, 0, vertex_bytes);
        }
        if !index_bytes.is_empty() {
            gpu.queue.write_buffer(&self.index_buffer, 0, index_bytes);
        }
        Ok(())
    }

    fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.camera_buffer.destroy();
        self.atlas_texture.texture.destroy();
    }
}

pub struct SpriteRenderer {
    atlas: AtlasIndex,
    atlas_image: image::RgbaImage,
    gate: FrameGate,
    resources: Option<GpuSpriteResources>,
}

impl SpriteRenderer {
    pub fn new(atlas: AtlasIndex, atlas_image: image::RgbaImage, reference_center: DVec2) -> Self {
        Self {
            atlas,
            atlas_image,
            gate: FrameGate::new(reference_center),
            resources: None,
        }
    }

    /// Loads the atlas image and its metadata. UVs are normalized against the
    /// decoded image size.
    pub fn load(
        image_path: &Path,
        metadata_path: &Path,
        reference_center: DVec2,
    ) -> Result<Self, RenderError> {
        let atlas_image = load_atlas_image(image_path)?;
        let rects = load_atlas_metadata(metadata_path).map_err(RenderError::Asset)?;
        let atlas = AtlasIndex::from_pixel_rects(atlas_image.dimensions(), &rects)
            .map_err(RenderError::Asset)?;
        log::info!(
            "Loaded sprite atlas {} ({}x{}, {} styles)",
            image_path.display(),
            atlas_image.width(),
            atlas_image.height(),
            atlas.len()
        );
        Ok(Self::new(atlas, atlas_image, reference_center))
    }

    pub fn atlas(&self) -> &AtlasIndex {
        &self.atlas
    }

    pub fn stats(&self) -> &FrameStats {
        self.gate.stats()
    }

    /// Index format of the uploaded batch, `None` while detached.
    pub fn index_format(&self) -> Option<wgpu::IndexFormat> {
        self.resources.as_ref().map(|r| r.index_format)
    }
}

impl MapLayer for SpriteRenderer {
    fn initialize(&mut self, gpu: &GpuContext) -> Result<(), RenderError> {
        if self.resources.is_some() {
            return Ok(());
        }
        self.resources = Some(GpuSpriteResources::create(gpu, &self.atlas_image)?);
        self.gate.invalidate();
        log::info!("Sprite layer attached");
        Ok(())
    }

    fn teardown(&mut self) {
        let Some(resources) = self.resources.take() else {
            return;
        };
        resources.destroy();
        self.gate.invalidate();
        log::info!("Sprite layer detached");
    }

    fn is_attached(&self) -> bool {
        self.resources.is_some()
    }

    fn on_frame(
        &mut self,
        gpu: &GpuContext,
        viewport: &ViewportState,
        store: &mut SpriteStore,
    ) -> Result<LayerFrame, RenderError> {
        let Some(resources) = self.resources.as_mut() else {
            return Ok(LayerFrame::default());
        };

        let outcome = self.gate.advance(viewport, store, &self.atlas);
        if let Some(geometry) = &outcome.rebuilt {
            resources.upload(gpu, geometry)?;
        }

        let uniform = CameraUniform::from(&outcome.camera);
        gpu.queue
            .write_buffer(&resources.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));

        Ok(LayerFrame {
            draw: outcome.draw,
            needs_redraw: outcome.needs_redraw(),
        })
    }

    fn encode(&self, pass: &mut wgpu::RenderPass<'_>, draw: &DrawCommand) {
        let Some(resources) = self.resources.as_ref() else {
            return;
        };
        if draw.index_count == 0 {
            return;
        }
        pass.set_pipeline(&resources.pipeline.render_pipeline);
        pass.set_bind_group(0, &resources.camera_bind_group, &[]);
        pass.set_bind_group(1, &resources.atlas_bind_group, &[]);
        pass.set_vertex_buffer(0, resources.vertex_buffer.slice(..));
        pass.set_index_buffer(resources.index_buffer.slice(..), resources.index_format);
        pass.draw_indexed(0..draw.index_count, 0, 0..1);
    }
}

pub fn index_format(indices: &IndexData) -> wgpu::IndexFormat {
    match indices {
        IndexData::U16(_) => wgpu::IndexFormat::Uint16,
        IndexData::U32(_) => wgpu::IndexFormat::Uint32,
    }
}

/// New power-of-two capacity when `needed` bytes no longer fit; buffers never
/// shrink.
fn grown_capacity(current: u64, needed: u64) -> Option<u64> {
    (needed > current).then(|| needed.max(MIN_BUFFER_BYTES).next_power_of_two())
}

fn create_vertex_buffer(device: &wgpu::Device, byte_len: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, byte_len: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
