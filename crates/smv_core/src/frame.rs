//! Per-frame rebuild gate for the sprite layer.
//!
//! Rebuilding the batch is O(sprites) and dominates frame cost, so it only
//! happens on a stationary viewport:
//!
//!   1. viewport moving: refresh the translation term, ask for another frame,
//!      leave the buffers alone
//!   2. stationary, clean store, no translation: nothing to do
//!   3. otherwise: re-anchor on the current center, clear the dirty flag,
//!      rebuild, and hand the geometry to the GPU side for a wholesale upload
//!
//! The camera transform is recomputed every frame regardless, and the draw is
//! skipped entirely while the last rebuild emitted no indices.

use crate::atlas::AtlasIndex;
use crate::batch::{self, BatchGeometry};
use crate::camera::CameraTransform;
use crate::store::SpriteStore;
use crate::viewport::ViewportState;
use glam::DVec2;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    Panning,
    Idle,
    Rebuild,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub camera: CameraTransform,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub decision: FrameDecision,
    pub camera: CameraTransform,
    /// Present only on rebuild frames; the GPU side must upload it wholesale.
    pub rebuilt: Option<BatchGeometry>,
    pub draw: Option<DrawCommand>,
}

impl FrameOutcome {
    pub fn needs_redraw(&self) -> bool {
        self.decision == FrameDecision::Panning
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub rebuild_count: u64,
    pub last_rebuild: Duration,
    pub emitted_quads: usize,
    pub skipped_entities: usize,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct FrameGate {
    reference_center: DVec2,
    translation: DVec2,
    index_count: u32,
    /// Set when GPU buffers no longer hold the last batch (fresh attach).
    invalidated: bool,
    stats: FrameStats,
}

impl FrameGate {
    pub fn new(reference_center: DVec2) -> Self {
        Self {
            reference_center,
            translation: DVec2::ZERO,
            index_count: 0,
            invalidated: true,
            stats: FrameStats::default(),
        }
    }

    pub fn reference_center(&self) -> DVec2 {
        self.reference_center
    }

    pub fn translation(&self) -> DVec2 {
        self.translation
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Forget the uploaded batch; the next stationary frame rebuilds.
    pub fn invalidate(&mut self) {
        self.index_count = 0;
        self.invalidated = true;
    }

    pub fn decide(&mut self, viewport: &ViewportState, dirty: bool) -> FrameDecision {
        self.translation = self.reference_center - viewport.center;
        if !viewport.stationary {
            return FrameDecision::Panning;
        }
        if !dirty && !self.invalidated && self.translation == DVec2::ZERO {
            return FrameDecision::Idle;
        }
        FrameDecision::Rebuild
    }

    pub fn advance(
        &mut self,
        viewport: &ViewportState,
        store: &mut SpriteStore,
        atlas: &AtlasIndex,
    ) -> FrameOutcome {
        let decision = self.decide(viewport, store.is_dirty());

        let rebuilt = if decision == FrameDecision::Rebuild {
            self.reference_center = viewport.center;
            self.translation = DVec2::ZERO;
            self.invalidated = false;
            store.clear_dirty();

            let started = Instant::now();
            let geometry = batch::rebuild(store.entities(), atlas, self.reference_center);
            self.index_count = geometry.index_count();

            self.stats.rebuild_count += 1;
            self.stats.last_rebuild = started.elapsed();
            self.stats.emitted_quads = geometry.quad_count();
            self.stats.skipped_entities = geometry.skipped;
            self.stats.index_count = self.index_count;
            log::debug!(
                "Sprite batch rebuilt: {} quads, {} skipped (unresolved style), {:.2} ms",
                self.stats.emitted_quads,
                self.stats.skipped_entities,
                self.stats.last_rebuild.as_secs_f64() * 1000.0
            );
            Some(geometry)
        } else {
            None
        };

        let camera = CameraTransform::new(viewport, self.translation);
        let draw = (self.index_count > 0).then_some(DrawCommand {
            camera,
            index_count: self.index_count,
        });

        FrameOutcome {
            decision,
            camera,
            rebuilt,
            draw,
        }
    }
}
