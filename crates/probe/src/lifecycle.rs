//! Per-variant texture/framebuffer lifecycle.
//!
//! ```text
//! Created -> Allocated -> [PreCleared] -> Attached -> Cleared -> Detached -> Sampled(x6) -> Destroyed
//! ```
//!
//! # Invariants
//! - Stages only move forward.
//! - Handles are destroyed on every exit path, including unwinding.
//! - Driver errors never stop the sequence; they are collected once at the end.

use crate::device::ClearDevice;
use crate::matrix::{Allocation, Variant};
use crate::pool::PixelPool;
use crate::verify::FaceSample;
use cubeclear_common::{CubeFace, DriverStatus, Rgba8};

/// Lifecycle stage of a variant's GPU objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Created,
    Allocated,
    PreCleared,
    Attached,
    Cleared,
    Detached,
    Sampled,
    Destroyed,
}

/// Scoped owner of one variant's texture and framebuffer.
///
/// Dropping the guard destroys both objects.
pub struct CubeTarget<'d, D: ClearDevice> {
    device: &'d mut D,
    handles: D::Handles,
    face_size: u32,
    stage: Stage,
}

impl<'d, D: ClearDevice> CubeTarget<'d, D> {
    pub fn create(device: &'d mut D, face_size: u32) -> Self {
        let handles = device.create_cube(face_size);
        Self {
            device,
            handles,
            face_size,
            stage: Stage::Created,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next >= self.stage, "{:?} after {:?}", next, self.stage);
        tracing::debug!(stage = ?next, "lifecycle");
        self.stage = next;
    }

    /// Apply the allocation step. The only place allocation modes are
    /// dispatched on.
    pub fn allocate(&mut self, allocation: Allocation, seed: &[u8]) {
        match allocation {
            Allocation::PerFace { seeded } => {
                let data = seeded.then_some(seed);
                for face in CubeFace::ALL {
                    self.device.specify_face(&mut self.handles, face, data);
                }
            }
            Allocation::Immutable { levels } => {
                self.device.allocate_storage(&mut self.handles, levels);
            }
        }
        self.advance(Stage::Allocated);
    }

    pub fn pre_clear(&mut self, color: Rgba8) {
        self.device.clear_texture(&mut self.handles, color);
        self.advance(Stage::PreCleared);
    }

    pub fn attach(&mut self) {
        self.device.attach_layered(&mut self.handles);
        self.advance(Stage::Attached);
    }

    pub fn clear(&mut self, color: Rgba8) {
        self.device.clear_attachment(&mut self.handles, color);
        self.advance(Stage::Cleared);
    }

    pub fn detach(&mut self) {
        self.device.detach(&mut self.handles);
        self.advance(Stage::Detached);
    }

    /// Read back every face in order and verify its center texel.
    pub fn sample(&mut self, pool: &mut PixelPool) -> Vec<FaceSample> {
        debug_assert_eq!(pool.face_size(), self.face_size);
        let samples: Vec<FaceSample> = CubeFace::ALL
            .into_iter()
            .map(|face| {
                pool.reset_scratch();
                self.device.read_face(&self.handles, face, pool.scratch_mut());
                FaceSample::new(face, pool.center_texel())
            })
            .collect();
        self.advance(Stage::Sampled);
        samples
    }

    /// Collect the pending driver status and destroy the objects.
    pub fn finish(mut self) -> DriverStatus {
        let status = self.device.take_error();
        self.release();
        status
    }

    fn release(&mut self) {
        if self.stage != Stage::Destroyed {
            self.device.destroy(&mut self.handles);
            self.stage = Stage::Destroyed;
            tracing::debug!(stage = ?Stage::Destroyed, "lifecycle");
        }
    }
}

impl<D: ClearDevice> Drop for CubeTarget<'_, D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Clear colors used by a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colors {
    pub clear: Rgba8,
    pub seed: Rgba8,
}

/// Run one variant from creation to destruction.
pub fn process_variant<D: ClearDevice>(
    device: &mut D,
    pool: &mut PixelPool,
    variant: Variant,
    colors: Colors,
) -> (Vec<FaceSample>, DriverStatus) {
    let mut target = CubeTarget::create(device, pool.face_size());
    target.allocate(variant.mode.allocation(), pool.seed());
    if variant.mode.pre_clears() {
        target.pre_clear(colors.seed);
    }
    target.attach();
    target.clear(colors.clear);
    target.detach();
    let samples = target.sample(pool);
    let status = target.finish();
    (samples, status)
}
