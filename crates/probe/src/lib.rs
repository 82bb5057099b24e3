//! Layered cube-map clear probe.
//!
//! Walks a fixed matrix of texture-allocation strategies. For each one it
//! allocates a cube map, attaches all six faces as one layered render target,
//! clears the framebuffer, and reads every face back to check that the clear
//! reached it.
//!
//! # Invariants
//! - Variants run strictly in matrix order, one at a time.
//! - A variant's texture and framebuffer are destroyed before the next variant
//!   creates its own.
//! - Driver errors and failing faces are results, not failures of the run.

pub mod device;
pub mod lifecycle;
pub mod matrix;
pub mod pool;
pub mod report;
pub mod run;
pub mod sim;
pub mod verify;

pub use device::ClearDevice;
pub use lifecycle::{CubeTarget, Stage};
pub use matrix::{Allocation, AllocationMode, StorageKind, Variant, variants};
pub use pool::PixelPool;
pub use report::{ReportError, Reporter, TextReporter, TracingReporter, write_json};
pub use run::{Probe, ProbeConfig, RunResult, VariantResult};
pub use sim::{Quirk, SimulatedDevice};
pub use verify::{FaceSample, Tolerance, verify_clear};
