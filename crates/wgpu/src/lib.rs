//! wgpu backend for the cube-map clear probe.
//!
//! [`GpuContext`] acquires a headless device and checks the capabilities the
//! probe needs; [`WgpuClearDevice`] runs the lifecycle steps on it.
//!
//! # Invariants
//! - Missing adapter, feature or limit is fatal and reported before any
//!   variant runs.
//! - Driver errors raised while a variant runs are captured by error scopes
//!   and returned as status; they never panic.

mod context;
mod device;

pub use context::{ContextError, GpuContext, REQUIRED_FEATURES, check_capabilities};
pub use device::{WgpuClearDevice, WgpuHandles, padded_bytes_per_row};
