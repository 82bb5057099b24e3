//! Shared value types for the cube-map clear probe.
//!
//! # Invariants
//! - Face order is fixed: +X, -X, +Y, -Y, +Z, -Z. A face index always names
//!   the same cube direction.
//! - Pixels are 4-channel, 8 bits per channel, in R, G, B, A order.

pub mod status;
pub mod types;

pub use status::{DriverError, DriverStatus};
pub use types::{CubeFace, FACE_COUNT, Rgba8};
