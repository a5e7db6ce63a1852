//! `bm-device` - Block-multiplication device handle with pluggable compute backends.
//!
//! This crate provides:
//! - A `BlockDevice` handle owning the staging buffers and invocation counter
//! - A `BlockBackend` trait for pluggable block compute (reference CPU, MMIO hardware)
//! - A `ReferenceBackend` CPU implementation used for validation and fallback
//! - An `MmioBackend` register-handshake implementation (feature `mmio`)
//! - `BlockGeometry`, the fixed per-block operand dimensions

pub mod backend;
pub mod device;
pub mod error;
pub mod geometry;
#[cfg(feature = "mmio")]
pub mod mmio;
pub mod reference;
pub mod staging;

// Re-export primary types at the crate root for convenience.
pub use backend::BlockBackend;
pub use device::BlockDevice;
pub use error::{DeviceError, Result};
pub use geometry::BlockGeometry;
#[cfg(feature = "mmio")]
pub use mmio::MmioBackend;
pub use reference::ReferenceBackend;
pub use staging::StagingBuffers;
