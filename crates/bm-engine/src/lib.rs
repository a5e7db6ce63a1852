//! `bm-engine` - Block tiling engine and convolution lowering for blockmul.
//!
//! This crate provides:
//! - `large_mv` / `large_mm`: decompose arbitrarily large matrix-vector and
//!   matrix-matrix products into device-sized blocks driven through a
//!   `bm_device::BlockDevice`
//! - `conv_lowering`: im2col-style reshaping of a 4-D weight tensor and a
//!   3-D input volume into the 2-D matrices the tiling engine consumes

pub mod error;
pub mod lowering;
pub mod tiling;

pub use error::{EngineError, Result};
pub use lowering::{conv_lowering, ConvWeightShape, InputVolumeShape};
pub use tiling::{large_mm, large_mv};
