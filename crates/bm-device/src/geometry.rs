use crate::error::{DeviceError, Result};
use std::fmt;

/// The fixed operand dimensions the device computes per invocation.
///
/// A vector block holds `block_cols` values, a matrix block
/// `block_rows x block_cols`, and each operand of a matrix-matrix block
/// `block_cols x block_cols`. Fixed for the lifetime of a device handle;
/// all tiling decisions derive from these two numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    block_rows: usize,
    block_cols: usize,
}

impl BlockGeometry {
    /// Create a geometry, rejecting zero-sized blocks up front so the
    /// tiling loops never have to handle them.
    pub fn new(block_rows: usize, block_cols: usize) -> Result<Self> {
        if block_rows == 0 || block_cols == 0 {
            return Err(DeviceError::InvalidGeometry {
                rows: block_rows,
                cols: block_cols,
            });
        }
        Ok(BlockGeometry {
            block_rows,
            block_cols,
        })
    }

    pub fn block_rows(&self) -> usize {
        self.block_rows
    }

    pub fn block_cols(&self) -> usize {
        self.block_cols
    }

    /// Length of the vector staging region.
    pub fn vector_len(&self) -> usize {
        self.block_cols
    }

    /// Length of the matrix staging region (row-major `block_rows x block_cols`).
    pub fn matrix_len(&self) -> usize {
        self.block_rows * self.block_cols
    }

    /// Total length of the vector+matrix staging area. The vector occupies
    /// the first `block_cols` slots and the matrix follows, matching the
    /// device's BRAM layout.
    pub fn data_len(&self) -> usize {
        (self.block_rows + 1) * self.block_cols
    }

    /// Length of one operand of the matrix-pair staging area.
    pub fn pair_region_len(&self) -> usize {
        self.block_cols * self.block_cols
    }

    /// Total length of the matrix-pair staging area (M1 and M2 back to back).
    pub fn pair_data_len(&self) -> usize {
        2 * self.block_cols * self.block_cols
    }

    /// Length of a vector-block result.
    pub fn mv_result_len(&self) -> usize {
        self.block_rows
    }

    /// Length of a matrix-block result.
    pub fn mm_result_len(&self) -> usize {
        self.block_cols * self.block_cols
    }
}

impl fmt::Display for BlockGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.block_rows, self.block_cols)
    }
}
