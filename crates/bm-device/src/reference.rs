use crate::backend::BlockBackend;
use crate::error::Result;
use crate::staging::StagingBuffers;

/// Pure-Rust reference backend.
///
/// Computes each block with straightforward dense loops over the full device
/// geometry, accumulating in ascending index order. Results are written back
/// with the same in-place layout the hardware produces, so the tiling engine
/// cannot tell the backends apart. Intended for validation and as a fallback
/// when no device is present.
#[derive(Debug, Default)]
pub struct ReferenceBackend {
    // Reused between blocks; results are computed here first because they
    // alias operand memory once copied back.
    scratch: Vec<f32>,
}

impl ReferenceBackend {
    pub fn new() -> Self {
        ReferenceBackend::default()
    }
}

impl BlockBackend for ReferenceBackend {
    fn name(&self) -> &str {
        "reference"
    }

    fn execute_vector_block(&mut self, staging: &mut StagingBuffers) -> Result<()> {
        let geom = staging.geometry();
        let rows = geom.block_rows();
        let cols = geom.block_cols();

        self.scratch.clear();
        self.scratch.resize(rows, 0.0);
        {
            let vec = staging.vector();
            let mat = staging.matrix();
            for i in 0..rows {
                let mut sum = 0.0f32;
                for j in 0..cols {
                    sum += vec[j] * mat[cols * i + j];
                }
                self.scratch[i] = sum;
            }
        }
        staging.data_mut()[..rows].copy_from_slice(&self.scratch);
        Ok(())
    }

    fn execute_matrix_block(&mut self, staging: &mut StagingBuffers) -> Result<()> {
        let geom = staging.geometry();
        let cols = geom.block_cols();

        self.scratch.clear();
        self.scratch.resize(cols * cols, 0.0);
        {
            let m1 = staging.matrix_a();
            let m2 = staging.matrix_b();
            for i in 0..cols {
                for j in 0..cols {
                    let mut sum = 0.0f32;
                    for k in 0..cols {
                        sum += m1[cols * i + k] * m2[cols * k + j];
                    }
                    self.scratch[cols * i + j] = sum;
                }
            }
        }
        staging.pair_mut()[..cols * cols].copy_from_slice(&self.scratch);
        Ok(())
    }
}
