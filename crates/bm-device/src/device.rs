use crate::backend::BlockBackend;
use crate::error::Result;
use crate::geometry::BlockGeometry;
use crate::reference::ReferenceBackend;
use crate::staging::StagingBuffers;

/// Handle to one block-multiplication device.
///
/// Owns the staging buffers, the compute backend, and the invocation
/// counter. Callers stage operands through the region accessors, then call
/// [`block_mv`](BlockDevice::block_mv) or [`block_mm`](BlockDevice::block_mm)
/// to run one block and read the result.
///
/// Block results alias staging memory; they are returned as borrows of the
/// device, so the next staging write requires the result view to be dropped
/// first.
#[derive(Debug)]
pub struct BlockDevice {
    geometry: BlockGeometry,
    staging: StagingBuffers,
    backend: Box<dyn BlockBackend>,
    block_calls: u64,
}

impl BlockDevice {
    pub fn new(geometry: BlockGeometry, backend: Box<dyn BlockBackend>) -> Self {
        BlockDevice {
            geometry,
            staging: StagingBuffers::new(geometry),
            backend,
            block_calls: 0,
        }
    }

    /// Device backed by the CPU reference kernel.
    pub fn with_reference(geometry: BlockGeometry) -> Self {
        Self::new(geometry, Box::new(ReferenceBackend::new()))
    }

    pub fn geometry(&self) -> BlockGeometry {
        self.geometry
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Number of block computations since construction or the last `reset`.
    pub fn block_calls(&self) -> u64 {
        self.block_calls
    }

    /// Zero the invocation counter. Staging contents are untouched.
    pub fn reset(&mut self) {
        self.block_calls = 0;
    }

    /// Read-only view of the staging buffers.
    pub fn staging(&self) -> &StagingBuffers {
        &self.staging
    }

    pub fn vector_mut(&mut self) -> &mut [f32] {
        self.staging.vector_mut()
    }

    pub fn matrix_mut(&mut self) -> &mut [f32] {
        self.staging.matrix_mut()
    }

    pub fn matrix_a_mut(&mut self) -> &mut [f32] {
        self.staging.matrix_a_mut()
    }

    pub fn matrix_b_mut(&mut self) -> &mut [f32] {
        self.staging.matrix_b_mut()
    }

    /// Execute one matrix-vector block and return the `block_rows` results.
    ///
    /// Blocks until the backend signals completion. The view aliases the
    /// vector+matrix staging area.
    pub fn block_mv(&mut self) -> Result<&[f32]> {
        self.block_calls += 1;
        self.backend.execute_vector_block(&mut self.staging)?;
        Ok(self.staging.mv_result())
    }

    /// Execute one matrix-matrix block and return the
    /// `block_cols x block_cols` results. The view aliases the pair area.
    pub fn block_mm(&mut self) -> Result<&[f32]> {
        self.block_calls += 1;
        self.backend.execute_matrix_block(&mut self.staging)?;
        Ok(self.staging.mm_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn device() -> BlockDevice {
        BlockDevice::with_reference(BlockGeometry::new(2, 2).unwrap())
    }

    #[test]
    fn test_block_mv() {
        let mut d = device();
        d.vector_mut().copy_from_slice(&[1.0, 2.0]);
        d.matrix_mut().copy_from_slice(&[3.0, 4.0, 5.0, 6.0]);

        let out = d.block_mv().unwrap();
        assert_relative_eq!(out[0], 11.0);
        assert_relative_eq!(out[1], 17.0);
    }

    #[test]
    fn test_block_mm() {
        let mut d = device();
        d.matrix_a_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        d.matrix_b_mut().copy_from_slice(&[5.0, 6.0, 7.0, 8.0]);

        let out = d.block_mm().unwrap();
        assert_eq!(out, &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_block_calls_and_reset() {
        let mut d = device();
        assert_eq!(d.block_calls(), 0);

        d.block_mv().unwrap();
        d.block_mm().unwrap();
        assert_eq!(d.block_calls(), 2);

        d.reset();
        assert_eq!(d.block_calls(), 0);
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(device().backend_name(), "reference");
    }
}
