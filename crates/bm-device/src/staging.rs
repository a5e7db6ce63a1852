use crate::geometry::BlockGeometry;

/// Host-side staging buffers mirroring the device's operand memory.
///
/// Two flat row-major f32 areas:
///
/// - `data`: the vector region (first `block_cols` slots) immediately
///   followed by the matrix region (`block_rows x block_cols`). A vector
///   block's result is written back over the head of this area.
/// - `pair`: the two `block_cols x block_cols` matrix-matrix operands M1 and
///   M2, back to back. A matrix block's result is written back over the head.
///
/// The in-place result layout matches what the hardware produces: results
/// alias operand memory, so a result view is only valid until the next
/// staging write.
#[derive(Debug)]
pub struct StagingBuffers {
    geometry: BlockGeometry,
    data: Vec<f32>,
    pair: Vec<f32>,
}

impl StagingBuffers {
    pub fn new(geometry: BlockGeometry) -> Self {
        StagingBuffers {
            geometry,
            data: vec![0.0; geometry.data_len()],
            pair: vec![0.0; geometry.pair_data_len()],
        }
    }

    pub fn geometry(&self) -> BlockGeometry {
        self.geometry
    }

    /// The vector staging region, `block_cols` values.
    pub fn vector(&self) -> &[f32] {
        &self.data[..self.geometry.vector_len()]
    }

    pub fn vector_mut(&mut self) -> &mut [f32] {
        let n = self.geometry.vector_len();
        &mut self.data[..n]
    }

    /// The matrix staging region, row-major `block_rows x block_cols`.
    pub fn matrix(&self) -> &[f32] {
        &self.data[self.geometry.vector_len()..]
    }

    pub fn matrix_mut(&mut self) -> &mut [f32] {
        let off = self.geometry.vector_len();
        &mut self.data[off..]
    }

    /// First matrix-matrix operand, row-major `block_cols x block_cols`.
    pub fn matrix_a(&self) -> &[f32] {
        &self.pair[..self.geometry.pair_region_len()]
    }

    pub fn matrix_a_mut(&mut self) -> &mut [f32] {
        let n = self.geometry.pair_region_len();
        &mut self.pair[..n]
    }

    /// Second matrix-matrix operand, row-major `block_cols x block_cols`.
    pub fn matrix_b(&self) -> &[f32] {
        &self.pair[self.geometry.pair_region_len()..]
    }

    pub fn matrix_b_mut(&mut self) -> &mut [f32] {
        let off = self.geometry.pair_region_len();
        &mut self.pair[off..]
    }

    /// Result of the last vector block, `block_rows` values aliasing the
    /// head of the vector+matrix area.
    pub fn mv_result(&self) -> &[f32] {
        &self.data[..self.geometry.mv_result_len()]
    }

    /// Result of the last matrix block, `block_cols x block_cols` values
    /// aliasing the head of the pair area.
    pub fn mm_result(&self) -> &[f32] {
        &self.pair[..self.geometry.mm_result_len()]
    }

    /// The whole vector+matrix area, for backends that transfer it wholesale.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// The whole pair area.
    pub fn pair(&self) -> &[f32] {
        &self.pair
    }

    pub fn pair_mut(&mut self) -> &mut [f32] {
        &mut self.pair
    }
}
