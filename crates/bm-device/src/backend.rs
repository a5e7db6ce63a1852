use std::fmt::Debug;

use crate::error::Result;
use crate::staging::StagingBuffers;

/// Trait for pluggable block compute backends (reference CPU, MMIO hardware).
///
/// A backend consumes the operands currently staged in `StagingBuffers` and
/// writes the block result back in place, over the head of the same area the
/// operands were staged into. Both operations are synchronous: when they
/// return `Ok`, the result is fully materialized in staging memory.
pub trait BlockBackend: Send + Debug {
    /// Returns the name of this backend (e.g., "reference", "mmio").
    fn name(&self) -> &str;

    /// Matrix-vector block: reads the vector and matrix staging regions and
    /// writes `block_rows` results over the head of the vector+matrix area.
    ///
    /// The full `block_cols` width is summed, so padding of the vector
    /// region decides what unused matrix columns contribute.
    fn execute_vector_block(&mut self, staging: &mut StagingBuffers) -> Result<()>;

    /// Matrix-matrix block: reads M1 and M2 and writes
    /// `block_cols x block_cols` results over the head of the pair area.
    fn execute_matrix_block(&mut self, staging: &mut StagingBuffers) -> Result<()>;
}
