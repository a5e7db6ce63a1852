use bm_device::BlockDevice;

use crate::error::{EngineError, Result};

/// Multiply an arbitrarily large matrix by a vector, one device block at a
/// time.
///
/// `matrix` is row-major `num_output x num_input`, `input` has `num_input`
/// values, `output` receives `num_output` values. Tiles step by the device
/// geometry; edge tiles are clamped and the vector tail is zero-padded so the
/// dense block kernel's full-width sum contributes nothing for the padding.
///
/// The matrix staging region is deliberately *not* padded: its unused
/// columns and trailing rows keep stale contents, which the zero-padded
/// vector entries multiply to zero. Only the first `block_row` results of
/// each block are consumed.
pub fn large_mv(
    device: &mut BlockDevice,
    matrix: &[f32],
    input: &[f32],
    output: &mut [f32],
    num_input: usize,
    num_output: usize,
) -> Result<()> {
    check_len(matrix, num_output * num_input)?;
    check_len(input, num_input)?;
    check_len(output, num_output)?;

    let rows = device.geometry().block_rows();
    let cols = device.geometry().block_cols();

    output.fill(0.0);

    for i in (0..num_output).step_by(rows) {
        for j in (0..num_input).step_by(cols) {
            let block_row = rows.min(num_output - i);
            let block_col = cols.min(num_input - j);

            // Stage the vector tile, zeroing the unused tail.
            let vec = device.vector_mut();
            vec[..block_col].copy_from_slice(&input[j..j + block_col]);
            vec[block_col..].fill(0.0);

            // Stage the matrix sub-block row by row.
            let mat = device.matrix_mut();
            for r in 0..block_row {
                let src = (i + r) * num_input + j;
                mat[cols * r..cols * r + block_col]
                    .copy_from_slice(&matrix[src..src + block_col]);
            }

            // A logical output row collects one partial sum per column tile.
            let ret = device.block_mv()?;
            for (row, &partial) in ret[..block_row].iter().enumerate() {
                output[i + row] += partial;
            }
        }
    }
    Ok(())
}

/// Multiply two large matrices, one `block_cols x block_cols` device block
/// at a time.
///
/// `weight_mat` is row-major `num_output x num_input`, `input_mat` row-major
/// `num_input x num_matrix2`. The output is written with the device's
/// transposed convention: logical element `(row, col)` lands at
/// `output[row + col * num_output]` (column-major). Callers rely on this
/// layout exactly.
///
/// Unlike the vector path, both operand blocks are fully zero-padded: the
/// block kernel sums over the full `block_cols` inner dimension, so stale
/// values in either operand would corrupt the result.
pub fn large_mm(
    device: &mut BlockDevice,
    weight_mat: &[f32],
    input_mat: &[f32],
    output: &mut [f32],
    num_input: usize,
    num_output: usize,
    num_matrix2: usize,
) -> Result<()> {
    check_len(weight_mat, num_output * num_input)?;
    check_len(input_mat, num_input * num_matrix2)?;
    check_len(output, num_output * num_matrix2)?;

    let cols = device.geometry().block_cols();

    output.fill(0.0);

    for i in (0..num_output).step_by(cols) {
        for j in (0..num_input).step_by(cols) {
            for k in (0..num_matrix2).step_by(cols) {
                let block_row = cols.min(num_output - i);
                let block_col_1 = cols.min(num_input - j);
                let block_col_2 = cols.min(num_matrix2 - k);

                let m1 = device.matrix_a_mut();
                for a in 0..block_row {
                    let src = (i + a) * num_input + j;
                    let dst = &mut m1[cols * a..cols * (a + 1)];
                    dst[..block_col_1].copy_from_slice(&weight_mat[src..src + block_col_1]);
                    dst[block_col_1..].fill(0.0);
                }
                m1[cols * block_row..].fill(0.0);

                let m2 = device.matrix_b_mut();
                for a in 0..block_col_1 {
                    let src = (j + a) * num_matrix2 + k;
                    let dst = &mut m2[cols * a..cols * (a + 1)];
                    dst[..block_col_2].copy_from_slice(&input_mat[src..src + block_col_2]);
                    dst[block_col_2..].fill(0.0);
                }
                m2[cols * block_col_1..].fill(0.0);

                let ret = device.block_mm()?;
                for n in 0..block_row {
                    for m in 0..block_col_2 {
                        output[(i + n) + (k + m) * num_output] += ret[n * cols + m];
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_len(slice: &[f32], expected: usize) -> Result<()> {
    if slice.len() != expected {
        return Err(EngineError::ShapeMismatch {
            expected: vec![expected],
            got: vec![slice.len()],
        });
    }
    Ok(())
}
