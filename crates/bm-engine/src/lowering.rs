use crate::error::{EngineError, Result};

/// Shape of a 4-D convolution weight tensor,
/// `[conv_channels, input_channels, kernel_h, kernel_w]` row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvWeightShape {
    pub conv_channels: usize,
    pub input_channels: usize,
    pub kernel_h: usize,
    pub kernel_w: usize,
}

impl ConvWeightShape {
    pub fn numel(&self) -> usize {
        self.conv_channels * self.input_channels * self.kernel_h * self.kernel_w
    }

    /// Rows of the lowered weight matrix.
    pub fn lowered_rows(&self) -> usize {
        self.conv_channels
    }

    /// Columns of the lowered weight matrix, and rows of the lowered input
    /// matrix: one slot per (input channel, kernel row, kernel col) triple.
    pub fn lowered_cols(&self) -> usize {
        self.input_channels * self.kernel_h * self.kernel_w
    }
}

/// Shape of a 3-D input volume, `[channels, height, width]` row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputVolumeShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl InputVolumeShape {
    pub fn numel(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// Output height of a valid, stride-1 convolution with the given kernel.
    pub fn out_h(&self, weights: &ConvWeightShape) -> usize {
        self.height - weights.kernel_h + 1
    }

    /// Output width of a valid, stride-1 convolution with the given kernel.
    pub fn out_w(&self, weights: &ConvWeightShape) -> usize {
        self.width - weights.kernel_w + 1
    }
}

/// im2col-style lowering of a convolution into a plain matrix product.
///
/// Fills the caller-provided buffers so that
/// `new_weights @ new_inputs` (ordinary row-major matrix product,
/// `[conv_channels, K] @ [K, out_h*out_w]` with
/// `K = input_channels*kernel_h*kernel_w`) equals the flattened result of
/// the valid, stride-1 convolution of `input` with `weights`.
///
/// Index mapping (consumers depend on this exact layout):
/// - `new_weights[i][j]` with `j = kc + kernel_w*(kr + kernel_h*ic)` is
///   `weights[i][ic][kr][kc]`;
/// - `new_inputs[j][or*out_w + oc]` with the same `j` flattening is
///   `input[ic][or + kr][oc + kc]`.
///
/// Pure data movement; no device interaction.
pub fn conv_lowering(
    weights: &[f32],
    wshape: ConvWeightShape,
    input: &[f32],
    ishape: InputVolumeShape,
    new_weights: &mut [f32],
    new_inputs: &mut [f32],
) -> Result<()> {
    if wshape.input_channels != ishape.channels {
        return Err(EngineError::ShapeMismatch {
            expected: vec![wshape.input_channels],
            got: vec![ishape.channels],
        });
    }
    if wshape.kernel_h > ishape.height || wshape.kernel_w > ishape.width {
        return Err(EngineError::ShapeMismatch {
            expected: vec![ishape.height, ishape.width],
            got: vec![wshape.kernel_h, wshape.kernel_w],
        });
    }
    check_len(weights, wshape.numel())?;
    check_len(input, ishape.numel())?;

    let k = wshape.lowered_cols();
    let out_h = ishape.out_h(&wshape);
    let out_w = ishape.out_w(&wshape);
    check_len(new_weights, wshape.lowered_rows() * k)?;
    check_len(new_inputs, k * out_h * out_w)?;

    let ConvWeightShape {
        conv_channels,
        input_channels,
        kernel_h,
        kernel_w,
    } = wshape;

    for i in 0..conv_channels {
        for ic in 0..input_channels {
            for kr in 0..kernel_h {
                for kc in 0..kernel_w {
                    let col = kc + kernel_w * (kr + kernel_h * ic);
                    let src = ((i * input_channels + ic) * kernel_h + kr) * kernel_w + kc;
                    new_weights[i * k + col] = weights[src];
                }
            }
        }
    }

    for ic in 0..input_channels {
        for or in 0..out_h {
            for oc in 0..out_w {
                for kr in 0..kernel_h {
                    for kc in 0..kernel_w {
                        let row = kc + kernel_w * (kr + kernel_h * ic);
                        let src = (ic * ishape.height + or + kr) * ishape.width + oc + kc;
                        new_inputs[row * (out_h * out_w) + or * out_w + oc] = input[src];
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiling::large_mm;
    use approx::assert_relative_eq;
    use bm_device::{BlockDevice, BlockGeometry};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Direct valid stride-1 convolution, output `[conv_channels, out_h, out_w]`.
    fn direct_conv(
        weights: &[f32],
        wshape: ConvWeightShape,
        input: &[f32],
        ishape: InputVolumeShape,
    ) -> Vec<f32> {
        let out_h = ishape.out_h(&wshape);
        let out_w = ishape.out_w(&wshape);
        let mut out = vec![0.0f32; wshape.conv_channels * out_h * out_w];
        for cc in 0..wshape.conv_channels {
            for or in 0..out_h {
                for oc in 0..out_w {
                    let mut sum = 0.0f32;
                    for ic in 0..wshape.input_channels {
                        for kr in 0..wshape.kernel_h {
                            for kc in 0..wshape.kernel_w {
                                let w = weights[((cc * wshape.input_channels + ic)
                                    * wshape.kernel_h
                                    + kr)
                                    * wshape.kernel_w
                                    + kc];
                                let x = input
                                    [(ic * ishape.height + or + kr) * ishape.width + oc + kc];
                                sum += w * x;
                            }
                        }
                    }
                    out[(cc * out_h + or) * out_w + oc] = sum;
                }
            }
        }
        out
    }

    /// Row-major dense product of the lowered matrices.
    fn lowered_product(
        new_weights: &[f32],
        new_inputs: &[f32],
        m: usize,
        k: usize,
        n: usize,
    ) -> Vec<f32> {
        let mut out = vec![0.0f32; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0f32;
                for p in 0..k {
                    sum += new_weights[i * k + p] * new_inputs[p * n + j];
                }
                out[i * n + j] = sum;
            }
        }
        out
    }

    fn random_case(
        rng: &mut StdRng,
        wshape: ConvWeightShape,
        ishape: InputVolumeShape,
    ) -> (Vec<f32>, Vec<f32>) {
        let weights = (0..wshape.numel()).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let input = (0..ishape.numel()).map(|_| rng.gen_range(-1.0..1.0)).collect();
        (weights, input)
    }

    fn assert_lowering_matches_conv(wshape: ConvWeightShape, ishape: InputVolumeShape, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (weights, input) = random_case(&mut rng, wshape, ishape);

        let k = wshape.lowered_cols();
        let n = ishape.out_h(&wshape) * ishape.out_w(&wshape);
        let mut new_weights = vec![0.0f32; wshape.lowered_rows() * k];
        let mut new_inputs = vec![0.0f32; k * n];

        conv_lowering(
            &weights,
            wshape,
            &input,
            ishape,
            &mut new_weights,
            &mut new_inputs,
        )
        .unwrap();

        let got = lowered_product(&new_weights, &new_inputs, wshape.conv_channels, k, n);
        let want = direct_conv(&weights, wshape, &input, ishape);
        for (g, w) in got.iter().zip(&want) {
            assert_relative_eq!(*g, *w, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_1x1_kernel_is_per_pixel_scaling() {
        assert_lowering_matches_conv(
            ConvWeightShape {
                conv_channels: 2,
                input_channels: 3,
                kernel_h: 1,
                kernel_w: 1,
            },
            InputVolumeShape {
                channels: 3,
                height: 4,
                width: 5,
            },
            1,
        );
    }

    #[test]
    fn test_full_size_kernel_single_output_pixel() {
        let wshape = ConvWeightShape {
            conv_channels: 2,
            input_channels: 2,
            kernel_h: 3,
            kernel_w: 4,
        };
        let ishape = InputVolumeShape {
            channels: 2,
            height: 3,
            width: 4,
        };
        assert_eq!(ishape.out_h(&wshape), 1);
        assert_eq!(ishape.out_w(&wshape), 1);
        assert_lowering_matches_conv(wshape, ishape, 2);
    }

    #[test]
    fn test_smaller_kernel_non_square_input() {
        assert_lowering_matches_conv(
            ConvWeightShape {
                conv_channels: 3,
                input_channels: 2,
                kernel_h: 2,
                kernel_w: 3,
            },
            InputVolumeShape {
                channels: 2,
                height: 5,
                width: 7,
            },
            3,
        );
    }

    #[test]
    fn test_exact_index_mapping() {
        // One channel, 2x2 kernel on a 3x3 input; check a handful of slots
        // against the flattening formula by hand.
        let wshape = ConvWeightShape {
            conv_channels: 1,
            input_channels: 1,
            kernel_h: 2,
            kernel_w: 2,
        };
        let ishape = InputVolumeShape {
            channels: 1,
            height: 3,
            width: 3,
        };
        let weights = [1.0, 2.0, 3.0, 4.0];
        let input = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let mut new_weights = vec![0.0f32; 4];
        let mut new_inputs = vec![0.0f32; 4 * 4];
        conv_lowering(
            &weights,
            wshape,
            &input,
            ishape,
            &mut new_weights,
            &mut new_inputs,
        )
        .unwrap();

        // Weight row 0 is the kernel flattened in (kr, kc) order.
        assert_eq!(new_weights, vec![1.0, 2.0, 3.0, 4.0]);

        // Column for output pixel (or=1, oc=0), i.e. or*out_w + oc = 2 with
        // out_w = 2, is the 2x2 patch anchored at input (1, 0).
        let n = 4; // out_h * out_w
        let column: Vec<f32> = (0..4).map(|row| new_inputs[row * n + 2]).collect();
        assert_eq!(column, vec![3.0, 4.0, 6.0, 7.0]);
    }

    #[test]
    fn test_lowered_then_tiled_matches_direct_conv() {
        // End to end: lower, then run the product through the tiling engine.
        let wshape = ConvWeightShape {
            conv_channels: 2,
            input_channels: 2,
            kernel_h: 2,
            kernel_w: 2,
        };
        let ishape = InputVolumeShape {
            channels: 2,
            height: 4,
            width: 4,
        };
        let mut rng = StdRng::seed_from_u64(5);
        let (weights, input) = random_case(&mut rng, wshape, ishape);

        let k = wshape.lowered_cols();
        let n = ishape.out_h(&wshape) * ishape.out_w(&wshape);
        let m = wshape.lowered_rows();
        let mut new_weights = vec![0.0f32; m * k];
        let mut new_inputs = vec![0.0f32; k * n];
        conv_lowering(
            &weights,
            wshape,
            &input,
            ishape,
            &mut new_weights,
            &mut new_inputs,
        )
        .unwrap();

        let mut d = BlockDevice::with_reference(BlockGeometry::new(3, 3).unwrap());
        let mut out = vec![0.0f32; m * n];
        large_mm(&mut d, &new_weights, &new_inputs, &mut out, k, m, n).unwrap();

        // The tiled output is column-major over the logical [m, n] shape.
        let want = direct_conv(&weights, wshape, &input, ishape);
        for i in 0..m {
            for j in 0..n {
                assert_relative_eq!(out[i + j * m], want[i * n + j], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let wshape = ConvWeightShape {
            conv_channels: 1,
            input_channels: 2,
            kernel_h: 1,
            kernel_w: 1,
        };
        let ishape = InputVolumeShape {
            channels: 3,
            height: 2,
            width: 2,
        };
        let weights = vec![0.0f32; wshape.numel()];
        let input = vec![0.0f32; ishape.numel()];
        let mut nw = vec![0.0f32; 2];
        let mut ni = vec![0.0f32; 8];
        assert!(
            conv_lowering(&weights, wshape, &input, ishape, &mut nw, &mut ni).is_err()
        );
    }

    #[test]
    fn test_mis_sized_output_buffers_rejected() {
        let wshape = ConvWeightShape {
            conv_channels: 1,
            input_channels: 1,
            kernel_h: 2,
            kernel_w: 2,
        };
        let ishape = InputVolumeShape {
            channels: 1,
            height: 3,
            width: 3,
        };
        let weights = vec![0.0f32; 4];
        let input = vec![0.0f32; 9];
        let mut nw = vec![0.0f32; 3]; // should be 4
        let mut ni = vec![0.0f32; 16];
        assert!(
            conv_lowering(&weights, wshape, &input, ishape, &mut nw, &mut ni).is_err()
        );

        let mut nw = vec![0.0f32; 4];
        let mut ni = vec![0.0f32; 15]; // should be 16
        assert!(
            conv_lowering(&weights, wshape, &input, ishape, &mut nw, &mut ni).is_err()
        );
    }

    #[test]
    fn test_kernel_larger_than_input_rejected() {
        let wshape = ConvWeightShape {
            conv_channels: 1,
            input_channels: 1,
            kernel_h: 4,
            kernel_w: 2,
        };
        let ishape = InputVolumeShape {
            channels: 1,
            height: 3,
            width: 3,
        };
        let weights = vec![0.0f32; wshape.numel()];
        let input = vec![0.0f32; ishape.numel()];
        let mut nw = vec![0.0f32; wshape.lowered_cols()];
        let mut ni = vec![0.0f32; 1];
        assert!(
            conv_lowering(&weights, wshape, &input, ishape, &mut nw, &mut ni).is_err()
        );
    }
}
