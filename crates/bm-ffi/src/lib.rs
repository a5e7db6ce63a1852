mod types;
mod error;
mod context;

pub use types::*;
pub use error::*;
pub use context::*;

use std::os::raw::c_char;
use std::slice;

use bm_device::BlockGeometry;
use bm_engine::{ConvWeightShape, EngineError, InputVolumeShape};

/// Execute a closure that returns a `BmStatus`, catching any panics
/// and converting them into `BmStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> BmStatus>(f: F) -> BmStatus {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(status) => status,
        Err(_) => {
            set_last_error("internal panic".to_string());
            BmStatus::ErrorInternal
        }
    }
}

fn engine_status(err: EngineError) -> BmStatus {
    let status = match &err {
        EngineError::ShapeMismatch { .. } => BmStatus::ErrorShape,
        EngineError::Device(_) => BmStatus::ErrorDevice,
    };
    set_last_error(err.to_string());
    status
}

/// Create a new device context.
///
/// On success, writes a heap-allocated `BmContext` pointer into `*ctx_out`
/// and returns `BmStatus::Ok`. The caller must later call
/// `bm_device_destroy` to free the context.
///
/// Only `BmBackendType::Reference` can be constructed through this ABI;
/// the MMIO backend needs physical window addresses and is wired up from
/// Rust directly.
#[no_mangle]
pub extern "C" fn bm_device_create(
    block_rows: usize,
    block_cols: usize,
    backend: BmBackendType,
    ctx_out: *mut *mut BmContext,
) -> BmStatus {
    catch_panic(|| {
        if ctx_out.is_null() {
            set_last_error("ctx_out is null".to_string());
            return BmStatus::ErrorInvalidArgument;
        }
        if let BmBackendType::Mmio = backend {
            set_last_error(
                "mmio backend requires physical addresses; construct it from Rust".to_string(),
            );
            return BmStatus::ErrorInvalidArgument;
        }
        let geometry = match BlockGeometry::new(block_rows, block_cols) {
            Ok(g) => g,
            Err(e) => {
                set_last_error(e.to_string());
                return BmStatus::ErrorInvalidArgument;
            }
        };
        let ctx = Box::new(BmContext::new(geometry));
        unsafe {
            *ctx_out = Box::into_raw(ctx);
        }
        BmStatus::Ok
    })
}

/// Destroy a context previously created by `bm_device_create`.
///
/// Passing a null pointer is a no-op and returns `BmStatus::Ok`.
#[no_mangle]
pub unsafe extern "C" fn bm_device_destroy(ctx: *mut BmContext) -> BmStatus {
    if ctx.is_null() {
        return BmStatus::Ok;
    }
    drop(Box::from_raw(ctx));
    BmStatus::Ok
}

/// Zero the context's block-invocation counter.
#[no_mangle]
pub unsafe extern "C" fn bm_device_reset(ctx: *mut BmContext) -> BmStatus {
    catch_panic(|| {
        if ctx.is_null() {
            set_last_error("ctx is null".to_string());
            return BmStatus::ErrorInvalidArgument;
        }
        let ctx = unsafe { &mut *ctx };
        ctx.device.reset();
        BmStatus::Ok
    })
}

/// Read the number of block computations since creation or the last reset.
#[no_mangle]
pub unsafe extern "C" fn bm_block_calls(ctx: *const BmContext, calls_out: *mut u64) -> BmStatus {
    catch_panic(|| {
        if ctx.is_null() || calls_out.is_null() {
            set_last_error("null argument".to_string());
            return BmStatus::ErrorInvalidArgument;
        }
        let ctx = unsafe { &*ctx };
        unsafe {
            *calls_out = ctx.device.block_calls();
        }
        BmStatus::Ok
    })
}

/// Tiled matrix-vector multiplication.
///
/// `matrix` is row-major `num_output x num_input`, `input` holds `num_input`
/// values, `output` receives `num_output` values.
#[no_mangle]
pub unsafe extern "C" fn bm_large_mv(
    ctx: *mut BmContext,
    matrix: *const f32,
    input: *const f32,
    output: *mut f32,
    num_input: usize,
    num_output: usize,
) -> BmStatus {
    catch_panic(|| {
        if ctx.is_null() || matrix.is_null() || input.is_null() || output.is_null() {
            set_last_error("null argument".to_string());
            return BmStatus::ErrorInvalidArgument;
        }
        let ctx = unsafe { &mut *ctx };
        let matrix = unsafe { slice::from_raw_parts(matrix, num_output * num_input) };
        let input = unsafe { slice::from_raw_parts(input, num_input) };
        let output = unsafe { slice::from_raw_parts_mut(output, num_output) };

        match bm_engine::large_mv(&mut ctx.device, matrix, input, output, num_input, num_output) {
            Ok(()) => BmStatus::Ok,
            Err(e) => engine_status(e),
        }
    })
}

/// Tiled matrix-matrix multiplication.
///
/// `weight_mat` is row-major `num_output x num_input`, `input_mat` row-major
/// `num_input x num_matrix2`. `output` receives `num_output * num_matrix2`
/// values in the engine's column-major convention: logical `(row, col)` at
/// `output[row + col * num_output]`.
#[no_mangle]
pub unsafe extern "C" fn bm_large_mm(
    ctx: *mut BmContext,
    weight_mat: *const f32,
    input_mat: *const f32,
    output: *mut f32,
    num_input: usize,
    num_output: usize,
    num_matrix2: usize,
) -> BmStatus {
    catch_panic(|| {
        if ctx.is_null() || weight_mat.is_null() || input_mat.is_null() || output.is_null() {
            set_last_error("null argument".to_string());
            return BmStatus::ErrorInvalidArgument;
        }
        let ctx = unsafe { &mut *ctx };
        let weight_mat = unsafe { slice::from_raw_parts(weight_mat, num_output * num_input) };
        let input_mat = unsafe { slice::from_raw_parts(input_mat, num_input * num_matrix2) };
        let output = unsafe { slice::from_raw_parts_mut(output, num_output * num_matrix2) };

        match bm_engine::large_mm(
            &mut ctx.device,
            weight_mat,
            input_mat,
            output,
            num_input,
            num_output,
            num_matrix2,
        ) {
            Ok(()) => BmStatus::Ok,
            Err(e) => engine_status(e),
        }
    })
}

/// Lower a convolution into the 2-D matrices `bm_large_mm` consumes.
///
/// `weights` is row-major `[conv_channels, input_channels, kernel_h,
/// kernel_w]`, `input` row-major `[input_channels, height, width]`.
/// `new_weights` must hold `conv_channels * K` values and `new_inputs`
/// `K * out_h * out_w`, with `K = input_channels * kernel_h * kernel_w`,
/// `out_h = height - kernel_h + 1`, `out_w = width - kernel_w + 1`.
#[no_mangle]
pub unsafe extern "C" fn bm_conv_lowering(
    weights: *const f32,
    conv_channels: usize,
    input_channels: usize,
    kernel_h: usize,
    kernel_w: usize,
    input: *const f32,
    height: usize,
    width: usize,
    new_weights: *mut f32,
    new_inputs: *mut f32,
) -> BmStatus {
    catch_panic(|| {
        if weights.is_null() || input.is_null() || new_weights.is_null() || new_inputs.is_null()
        {
            set_last_error("null argument".to_string());
            return BmStatus::ErrorInvalidArgument;
        }
        let wshape = ConvWeightShape {
            conv_channels,
            input_channels,
            kernel_h,
            kernel_w,
        };
        let ishape = InputVolumeShape {
            channels: input_channels,
            height,
            width,
        };
        if kernel_h > height || kernel_w > width {
            set_last_error("kernel larger than input".to_string());
            return BmStatus::ErrorShape;
        }
        let k = wshape.lowered_cols();
        let n = ishape.out_h(&wshape) * ishape.out_w(&wshape);

        let weights = unsafe { slice::from_raw_parts(weights, wshape.numel()) };
        let input = unsafe { slice::from_raw_parts(input, ishape.numel()) };
        let new_weights =
            unsafe { slice::from_raw_parts_mut(new_weights, wshape.lowered_rows() * k) };
        let new_inputs = unsafe { slice::from_raw_parts_mut(new_inputs, k * n) };

        match bm_engine::conv_lowering(weights, wshape, input, ishape, new_weights, new_inputs) {
            Ok(()) => BmStatus::Ok,
            Err(e) => engine_status(e),
        }
    })
}

/// Take the last error message as a heap-allocated C string, or null if
/// there is none. The caller must free it with `bm_free_string`.
#[no_mangle]
pub extern "C" fn bm_last_error() -> *mut c_char {
    match take_last_error() {
        Some(s) => s.into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Free a string returned by `bm_last_error`.
#[no_mangle]
pub unsafe extern "C" fn bm_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(std::ffi::CString::from_raw(s));
    }
}
