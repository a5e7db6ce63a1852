use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("device error: {0}")]
    Device(#[from] bm_device::DeviceError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
