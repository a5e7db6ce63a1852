use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("invalid block geometry: {rows}x{cols} (both dimensions must be > 0)")]
    InvalidGeometry { rows: usize, cols: usize },
    #[error("device did not complete within {polls} status polls")]
    Timeout { polls: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
