use bm_device::{BlockDevice, BlockGeometry};

/// Opaque context handle that owns the device.
pub struct BmContext {
    pub device: BlockDevice,
}

impl BmContext {
    pub fn new(geometry: BlockGeometry) -> Self {
        Self {
            device: BlockDevice::with_reference(geometry),
        }
    }
}
