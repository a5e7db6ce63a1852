//! Memory-mapped hardware backend (feature `mmio`).
//!
//! Talks to the accelerator through two windows mapped from `/dev/mem`:
//! a data window the operand blocks are staged into, and a one-word
//! command/status register. The handshake is write-sentinel / spin-poll:
//! writing [`START_SENTINEL`] requests computation, and the device clears
//! the register to any other value when the result is in place.

use std::fmt;
use std::fs::OpenOptions;
use std::ptr;

use memmap2::{MmapOptions, MmapRaw};

use crate::backend::BlockBackend;
use crate::error::{DeviceError, Result};
use crate::geometry::BlockGeometry;
use crate::staging::StagingBuffers;

/// Command value that triggers one block computation.
pub const START_SENTINEL: u32 = 0x5555;

/// Status polls before giving up on the device.
pub const DEFAULT_POLL_BUDGET: usize = 100_000_000;

/// Hardware backend driving the device over memory-mapped registers.
pub struct MmioBackend {
    data: MmapRaw,
    status: MmapRaw,
    poll_budget: usize,
}

impl MmioBackend {
    /// Map the device windows from `/dev/mem` at the given physical offsets.
    ///
    /// `data_addr` is the base of the operand window, which must cover
    /// `max(data_len, pair_data_len)` floats for `geometry`; `status_addr`
    /// is the base of the one-word command/status register. Both must be
    /// page-aligned, as `mmap` requires.
    pub fn open(geometry: BlockGeometry, data_addr: u64, status_addr: u64) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open("/dev/mem")?;

        let data_len = geometry.data_len().max(geometry.pair_data_len());
        let data = MmapOptions::new()
            .offset(data_addr)
            .len(data_len * std::mem::size_of::<f32>())
            .map_raw(&file)?;
        let status = MmapOptions::new()
            .offset(status_addr)
            .len(std::mem::size_of::<u32>())
            .map_raw(&file)?;

        Ok(MmioBackend {
            data,
            status,
            poll_budget: DEFAULT_POLL_BUDGET,
        })
    }

    /// Override the status-poll budget.
    pub fn with_poll_budget(mut self, poll_budget: usize) -> Self {
        self.poll_budget = poll_budget;
        self
    }

    fn stage_in(&mut self, src: &[f32]) {
        let dst = self.data.as_mut_ptr() as *mut f32;
        for (i, &v) in src.iter().enumerate() {
            unsafe { ptr::write_volatile(dst.add(i), v) };
        }
    }

    fn read_back(&self, dst: &mut [f32]) {
        let src = self.data.as_ptr() as *const f32;
        for (i, v) in dst.iter_mut().enumerate() {
            *v = unsafe { ptr::read_volatile(src.add(i)) };
        }
    }

    /// Trigger one computation and spin until the device clears the
    /// sentinel, up to the poll budget.
    fn trigger_and_wait(&mut self) -> Result<()> {
        let reg = self.status.as_mut_ptr() as *mut u32;
        unsafe { ptr::write_volatile(reg, START_SENTINEL) };

        for _ in 0..self.poll_budget {
            if unsafe { ptr::read_volatile(reg) } != START_SENTINEL {
                return Ok(());
            }
            std::hint::spin_loop();
        }
        Err(DeviceError::Timeout {
            polls: self.poll_budget,
        })
    }
}

impl BlockBackend for MmioBackend {
    fn name(&self) -> &str {
        "mmio"
    }

    fn execute_vector_block(&mut self, staging: &mut StagingBuffers) -> Result<()> {
        let rows = staging.geometry().block_rows();
        self.stage_in(staging.data());
        self.trigger_and_wait()?;
        self.read_back(&mut staging.data_mut()[..rows]);
        Ok(())
    }

    fn execute_matrix_block(&mut self, staging: &mut StagingBuffers) -> Result<()> {
        let n = staging.geometry().mm_result_len();
        self.stage_in(staging.pair());
        self.trigger_and_wait()?;
        self.read_back(&mut staging.pair_mut()[..n]);
        Ok(())
    }
}

impl fmt::Debug for MmioBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MmioBackend")
            .field("poll_budget", &self.poll_budget)
            .finish_non_exhaustive()
    }
}
