//! Device buffers and blocking host transfers.

use crate::context::VaddSession;
use crate::runtime::ComputeRuntime;
use tracing::debug;
use vadd_common::{ClStatus, MemAccess, Result, TransferDirection, VaddError};

/// A device allocation of `len` `f32` elements.
pub struct DeviceBuffer<R: ComputeRuntime> {
    pub buffer: R::Buffer,
    label: &'static str,
    len: usize,
    access: MemAccess,
}

impl<R: ComputeRuntime> std::fmt::Debug for DeviceBuffer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("label", &self.label)
            .field("len", &self.len)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

impl<R: ComputeRuntime> DeviceBuffer<R> {
    /// Allocate device memory for `len` elements with the given intent.
    pub fn allocate(
        session: &VaddSession<'_, R>,
        label: &'static str,
        len: usize,
        access: MemAccess,
    ) -> Result<Self> {
        let bytes = len.saturating_mul(std::mem::size_of::<f32>());
        let buffer = session.runtime.create_buffer(session.context(), access, len).map_err(|status| {
            VaddError::BufferAllocationFailed { buffer: label.to_owned(), bytes, status }
        })?;
        debug!(buffer = label, len, bytes, %access, "allocated device buffer");
        Ok(Self { buffer, label, len, access })
    }

    /// Blocking copy of `host` into the buffer.
    pub fn upload(&mut self, session: &VaddSession<'_, R>, host: &[f32]) -> Result<()> {
        let direction = TransferDirection::HostToDevice;
        self.check_len(host.len(), direction)?;
        session
            .runtime
            .write_buffer(session.queue(), &mut self.buffer, host)
            .map_err(|status| self.transfer_error(direction, status))
    }

    /// Blocking copy of the buffer into `host`.
    pub fn download(&self, session: &VaddSession<'_, R>, host: &mut [f32]) -> Result<()> {
        let direction = TransferDirection::DeviceToHost;
        self.check_len(host.len(), direction)?;
        session
            .runtime
            .read_buffer(session.queue(), &self.buffer, host)
            .map_err(|status| self.transfer_error(direction, status))
    }

    fn check_len(&self, host_len: usize, direction: TransferDirection) -> Result<()> {
        if host_len != self.len {
            debug!(buffer = self.label, host_len, device_len = self.len, "transfer size mismatch");
            return Err(self.transfer_error(direction, ClStatus::INVALID_VALUE));
        }
        Ok(())
    }

    fn transfer_error(&self, direction: TransferDirection, status: ClStatus) -> VaddError {
        VaddError::TransferFailed { buffer: self.label.to_owned(), direction, status }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size in bytes.
    pub fn bytes(&self) -> usize {
        self.len * std::mem::size_of::<f32>()
    }

    pub fn access(&self) -> MemAccess {
        self.access
    }
}
