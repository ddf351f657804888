//! Compute runtime abstraction.
//!
//! [`ComputeRuntime`] exposes exactly the OpenCL entry points the vector-add
//! pipeline needs. Every handle is an owned associated type whose `Drop`
//! releases the underlying object, so callers get scoped release for free.

use vadd_common::{ClStatus, DeviceClass, MemAccess};

/// Result type for raw runtime calls.
pub type ClResult<T> = std::result::Result<T, ClStatus>;

/// A platform/device runtime the pipeline can drive.
pub trait ComputeRuntime {
    type Platform;
    type Device;
    type Context;
    type Queue;
    type Program;
    type Kernel;
    type Buffer;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Enumerate every platform visible to the host.
    fn platforms(&self) -> ClResult<Vec<Self::Platform>>;

    fn platform_name(&self, platform: &Self::Platform) -> ClResult<String>;

    /// Devices on `platform` matching `class`, in platform order.
    ///
    /// Returns `Err(CL_DEVICE_NOT_FOUND)` or an empty list when none match.
    fn devices(&self, platform: &Self::Platform, class: DeviceClass)
        -> ClResult<Vec<Self::Device>>;

    fn device_name(&self, device: &Self::Device) -> ClResult<String>;

    fn device_class(&self, device: &Self::Device) -> ClResult<DeviceClass>;

    /// Create a context bound to exactly `device`.
    fn create_context(&self, device: &Self::Device) -> ClResult<Self::Context>;

    /// Create an in-order, non-profiling command queue.
    fn create_queue(&self, context: &Self::Context, device: &Self::Device)
        -> ClResult<Self::Queue>;

    fn create_program(&self, context: &Self::Context, source: &str) -> ClResult<Self::Program>;

    /// Build `program` for `device`. Blocks until the compiler returns.
    fn build_program(
        &self,
        program: &mut Self::Program,
        device: &Self::Device,
        options: &str,
    ) -> ClResult<()>;

    fn build_log(&self, program: &Self::Program, device: &Self::Device) -> ClResult<String>;

    fn create_kernel(&self, program: &Self::Program, name: &str) -> ClResult<Self::Kernel>;

    /// Allocate `len` `f32` elements of device memory.
    fn create_buffer(
        &self,
        context: &Self::Context,
        access: MemAccess,
        len: usize,
    ) -> ClResult<Self::Buffer>;

    /// Blocking host-to-device copy.
    fn write_buffer(
        &self,
        queue: &Self::Queue,
        buffer: &mut Self::Buffer,
        data: &[f32],
    ) -> ClResult<()>;

    /// Blocking device-to-host copy.
    fn read_buffer(
        &self,
        queue: &Self::Queue,
        buffer: &Self::Buffer,
        out: &mut [f32],
    ) -> ClResult<()>;

    fn set_kernel_arg(
        &self,
        kernel: &mut Self::Kernel,
        index: u32,
        buffer: &Self::Buffer,
    ) -> ClResult<()>;

    /// Enqueue a 1-D launch of `global` work-items. The runtime picks the
    /// work-group size.
    fn enqueue_kernel(&self, queue: &Self::Queue, kernel: &Self::Kernel, global: usize)
        -> ClResult<()>;

    /// Block until every command enqueued on `queue` has completed.
    fn finish(&self, queue: &Self::Queue) -> ClResult<()>;
}
