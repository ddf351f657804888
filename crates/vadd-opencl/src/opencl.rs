//! OpenCL runtime backed by the system ICD loader via `opencl3`.

use crate::runtime::{ClResult, ComputeRuntime};
use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{
    Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_CUSTOM,
    CL_DEVICE_TYPE_GPU,
};
use opencl3::error_codes::ClError;
use opencl3::kernel::Kernel;
use opencl3::memory::{Buffer, ClMem};
use opencl3::platform::{get_platforms, Platform};
use opencl3::program::Program;
use opencl3::types::{cl_float, CL_BLOCKING};
use std::ptr;
use tracing::debug;
use vadd_common::{ClStatus, DeviceClass, MemAccess};

fn cl_status(err: ClError) -> ClStatus {
    ClStatus::from(err.0)
}

/// The real OpenCL implementation installed on this host.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClRuntime;

impl OpenClRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl ComputeRuntime for OpenClRuntime {
    type Platform = Platform;
    type Device = Device;
    type Context = Context;
    type Queue = CommandQueue;
    type Program = Program;
    type Kernel = Kernel;
    type Buffer = Buffer<cl_float>;

    fn name(&self) -> &'static str {
        "opencl"
    }

    fn platforms(&self) -> ClResult<Vec<Platform>> {
        get_platforms().map_err(cl_status)
    }

    fn platform_name(&self, platform: &Platform) -> ClResult<String> {
        platform.name().map_err(cl_status)
    }

    fn devices(&self, platform: &Platform, class: DeviceClass) -> ClResult<Vec<Device>> {
        let ids = platform.get_devices(class.cl_bits()).map_err(cl_status)?;
        debug!(count = ids.len(), %class, "queried OpenCL devices");
        Ok(ids.into_iter().map(Device::new).collect())
    }

    fn device_name(&self, device: &Device) -> ClResult<String> {
        device.name().map_err(cl_status)
    }

    fn device_class(&self, device: &Device) -> ClResult<DeviceClass> {
        let bits = device.dev_type().map_err(cl_status)?;
        let class = if bits & CL_DEVICE_TYPE_GPU != 0 {
            DeviceClass::Gpu
        } else if bits & CL_DEVICE_TYPE_CPU != 0 {
            DeviceClass::Cpu
        } else if bits & (CL_DEVICE_TYPE_ACCELERATOR | CL_DEVICE_TYPE_CUSTOM) != 0 {
            DeviceClass::Accelerator
        } else {
            DeviceClass::Default
        };
        Ok(class)
    }

    fn create_context(&self, device: &Device) -> ClResult<Context> {
        Context::from_device(device).map_err(cl_status)
    }

    fn create_queue(&self, context: &Context, _device: &Device) -> ClResult<CommandQueue> {
        // In-order, no profiling.
        CommandQueue::create_default_with_properties(context, 0, 0).map_err(cl_status)
    }

    fn create_program(&self, context: &Context, source: &str) -> ClResult<Program> {
        Program::create_from_source(context, source).map_err(cl_status)
    }

    fn build_program(&self, program: &mut Program, device: &Device, options: &str) -> ClResult<()> {
        program.build(&[device.id()], options).map_err(cl_status)
    }

    fn build_log(&self, program: &Program, device: &Device) -> ClResult<String> {
        program.get_build_log(device.id()).map_err(cl_status)
    }

    fn create_kernel(&self, program: &Program, name: &str) -> ClResult<Kernel> {
        Kernel::create(program, name).map_err(cl_status)
    }

    fn create_buffer(&self, context: &Context, access: MemAccess, len: usize) -> ClResult<Buffer<cl_float>> {
        // SAFETY: no host pointer is passed, so the runtime owns the allocation.
        unsafe { Buffer::<cl_float>::create(context, access.cl_flags(), len, ptr::null_mut()) }
            .map_err(cl_status)
    }

    fn write_buffer(
        &self,
        queue: &CommandQueue,
        buffer: &mut Buffer<cl_float>,
        data: &[f32],
    ) -> ClResult<()> {
        // SAFETY: blocking write; `data` outlives the call.
        unsafe { queue.enqueue_write_buffer(buffer, CL_BLOCKING, 0, data, &[]) }
            .map(drop)
            .map_err(cl_status)
    }

    fn read_buffer(
        &self,
        queue: &CommandQueue,
        buffer: &Buffer<cl_float>,
        out: &mut [f32],
    ) -> ClResult<()> {
        // SAFETY: blocking read; `out` is not touched until the call returns.
        unsafe { queue.enqueue_read_buffer(buffer, CL_BLOCKING, 0, out, &[]) }
            .map(drop)
            .map_err(cl_status)
    }

    fn set_kernel_arg(&self, kernel: &mut Kernel, index: u32, buffer: &Buffer<cl_float>) -> ClResult<()> {
        // SAFETY: the argument is a live `cl_mem` handle of the declared pointer type.
        unsafe { kernel.set_arg(index, &buffer.get()) }.map_err(cl_status)
    }

    fn enqueue_kernel(&self, queue: &CommandQueue, kernel: &Kernel, global: usize) -> ClResult<()> {
        let global_work_size = [global];
        // SAFETY: 1-D launch; the local size is left to the runtime.
        unsafe {
            queue.enqueue_nd_range_kernel(
                kernel.get(),
                1,
                ptr::null(),
                global_work_size.as_ptr(),
                ptr::null(),
                &[],
            )
        }
        .map(drop)
        .map_err(cl_status)
    }

    fn finish(&self, queue: &CommandQueue) -> ClResult<()> {
        queue.finish().map_err(cl_status)
    }
}
