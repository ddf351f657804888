//! CPU reference runtime.
//!
//! [`ReferenceRuntime`] implements [`ComputeRuntime`] entirely on the host.
//! It checks kernel source the way a device compiler front-end would,
//! executes the kernels it knows on the CPU, and models an in-order queue:
//! launches are recorded at enqueue time and run when the queue is
//! finished or before a blocking read.
//!
//! Every handle it returns is recorded in a [`ResourceLedger`], and any
//! call can be made to fail through [`Fault`]s, so the pipeline's error
//! and release paths can be exercised without OpenCL hardware.

pub mod compiler;
mod fault;
pub mod ledger;

pub use compiler::{BuildFailure, KernelParam, KernelSignature};
pub use fault::{Fault, FaultStage};
pub use ledger::{LedgerEvent, ResourceKind, ResourceLedger};

use crate::kernels::{VADD_ENTRY, VADD_SRC};
use crate::runtime::{ClResult, ComputeRuntime};
use fault::FaultPlan;
use ledger::Tracked;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace, warn};
use vadd_common::{ClStatus, DeviceClass, MemAccess};

type Storage = Arc<Mutex<Vec<f32>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A kernel the reference device can execute.
///
/// The output buffer is the last argument; `work_item` computes one
/// element of it from the input buffers. Only programs whose kernel body
/// matches `source` are executed with it.
struct HostKernel {
    name: &'static str,
    arity: usize,
    source: &'static str,
    work_item: fn(usize, &[Vec<f32>]) -> f32,
}

impl HostKernel {
    fn accepts(&self, signature: &KernelSignature) -> bool {
        if signature.params.len() != self.arity {
            return false;
        }
        compiler::compile(self.source)
            .ok()
            .and_then(|kernels| kernels.into_iter().find(|k| k.name == self.name))
            .is_some_and(|builtin| builtin.body == signature.body)
    }
}

fn vadd_item(i: usize, inputs: &[Vec<f32>]) -> f32 {
    inputs[0][i] + inputs[1][i]
}

const HOST_KERNELS: &[HostKernel] =
    &[HostKernel { name: VADD_ENTRY, arity: 3, source: VADD_SRC, work_item: vadd_item }];

/// Static description of a reference device.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDevice {
    pub name: String,
    pub class: DeviceClass,
    /// `false` makes context creation fail with `CL_DEVICE_NOT_AVAILABLE`.
    pub available: bool,
}

impl ReferenceDevice {
    pub fn new(name: impl Into<String>, class: DeviceClass) -> Self {
        Self { name: name.into(), class, available: true }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// Static description of a reference platform.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePlatform {
    pub name: String,
    pub devices: Vec<ReferenceDevice>,
}

impl ReferencePlatform {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), devices: Vec::new() }
    }

    pub fn with_device(mut self, device: ReferenceDevice) -> Self {
        self.devices.push(device);
        self
    }
}

impl Default for ReferencePlatform {
    fn default() -> Self {
        Self::new("vadd-rs Reference Platform")
            .with_device(ReferenceDevice::new("Reference CPU Device", DeviceClass::Cpu))
    }
}

/// Host-executed stand-in for an OpenCL implementation.
#[derive(Debug)]
pub struct ReferenceRuntime {
    platforms: Vec<ReferencePlatform>,
    faults: FaultPlan,
    output_offset: f32,
    max_alloc_bytes: Option<usize>,
    ledger: Arc<ResourceLedger>,
}

impl Default for ReferenceRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceRuntime {
    /// One platform with one CPU device.
    pub fn new() -> Self {
        Self::with_platforms(vec![ReferencePlatform::default()])
    }

    pub fn with_platforms(platforms: Vec<ReferencePlatform>) -> Self {
        Self {
            platforms,
            faults: FaultPlan::default(),
            output_offset: 0.0,
            max_alloc_bytes: None,
            ledger: Arc::new(ResourceLedger::new()),
        }
    }

    /// A host with no OpenCL platforms installed.
    pub fn without_platforms() -> Self {
        Self::with_platforms(Vec::new())
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Add `offset` to every element a kernel writes, emulating a faulty device.
    pub fn with_output_offset(mut self, offset: f32) -> Self {
        self.output_offset = offset;
        self
    }

    /// Reject allocations larger than `bytes` with `CL_MEM_OBJECT_ALLOCATION_FAILURE`.
    pub fn with_max_alloc_bytes(mut self, bytes: usize) -> Self {
        self.max_alloc_bytes = Some(bytes);
        self
    }

    pub fn ledger(&self) -> &Arc<ResourceLedger> {
        &self.ledger
    }

    fn run_launch(&self, launch: &Launch) -> ClResult<()> {
        let (output, inputs) = match launch.args.split_last() {
            Some(split) => split,
            None => return Err(ClStatus::INVALID_KERNEL_ARGS),
        };
        // Snapshot inputs before locking the output so aliased bindings
        // cannot deadlock.
        let inputs: Vec<Vec<f32>> = inputs.iter().map(|buf| lock(buf).clone()).collect();
        let mut output = lock(output);

        let shortest = inputs.iter().map(Vec::len).chain([output.len()]).min().unwrap_or(0);
        if launch.global > shortest {
            debug!(
                kernel = launch.kernel.name,
                global = launch.global,
                shortest,
                "work-items would access memory out of range"
            );
            return Err(ClStatus::OUT_OF_RESOURCES);
        }

        for (gid, out) in output.iter_mut().enumerate().take(launch.global) {
            *out = (launch.kernel.work_item)(gid, &inputs) + self.output_offset;
        }
        trace!(kernel = launch.kernel.name, global = launch.global, "launch executed");
        Ok(())
    }

    fn flush(&self, queue: &RefQueue) -> ClResult<()> {
        let pending: Vec<Launch> = lock(&queue.pending).drain(..).collect();
        for launch in &pending {
            self.run_launch(launch)?;
        }
        Ok(())
    }
}

/// Platform handle. Handles from one enumeration share a ledger entry.
#[derive(Debug)]
pub struct RefPlatform {
    index: usize,
    _list: Arc<Tracked>,
}

/// Device handle. Devices from one query share a ledger entry.
#[derive(Debug)]
pub struct RefDevice {
    info: ReferenceDevice,
    _list: Arc<Tracked>,
}

#[derive(Debug)]
pub struct RefContext {
    id: u64,
    _handle: Tracked,
}

#[derive(Debug)]
struct Launch {
    kernel: &'static HostKernel,
    args: Vec<Storage>,
    global: usize,
}

impl std::fmt::Debug for HostKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostKernel").field("name", &self.name).field("arity", &self.arity).finish()
    }
}

#[derive(Debug)]
pub struct RefQueue {
    context: u64,
    pending: Mutex<Vec<Launch>>,
    _handle: Tracked,
}

impl RefQueue {
    /// Launches enqueued and not yet executed.
    pub fn pending_launches(&self) -> usize {
        lock(&self.pending).len()
    }
}

#[derive(Debug)]
pub struct RefProgram {
    context: u64,
    source: String,
    kernels: Option<Vec<KernelSignature>>,
    log: String,
    _handle: Tracked,
}

#[derive(Debug)]
pub struct RefKernel {
    context: u64,
    host: &'static HostKernel,
    args: Vec<Option<Storage>>,
    _handle: Tracked,
}

#[derive(Debug)]
pub struct RefBuffer {
    context: u64,
    access: MemAccess,
    data: Storage,
    _handle: Tracked,
}

impl RefBuffer {
    pub fn len(&self) -> usize {
        lock(&self.data).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn access(&self) -> MemAccess {
        self.access
    }
}

impl ComputeRuntime for ReferenceRuntime {
    type Platform = RefPlatform;
    type Device = RefDevice;
    type Context = RefContext;
    type Queue = RefQueue;
    type Program = RefProgram;
    type Kernel = RefKernel;
    type Buffer = RefBuffer;

    fn name(&self) -> &'static str {
        "reference"
    }

    fn platforms(&self) -> ClResult<Vec<RefPlatform>> {
        self.faults.check(FaultStage::Platforms)?;
        if self.platforms.is_empty() {
            return Ok(Vec::new());
        }
        let list = Arc::new(self.ledger.acquire(ResourceKind::PlatformList));
        Ok((0..self.platforms.len())
            .map(|index| RefPlatform { index, _list: Arc::clone(&list) })
            .collect())
    }

    fn platform_name(&self, platform: &RefPlatform) -> ClResult<String> {
        self.platforms
            .get(platform.index)
            .map(|p| p.name.clone())
            .ok_or(ClStatus::INVALID_PLATFORM)
    }

    fn devices(&self, platform: &RefPlatform, class: DeviceClass) -> ClResult<Vec<RefDevice>> {
        self.faults.check(FaultStage::Devices)?;
        let desc = self.platforms.get(platform.index).ok_or(ClStatus::INVALID_PLATFORM)?;
        let matching: Vec<&ReferenceDevice> = match class {
            DeviceClass::Default => desc.devices.iter().take(1).collect(),
            _ => desc.devices.iter().filter(|d| class.accepts(d.class)).collect(),
        };
        if matching.is_empty() {
            return Err(ClStatus::DEVICE_NOT_FOUND);
        }
        let list = Arc::new(self.ledger.acquire(ResourceKind::Device));
        Ok(matching
            .into_iter()
            .map(|info| RefDevice { info: info.clone(), _list: Arc::clone(&list) })
            .collect())
    }

    fn device_name(&self, device: &RefDevice) -> ClResult<String> {
        Ok(device.info.name.clone())
    }

    fn device_class(&self, device: &RefDevice) -> ClResult<DeviceClass> {
        Ok(device.info.class)
    }

    fn create_context(&self, device: &RefDevice) -> ClResult<RefContext> {
        self.faults.check(FaultStage::CreateContext)?;
        if !device.info.available {
            return Err(ClStatus::DEVICE_NOT_AVAILABLE);
        }
        let handle = self.ledger.acquire(ResourceKind::Context);
        Ok(RefContext { id: handle.id(), _handle: handle })
    }

    fn create_queue(&self, context: &RefContext, _device: &RefDevice) -> ClResult<RefQueue> {
        self.faults.check(FaultStage::CreateQueue)?;
        Ok(RefQueue {
            context: context.id,
            pending: Mutex::new(Vec::new()),
            _handle: self.ledger.acquire(ResourceKind::Queue),
        })
    }

    fn create_program(&self, context: &RefContext, source: &str) -> ClResult<RefProgram> {
        self.faults.check(FaultStage::CreateProgram)?;
        if source.trim().is_empty() {
            return Err(ClStatus::INVALID_VALUE);
        }
        Ok(RefProgram {
            context: context.id,
            source: source.to_owned(),
            kernels: None,
            log: String::new(),
            _handle: self.ledger.acquire(ResourceKind::Program),
        })
    }

    fn build_program(
        &self,
        program: &mut RefProgram,
        _device: &RefDevice,
        options: &str,
    ) -> ClResult<()> {
        if let Err(status) = self.faults.check(FaultStage::BuildProgram) {
            program.log = format!("error: device compiler failed ({status})\n");
            return Err(status);
        }
        let result = compiler::check_options(options).and_then(|()| compiler::compile(&program.source));
        match result {
            Ok(kernels) => {
                debug!(kernels = kernels.len(), "reference build succeeded");
                program.kernels = Some(kernels);
                program.log.clear();
                Ok(())
            }
            Err(BuildFailure { status, log }) => {
                program.kernels = None;
                program.log = log;
                Err(status)
            }
        }
    }

    fn build_log(&self, program: &RefProgram, _device: &RefDevice) -> ClResult<String> {
        self.faults.check(FaultStage::BuildLog)?;
        Ok(program.log.clone())
    }

    fn create_kernel(&self, program: &RefProgram, name: &str) -> ClResult<RefKernel> {
        self.faults.check(FaultStage::CreateKernel)?;
        let kernels = program.kernels.as_ref().ok_or(ClStatus::INVALID_PROGRAM_EXECUTABLE)?;
        let signature =
            kernels.iter().find(|k| k.name == name).ok_or(ClStatus::INVALID_KERNEL_NAME)?;
        let host = HOST_KERNELS.iter().find(|k| k.name == name).ok_or(ClStatus::INVALID_KERNEL_NAME)?;
        if !host.accepts(signature) {
            warn!(kernel = name, "reference device can only execute the built-in body of this kernel");
            return Err(ClStatus::INVALID_KERNEL_DEFINITION);
        }
        Ok(RefKernel {
            context: program.context,
            host,
            args: vec![None; host.arity],
            _handle: self.ledger.acquire(ResourceKind::Kernel),
        })
    }

    fn create_buffer(&self, context: &RefContext, access: MemAccess, len: usize) -> ClResult<RefBuffer> {
        self.faults.next_create_buffer()?;
        if len == 0 {
            return Err(ClStatus::INVALID_BUFFER_SIZE);
        }
        let bytes = len.checked_mul(std::mem::size_of::<f32>()).ok_or(ClStatus::INVALID_BUFFER_SIZE)?;
        if self.max_alloc_bytes.is_some_and(|max| bytes > max) {
            return Err(ClStatus::MEM_OBJECT_ALLOCATION_FAILURE);
        }
        Ok(RefBuffer {
            context: context.id,
            access,
            data: Arc::new(Mutex::new(vec![0.0; len])),
            _handle: self.ledger.acquire(ResourceKind::Buffer),
        })
    }

    fn write_buffer(&self, queue: &RefQueue, buffer: &mut RefBuffer, data: &[f32]) -> ClResult<()> {
        self.faults.next_write_buffer()?;
        if buffer.context != queue.context {
            return Err(ClStatus::INVALID_CONTEXT);
        }
        // Blocking writes still respect queue order.
        self.flush(queue)?;
        let mut dst = lock(&buffer.data);
        if data.len() > dst.len() {
            return Err(ClStatus::INVALID_VALUE);
        }
        dst[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, queue: &RefQueue, buffer: &RefBuffer, out: &mut [f32]) -> ClResult<()> {
        self.faults.check(FaultStage::ReadBuffer)?;
        if buffer.context != queue.context {
            return Err(ClStatus::INVALID_CONTEXT);
        }
        self.flush(queue)?;
        let src = lock(&buffer.data);
        if out.len() > src.len() {
            return Err(ClStatus::INVALID_VALUE);
        }
        out.copy_from_slice(&src[..out.len()]);
        Ok(())
    }

    fn set_kernel_arg(&self, kernel: &mut RefKernel, index: u32, buffer: &RefBuffer) -> ClResult<()> {
        self.faults.check(FaultStage::SetKernelArg(index))?;
        if buffer.context != kernel.context {
            return Err(ClStatus::INVALID_MEM_OBJECT);
        }
        let slot = kernel.args.get_mut(index as usize).ok_or(ClStatus::INVALID_ARG_INDEX)?;
        *slot = Some(Arc::clone(&buffer.data));
        Ok(())
    }

    fn enqueue_kernel(&self, queue: &RefQueue, kernel: &RefKernel, global: usize) -> ClResult<()> {
        self.faults.check(FaultStage::EnqueueKernel)?;
        if kernel.context != queue.context {
            return Err(ClStatus::INVALID_CONTEXT);
        }
        if global == 0 {
            return Err(ClStatus::INVALID_GLOBAL_WORK_SIZE);
        }
        let args: Vec<Storage> = kernel
            .args
            .iter()
            .map(|arg| arg.as_ref().map(Arc::clone))
            .collect::<Option<_>>()
            .ok_or(ClStatus::INVALID_KERNEL_ARGS)?;
        lock(&queue.pending).push(Launch { kernel: kernel.host, args, global });
        Ok(())
    }

    fn finish(&self, queue: &RefQueue) -> ClResult<()> {
        self.faults.check(FaultStage::Finish)?;
        self.flush(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::VADD_SRC;

    struct Rig {
        _device: RefDevice,
        queue: RefQueue,
        kernel: RefKernel,
        context: RefContext,
    }

    fn rig(rt: &ReferenceRuntime) -> Rig {
        let platforms = rt.platforms().unwrap();
        let device = rt.devices(&platforms[0], DeviceClass::Default).unwrap().remove(0);
        let context = rt.create_context(&device).unwrap();
        let queue = rt.create_queue(&context, &device).unwrap();
        let mut program = rt.create_program(&context, VADD_SRC).unwrap();
        rt.build_program(&mut program, &device, "").unwrap();
        let kernel = rt.create_kernel(&program, "vadd").unwrap();
        Rig { _device: device, queue, kernel, context }
    }

    fn buffer(rt: &ReferenceRuntime, rig: &Rig, access: MemAccess, data: &[f32]) -> RefBuffer {
        let mut buf = rt.create_buffer(&rig.context, access, data.len()).unwrap();
        rt.write_buffer(&rig.queue, &mut buf, data).unwrap();
        buf
    }

    #[test]
    fn launch_is_deferred_until_finish() {
        let rt = ReferenceRuntime::new();
        let mut rig = rig(&rt);
        let a = buffer(&rt, &rig, MemAccess::ReadOnly, &[1.0, 2.0]);
        let b = buffer(&rt, &rig, MemAccess::ReadOnly, &[3.0, 4.0]);
        let c = rt.create_buffer(&rig.context, MemAccess::WriteOnly, 2).unwrap();
        for (slot, buf) in [&a, &b, &c].into_iter().enumerate() {
            rt.set_kernel_arg(&mut rig.kernel, slot as u32, buf).unwrap();
        }
        rt.enqueue_kernel(&rig.queue, &rig.kernel, 2).unwrap();
        assert_eq!(rig.queue.pending_launches(), 1);
        rt.finish(&rig.queue).unwrap();
        assert_eq!(rig.queue.pending_launches(), 0);

        let mut out = [0.0; 2];
        rt.read_buffer(&rig.queue, &c, &mut out).unwrap();
        assert_eq!(out, [4.0, 6.0]);
    }

    #[test]
    fn blocking_read_drains_queue() {
        let rt = ReferenceRuntime::new();
        let mut rig = rig(&rt);
        let a = buffer(&rt, &rig, MemAccess::ReadOnly, &[0.5]);
        let c = rt.create_buffer(&rig.context, MemAccess::WriteOnly, 1).unwrap();
        rt.set_kernel_arg(&mut rig.kernel, 0, &a).unwrap();
        rt.set_kernel_arg(&mut rig.kernel, 1, &a).unwrap();
        rt.set_kernel_arg(&mut rig.kernel, 2, &c).unwrap();
        rt.enqueue_kernel(&rig.queue, &rig.kernel, 1).unwrap();
        let mut out = [0.0];
        rt.read_buffer(&rig.queue, &c, &mut out).unwrap();
        assert_eq!(out, [1.0]);
    }

    #[test]
    fn oversized_domain_fails_at_sync() {
        let rt = ReferenceRuntime::new();
        let mut rig = rig(&rt);
        let a = buffer(&rt, &rig, MemAccess::ReadOnly, &[1.0, 1.0]);
        let c = rt.create_buffer(&rig.context, MemAccess::WriteOnly, 2).unwrap();
        for slot in 0..2 {
            rt.set_kernel_arg(&mut rig.kernel, slot, &a).unwrap();
        }
        rt.set_kernel_arg(&mut rig.kernel, 2, &c).unwrap();
        rt.enqueue_kernel(&rig.queue, &rig.kernel, 3).unwrap();
        assert_eq!(rt.finish(&rig.queue), Err(ClStatus::OUT_OF_RESOURCES));
    }

    #[test]
    fn unset_arguments_rejected_at_enqueue() {
        let rt = ReferenceRuntime::new();
        let rig = rig(&rt);
        assert_eq!(rt.enqueue_kernel(&rig.queue, &rig.kernel, 4), Err(ClStatus::INVALID_KERNEL_ARGS));
    }

    #[test]
    fn argument_index_checked() {
        let rt = ReferenceRuntime::new();
        let mut rig = rig(&rt);
        let a = buffer(&rt, &rig, MemAccess::ReadOnly, &[1.0]);
        assert_eq!(rt.set_kernel_arg(&mut rig.kernel, 3, &a), Err(ClStatus::INVALID_ARG_INDEX));
    }

    #[test]
    fn allocation_limits() {
        let rt = ReferenceRuntime::new().with_max_alloc_bytes(16);
        let rig = rig(&rt);
        assert!(rt.create_buffer(&rig.context, MemAccess::ReadOnly, 4).is_ok());
        assert_eq!(
            rt.create_buffer(&rig.context, MemAccess::ReadOnly, 5).err(),
            Some(ClStatus::MEM_OBJECT_ALLOCATION_FAILURE)
        );
        assert_eq!(
            rt.create_buffer(&rig.context, MemAccess::ReadOnly, 0).err(),
            Some(ClStatus::INVALID_BUFFER_SIZE)
        );
    }

    #[test]
    fn oversized_transfer_rejected() {
        let rt = ReferenceRuntime::new();
        let rig = rig(&rt);
        let mut buf = rt.create_buffer(&rig.context, MemAccess::ReadOnly, 2).unwrap();
        assert_eq!(rt.write_buffer(&rig.queue, &mut buf, &[1.0; 3]), Err(ClStatus::INVALID_VALUE));
        let mut out = [0.0; 3];
        assert_eq!(rt.read_buffer(&rig.queue, &buf, &mut out), Err(ClStatus::INVALID_VALUE));
    }

    #[test]
    fn output_offset_corrupts_results() {
        let rt = ReferenceRuntime::new().with_output_offset(0.5);
        let mut rig = rig(&rt);
        let a = buffer(&rt, &rig, MemAccess::ReadOnly, &[1.0]);
        let c = rt.create_buffer(&rig.context, MemAccess::WriteOnly, 1).unwrap();
        rt.set_kernel_arg(&mut rig.kernel, 0, &a).unwrap();
        rt.set_kernel_arg(&mut rig.kernel, 1, &a).unwrap();
        rt.set_kernel_arg(&mut rig.kernel, 2, &c).unwrap();
        rt.enqueue_kernel(&rig.queue, &rig.kernel, 1).unwrap();
        rt.finish(&rig.queue).unwrap();
        let mut out = [0.0];
        rt.read_buffer(&rig.queue, &c, &mut out).unwrap();
        assert_eq!(out, [2.5]);
    }

    #[test]
    fn device_class_filtering() {
        let rt = ReferenceRuntime::with_platforms(vec![ReferencePlatform::new("p")
            .with_device(ReferenceDevice::new("cpu0", DeviceClass::Cpu))
            .with_device(ReferenceDevice::new("gpu0", DeviceClass::Gpu))]);
        let platforms = rt.platforms().unwrap();
        let gpus = rt.devices(&platforms[0], DeviceClass::Gpu).unwrap();
        assert_eq!(rt.device_name(&gpus[0]).unwrap(), "gpu0");
        let all = rt.devices(&platforms[0], DeviceClass::All).unwrap();
        assert_eq!(all.len(), 2);
        let default = rt.devices(&platforms[0], DeviceClass::Default).unwrap();
        assert_eq!(rt.device_name(&default[0]).unwrap(), "cpu0");
        assert_eq!(
            rt.devices(&platforms[0], DeviceClass::Accelerator).err(),
            Some(ClStatus::DEVICE_NOT_FOUND)
        );
    }

    #[test]
    fn unavailable_device_refuses_context() {
        let rt = ReferenceRuntime::with_platforms(vec![ReferencePlatform::new("p")
            .with_device(ReferenceDevice::new("busy", DeviceClass::Gpu).unavailable())]);
        let platforms = rt.platforms().unwrap();
        let device = rt.devices(&platforms[0], DeviceClass::Gpu).unwrap().remove(0);
        assert_eq!(rt.create_context(&device).err(), Some(ClStatus::DEVICE_NOT_AVAILABLE));
    }

    #[test]
    fn unknown_entry_point() {
        let rt = ReferenceRuntime::new();
        let platforms = rt.platforms().unwrap();
        let device = rt.devices(&platforms[0], DeviceClass::Default).unwrap().remove(0);
        let context = rt.create_context(&device).unwrap();
        let mut program = rt.create_program(&context, VADD_SRC).unwrap();
        assert_eq!(
            rt.create_kernel(&program, "vadd").err(),
            Some(ClStatus::INVALID_PROGRAM_EXECUTABLE)
        );
        rt.build_program(&mut program, &device, "").unwrap();
        assert_eq!(rt.create_kernel(&program, "vsub").err(), Some(ClStatus::INVALID_KERNEL_NAME));
    }

    fn kernel_from(rt: &ReferenceRuntime, source: &str) -> ClResult<RefKernel> {
        let platforms = rt.platforms().unwrap();
        let device = rt.devices(&platforms[0], DeviceClass::Default).unwrap().remove(0);
        let context = rt.create_context(&device).unwrap();
        let mut program = rt.create_program(&context, source).unwrap();
        rt.build_program(&mut program, &device, "").unwrap();
        rt.create_kernel(&program, "vadd")
    }

    #[test]
    fn only_the_builtin_body_is_executed() {
        let rt = ReferenceRuntime::new();
        let sub = VADD_SRC.replace("a[i] + b[i]", "a[i] - b[i]");
        assert_eq!(kernel_from(&rt, &sub).err(), Some(ClStatus::INVALID_KERNEL_DEFINITION));

        let renamed = "__kernel void vadd(__global const float* x,\n\
                       __global const float* y, __global float* out)\n\
                       {\n    int i = get_global_id(0); // one element\n    out[i] = x[i] + y[i];\n}\n";
        assert!(kernel_from(&rt, renamed).is_ok());
    }

    #[test]
    fn buffers_from_another_context_rejected() {
        let rt = ReferenceRuntime::new();
        let mut rig = rig(&rt);
        let other = self::rig(&rt);
        let foreign = rt.create_buffer(&other.context, MemAccess::ReadOnly, 1).unwrap();
        assert_eq!(rt.set_kernel_arg(&mut rig.kernel, 0, &foreign), Err(ClStatus::INVALID_MEM_OBJECT));
        assert_eq!(rt.enqueue_kernel(&other.queue, &rig.kernel, 1), Err(ClStatus::INVALID_CONTEXT));
    }

    #[test]
    fn build_failure_keeps_log() {
        let rt = ReferenceRuntime::new();
        let platforms = rt.platforms().unwrap();
        let device = rt.devices(&platforms[0], DeviceClass::Default).unwrap().remove(0);
        let context = rt.create_context(&device).unwrap();
        let mut program = rt.create_program(&context, "__kernel void vadd(").unwrap();
        assert_eq!(
            rt.build_program(&mut program, &device, ""),
            Err(ClStatus::BUILD_PROGRAM_FAILURE)
        );
        assert!(rt.build_log(&program, &device).unwrap().contains("error:"));
    }

    #[test]
    fn handles_release_in_reverse_order() {
        let rt = ReferenceRuntime::new();
        {
            let rig = rig(&rt);
            let _buf = rt.create_buffer(&rig.context, MemAccess::ReadOnly, 1).unwrap();
        }
        // Rig fields drop in declaration order, so the ledger is not LIFO
        // here; only check nothing leaked.
        assert!(rt.ledger().outstanding().is_empty());
        assert_eq!(rt.ledger().acquired_count(ResourceKind::Buffer), 1);
    }
}
