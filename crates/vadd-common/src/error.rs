//! OpenCL status codes and the pipeline error taxonomy.

use crate::types::{DeviceClass, TransferDirection};
use std::fmt;
use thiserror::Error;

/// A raw OpenCL status code (`cl_int`) as returned by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClStatus(pub i32);

impl ClStatus {
    pub const SUCCESS: Self = Self(0);
    pub const DEVICE_NOT_FOUND: Self = Self(-1);
    pub const DEVICE_NOT_AVAILABLE: Self = Self(-2);
    pub const COMPILER_NOT_AVAILABLE: Self = Self(-3);
    pub const MEM_OBJECT_ALLOCATION_FAILURE: Self = Self(-4);
    pub const OUT_OF_RESOURCES: Self = Self(-5);
    pub const OUT_OF_HOST_MEMORY: Self = Self(-6);
    pub const BUILD_PROGRAM_FAILURE: Self = Self(-11);
    pub const INVALID_VALUE: Self = Self(-30);
    pub const INVALID_DEVICE_TYPE: Self = Self(-31);
    pub const INVALID_PLATFORM: Self = Self(-32);
    pub const INVALID_DEVICE: Self = Self(-33);
    pub const INVALID_CONTEXT: Self = Self(-34);
    pub const INVALID_COMMAND_QUEUE: Self = Self(-36);
    pub const INVALID_MEM_OBJECT: Self = Self(-38);
    pub const INVALID_BUILD_OPTIONS: Self = Self(-43);
    pub const INVALID_PROGRAM: Self = Self(-44);
    pub const INVALID_PROGRAM_EXECUTABLE: Self = Self(-45);
    pub const INVALID_KERNEL_NAME: Self = Self(-46);
    pub const INVALID_KERNEL_DEFINITION: Self = Self(-47);
    pub const INVALID_KERNEL: Self = Self(-48);
    pub const INVALID_ARG_INDEX: Self = Self(-49);
    pub const INVALID_ARG_VALUE: Self = Self(-50);
    pub const INVALID_KERNEL_ARGS: Self = Self(-52);
    pub const INVALID_WORK_DIMENSION: Self = Self(-53);
    pub const INVALID_OPERATION: Self = Self(-59);
    pub const INVALID_BUFFER_SIZE: Self = Self(-61);
    pub const INVALID_GLOBAL_WORK_SIZE: Self = Self(-63);
    pub const PLATFORM_NOT_FOUND_KHR: Self = Self(-1001);

    /// Raw `cl_int` value.
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Symbolic name of this status, e.g. `CL_OUT_OF_RESOURCES`.
    pub fn name(self) -> &'static str {
        status_name(self.0)
    }
}

impl fmt::Display for ClStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl From<i32> for ClStatus {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

/// Map an OpenCL status code to its symbolic name.
///
/// Codes outside the OpenCL 2.x core and KHR ICD ranges map to
/// `UNKNOWN ERROR`.
pub fn status_name(code: i32) -> &'static str {
    match code {
        0 => "CL_SUCCESS",
        -1 => "CL_DEVICE_NOT_FOUND",
        -2 => "CL_DEVICE_NOT_AVAILABLE",
        -3 => "CL_COMPILER_NOT_AVAILABLE",
        -4 => "CL_MEM_OBJECT_ALLOCATION_FAILURE",
        -5 => "CL_OUT_OF_RESOURCES",
        -6 => "CL_OUT_OF_HOST_MEMORY",
        -7 => "CL_PROFILING_INFO_NOT_AVAILABLE",
        -8 => "CL_MEM_COPY_OVERLAP",
        -9 => "CL_IMAGE_FORMAT_MISMATCH",
        -10 => "CL_IMAGE_FORMAT_NOT_SUPPORTED",
        -11 => "CL_BUILD_PROGRAM_FAILURE",
        -12 => "CL_MAP_FAILURE",
        -13 => "CL_MISALIGNED_SUB_BUFFER_OFFSET",
        -14 => "CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST",
        -15 => "CL_COMPILE_PROGRAM_FAILURE",
        -16 => "CL_LINKER_NOT_AVAILABLE",
        -17 => "CL_LINK_PROGRAM_FAILURE",
        -18 => "CL_DEVICE_PARTITION_FAILED",
        -19 => "CL_KERNEL_ARG_INFO_NOT_AVAILABLE",
        -30 => "CL_INVALID_VALUE",
        -31 => "CL_INVALID_DEVICE_TYPE",
        -32 => "CL_INVALID_PLATFORM",
        -33 => "CL_INVALID_DEVICE",
        -34 => "CL_INVALID_CONTEXT",
        -35 => "CL_INVALID_QUEUE_PROPERTIES",
        -36 => "CL_INVALID_COMMAND_QUEUE",
        -37 => "CL_INVALID_HOST_PTR",
        -38 => "CL_INVALID_MEM_OBJECT",
        -39 => "CL_INVALID_IMAGE_FORMAT_DESCRIPTOR",
        -40 => "CL_INVALID_IMAGE_SIZE",
        -41 => "CL_INVALID_SAMPLER",
        -42 => "CL_INVALID_BINARY",
        -43 => "CL_INVALID_BUILD_OPTIONS",
        -44 => "CL_INVALID_PROGRAM",
        -45 => "CL_INVALID_PROGRAM_EXECUTABLE",
        -46 => "CL_INVALID_KERNEL_NAME",
        -47 => "CL_INVALID_KERNEL_DEFINITION",
        -48 => "CL_INVALID_KERNEL",
        -49 => "CL_INVALID_ARG_INDEX",
        -50 => "CL_INVALID_ARG_VALUE",
        -51 => "CL_INVALID_ARG_SIZE",
        -52 => "CL_INVALID_KERNEL_ARGS",
        -53 => "CL_INVALID_WORK_DIMENSION",
        -54 => "CL_INVALID_WORK_GROUP_SIZE",
        -55 => "CL_INVALID_WORK_ITEM_SIZE",
        -56 => "CL_INVALID_GLOBAL_OFFSET",
        -57 => "CL_INVALID_EVENT_WAIT_LIST",
        -58 => "CL_INVALID_EVENT",
        -59 => "CL_INVALID_OPERATION",
        -60 => "CL_INVALID_GL_OBJECT",
        -61 => "CL_INVALID_BUFFER_SIZE",
        -62 => "CL_INVALID_MIP_LEVEL",
        -63 => "CL_INVALID_GLOBAL_WORK_SIZE",
        -64 => "CL_INVALID_PROPERTY",
        -65 => "CL_INVALID_IMAGE_DESCRIPTOR",
        -66 => "CL_INVALID_COMPILER_OPTIONS",
        -67 => "CL_INVALID_LINKER_OPTIONS",
        -68 => "CL_INVALID_DEVICE_PARTITION_COUNT",
        -69 => "CL_INVALID_PIPE_SIZE",
        -70 => "CL_INVALID_DEVICE_QUEUE",
        -1000 => "CL_INVALID_GL_SHAREGROUP_REFERENCE_KHR",
        -1001 => "CL_PLATFORM_NOT_FOUND_KHR",
        -1002 => "CL_INVALID_D3D10_DEVICE_KHR",
        -1003 => "CL_INVALID_D3D10_RESOURCE_KHR",
        -1004 => "CL_D3D10_RESOURCE_ALREADY_ACQUIRED_KHR",
        -1005 => "CL_D3D10_RESOURCE_NOT_ACQUIRED_KHR",
        _ => "UNKNOWN ERROR",
    }
}

/// Pipeline step in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    FindPlatforms,
    FindDevice,
    CreateContext,
    CreateQueue,
    CreateProgram,
    BuildProgram,
    CreateKernel,
    CreateBuffer,
    WriteBuffer,
    SetKernelArgs,
    EnqueueKernel,
    WaitForKernel,
    ReadBuffer,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FindPlatforms => "Finding platforms",
            Self::FindDevice => "Finding a device",
            Self::CreateContext => "Creating context",
            Self::CreateQueue => "Creating command queue",
            Self::CreateProgram => "Creating program",
            Self::BuildProgram => "Building program",
            Self::CreateKernel => "Creating kernel",
            Self::CreateBuffer => "Creating buffer",
            Self::WriteBuffer => "Copying to device",
            Self::SetKernelArgs => "Setting kernel arguments",
            Self::EnqueueKernel => "Enqueueing kernel",
            Self::WaitForKernel => "Waiting for kernel to finish",
            Self::ReadBuffer => "Reading back output array",
        };
        f.write_str(label)
    }
}

/// Errors produced by the vector-add pipeline.
///
/// Every variant is fatal to the run. Verification mismatches are not
/// errors and never appear here.
#[derive(Debug, Clone, Error)]
pub enum VaddError {
    #[error("Found 0 platforms!")]
    NoPlatform,

    #[error("Finding platforms failed: {status}")]
    PlatformQueryFailed { status: ClStatus },

    #[error("Finding a device failed: no {class} device on any platform ({status})")]
    NoDevice { class: DeviceClass, status: ClStatus },

    #[error("Creating context failed: {status}")]
    ContextCreationFailed { status: ClStatus },

    #[error("Creating command queue failed: {status}")]
    QueueCreationFailed { status: ClStatus },

    #[error("Creating program failed: {status}")]
    ProgramCreationFailed { status: ClStatus },

    #[error("Failed to build program executable: {status}")]
    CompileFailed { status: ClStatus, log: String },

    #[error("Creating kernel '{name}' failed: {status}")]
    KernelExtractionFailed { name: String, status: ClStatus },

    #[error("Creating buffer {buffer} ({bytes} bytes) failed: {status}")]
    BufferAllocationFailed { buffer: String, bytes: usize, status: ClStatus },

    #[error("{direction} copy of {buffer} failed: {status}")]
    TransferFailed { buffer: String, direction: TransferDirection, status: ClStatus },

    #[error("Setting kernel argument {slot} failed: {status}")]
    ArgumentBindingFailed { slot: u32, status: ClStatus },

    #[error("Enqueueing kernel over {global} work-items failed: {status}")]
    LaunchFailed { global: usize, status: ClStatus },

    #[error("Waiting for kernel to finish failed: {status}")]
    SyncFailed { status: ClStatus },
}

impl VaddError {
    /// The pipeline step this error was raised from.
    pub fn step(&self) -> Step {
        match self {
            Self::NoPlatform | Self::PlatformQueryFailed { .. } => Step::FindPlatforms,
            Self::NoDevice { .. } => Step::FindDevice,
            Self::ContextCreationFailed { .. } => Step::CreateContext,
            Self::QueueCreationFailed { .. } => Step::CreateQueue,
            Self::ProgramCreationFailed { .. } => Step::CreateProgram,
            Self::CompileFailed { .. } => Step::BuildProgram,
            Self::KernelExtractionFailed { .. } => Step::CreateKernel,
            Self::BufferAllocationFailed { .. } => Step::CreateBuffer,
            Self::TransferFailed { direction: TransferDirection::HostToDevice, .. } => {
                Step::WriteBuffer
            }
            Self::TransferFailed { direction: TransferDirection::DeviceToHost, .. } => {
                Step::ReadBuffer
            }
            Self::ArgumentBindingFailed { .. } => Step::SetKernelArgs,
            Self::LaunchFailed { .. } => Step::EnqueueKernel,
            Self::SyncFailed { .. } => Step::WaitForKernel,
        }
    }

    /// Underlying runtime status, if the failure came from the runtime.
    pub fn status(&self) -> Option<ClStatus> {
        match self {
            Self::NoPlatform => None,
            Self::PlatformQueryFailed { status }
            | Self::NoDevice { status, .. }
            | Self::ContextCreationFailed { status }
            | Self::QueueCreationFailed { status }
            | Self::ProgramCreationFailed { status }
            | Self::CompileFailed { status, .. }
            | Self::KernelExtractionFailed { status, .. }
            | Self::BufferAllocationFailed { status, .. }
            | Self::TransferFailed { status, .. }
            | Self::ArgumentBindingFailed { status, .. }
            | Self::LaunchFailed { status, .. }
            | Self::SyncFailed { status } => Some(*status),
        }
    }

    /// Device build log for compile failures.
    pub fn build_log(&self) -> Option<&str> {
        match self {
            Self::CompileFailed { log, .. } => Some(log),
            _ => None,
        }
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, VaddError>;
