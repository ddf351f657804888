//! `vadd-opencl`: host pipeline that runs elementwise vector addition on
//! an OpenCL device and checks the result on the host.
//!
//! | Stage          | Module        | Failure                                   |
//! |----------------|---------------|-------------------------------------------|
//! | Device lookup  | [`locator`]   | `NoPlatform`, `NoDevice`                  |
//! | Context/queue  | [`context`]   | `ContextCreationFailed`, `QueueCreationFailed` |
//! | Compilation    | [`program`]   | `CompileFailed` (with build log)          |
//! | Buffers        | [`buffers`]   | `BufferAllocationFailed`, `TransferFailed` |
//! | Launch         | [`dispatch`]  | `ArgumentBindingFailed`, `LaunchFailed`, `SyncFailed` |
//! | Verification   | [`verify`]    | never fails; reports mismatches           |
//!
//! Every stage is generic over [`ComputeRuntime`]. The `opencl` feature
//! enables [`opencl::OpenClRuntime`] on the system ICD loader; the
//! [`reference::ReferenceRuntime`] always builds and runs on the CPU.
//!
//! # Usage
//!
//! ```rust
//! use vadd_opencl::{run_vadd, HostVectors, ReferenceRuntime, RunOptions};
//!
//! let runtime = ReferenceRuntime::new();
//! let vectors = HostVectors::from_inputs(vec![1.0, 2.0], vec![3.0, 4.0]);
//! let report = run_vadd(&runtime, &RunOptions::default(), &vectors).unwrap();
//! assert_eq!(report.output, vec![4.0, 6.0]);
//! assert_eq!(report.verification.summary(), "C = A+B: 2 out of 2 results were correct.");
//! ```

pub mod buffers;
pub mod context;
pub mod dispatch;
pub mod host;
pub mod kernels;
pub mod locator;
#[cfg(feature = "opencl")]
pub mod opencl;
pub mod pipeline;
pub mod program;
pub mod reference;
pub mod runtime;
pub mod verify;

// Re-export primary public types.
pub use buffers::DeviceBuffer;
pub use context::{ExecutionContext, VaddSession};
pub use dispatch::{bind_arguments, finish, launch, LaunchDomain, VaddBindings};
pub use host::HostVectors;
pub use locator::{enumerate_devices, locate_device, DeviceListing, SelectedDevice};
#[cfg(feature = "opencl")]
pub use opencl::OpenClRuntime;
pub use pipeline::{execute, run_on_session, run_vadd, RunOptions, RunReport};
pub use program::{compile_kernel, truncate_log, CompiledKernel, BUILD_LOG_LIMIT};
pub use reference::{Fault, FaultStage, ReferenceDevice, ReferencePlatform, ReferenceRuntime};
pub use runtime::{ClResult, ComputeRuntime};
pub use verify::{verify, Mismatch, Verification};
