//! End-to-end vector-add run.
//!
//! Resources are bound as locals in acquisition order, so every exit path
//! (including each `?`) releases them in reverse.

use crate::buffers::DeviceBuffer;
use crate::context::VaddSession;
use crate::dispatch::{bind_arguments, finish, launch, VaddBindings};
use crate::host::HostVectors;
use crate::kernels::{VADD_ENTRY, VADD_SRC};
use crate::program::{compile_kernel, CompiledKernel};
use crate::runtime::ComputeRuntime;
use crate::verify::{verify, Verification};
use serde::Serialize;
use tracing::{debug, info, warn};
use vadd_common::{DeviceClass, MemAccess, Result, VaddConfig};

/// Knobs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub device: DeviceClass,
    pub tolerance: f64,
    pub build_options: String,
    /// Kernel source to build instead of the embedded `vadd.cl`.
    pub kernel_source: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            device: DeviceClass::Default,
            tolerance: vadd_common::config::DEFAULT_TOLERANCE,
            build_options: String::new(),
            kernel_source: None,
        }
    }
}

impl From<&VaddConfig> for RunOptions {
    fn from(config: &VaddConfig) -> Self {
        Self {
            device: config.device,
            tolerance: config.tolerance,
            build_options: config.build_options.clone(),
            kernel_source: None,
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub runtime: &'static str,
    pub device: String,
    pub platform: String,
    pub length: usize,
    #[serde(skip)]
    pub output: Vec<f32>,
    pub verification: Verification,
}

/// Upload inputs, launch the kernel over every element, and read `c` back.
pub fn execute<R: ComputeRuntime>(
    session: &VaddSession<'_, R>,
    kernel: &mut CompiledKernel<R>,
    vectors: &HostVectors,
) -> Result<Vec<f32>> {
    let len = vectors.len();
    let mut a = DeviceBuffer::allocate(session, "a", len, MemAccess::ReadOnly)?;
    let mut b = DeviceBuffer::allocate(session, "b", len, MemAccess::ReadOnly)?;
    let c = DeviceBuffer::allocate(session, "c", len, MemAccess::WriteOnly)?;

    a.upload(session, &vectors.a)?;
    b.upload(session, &vectors.b)?;

    let bindings = VaddBindings::new(&a, &b, &c);
    bind_arguments(session, kernel, &bindings)?;
    launch(session, kernel, bindings.domain())?;
    finish(session)?;

    let mut output = vectors.c.clone();
    c.download(session, &mut output)?;
    debug!(len, "read back output");
    Ok(output)
}

/// Compile, execute and verify on an already opened session.
pub fn run_on_session<R: ComputeRuntime>(
    session: &VaddSession<'_, R>,
    options: &RunOptions,
    vectors: &HostVectors,
) -> Result<RunReport> {
    let source = options.kernel_source.as_deref().unwrap_or(VADD_SRC);
    let mut kernel = compile_kernel(session, source, VADD_ENTRY, &options.build_options)?;
    let output = execute(session, &mut kernel, vectors)?;
    let verification = verify(&vectors.a, &vectors.b, &output, options.tolerance);

    if verification.all_correct() {
        info!(total = verification.total, "all results correct");
    } else {
        warn!(
            accepted = verification.accepted,
            total = verification.total,
            "device results outside tolerance"
        );
    }

    Ok(RunReport {
        runtime: session.runtime.name(),
        device: session.device_name().to_owned(),
        platform: session.platform_name().to_owned(),
        length: vectors.len(),
        output,
        verification,
    })
}

/// Locate a device and run the whole pipeline.
pub fn run_vadd<R: ComputeRuntime>(
    runtime: &R,
    options: &RunOptions,
    vectors: &HostVectors,
) -> Result<RunReport> {
    let session = VaddSession::open(runtime, options.device)?;
    run_on_session(&session, options, vectors)
}
