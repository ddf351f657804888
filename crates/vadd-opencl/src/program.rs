//! Runtime compilation of kernel source.

use crate::context::VaddSession;
use crate::runtime::ComputeRuntime;
use tracing::{debug, warn};
use vadd_common::{Result, VaddError};

/// Longest build log carried in [`VaddError::CompileFailed`], in bytes.
pub const BUILD_LOG_LIMIT: usize = 2048;

/// A built program and the kernel extracted from it.
///
/// The kernel is declared first so it is released before its program.
pub struct CompiledKernel<R: ComputeRuntime> {
    pub kernel: R::Kernel,
    pub program: R::Program,
    pub entry: String,
}

impl<R: ComputeRuntime> std::fmt::Debug for CompiledKernel<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledKernel").field("entry", &self.entry).finish_non_exhaustive()
    }
}

/// Cut `log` to at most `limit` bytes without splitting a character.
pub fn truncate_log(log: &str, limit: usize) -> &str {
    if log.len() <= limit {
        return log;
    }
    let mut end = limit;
    while !log.is_char_boundary(end) {
        end -= 1;
    }
    &log[..end]
}

/// Build `source` for the session's device and extract `entry`.
pub fn compile_kernel<R: ComputeRuntime>(
    session: &VaddSession<'_, R>,
    source: &str,
    entry: &str,
    options: &str,
) -> Result<CompiledKernel<R>> {
    let runtime = session.runtime;
    let device = &session.device.device;

    let mut program = runtime
        .create_program(session.context(), source)
        .map_err(|status| VaddError::ProgramCreationFailed { status })?;

    if let Err(status) = runtime.build_program(&mut program, device, options) {
        let full = runtime.build_log(&program, device).unwrap_or_else(|log_status| {
            warn!(%status, %log_status, "build log unavailable");
            String::new()
        });
        let log = truncate_log(&full, BUILD_LOG_LIMIT).to_owned();
        debug!(%status, "failed to build program executable\n{log}");
        return Err(VaddError::CompileFailed { status, log });
    }
    debug!(entry, options, "program built");

    let kernel = runtime
        .create_kernel(&program, entry)
        .map_err(|status| VaddError::KernelExtractionFailed { name: entry.to_owned(), status })?;

    Ok(CompiledKernel { kernel, program, entry: entry.to_owned() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{VADD_ENTRY, VADD_SRC};
    use crate::reference::{Fault, FaultStage, ReferenceRuntime, ResourceKind};
    use tracing_test::traced_test;
    use vadd_common::{ClStatus, DeviceClass};

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_log("short", 10), "short");
        assert_eq!(truncate_log("abcdef", 3), "abc");
        // 'é' is two bytes; cutting at 2 would split it.
        assert_eq!(truncate_log("aé", 2), "a");
        assert_eq!(truncate_log("", 0), "");
    }

    #[test]
    fn vadd_compiles_on_reference_device() {
        let rt = ReferenceRuntime::new();
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let compiled = compile_kernel(&session, VADD_SRC, VADD_ENTRY, "").unwrap();
        assert_eq!(compiled.entry, "vadd");
    }

    #[test]
    fn broken_source_returns_log() {
        let rt = ReferenceRuntime::new();
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let err = compile_kernel(&session, "__kernel void vadd(__global float* a) {", VADD_ENTRY, "")
            .unwrap_err();
        assert_eq!(err.status(), Some(ClStatus::BUILD_PROGRAM_FAILURE));
        assert!(err.build_log().unwrap().contains("expected '}'"));
        assert_eq!(rt.ledger().acquired_count(ResourceKind::Kernel), 0);
    }

    #[test]
    #[traced_test]
    fn unreadable_build_log_is_reported() {
        let rt = ReferenceRuntime::new()
            .with_fault(Fault::new(FaultStage::BuildProgram, ClStatus::BUILD_PROGRAM_FAILURE))
            .with_fault(Fault::new(FaultStage::BuildLog, ClStatus::OUT_OF_HOST_MEMORY));
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let err = compile_kernel(&session, VADD_SRC, VADD_ENTRY, "").unwrap_err();
        assert_eq!(err.build_log(), Some(""));
        assert!(logs_contain("build log unavailable"));
        assert!(logs_contain("CL_OUT_OF_HOST_MEMORY"));
    }

    #[test]
    fn missing_entry_point() {
        let rt = ReferenceRuntime::new();
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let err = compile_kernel(&session, VADD_SRC, "vmul", "").unwrap_err();
        match err {
            VaddError::KernelExtractionFailed { name, status } => {
                assert_eq!(name, "vmul");
                assert_eq!(status, ClStatus::INVALID_KERNEL_NAME);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bad_build_options() {
        let rt = ReferenceRuntime::new();
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let err = compile_kernel(&session, VADD_SRC, VADD_ENTRY, "--fast").unwrap_err();
        assert_eq!(err.status(), Some(ClStatus::INVALID_BUILD_OPTIONS));
    }

    #[test]
    fn long_log_is_truncated() {
        let rt = ReferenceRuntime::new();
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let options = format!("-{}", "x".repeat(4 * BUILD_LOG_LIMIT));
        let err = compile_kernel(&session, VADD_SRC, VADD_ENTRY, &options).unwrap_err();
        assert_eq!(err.build_log().unwrap().len(), BUILD_LOG_LIMIT);
    }
}
