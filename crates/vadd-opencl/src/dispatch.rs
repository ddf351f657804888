//! Kernel argument binding, launch and synchronization.

use crate::buffers::DeviceBuffer;
use crate::context::VaddSession;
use crate::kernels::{VADD_SLOT_A, VADD_SLOT_B, VADD_SLOT_C};
use crate::program::CompiledKernel;
use crate::runtime::ComputeRuntime;
use tracing::{debug, info};
use vadd_common::{MemAccess, Result, VaddError};

/// The three `vadd` arguments, checked together before any is bound.
pub struct VaddBindings<'a, R: ComputeRuntime> {
    a: &'a DeviceBuffer<R>,
    b: &'a DeviceBuffer<R>,
    c: &'a DeviceBuffer<R>,
}

impl<'a, R: ComputeRuntime> VaddBindings<'a, R> {
    /// # Panics
    ///
    /// If the inputs are not read-only, the output is not write-only, or
    /// the three lengths differ. Those are programming errors.
    pub fn new(a: &'a DeviceBuffer<R>, b: &'a DeviceBuffer<R>, c: &'a DeviceBuffer<R>) -> Self {
        assert_eq!(a.access(), MemAccess::ReadOnly, "input a must be read-only");
        assert_eq!(b.access(), MemAccess::ReadOnly, "input b must be read-only");
        assert_eq!(c.access(), MemAccess::WriteOnly, "output c must be write-only");
        assert!(
            a.len() == b.len() && b.len() == c.len(),
            "vadd buffers differ in length: a={} b={} c={}",
            a.len(),
            b.len(),
            c.len()
        );
        Self { a, b, c }
    }

    /// Work-items needed to cover the output.
    pub fn domain(&self) -> LaunchDomain {
        LaunchDomain { global: self.c.len() }
    }

    fn slots(&self) -> [(u32, &'a DeviceBuffer<R>); 3] {
        [(VADD_SLOT_A, self.a), (VADD_SLOT_B, self.b), (VADD_SLOT_C, self.c)]
    }
}

/// 1-D launch size. The local size is always left to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchDomain {
    pub global: usize,
}

/// Bind every buffer to its slot, stopping at the first failure.
pub fn bind_arguments<R: ComputeRuntime>(
    session: &VaddSession<'_, R>,
    kernel: &mut CompiledKernel<R>,
    bindings: &VaddBindings<'_, R>,
) -> Result<()> {
    for (slot, buffer) in bindings.slots() {
        session
            .runtime
            .set_kernel_arg(&mut kernel.kernel, slot, &buffer.buffer)
            .map_err(|status| VaddError::ArgumentBindingFailed { slot, status })?;
        debug!(slot, buffer = buffer.label(), "bound kernel argument");
    }
    Ok(())
}

/// Enqueue the kernel over `domain`.
pub fn launch<R: ComputeRuntime>(
    session: &VaddSession<'_, R>,
    kernel: &CompiledKernel<R>,
    domain: LaunchDomain,
) -> Result<()> {
    session
        .runtime
        .enqueue_kernel(session.queue(), &kernel.kernel, domain.global)
        .map_err(|status| VaddError::LaunchFailed { global: domain.global, status })?;
    info!(kernel = %kernel.entry, global = domain.global, "kernel enqueued");
    Ok(())
}

/// Block until the queue has drained.
pub fn finish<R: ComputeRuntime>(session: &VaddSession<'_, R>) -> Result<()> {
    session.runtime.finish(session.queue()).map_err(|status| VaddError::SyncFailed { status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{VADD_ENTRY, VADD_SRC};
    use crate::program::compile_kernel;
    use crate::reference::{Fault, FaultStage, ReferenceRuntime};
    use vadd_common::{ClStatus, DeviceClass};

    fn alloc(
        session: &VaddSession<'_, ReferenceRuntime>,
        len: usize,
        access: MemAccess,
    ) -> DeviceBuffer<ReferenceRuntime> {
        DeviceBuffer::allocate(session, "t", len, access).unwrap()
    }

    #[test]
    fn domain_matches_length() {
        let rt = ReferenceRuntime::new();
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let a = alloc(&session, 5, MemAccess::ReadOnly);
        let b = alloc(&session, 5, MemAccess::ReadOnly);
        let c = alloc(&session, 5, MemAccess::WriteOnly);
        assert_eq!(VaddBindings::new(&a, &b, &c).domain(), LaunchDomain { global: 5 });
    }

    #[test]
    #[should_panic(expected = "differ in length")]
    fn mismatched_lengths_panic() {
        let rt = ReferenceRuntime::new();
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let a = alloc(&session, 4, MemAccess::ReadOnly);
        let b = alloc(&session, 4, MemAccess::ReadOnly);
        let c = alloc(&session, 3, MemAccess::WriteOnly);
        let _ = VaddBindings::new(&a, &b, &c);
    }

    #[test]
    #[should_panic(expected = "must be write-only")]
    fn output_intent_checked() {
        let rt = ReferenceRuntime::new();
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let a = alloc(&session, 1, MemAccess::ReadOnly);
        let b = alloc(&session, 1, MemAccess::ReadOnly);
        let c = alloc(&session, 1, MemAccess::ReadOnly);
        let _ = VaddBindings::new(&a, &b, &c);
    }

    #[test]
    fn binding_failure_names_slot() {
        let rt = ReferenceRuntime::new()
            .with_fault(Fault::new(FaultStage::SetKernelArg(1), ClStatus::INVALID_MEM_OBJECT));
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let mut kernel = compile_kernel(&session, VADD_SRC, VADD_ENTRY, "").unwrap();
        let a = alloc(&session, 2, MemAccess::ReadOnly);
        let b = alloc(&session, 2, MemAccess::ReadOnly);
        let c = alloc(&session, 2, MemAccess::WriteOnly);
        let bindings = VaddBindings::new(&a, &b, &c);
        let err = bind_arguments(&session, &mut kernel, &bindings).unwrap_err();
        assert!(matches!(
            err,
            VaddError::ArgumentBindingFailed { slot: 1, status: ClStatus::INVALID_MEM_OBJECT }
        ));
    }

    #[test]
    fn launch_and_sync_failures() {
        let rt = ReferenceRuntime::new()
            .with_fault(Fault::new(FaultStage::EnqueueKernel, ClStatus::OUT_OF_RESOURCES));
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        let kernel = compile_kernel(&session, VADD_SRC, VADD_ENTRY, "").unwrap();
        let err = launch(&session, &kernel, LaunchDomain { global: 8 }).unwrap_err();
        assert!(matches!(err, VaddError::LaunchFailed { global: 8, .. }));

        let rt = ReferenceRuntime::new()
            .with_fault(Fault::new(FaultStage::Finish, ClStatus::OUT_OF_RESOURCES));
        let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
        assert!(matches!(finish(&session), Err(VaddError::SyncFailed { .. })));
    }
}
