//! Execution context: one context, one in-order queue, one device.

use crate::locator::{locate_device, SelectedDevice};
use crate::runtime::ComputeRuntime;
use tracing::debug;
use vadd_common::{DeviceClass, Result, VaddError};

/// A context bound to one device and its command queue.
///
/// The queue is declared first so it is released before the context.
pub struct ExecutionContext<R: ComputeRuntime> {
    pub queue: R::Queue,
    pub context: R::Context,
}

impl<R: ComputeRuntime> ExecutionContext<R> {
    /// Create a context for exactly `device` and an in-order queue on it.
    pub fn create(runtime: &R, device: &R::Device) -> Result<Self> {
        let context = runtime
            .create_context(device)
            .map_err(|status| VaddError::ContextCreationFailed { status })?;
        debug!("context created");
        let queue = runtime
            .create_queue(&context, device)
            .map_err(|status| VaddError::QueueCreationFailed { status })?;
        debug!("command queue created");
        Ok(Self { queue, context })
    }
}

/// Everything one run needs from the runtime, acquired in order and
/// released in reverse.
pub struct VaddSession<'r, R: ComputeRuntime> {
    pub runtime: &'r R,
    pub exec: ExecutionContext<R>,
    pub device: SelectedDevice<R>,
}

impl<'r, R: ComputeRuntime> VaddSession<'r, R> {
    /// Locate a device of `class` and set up its context and queue.
    pub fn open(runtime: &'r R, class: DeviceClass) -> Result<Self> {
        let device = locate_device(runtime, class)?;
        let exec = ExecutionContext::create(runtime, &device.device)?;
        Ok(Self { runtime, exec, device })
    }

    pub fn device_name(&self) -> &str {
        &self.device.name
    }

    pub fn platform_name(&self) -> &str {
        &self.device.platform_name
    }

    pub fn queue(&self) -> &R::Queue {
        &self.exec.queue
    }

    pub fn context(&self) -> &R::Context {
        &self.exec.context
    }
}

impl<R: ComputeRuntime> std::fmt::Debug for VaddSession<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaddSession")
            .field("runtime", &self.runtime.name())
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{Fault, FaultStage, ReferenceRuntime, ResourceKind};
    use vadd_common::ClStatus;

    #[test]
    fn session_acquires_in_order_and_releases_in_reverse() {
        let rt = ReferenceRuntime::new();
        {
            let session = VaddSession::open(&rt, DeviceClass::Default).unwrap();
            assert_eq!(session.device_name(), "Reference CPU Device");
        }
        let ledger = rt.ledger();
        assert_eq!(
            ledger.acquired_kinds(),
            vec![
                ResourceKind::PlatformList,
                ResourceKind::Device,
                ResourceKind::Context,
                ResourceKind::Queue
            ]
        );
        assert!(ledger.is_clean());
    }

    #[test]
    fn context_failure() {
        let rt = ReferenceRuntime::new()
            .with_fault(Fault::new(FaultStage::CreateContext, ClStatus::OUT_OF_HOST_MEMORY));
        let err = VaddSession::open(&rt, DeviceClass::Default).unwrap_err();
        assert!(matches!(err, VaddError::ContextCreationFailed { status: ClStatus::OUT_OF_HOST_MEMORY }));
        assert!(rt.ledger().is_clean());
    }

    #[test]
    fn queue_failure_releases_context() {
        let rt = ReferenceRuntime::new()
            .with_fault(Fault::new(FaultStage::CreateQueue, ClStatus::INVALID_DEVICE));
        let err = VaddSession::open(&rt, DeviceClass::Default).unwrap_err();
        assert!(matches!(err, VaddError::QueueCreationFailed { .. }));
        assert_eq!(rt.ledger().acquired_count(ResourceKind::Context), 1);
        assert!(rt.ledger().is_clean());
    }
}
