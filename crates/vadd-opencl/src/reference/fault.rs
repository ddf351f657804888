//! Fault injection for the reference runtime.

use std::sync::atomic::{AtomicUsize, Ordering};
use vadd_common::ClStatus;

/// Runtime call a fault is attached to.
///
/// Buffer creation and uploads happen more than once per run, so those
/// stages carry the zero-based call index the fault should hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultStage {
    Platforms,
    Devices,
    CreateContext,
    CreateQueue,
    CreateProgram,
    BuildProgram,
    BuildLog,
    CreateKernel,
    CreateBuffer(usize),
    WriteBuffer(usize),
    SetKernelArg(u32),
    EnqueueKernel,
    Finish,
    ReadBuffer,
}

/// Make the runtime call at `stage` fail with `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub stage: FaultStage,
    pub status: ClStatus,
}

impl Fault {
    pub fn new(stage: FaultStage, status: ClStatus) -> Self {
        Self { stage, status }
    }
}

/// Armed faults plus per-stage call counters.
#[derive(Debug, Default)]
pub(crate) struct FaultPlan {
    faults: Vec<Fault>,
    buffers_created: AtomicUsize,
    buffers_written: AtomicUsize,
}

impl FaultPlan {
    pub(crate) fn push(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Status to fail `stage` with, if a fault is armed for it.
    pub(crate) fn check(&self, stage: FaultStage) -> Result<(), ClStatus> {
        match self.faults.iter().find(|f| f.stage == stage) {
            Some(fault) => Err(fault.status),
            None => Ok(()),
        }
    }

    /// Count a buffer allocation and check the fault for its index.
    pub(crate) fn next_create_buffer(&self) -> Result<(), ClStatus> {
        let nth = self.buffers_created.fetch_add(1, Ordering::Relaxed);
        self.check(FaultStage::CreateBuffer(nth))
    }

    /// Count an upload and check the fault for its index.
    pub(crate) fn next_write_buffer(&self) -> Result<(), ClStatus> {
        let nth = self.buffers_written.fetch_add(1, Ordering::Relaxed);
        self.check(FaultStage::WriteBuffer(nth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_stage_passes() {
        let plan = FaultPlan::default();
        assert!(plan.check(FaultStage::Finish).is_ok());
    }

    #[test]
    fn indexed_stage_hits_only_its_call() {
        let mut plan = FaultPlan::default();
        plan.push(Fault::new(FaultStage::CreateBuffer(1), ClStatus::OUT_OF_RESOURCES));
        assert!(plan.next_create_buffer().is_ok());
        assert_eq!(plan.next_create_buffer(), Err(ClStatus::OUT_OF_RESOURCES));
        assert!(plan.next_create_buffer().is_ok());
    }
}
