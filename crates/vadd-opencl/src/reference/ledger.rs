//! Acquire/release bookkeeping for reference runtime handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Kind of runtime object tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    PlatformList,
    Device,
    Context,
    Queue,
    Program,
    Kernel,
    Buffer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PlatformList => "platform list",
            Self::Device => "device",
            Self::Context => "context",
            Self::Queue => "command queue",
            Self::Program => "program",
            Self::Kernel => "kernel",
            Self::Buffer => "buffer",
        };
        f.write_str(s)
    }
}

/// One ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    Acquired { kind: ResourceKind, id: u64 },
    Released { kind: ResourceKind, id: u64 },
}

/// Records every handle the reference runtime hands out and gives back.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    events: Mutex<Vec<LedgerEvent>>,
    next_id: AtomicU64,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LedgerEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn acquire(self: &Arc<Self>, kind: ResourceKind) -> Tracked {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push(LedgerEvent::Acquired { kind, id });
        Tracked { kind, id, ledger: Arc::clone(self) }
    }

    fn release(&self, kind: ResourceKind, id: u64) {
        self.lock().push(LedgerEvent::Released { kind, id });
    }

    /// Snapshot of every event so far.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.lock().clone()
    }

    /// Kinds acquired, in acquisition order.
    pub fn acquired_kinds(&self) -> Vec<ResourceKind> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                LedgerEvent::Acquired { kind, .. } => Some(*kind),
                LedgerEvent::Released { .. } => None,
            })
            .collect()
    }

    /// Kinds released, in release order.
    pub fn released_kinds(&self) -> Vec<ResourceKind> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                LedgerEvent::Released { kind, .. } => Some(*kind),
                LedgerEvent::Acquired { .. } => None,
            })
            .collect()
    }

    pub fn acquired_count(&self, kind: ResourceKind) -> usize {
        self.acquired_kinds().into_iter().filter(|k| *k == kind).count()
    }

    /// Resources acquired and not yet released.
    pub fn outstanding(&self) -> Vec<(ResourceKind, u64)> {
        let mut live: Vec<(ResourceKind, u64)> = Vec::new();
        for event in self.lock().iter() {
            match *event {
                LedgerEvent::Acquired { kind, id } => live.push((kind, id)),
                LedgerEvent::Released { id, .. } => live.retain(|(_, live_id)| *live_id != id),
            }
        }
        live
    }

    /// Every release undid the most recent still-live acquisition.
    pub fn released_in_reverse_order(&self) -> bool {
        let mut stack: Vec<u64> = Vec::new();
        for event in self.lock().iter() {
            match *event {
                LedgerEvent::Acquired { id, .. } => stack.push(id),
                LedgerEvent::Released { id, .. } => {
                    if stack.pop() != Some(id) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Nothing outstanding and release order was strictly LIFO.
    pub fn is_clean(&self) -> bool {
        self.outstanding().is_empty() && self.released_in_reverse_order()
    }
}

/// Guard embedded in each reference handle; records the release on drop.
#[derive(Debug)]
pub(crate) struct Tracked {
    kind: ResourceKind,
    id: u64,
    ledger: Arc<ResourceLedger>,
}

impl Tracked {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.ledger.release(self.kind, self.id);
    }
}
