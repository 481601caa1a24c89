//! Event-loop liveness refcount
//!
//! Every callback hold and every object hold implies exactly one hold on the
//! runtime's execution loop; every release drops exactly one. The embedding
//! loop polls `holds()` to decide whether native code still depends on it.
//! An imbalance either keeps the loop alive forever (leak) or tears it down
//! under live handles, so underflow is an internal fault.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Fault;

/// Cheap-clone handle on the loop liveness counter. All clones share one
/// count.
#[derive(Clone, Debug, Default)]
pub struct LoopHandle(Arc<AtomicU64>);

impl LoopHandle {
    pub fn new() -> Self {
        LoopHandle(Arc::new(AtomicU64::new(0)))
    }

    /// Take one liveness hold.
    pub fn hold(&self) {
        let previous = self.0.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(holds = previous + 1, "event loop hold");
    }

    /// Drop one liveness hold. Underflow is an internal fault.
    pub fn release(&self) -> Result<(), Fault> {
        let result = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |holds| {
                holds.checked_sub(1)
            });
        match result {
            Ok(previous) => {
                tracing::trace!(holds = previous - 1, "event loop release");
                Ok(())
            }
            Err(_) => Err(Fault::LoopUnderflow),
        }
    }

    /// Current hold count.
    pub fn holds(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// True when nothing native is keeping the loop alive.
    pub fn is_idle(&self) -> bool {
        self.holds() == 0
    }
}
