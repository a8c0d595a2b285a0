//! Small helpers shared across the crate.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generator for stable names of anonymous flows.
///
/// Anonymous flows need a name before their channels can be derived; the
/// generated name is assigned once at builder creation so that repeated
/// lookups of the same flow agree. The counter is process-wide, keeping
/// names unique across independently built flows.
#[derive(Debug, Default)]
pub struct IdGenerator;

static FLOW_COUNTER: AtomicU64 = AtomicU64::new(1);

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the next anonymous flow name, e.g. `"flow1"`, `"flow2"`.
    pub fn next_flow_name(&self) -> String {
        let n = FLOW_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("flow{n}")
    }
}
