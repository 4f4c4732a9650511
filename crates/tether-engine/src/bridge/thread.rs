//! Execution context for script code calling into the host
//!
//! Each [`Thread`] represents one cooperative script evaluation with:
//! - Its own options (fault trapping, backtrace capture)
//! - A limit on the nesting depth of host calls
//! - Call accounting

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::bridge::error::{BridgeError, BridgeResult};

/// Unique identifier for a Thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(u64);

impl ThreadId {
    /// Create a new unique thread ID
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ThreadId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

/// Limits on host calls made from one Thread
#[derive(Debug, Clone)]
pub struct CallLimits {
    /// Maximum nesting depth of host calls (None = unlimited)
    pub max_call_depth: Option<usize>,
}

impl Default for CallLimits {
    fn default() -> Self {
        Self {
            max_call_depth: Some(256),
        }
    }
}

impl CallLimits {
    /// No limits
    pub fn unlimited() -> Self {
        Self {
            max_call_depth: None,
        }
    }

    /// Limit host call nesting to `depth`
    pub fn with_call_depth(depth: usize) -> Self {
        Self {
            max_call_depth: Some(depth),
        }
    }
}

/// Bridge configuration for a Thread
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Call limits
    pub limits: CallLimits,

    /// Convert host panics into errors instead of unwinding through the
    /// evaluator
    pub trap_host_faults: bool,

    /// Capture and log a backtrace for each trapped fault
    pub capture_backtraces: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            limits: CallLimits::default(),
            trap_host_faults: true,
            capture_backtraces: false,
        }
    }
}

/// Host call counters for a Thread
#[derive(Debug, Default)]
pub struct CallCounters {
    calls: AtomicU64,
    faults: AtomicU64,
    depth: AtomicUsize,
    peak_depth: AtomicUsize,
}

impl CallCounters {
    /// Total host calls started
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Host faults trapped
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Deepest nesting reached
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    pub(crate) fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    fn enter(&self) -> usize {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_depth.fetch_max(depth, Ordering::Relaxed);
        depth
    }

    fn leave(&self) {
        self.depth.fetch_sub(1, Ordering::Relaxed);
    }
}

/// One script evaluation context
#[derive(Debug)]
pub struct Thread {
    id: ThreadId,
    name: String,
    options: BridgeOptions,
    counters: CallCounters,
}

impl Thread {
    /// Create a thread with default options
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, BridgeOptions::default())
    }

    /// Create a thread with explicit options
    pub fn with_options(name: impl Into<String>, options: BridgeOptions) -> Self {
        Self {
            id: ThreadId::new(),
            name: name.into(),
            options,
            counters: CallCounters::default(),
        }
    }

    /// Thread ID
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Call counters
    pub fn counters(&self) -> &CallCounters {
        &self.counters
    }

    /// Account for a host call; the call ends when the guard drops
    pub(crate) fn enter(&self) -> BridgeResult<CallGuard<'_>> {
        if let Some(max) = self.options.limits.max_call_depth {
            if self.counters.depth() >= max {
                return Err(BridgeError::CallDepth(max));
            }
        }
        let depth = self.counters.enter();
        Ok(CallGuard {
            counters: &self.counters,
            depth,
        })
    }
}

/// Marks one host call in progress
pub(crate) struct CallGuard<'a> {
    counters: &'a CallCounters,
    depth: usize,
}

impl CallGuard<'_> {
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.counters.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_ids_unique() {
        let a = Thread::new("a");
        let b = Thread::new("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), "a");
    }

    #[test]
    fn test_default_options() {
        let opts = BridgeOptions::default();
        assert!(opts.trap_host_faults);
        assert!(!opts.capture_backtraces);
        assert_eq!(opts.limits.max_call_depth, Some(256));
        assert_eq!(CallLimits::unlimited().max_call_depth, None);
    }

    #[test]
    fn test_depth_limit() {
        let t = Thread::with_options(
            "t",
            BridgeOptions {
                limits: CallLimits::with_call_depth(2),
                ..Default::default()
            },
        );
        let g1 = t.enter().unwrap();
        let g2 = t.enter().unwrap();
        assert_eq!(g2.depth(), 2);
        assert!(matches!(t.enter(), Err(BridgeError::CallDepth(2))));
        drop(g2);
        drop(g1);
        assert_eq!(t.counters().depth(), 0);
        assert_eq!(t.counters().peak_depth(), 2);
        assert_eq!(t.counters().calls(), 2);
    }
}
