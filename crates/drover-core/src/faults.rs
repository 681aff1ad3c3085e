//! Sliding-window fault accounting.
//!
//! A fault signature names where an error came from and what kind it was.
//! One bad message is handled locally and the queue keeps running; the
//! same signature recurring inside a short window points at a systemic
//! problem (broker misconfiguration, bad deployment) that should stop the
//! runner instead of burning resources in a crash loop.
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Fault origin: the dispatch-path message classifier.
pub const ORIGIN_INTERPRET: &str = "interpret";
/// Fault origin: worker launch.
pub const ORIGIN_LAUNCH: &str = "launch";
/// Fault origin: reading from the work log.
pub const ORIGIN_READ: &str = "read";
/// Fault origin: retiring a processed entry.
pub const ORIGIN_RETIRE: &str = "retire";

/// (origin, error-kind) pair identifying a class of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaultSignature {
    /// Originating check site.
    pub origin: &'static str,
    /// Stable error label, e.g. `"malformed_message"`.
    pub kind: &'static str,
}

impl FaultSignature {
    /// Create a signature from its two components.
    pub const fn new(origin: &'static str, kind: &'static str) -> Self {
        Self { origin, kind }
    }
}

impl fmt::Display for FaultSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.origin, self.kind)
    }
}

struct WindowSlot {
    count: u32,
    window_start: Instant,
}

/// Per-signature sliding-window counter.
///
/// Counting is mutually exclusive but never blocks across an await; the
/// inner lock is held only for the map update.
pub struct FaultTracker {
    threshold: u32,
    window: Duration,
    slots: Mutex<HashMap<FaultSignature, WindowSlot>>,
}

impl FaultTracker {
    /// Create a tracker that reports once `threshold` identical
    /// signatures land within one `window`.
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self {
            threshold,
            window,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Count one occurrence of `signature`.
    ///
    /// Returns `true` when the threshold has been reached within the
    /// current window; the caller decides what "aborting" means.
    pub fn record(&self, signature: FaultSignature) -> bool {
        self.record_at(signature, Instant::now())
    }

    /// Count one occurrence at an explicit point in time.
    ///
    /// A window older than the configured length is closed and the count
    /// restarts at one; otherwise the count increments. Both happen in the
    /// same locked update.
    pub fn record_at(&self, signature: FaultSignature, now: Instant) -> bool {
        let mut slots = self.slots.lock().expect("fault tracker lock poisoned");
        let slot = slots.entry(signature).or_insert(WindowSlot {
            count: 0,
            window_start: now,
        });

        if now.duration_since(slot.window_start) > self.window {
            slot.count = 1;
            slot.window_start = now;
        } else {
            slot.count += 1;
        }
        slot.count >= self.threshold
    }
}
