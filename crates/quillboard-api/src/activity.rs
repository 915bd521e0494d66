// Global in-flight request accounting, drives loading indicators in hosts
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counter of requests currently on the wire
///
/// Incremented when a request starts and decremented when it settles,
/// success or failure. The decrement rides on a drop guard so no code
/// path can leak a count.
#[derive(Debug, Default)]
pub struct RequestGauge {
    in_flight: AtomicUsize,
}

impl RequestGauge {
    pub fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Register a request; the returned guard releases it on drop
    pub fn start(self: &Arc<Self>) -> RequestGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        RequestGuard {
            gauge: Arc::clone(self),
        }
    }

    /// How many requests are currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// True while anything is in flight
    pub fn is_busy(&self) -> bool {
        self.in_flight() > 0
    }
}

/// RAII handle pairing one start with exactly one release
#[derive(Debug)]
pub struct RequestGuard {
    gauge: Arc<RequestGauge>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.gauge.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
