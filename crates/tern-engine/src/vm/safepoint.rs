//! Cooperative interruption.
//!
//! The executor polls at loop back-edges and at call entry only. A poll is
//! a single relaxed atomic load; the deadline clock is read every
//! [`CLOCK_INTERVAL`] polls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::InterruptReason;

/// Polls between deadline checks.
pub const CLOCK_INTERVAL: u32 = 256;

/// Thread-safe handle that asks a running execution to stop.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the current (or next) execution stop at its next poll.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Poll state of one execution.
#[derive(Debug)]
pub struct Safepoint {
    handle: InterruptHandle,
    deadline: Option<Instant>,
    countdown: u32,
}

impl Safepoint {
    pub fn new(handle: InterruptHandle, timeout: Option<Duration>) -> Self {
        Self {
            handle,
            deadline: timeout.map(|t| Instant::now() + t),
            countdown: CLOCK_INTERVAL,
        }
    }

    #[inline]
    pub fn poll(&mut self) -> Result<(), InterruptReason> {
        if self.handle.is_interrupted() {
            return Err(InterruptReason::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            self.countdown -= 1;
            if self.countdown == 0 {
                self.countdown = CLOCK_INTERVAL;
                if Instant::now() >= deadline {
                    return Err(InterruptReason::TimedOut);
                }
            }
        }
        Ok(())
    }
}
