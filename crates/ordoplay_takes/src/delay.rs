// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cooperative delay timers.
//!
//! The scheduler holds at most one outstanding delay. It never blocks: the
//! host advances it with frame deltas and an elapsed delay is reported as an
//! event from [`DelayScheduler::advance`].

/// What a delay is holding back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    /// Waiting to activate the current take
    Start,
    /// Waiting to run the current take's finish handlers
    Finish,
}

/// Cancellation handle for a scheduled delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelayHandle(u64);

#[derive(Debug, Clone, Copy)]
struct PendingDelay {
    handle: DelayHandle,
    kind: DelayKind,
    remaining: f32,
}

/// Single-slot delay scheduler
#[derive(Debug, Default)]
pub struct DelayScheduler {
    pending: Option<PendingDelay>,
    next_generation: u64,
}

impl DelayScheduler {
    /// Create an idle scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a delay, cancelling any outstanding one
    pub fn schedule(&mut self, kind: DelayKind, secs: f32) -> DelayHandle {
        self.cancel_all();

        let handle = DelayHandle(self.next_generation);
        self.next_generation += 1;
        self.pending = Some(PendingDelay {
            handle,
            kind,
            remaining: secs.max(0.0),
        });

        tracing::debug!("Scheduled {:?} delay of {}s", kind, secs);
        handle
    }

    /// Cancel a specific delay; stale handles are ignored
    pub fn cancel(&mut self, handle: DelayHandle) -> bool {
        match self.pending {
            Some(pending) if pending.handle == handle => {
                self.pending = None;
                tracing::debug!("Cancelled {:?} delay", pending.kind);
                true
            }
            _ => false,
        }
    }

    /// Cancel whatever delay is outstanding
    pub fn cancel_all(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!("Cancelled {:?} delay", pending.kind);
        }
    }

    /// Advance the clock, returning the kind of delay that elapsed
    pub fn advance(&mut self, delta_secs: f32) -> Option<DelayKind> {
        let pending = self.pending.as_mut()?;
        pending.remaining -= delta_secs.max(0.0);

        if pending.remaining <= 0.0 {
            let kind = pending.kind;
            self.pending = None;
            Some(kind)
        } else {
            None
        }
    }

    /// Whether a delay is outstanding
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Seconds left on the outstanding delay
    pub fn remaining(&self) -> Option<f32> {
        self.pending.map(|p| p.remaining)
    }
}
