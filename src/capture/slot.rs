//! Single-slot rendezvous between the capture server and the orchestrator
//!
//! The slot moves through three states:
//!
//! ```text
//!            wait                      capture
//!   Idle ──────────► Waiting ─────────────────────► Idle (payload handed off)
//!     │
//!     │ capture                 wait
//!     └────────► Buffered ─────────────────────────► Idle (payload returned)
//! ```
//!
//! A latch records whether the current version window already produced a
//! capture, so later qualifying requests are acknowledged but dropped. Only
//! `reset` clears the latch.

use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

use super::payload::CapturedPayload;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("capture wait was abandoned by a slot reset or a newer waiter")]
    Abandoned,
}

/// Result of offering a payload to the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A waiter was parked and received the payload directly
    Delivered,
    /// No waiter yet; the payload is held for the next `wait`
    Buffered,
    /// This version window already captured a payload
    AlreadyCaptured,
}

#[derive(Debug, Default)]
enum SlotState {
    #[default]
    Idle,
    Waiting(oneshot::Sender<CapturedPayload>),
    Buffered(CapturedPayload),
}

#[derive(Debug, Default)]
struct Slot {
    state: SlotState,
    latched: bool,
}

/// Pending-capture cell shared by the listener and the orchestrator
#[derive(Debug, Default)]
pub struct PendingCapture {
    slot: Mutex<Slot>,
}

impl PendingCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // The slot holds no invariants that a panicking holder could break
        // halfway, so a poisoned lock is still usable.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the current version window already captured a payload
    pub fn is_latched(&self) -> bool {
        self.lock().latched
    }

    /// True when no live waiter is parked and no payload is buffered
    ///
    /// A waiter that timed out leaves its sender behind; it counts as idle.
    pub fn is_empty(&self) -> bool {
        match &self.lock().state {
            SlotState::Idle => true,
            SlotState::Waiting(tx) => tx.is_closed(),
            SlotState::Buffered(_) => false,
        }
    }

    /// Start a new version window
    ///
    /// Drops any buffered payload and any parked waiter (which then resolves
    /// with [`SlotError::Abandoned`]), and clears the capture latch.
    pub fn reset(&self) {
        let mut slot = self.lock();
        slot.state = SlotState::Idle;
        slot.latched = false;
    }

    /// Offer a qualifying payload
    pub fn capture(&self, payload: CapturedPayload) -> CaptureOutcome {
        let mut slot = self.lock();
        if slot.latched {
            return CaptureOutcome::AlreadyCaptured;
        }
        slot.latched = true;

        match std::mem::take(&mut slot.state) {
            SlotState::Waiting(tx) => match tx.send(payload) {
                Ok(()) => CaptureOutcome::Delivered,
                // Waiter gave up (timed out) before we arrived
                Err(payload) => {
                    slot.state = SlotState::Buffered(payload);
                    CaptureOutcome::Buffered
                }
            },
            SlotState::Idle => {
                slot.state = SlotState::Buffered(payload);
                CaptureOutcome::Buffered
            }
            // Unreachable while latched is false, but keep the first payload
            SlotState::Buffered(existing) => {
                slot.state = SlotState::Buffered(existing);
                CaptureOutcome::AlreadyCaptured
            }
        }
    }

    /// Wait for the next payload of the current version window
    ///
    /// Returns a buffered payload immediately; otherwise parks until
    /// `capture` hands one off. A newer `wait` replaces an older one.
    pub async fn wait(&self) -> Result<CapturedPayload, SlotError> {
        let rx = {
            let mut slot = self.lock();
            match std::mem::take(&mut slot.state) {
                SlotState::Buffered(payload) => return Ok(payload),
                SlotState::Idle | SlotState::Waiting(_) => {
                    let (tx, rx) = oneshot::channel();
                    slot.state = SlotState::Waiting(tx);
                    rx
                }
            }
        };

        rx.await.map_err(|_| SlotError::Abandoned)
    }
}
