// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Save and decrypt coordinators.
//!
//! Each flow owns a [`FlowGate`]: a `watch` channel holding the flow's
//! current step. Only the running flow writes it; callers observe it through
//! [`FlowGate::subscribe`]. A second caller is turned away while a run is in
//! flight and is never queued.

pub mod decryption;
pub mod submission;

pub use decryption::{ClearValue, DecryptionCoordinator, DecryptionState};
pub use submission::{SubmissionCoordinator, SubmissionState, ENCRYPTED_INCREMENT};

use std::fmt::Debug;

use tokio::sync::watch;

/// Step enum of one flow.
pub trait FlowState: Copy + Eq + Debug + Send + Sync + 'static {
    const IDLE: Self;
}

/// Try-lock over a flow's state.
pub struct FlowGate<S: FlowState> {
    tx: watch::Sender<S>,
}

impl<S: FlowState> FlowGate<S> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(S::IDLE);
        Self { tx }
    }

    /// Move from idle to `first`, or return `None` if a run is in flight.
    pub fn try_begin(&self, first: S) -> Option<FlowGuard<'_, S>> {
        let acquired = self.tx.send_if_modified(|state| {
            if *state == S::IDLE {
                *state = first;
                true
            } else {
                false
            }
        });
        acquired.then_some(FlowGuard { gate: self })
    }

    pub fn current(&self) -> S {
        *self.tx.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.current() != S::IDLE
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }
}

impl<S: FlowState> Default for FlowGate<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of one run; returns the gate to idle on drop,
/// whichever way the run ends.
pub struct FlowGuard<'a, S: FlowState> {
    gate: &'a FlowGate<S>,
}

impl<S: FlowState> FlowGuard<'_, S> {
    pub fn advance(&self, next: S) {
        tracing::trace!(from = ?self.gate.current(), to = ?next, "Flow step");
        self.gate.tx.send_replace(next);
    }
}

impl<S: FlowState> Drop for FlowGuard<'_, S> {
    fn drop(&mut self) {
        self.gate.tx.send_replace(S::IDLE);
    }
}
