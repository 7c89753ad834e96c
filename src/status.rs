// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rolling status channel shared by the coordinators and the link store.
//!
//! Only the latest message is kept. Observers subscribe to a
//! `watch::Receiver` and style by [`StatusKind`] instead of scanning text.

use std::fmt;

use tokio::sync::watch;

/// Presentation class of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// An operation advanced to its next step
    Progress,
    /// Neutral information (e.g. contract not deployed)
    Info,
    /// An operation completed
    Success,
    /// An operation was abandoned without error (stale environment, user declined)
    Cancelled,
    /// An operation failed; the detail carries the underlying message
    Failure,
}

/// One status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub detail: String,
}

impl StatusMessage {
    pub fn new(kind: StatusKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn progress(detail: impl Into<String>) -> Self {
        Self::new(StatusKind::Progress, detail)
    }

    pub fn info(detail: impl Into<String>) -> Self {
        Self::new(StatusKind::Info, detail)
    }

    pub fn success(detail: impl Into<String>) -> Self {
        Self::new(StatusKind::Success, detail)
    }

    pub fn cancelled(detail: impl Into<String>) -> Self {
        Self::new(StatusKind::Cancelled, detail)
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self::new(StatusKind::Failure, detail)
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// Single-slot broadcast of the latest [`StatusMessage`].
#[derive(Clone)]
pub struct StatusChannel {
    tx: watch::Sender<Option<StatusMessage>>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Replace the current message and notify subscribers.
    pub fn publish(&self, message: StatusMessage) {
        match message.kind {
            StatusKind::Failure => tracing::warn!(status = %message, "Status"),
            StatusKind::Cancelled => tracing::info!(status = %message, "Status"),
            _ => tracing::debug!(status = %message, "Status"),
        }
        self.tx.send_replace(Some(message));
    }

    pub fn latest(&self) -> Option<StatusMessage> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StatusMessage>> {
        self.tx.subscribe()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}
