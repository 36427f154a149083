// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Two failure classes reach callers:
//!
//! - [`UsageError`]: a host-only read was attempted on a store created without
//!   a viewport-capable host. Recoverable by using
//!   [`ViewportStore::get_server_snapshot`](crate::store::ViewportStore::get_server_snapshot).
//! - [`HostSignalError`]: a raw geometry accessor of the host failed. Never
//!   retried; it fails store construction or aborts the recomputation that
//!   triggered the read.
//!
//! Missing optional host primitives (frame, idle, microtask scheduling) are
//! not errors; the [`shim`](crate::shim) substitutes fallbacks for them.

use alloc::string::String;

use thiserror::Error;

/// Misuse of the store contract.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    /// [`get_snapshot`](crate::store::ViewportStore::get_snapshot) was called
    /// on a store that has no viewport-capable host.
    #[error("viewport-truth: get_snapshot() called off-host; use get_server_snapshot()")]
    OffHost,
}

/// Which raw host signal failed to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The layout viewport (`innerWidth` / `innerHeight`).
    LayoutViewport,
    /// The visual viewport object or one of its properties.
    VisualViewport,
}

/// A host accessor for raw viewport geometry raised an error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("viewport-truth: reading {signal:?} failed: {message}")]
pub struct HostSignalError {
    /// The signal that was being read.
    pub signal: Signal,
    /// Host-provided description of the failure.
    pub message: String,
}

impl HostSignalError {
    /// Creates an error for the given signal.
    #[must_use]
    pub fn new(signal: Signal, message: impl Into<String>) -> Self {
        Self {
            signal,
            message: message.into(),
        }
    }
}
