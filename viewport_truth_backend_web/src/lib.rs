// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser host for viewport-truth.
//!
//! This crate provides:
//!
//! - [`WebHost`]: a [`Host`] over the current JS realm's globals
//!   (`performance.now`, `requestAnimationFrame`, `requestIdleCallback`,
//!   `queueMicrotask`, `innerWidth`/`innerHeight` and `visualViewport`)
//! - [`create_web_store`]: a [`ViewportStore`] bound to a fresh [`WebHost`]
//!
//! Missing optional primitives are reported to the core as unavailable and
//! its fallbacks take over. Event listeners are registered as passive.

#![no_std]

extern crate alloc;

mod callbacks;
mod host;
mod js;

use alloc::rc::Rc;

pub use host::{WebCapabilities, WebHost};
pub use viewport_truth_core::host::Host;

use viewport_truth_core::time::HostTime;
use viewport_truth_core::{HostSignalError, StoreConfig, ViewportStore};

/// Returns the current host time from `performance.now()`.
///
/// The returned [`HostTime`] is in microsecond ticks.
#[must_use]
pub fn now() -> HostTime {
    HostTime::from_millis_f64(js::performance_now())
}

/// Creates a store over the current JS realm.
///
/// In a realm without `window`, `document` or `navigator` the store is
/// off-host.
///
/// # Errors
///
/// Returns the error of the first viewport read that throws.
pub fn create_web_store(config: StoreConfig) -> Result<ViewportStore<WebHost>, HostSignalError> {
    ViewportStore::new(Rc::new(WebHost::new()), config)
}
