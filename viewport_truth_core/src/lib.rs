// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A single source of truth for the visible viewport.
//!
//! Layout-viewport measurements (`innerWidth` / `innerHeight`) are unreliable
//! on mobile: on-screen keyboards, pinch-zoom and dynamic browser chrome all
//! change what the user actually sees. `viewport_truth_core` combines the
//! layout and visual viewports into a normalized [`Snapshot`], debounces
//! bursts of change into a stable/unstable state, and coalesces platform
//! events into at most one recomputation per frame. It is `no_std`
//! compatible (with `alloc`) and single-threaded.
//!
//! # Architecture
//!
//! ```text
//!   Host events (resize, scroll, orientationchange, pageshow)
//!       │
//!       ▼
//!   Scheduler::schedule_frame() ──► microtask ──► animation frame
//!                                                      │
//!                 ┌────────────────────────────────────┘
//!                 ▼
//!   snapshot::measure() ──► changed? ──► notify subscribers
//!                                │
//!                                ▼
//!   Scheduler::schedule_idle() ──► stability timer ──► stable, notify
//! ```
//!
//! **[`host`]**: The [`Host`](host::Host) trait: the event loop, clocks and
//! raw geometry a platform provides. Optional primitives hand their task back
//! when missing.
//!
//! **[`shim`]**: Capability probe, clock and scheduling primitives with
//! fallbacks for hosts that lack them.
//!
//! **[`scheduler`]**: Frame and idle lanes that coalesce bursts of requests
//! into one unit of work.
//!
//! **[`snapshot`]**: The [`Snapshot`] value and the pure computation from
//! raw readings.
//!
//! **[`store`]**: [`ViewportStore`]: subscriptions, platform listener
//! lifecycle and the stability debounce.
//!
//! **[`controller`]**: [`ViewportController`], a store wrapper whose
//! listeners receive the snapshot.
//!
//! **[`config`]**, **[`error`]**, **[`time`]**: Configuration, error types
//! and microsecond time.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and store events,
//! with a [`Tracer`](trace::Tracer) wrapper that compiles away without the
//! `trace` feature.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod scheduler;
pub mod shim;
pub mod snapshot;
pub mod store;
pub mod time;
pub mod trace;

#[cfg(test)]
mod testing;

pub use config::StoreConfig;
pub use controller::ViewportController;
pub use error::{HostSignalError, Signal, UsageError};
pub use snapshot::Snapshot;
pub use store::{Subscription, ViewportStore, create_store};
