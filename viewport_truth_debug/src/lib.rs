// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for viewport-truth
//! diagnostics.
//!
//! This crate provides [`TraceSink`](viewport_truth_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: one human-readable line per event.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! A sink handed to a store is owned by the store's
//! [`Tracer`](viewport_truth_core::trace::Tracer). To read it back while the
//! store is alive, wrap it in `Rc<RefCell<_>>` and pass a clone.

pub mod chrome;
pub mod pretty;
pub mod recorder;
