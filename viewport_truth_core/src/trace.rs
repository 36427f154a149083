// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostics hooks for the store.
//!
//! This module provides a [`TraceSink`] trait with one method per store
//! event. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing and the sink passed to
//! [`Tracer::new`] is dropped. When **on**, each method performs a single
//! `Option` branch before dispatching.
//!
//! Structured logging through `tracing` is independent of this module and
//! always on.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::error::Signal;
use crate::snapshot::Snapshot;
use crate::time::{Duration, HostTime};

/// Lifecycle transitions of a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// The store computed its initial snapshot.
    Created,
    /// Platform listeners were attached (first subscriber).
    Attached,
    /// Platform listeners were detached (last subscriber left, or destroy).
    Detached,
    /// The store was destroyed.
    Destroyed,
}

/// Why subscribers were called.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotifyReason {
    /// A recomputation produced a different snapshot.
    Changed,
    /// The stability timer marked the snapshot stable.
    Stable,
    /// First call for newly added subscribers.
    Initial,
}

/// Emitted after every recomputation.
#[derive(Clone, Copy, Debug)]
pub struct RecomputeEvent {
    /// The freshly computed snapshot.
    pub snapshot: Snapshot,
    /// Whether it replaced the previous snapshot.
    pub changed: bool,
}

/// Emitted whenever subscribers are called.
#[derive(Clone, Copy, Debug)]
pub struct NotifyEvent {
    /// When the notification happened.
    pub ts: HostTime,
    /// What triggered it.
    pub reason: NotifyReason,
    /// How many subscribers were called.
    pub listeners: usize,
}

/// Emitted when the stability timer fires.
#[derive(Clone, Copy, Debug)]
pub struct StabilityEvent {
    /// When the timer fired.
    pub ts: HostTime,
    /// Time since the last recorded change.
    pub quiet_for: Duration,
    /// Whether the firing transitioned the store to stable. `false` for stale
    /// firings and for firings while already stable.
    pub settled: bool,
}

/// Emitted on lifecycle transitions.
#[derive(Clone, Copy, Debug)]
pub struct LifecycleEvent {
    /// When the transition happened.
    pub ts: HostTime,
    /// Which transition.
    pub phase: LifecyclePhase,
    /// Subscriber count at the time of the transition.
    pub subscribers: usize,
}

/// Emitted when a scheduled recomputation is aborted by a host read failure.
#[derive(Clone, Copy, Debug)]
pub struct SignalErrorEvent {
    /// When the failure happened.
    pub ts: HostTime,
    /// Which signal failed.
    pub signal: Signal,
}

/// Receives store diagnostics.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after every recomputation.
    fn on_recompute(&mut self, e: &RecomputeEvent) {
        _ = e;
    }

    /// Called whenever subscribers are notified.
    fn on_notify(&mut self, e: &NotifyEvent) {
        _ = e;
    }

    /// Called when the stability timer fires.
    fn on_stability(&mut self, e: &StabilityEvent) {
        _ = e;
    }

    /// Called on lifecycle transitions.
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        _ = e;
    }

    /// Called when a recomputation is aborted by a host read failure.
    fn on_signal_error(&mut self, e: &SignalErrorEvent) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Shares one sink between a [`Tracer`] and its owner, so recorded events
/// can be read back while the store is alive.
impl<S: TraceSink + ?Sized> TraceSink for Rc<RefCell<S>> {
    fn on_recompute(&mut self, e: &RecomputeEvent) {
        self.borrow_mut().on_recompute(e);
    }

    fn on_notify(&mut self, e: &NotifyEvent) {
        self.borrow_mut().on_notify(e);
    }

    fn on_stability(&mut self, e: &StabilityEvent) {
        self.borrow_mut().on_stability(e);
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.borrow_mut().on_lifecycle(e);
    }

    fn on_signal_error(&mut self, e: &SignalErrorEvent) {
        self.borrow_mut().on_signal_error(e);
    }
}

/// Owning wrapper around an optional [`TraceSink`].
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to `sink`.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    /// Emits a [`RecomputeEvent`].
    #[inline]
    pub fn recompute(&mut self, e: &RecomputeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_recompute(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`NotifyEvent`].
    #[inline]
    pub fn notify(&mut self, e: &NotifyEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_notify(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StabilityEvent`].
    #[inline]
    pub fn stability(&mut self, e: &StabilityEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_stability(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LifecycleEvent`].
    #[inline]
    pub fn lifecycle(&mut self, e: &LifecycleEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_lifecycle(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SignalErrorEvent`].
    #[inline]
    pub fn signal_error(&mut self, e: &SignalErrorEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_signal_error(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle(phase: LifecyclePhase) -> LifecycleEvent {
        LifecycleEvent {
            ts: HostTime(5),
            phase,
            subscribers: 1,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_lifecycle(&lifecycle(LifecyclePhase::Created));
        sink.on_notify(&NotifyEvent {
            ts: HostTime(0),
            reason: NotifyReason::Initial,
            listeners: 2,
        });
        sink.on_signal_error(&SignalErrorEvent {
            ts: HostTime(0),
            signal: Signal::VisualViewport,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.lifecycle(&lifecycle(LifecyclePhase::Attached));
        tracer.stability(&StabilityEvent {
            ts: HostTime(0),
            quiet_for: Duration::ZERO,
            settled: false,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_shared_sink() {
        use alloc::vec::Vec;

        #[derive(Default)]
        struct RecordingSink {
            phases: Vec<LifecyclePhase>,
        }
        impl TraceSink for RecordingSink {
            fn on_lifecycle(&mut self, e: &LifecycleEvent) {
                self.phases.push(e.phase);
            }
        }

        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        let mut tracer = Tracer::new(Box::new(Rc::clone(&sink)));
        tracer.lifecycle(&lifecycle(LifecyclePhase::Attached));
        tracer.lifecycle(&lifecycle(LifecyclePhase::Detached));
        assert_eq!(
            sink.borrow().phases,
            [LifecyclePhase::Attached, LifecyclePhase::Detached]
        );
    }
}
