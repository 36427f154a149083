// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in milliseconds.

use std::io::Write;

use viewport_truth_core::time::HostTime;
use viewport_truth_core::trace::{
    LifecycleEvent, LifecyclePhase, NotifyEvent, NotifyReason, RecomputeEvent, SignalErrorEvent,
    StabilityEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn ms(t: HostTime) -> f64 {
    t.as_millis_f64()
}

fn phase_name(phase: LifecyclePhase) -> &'static str {
    match phase {
        LifecyclePhase::Created => "created",
        LifecyclePhase::Attached => "attached",
        LifecyclePhase::Detached => "detached",
        LifecyclePhase::Destroyed => "destroyed",
    }
}

fn reason_name(reason: NotifyReason) -> &'static str {
    match reason {
        NotifyReason::Changed => "changed",
        NotifyReason::Stable => "stable",
        NotifyReason::Initial => "initial",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_recompute(&mut self, e: &RecomputeEvent) {
        let s = &e.snapshot;
        let _ = writeln!(
            self.writer,
            "[recompute] at {:.3}ms {}x{} layout={}x{} scale={} keyboard={} changed={}",
            ms(s.ts),
            s.width,
            s.height,
            s.layout_width,
            s.layout_height,
            s.scale,
            s.is_keyboard_open,
            e.changed,
        );
    }

    fn on_notify(&mut self, e: &NotifyEvent) {
        let _ = writeln!(
            self.writer,
            "[notify] at {:.3}ms reason={} listeners={}",
            ms(e.ts),
            reason_name(e.reason),
            e.listeners,
        );
    }

    fn on_stability(&mut self, e: &StabilityEvent) {
        let outcome = if e.settled { "settled" } else { "ignored" };
        let _ = writeln!(
            self.writer,
            "[stability] at {:.3}ms quiet={:.3}ms {outcome}",
            ms(e.ts),
            e.quiet_for.as_millis_f64(),
        );
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        let _ = writeln!(
            self.writer,
            "[lifecycle] at {:.3}ms {} subscribers={}",
            ms(e.ts),
            phase_name(e.phase),
            e.subscribers,
        );
    }

    fn on_signal_error(&mut self, e: &SignalErrorEvent) {
        let _ = writeln!(
            self.writer,
            "[error] at {:.3}ms {:?} read failed",
            ms(e.ts),
            e.signal,
        );
    }
}
