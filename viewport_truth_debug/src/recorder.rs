// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use viewport_truth_core::Signal;
use viewport_truth_core::snapshot::Snapshot;
use viewport_truth_core::time::{Duration, HostTime};
use viewport_truth_core::trace::{
    LifecycleEvent, LifecyclePhase, NotifyEvent, NotifyReason, RecomputeEvent, SignalErrorEvent,
    StabilityEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_RECOMPUTE: u8 = 1;
const TAG_NOTIFY: u8 = 2;
const TAG_STABILITY: u8 = 3;
const TAG_LIFECYCLE: u8 = 4;
const TAG_SIGNAL_ERROR: u8 = 5;

// Snapshot flag bits.
const FLAG_KEYBOARD: u8 = 1 << 0;
const FLAG_STABLE: u8 = 1 << 1;
const FLAG_VISUAL: u8 = 1 << 2;
const FLAG_CHANGED: u8 = 1 << 3;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_count(&mut self, n: usize) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "listener count capped at u32::MAX for recording"
        )]
        self.write_u32(n.min(u32::MAX as usize) as u32);
    }

    fn write_signal(&mut self, s: Signal) {
        self.write_u8(match s {
            Signal::LayoutViewport => 0,
            Signal::VisualViewport => 1,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_recompute(&mut self, e: &RecomputeEvent) {
        let s = &e.snapshot;
        self.write_u8(TAG_RECOMPUTE);
        self.write_u64(s.ts.ticks());
        self.write_f64(s.width);
        self.write_f64(s.height);
        self.write_f64(s.layout_width);
        self.write_f64(s.layout_height);
        self.write_f64(s.offset_left);
        self.write_f64(s.offset_top);
        self.write_f64(s.scale);
        let mut flags = 0;
        for (set, bit) in [
            (s.is_keyboard_open, FLAG_KEYBOARD),
            (s.is_stable, FLAG_STABLE),
            (s.has_visual_viewport, FLAG_VISUAL),
            (e.changed, FLAG_CHANGED),
        ] {
            if set {
                flags |= bit;
            }
        }
        self.write_u8(flags);
    }

    fn on_notify(&mut self, e: &NotifyEvent) {
        self.write_u8(TAG_NOTIFY);
        self.write_u64(e.ts.ticks());
        self.write_u8(match e.reason {
            NotifyReason::Changed => 0,
            NotifyReason::Stable => 1,
            NotifyReason::Initial => 2,
        });
        self.write_count(e.listeners);
    }

    fn on_stability(&mut self, e: &StabilityEvent) {
        self.write_u8(TAG_STABILITY);
        self.write_u64(e.ts.ticks());
        self.write_u64(e.quiet_for.ticks());
        self.write_u8(u8::from(e.settled));
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.write_u8(TAG_LIFECYCLE);
        self.write_u64(e.ts.ticks());
        self.write_u8(match e.phase {
            LifecyclePhase::Created => 0,
            LifecyclePhase::Attached => 1,
            LifecyclePhase::Detached => 2,
            LifecyclePhase::Destroyed => 3,
        });
        self.write_count(e.subscribers);
    }

    fn on_signal_error(&mut self, e: &SignalErrorEvent) {
        self.write_u8(TAG_SIGNAL_ERROR);
        self.write_u64(e.ts.ticks());
        self.write_signal(e.signal);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A [`RecomputeEvent`].
    Recompute(RecomputeEvent),
    /// A [`NotifyEvent`].
    Notify(NotifyEvent),
    /// A [`StabilityEvent`].
    Stability(StabilityEvent),
    /// A [`LifecycleEvent`].
    Lifecycle(LifecycleEvent),
    /// A [`SignalErrorEvent`].
    SignalError(SignalErrorEvent),
}

impl RecordedEvent {
    /// Host time of the event.
    #[must_use]
    pub fn ts(&self) -> HostTime {
        match self {
            Self::Recompute(e) => e.snapshot.ts,
            Self::Notify(e) => e.ts,
            Self::Stability(e) => e.ts,
            Self::Lifecycle(e) => e.ts,
            Self::SignalError(e) => e.ts,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().map(|n| n as usize)
    }

    fn decode_recompute(&mut self) -> Option<RecordedEvent> {
        let ts = HostTime(self.read_u64()?);
        let width = self.read_f64()?;
        let height = self.read_f64()?;
        let layout_width = self.read_f64()?;
        let layout_height = self.read_f64()?;
        let offset_left = self.read_f64()?;
        let offset_top = self.read_f64()?;
        let scale = self.read_f64()?;
        let flags = self.read_u8()?;
        Some(RecordedEvent::Recompute(RecomputeEvent {
            snapshot: Snapshot {
                width,
                height,
                layout_width,
                layout_height,
                offset_left,
                offset_top,
                scale,
                is_keyboard_open: flags & FLAG_KEYBOARD != 0,
                is_stable: flags & FLAG_STABLE != 0,
                has_visual_viewport: flags & FLAG_VISUAL != 0,
                ts,
            },
            changed: flags & FLAG_CHANGED != 0,
        }))
    }

    fn decode_notify(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Notify(NotifyEvent {
            ts: HostTime(self.read_u64()?),
            reason: match self.read_u8()? {
                0 => NotifyReason::Changed,
                1 => NotifyReason::Stable,
                _ => NotifyReason::Initial,
            },
            listeners: self.read_count()?,
        }))
    }

    fn decode_stability(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Stability(StabilityEvent {
            ts: HostTime(self.read_u64()?),
            quiet_for: Duration(self.read_u64()?),
            settled: self.read_u8()? != 0,
        }))
    }

    fn decode_lifecycle(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Lifecycle(LifecycleEvent {
            ts: HostTime(self.read_u64()?),
            phase: match self.read_u8()? {
                0 => LifecyclePhase::Created,
                1 => LifecyclePhase::Attached,
                2 => LifecyclePhase::Detached,
                _ => LifecyclePhase::Destroyed,
            },
            subscribers: self.read_count()?,
        }))
    }

    fn decode_signal_error(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SignalError(SignalErrorEvent {
            ts: HostTime(self.read_u64()?),
            signal: match self.read_u8()? {
                0 => Signal::LayoutViewport,
                _ => Signal::VisualViewport,
            },
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_RECOMPUTE => self.decode_recompute(),
            TAG_NOTIFY => self.decode_notify(),
            TAG_STABILITY => self.decode_stability(),
            TAG_LIFECYCLE => self.decode_lifecycle(),
            TAG_SIGNAL_ERROR => self.decode_signal_error(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
