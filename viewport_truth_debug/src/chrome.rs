// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Recomputations become counter tracks (`viewport` for the effective size,
//! `layout` for the layout size) plus an instant on the `Store` thread.
//! Everything else is an instant.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Host ticks are already microseconds and are written unchanged.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        let ts = recorded.ts().ticks();
        match recorded {
            RecordedEvent::Recompute(e) => {
                let s = e.snapshot;
                events.push(json!({
                    "ph": "C",
                    "name": "viewport",
                    "ts": ts,
                    "pid": 0,
                    "args": { "width": s.width, "height": s.height }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "layout",
                    "ts": ts,
                    "pid": 0,
                    "args": { "width": s.layout_width, "height": s.layout_height }
                }));
                events.push(json!({
                    "ph": "i",
                    "name": "Recompute",
                    "cat": "Store",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "changed": e.changed,
                        "scale": s.scale,
                        "offset_left": s.offset_left,
                        "offset_top": s.offset_top,
                        "keyboard": s.is_keyboard_open,
                        "stable": s.is_stable,
                    }
                }));
            }
            RecordedEvent::Notify(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Notify",
                    "cat": "Store",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "reason": format!("{:?}", e.reason),
                        "listeners": e.listeners,
                    }
                }));
            }
            RecordedEvent::Stability(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "StabilityTimer",
                    "cat": "Scheduler",
                    "ts": ts,
                    "pid": 0,
                    "tid": 1,
                    "s": "t",
                    "args": {
                        "quiet_ms": e.quiet_for.as_millis_f64(),
                        "settled": e.settled,
                    }
                }));
            }
            RecordedEvent::Lifecycle(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.phase),
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": { "subscribers": e.subscribers }
                }));
            }
            RecordedEvent::SignalError(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "SignalError",
                    "cat": "Error",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": { "signal": format!("{:?}", e.signal) }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use viewport_truth_core::time::HostTime;
    use viewport_truth_core::trace::{
        LifecycleEvent, LifecyclePhase, NotifyEvent, NotifyReason, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_lifecycle(&LifecycleEvent {
            ts: HostTime(1_000),
            phase: LifecyclePhase::Attached,
            subscribers: 1,
        });
        rec.on_notify(&NotifyEvent {
            ts: HostTime(16_000),
            reason: NotifyReason::Initial,
            listeners: 1,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 2);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "Attached");
        assert_eq!(parsed[0]["ts"], 1_000);

        assert_eq!(parsed[1]["name"], "Notify");
        assert_eq!(parsed[1]["args"]["reason"], "Initial");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
