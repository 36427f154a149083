// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capability shim: host primitives with graceful fallbacks.
//!
//! Each function here is independent and works against any [`Host`]. When a
//! host lacks an optional primitive, the shim substitutes a fallback built
//! from the mandatory ones:
//!
//! | Primitive | Preferred | Fallback |
//! |---|---|---|
//! | [`now`] | `high_res_now` | `wall_clock_ms` |
//! | [`raf`] | `request_animation_frame` | [`FRAME_FALLBACK_DELAY`] timer |
//! | [`request_idle`] | `request_idle_callback` | zero-delay timer, [`IdleDeadline::EXCEEDED`] |
//! | [`queue_microtask_safe`] | `queue_microtask` | `resolved_promise_then` |
//!
//! Handles remember which primitive produced them, so [`caf`] and
//! [`cancel_idle`] always cancel through the matching primitive.

use alloc::boxed::Box;
use alloc::rc::Rc;

use crate::host::{CallbackId, FrameTask, Host, IdleDeadline, IdleTask, Task};
use crate::time::{Duration, HostTime};

/// Timer delay used when the host has no animation-frame primitive (~60 Hz).
pub const FRAME_FALLBACK_DELAY: Duration = Duration::from_millis(16);

/// Timeout budget passed to the host's idle primitive.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(200);

/// A pending frame request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameHandle {
    /// Scheduled with `request_animation_frame`.
    Animation(CallbackId),
    /// Scheduled with the timer fallback.
    Timer(CallbackId),
}

/// A pending idle request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdleHandle {
    /// Scheduled with `request_idle_callback`.
    Idle(CallbackId),
    /// Scheduled with the timer fallback.
    Timer(CallbackId),
}

/// Returns `true` if the host exposes the globals a viewport-capable host
/// would (`window`, `document` and `navigator`).
#[must_use]
pub fn can_use_dom<H: Host + ?Sized>(host: &H) -> bool {
    let g = host.globals();
    g.window && g.document && g.navigator
}

/// Returns the current time, preferring the high-resolution clock.
#[must_use]
pub fn now<H: Host + ?Sized>(host: &H) -> HostTime {
    match host.high_res_now() {
        Some(ms) => HostTime::from_millis_f64(ms),
        None => HostTime::from_millis_f64(host.wall_clock_ms()),
    }
}

/// Schedules `task` on the next animation frame.
///
/// Without a frame primitive, a [`FRAME_FALLBACK_DELAY`] timer is used and
/// the task receives [`now`] at fire time.
pub fn raf<H: Host + ?Sized + 'static>(host: &Rc<H>, task: FrameTask) -> FrameHandle {
    match host.request_animation_frame(task) {
        Ok(id) => FrameHandle::Animation(id),
        Err(task) => {
            let weak = Rc::downgrade(host);
            let id = host.set_timeout(
                FRAME_FALLBACK_DELAY,
                Box::new(move || {
                    let ts = weak.upgrade().map_or(HostTime::default(), |h| now(&*h));
                    task(ts);
                }),
            );
            FrameHandle::Timer(id)
        }
    }
}

/// Cancels a request made with [`raf`].
pub fn caf<H: Host + ?Sized>(host: &H, handle: FrameHandle) {
    match handle {
        FrameHandle::Animation(id) => host.cancel_animation_frame(id),
        FrameHandle::Timer(id) => host.clear_timeout(id),
    }
}

/// Schedules `task` for an idle period, running no later than `timeout`.
///
/// Without an idle primitive, a zero-delay timer runs the task with
/// [`IdleDeadline::EXCEEDED`].
pub fn request_idle<H: Host + ?Sized>(host: &H, task: IdleTask, timeout: Duration) -> IdleHandle {
    match host.request_idle_callback(task, timeout) {
        Ok(id) => IdleHandle::Idle(id),
        Err(task) => IdleHandle::Timer(
            host.set_timeout(Duration::ZERO, Box::new(move || task(IdleDeadline::EXCEEDED))),
        ),
    }
}

/// Cancels a request made with [`request_idle`].
pub fn cancel_idle<H: Host + ?Sized>(host: &H, handle: IdleHandle) {
    match handle {
        IdleHandle::Idle(id) => host.cancel_idle_callback(id),
        IdleHandle::Timer(id) => host.clear_timeout(id),
    }
}

/// Queues `task` as a microtask, falling back to a resolved-promise
/// continuation.
pub fn queue_microtask_safe<H: Host + ?Sized>(host: &H, task: Task) {
    if let Err(task) = host.queue_microtask(task) {
        host.resolved_promise_then(task);
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;

    use super::*;
    use crate::host::Globals;
    use crate::testing::{Caps, ManualHost};

    #[test]
    fn dom_probe_requires_all_globals() {
        let host = ManualHost::new(Caps::ALL);
        assert!(can_use_dom(&host));

        host.globals.set(Globals {
            navigator: false,
            ..Globals::ALL
        });
        assert!(!can_use_dom(&host));

        host.globals.set(Globals::NONE);
        assert!(!can_use_dom(&host));
    }

    #[test]
    fn now_prefers_high_res_clock() {
        let host = ManualHost::new(Caps::ALL);
        host.clock_ms.set(12.5);
        host.wall_ms.set(1_700_000_000_000.0);
        assert_eq!(now(&host), HostTime(12_500));

        let bare = ManualHost::new(Caps::NONE);
        bare.wall_ms.set(42.0);
        assert_eq!(now(&bare), HostTime(42_000), "falls back to wall clock");
    }

    #[test]
    fn raf_uses_native_primitive_when_present() {
        let host = Rc::new(ManualHost::new(Caps::ALL));
        let seen = Rc::new(Cell::new(None));
        let s = Rc::clone(&seen);
        let handle = raf(&host, Box::new(move |t| s.set(Some(t))));
        assert!(matches!(handle, FrameHandle::Animation(_)));

        host.clock_ms.set(16.0);
        host.run_frames();
        assert_eq!(seen.get(), Some(HostTime(16_000)));
    }

    #[test]
    fn raf_falls_back_to_timer() {
        let host = Rc::new(ManualHost::new(Caps::NONE));
        let seen = Rc::new(Cell::new(None));
        let s = Rc::clone(&seen);
        let handle = raf(&host, Box::new(move |t| s.set(Some(t))));
        assert!(matches!(handle, FrameHandle::Timer(_)));
        assert_eq!(host.last_timer_delay(), Some(FRAME_FALLBACK_DELAY));

        host.wall_ms.set(99.0);
        host.run_timers();
        assert_eq!(seen.get(), Some(HostTime(99_000)), "timestamp read at fire time");
    }

    #[test]
    fn caf_cancels_through_matching_primitive() {
        let host = Rc::new(ManualHost::new(Caps::NONE));
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let handle = raf(&host, Box::new(move |_| f.set(true)));
        caf(&*host, handle);
        host.run_timers();
        assert!(!fired.get());
    }

    #[test]
    fn idle_fallback_reports_exceeded_deadline() {
        let host = ManualHost::new(Caps::NONE);
        let seen = Rc::new(Cell::new(None));
        let s = Rc::clone(&seen);
        let handle = request_idle(&host, Box::new(move |d| s.set(Some(d))), DEFAULT_IDLE_TIMEOUT);
        assert!(matches!(handle, IdleHandle::Timer(_)));
        assert_eq!(host.last_timer_delay(), Some(Duration::ZERO));

        host.run_timers();
        assert_eq!(seen.get(), Some(IdleDeadline::EXCEEDED));
    }

    #[test]
    fn idle_native_is_cancellable() {
        let host = ManualHost::new(Caps::ALL);
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let handle = request_idle(&host, Box::new(move |_| f.set(true)), DEFAULT_IDLE_TIMEOUT);
        assert!(matches!(handle, IdleHandle::Idle(_)));
        cancel_idle(&host, handle);
        host.run_idle();
        assert!(!fired.get());
    }

    #[test]
    fn microtask_falls_back_to_promise_continuation() {
        let host = ManualHost::new(Caps::NONE);
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        queue_microtask_safe(&host, Box::new(move || f.set(true)));
        assert_eq!(host.promise_jobs(), 1);
        host.run_microtasks();
        assert!(fired.get());
    }
}
