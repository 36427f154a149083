// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event coalescing.
//!
//! The [`Scheduler`] keeps at most one frame request and at most one idle
//! request in flight. Requests made while one is pending are dropped, so a
//! burst of N platform events produces a single unit of work.
//!
//! # Frame lane
//!
//! [`schedule_frame`](Scheduler::schedule_frame) marks the lane pending,
//! defers through a microtask (letting the rest of the current task's events
//! land first), then requests one animation frame. The pending flag is
//! cleared *before* the work runs, so a request made from inside the work
//! opens a new coalescing window instead of being swallowed.
//!
//! # Idle lane
//!
//! [`schedule_idle`](Scheduler::schedule_idle) follows the same discipline
//! over the idle primitive. The two lanes are independent.
//!
//! # Cancellation
//!
//! [`cancel_all`](Scheduler::cancel_all) cancels whatever the host has queued
//! and advances each lane's epoch. Work captured under an older epoch never
//! runs, even when the microtask that would have requested its frame is
//! already queued.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use crate::host::Host;
use crate::shim::{self, DEFAULT_IDLE_TIMEOUT, FrameHandle, IdleHandle};

/// Coalescing state for one lane.
#[derive(Debug)]
struct Lane<T: Copy> {
    queued: Cell<bool>,
    epoch: Cell<u64>,
    handle: Cell<Option<T>>,
}

impl<T: Copy> Lane<T> {
    fn new() -> Self {
        Self {
            queued: Cell::new(false),
            epoch: Cell::new(0),
            handle: Cell::new(None),
        }
    }

    /// Claims the lane. Returns the epoch of the new window, or `None` if a
    /// request is already pending.
    fn claim(&self) -> Option<u64> {
        if self.queued.replace(true) {
            return None;
        }
        Some(self.epoch.get())
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.queued.get() && self.epoch.get() == epoch
    }

    /// Marks the in-flight request as delivered.
    fn settle(&self) {
        self.handle.set(None);
        self.queued.set(false);
    }

    /// Abandons the current window and returns the host handle to cancel.
    fn reset(&self) -> Option<T> {
        self.queued.set(false);
        self.epoch.set(self.epoch.get().wrapping_add(1));
        self.handle.take()
    }
}

/// Coalesces frame and idle work for one store.
///
/// Each store owns its own scheduler; schedulers are not shared.
pub struct Scheduler<H: Host + ?Sized + 'static> {
    host: Rc<H>,
    frame: Rc<Lane<FrameHandle>>,
    idle: Rc<Lane<IdleHandle>>,
}

impl<H: Host + ?Sized + 'static> fmt::Debug for Scheduler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("frame", &self.frame)
            .field("idle", &self.idle)
            .finish_non_exhaustive()
    }
}

impl<H: Host + ?Sized + 'static> Scheduler<H> {
    /// Creates a scheduler with both lanes idle.
    #[must_use]
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            frame: Rc::new(Lane::new()),
            idle: Rc::new(Lane::new()),
        }
    }

    /// Runs `work` on the next animation frame unless a frame request is
    /// already pending, in which case `work` is dropped.
    pub fn schedule_frame(&self, work: impl FnOnce() + 'static) {
        let Some(epoch) = self.frame.claim() else {
            return;
        };

        let lane = Rc::clone(&self.frame);
        let host = Rc::downgrade(&self.host);
        shim::queue_microtask_safe(
            &*self.host,
            Box::new(move || {
                if !lane.is_current(epoch) {
                    return;
                }
                let Some(host) = host.upgrade() else {
                    return;
                };
                let fired = Rc::clone(&lane);
                let handle = shim::raf(
                    &host,
                    Box::new(move |_| {
                        if !fired.is_current(epoch) {
                            return;
                        }
                        fired.settle();
                        work();
                    }),
                );
                lane.handle.set(Some(handle));
            }),
        );
    }

    /// Runs `work` when the host is idle unless an idle request is already
    /// pending, in which case `work` is dropped.
    pub fn schedule_idle(&self, work: impl FnOnce() + 'static) {
        let Some(epoch) = self.idle.claim() else {
            return;
        };

        let lane = Rc::clone(&self.idle);
        let handle = shim::request_idle(
            &*self.host,
            Box::new(move |_| {
                if !lane.is_current(epoch) {
                    return;
                }
                lane.settle();
                work();
            }),
            DEFAULT_IDLE_TIMEOUT,
        );
        // A host may only run idle work later, so the lane is still ours.
        if self.idle.is_current(epoch) {
            self.idle.handle.set(Some(handle));
        }
    }

    /// Cancels outstanding frame and idle requests and resets both lanes.
    ///
    /// Safe to call repeatedly or with nothing pending.
    pub fn cancel_all(&self) {
        if let Some(handle) = self.frame.reset() {
            shim::caf(&*self.host, handle);
        }
        if let Some(handle) = self.idle.reset() {
            shim::cancel_idle(&*self.host, handle);
        }
    }

    /// Returns `true` while a frame request is pending.
    #[must_use]
    pub fn is_frame_pending(&self) -> bool {
        self.frame.queued.get()
    }

    /// Returns `true` while an idle request is pending.
    #[must_use]
    pub fn is_idle_pending(&self) -> bool {
        self.idle.queued.get()
    }
}
