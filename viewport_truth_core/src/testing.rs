// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hand-cranked host for unit tests.
//!
//! Queues are drained explicitly and the clock only moves when a test sets
//! it. Timer delays are recorded but not used for ordering.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use kurbo::Size;

use crate::error::{HostSignalError, Signal};
use crate::host::{
    CallbackId, EventHandler, FrameTask, Globals, Host, IdleDeadline, IdleTask, ListenerId, Task,
    ViewportEvent, VisualViewportReading,
};
use crate::time::{Duration, HostTime};

#[derive(Clone, Copy, Debug)]
pub(crate) struct Caps {
    pub(crate) frame: bool,
    pub(crate) idle: bool,
    pub(crate) microtask: bool,
    pub(crate) high_res: bool,
}

impl Caps {
    pub(crate) const ALL: Self = Self {
        frame: true,
        idle: true,
        microtask: true,
        high_res: true,
    };

    pub(crate) const NONE: Self = Self {
        frame: false,
        idle: false,
        microtask: false,
        high_res: false,
    };
}

pub(crate) struct ManualHost {
    pub(crate) globals: Cell<Globals>,
    pub(crate) clock_ms: Cell<f64>,
    pub(crate) wall_ms: Cell<f64>,
    pub(crate) layout: Cell<Size>,
    pub(crate) visual: Cell<Option<VisualViewportReading>>,
    pub(crate) visual_error: RefCell<Option<String>>,
    caps: Caps,
    next_id: Cell<u32>,
    last_delay: Cell<Option<Duration>>,
    timers: RefCell<Vec<(CallbackId, Task)>>,
    frames: RefCell<Vec<(CallbackId, FrameTask)>>,
    idles: RefCell<Vec<(CallbackId, IdleTask)>>,
    microtasks: RefCell<VecDeque<Task>>,
    promise_jobs: Cell<usize>,
    listeners: RefCell<Vec<(ListenerId, ViewportEvent, EventHandler)>>,
}

impl ManualHost {
    pub(crate) fn new(caps: Caps) -> Self {
        Self {
            globals: Cell::new(Globals::ALL),
            clock_ms: Cell::new(0.0),
            wall_ms: Cell::new(0.0),
            layout: Cell::new(Size::new(400.0, 800.0)),
            visual: Cell::new(None),
            visual_error: RefCell::new(None),
            caps,
            next_id: Cell::new(1),
            last_delay: Cell::new(None),
            timers: RefCell::new(Vec::new()),
            frames: RefCell::new(Vec::new()),
            idles: RefCell::new(Vec::new()),
            microtasks: RefCell::new(VecDeque::new()),
            promise_jobs: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    fn next(&self) -> CallbackId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        CallbackId(id)
    }

    pub(crate) fn set_time_ms(&self, ms: f64) {
        self.clock_ms.set(ms);
        self.wall_ms.set(ms);
    }

    pub(crate) fn last_timer_delay(&self) -> Option<Duration> {
        self.last_delay.get()
    }

    pub(crate) fn promise_jobs(&self) -> usize {
        self.promise_jobs.get()
    }

    pub(crate) fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub(crate) fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub(crate) fn run_microtasks(&self) {
        loop {
            let Some(task) = self.microtasks.borrow_mut().pop_front() else {
                break;
            };
            task();
        }
    }

    pub(crate) fn run_frames(&self) {
        let batch: Vec<_> = self.frames.borrow_mut().drain(..).collect();
        let ts = crate::shim::now(self);
        for (_, task) in batch {
            task(ts);
        }
    }

    pub(crate) fn run_timers(&self) {
        let batch: Vec<_> = self.timers.borrow_mut().drain(..).collect();
        for (_, task) in batch {
            task();
        }
    }

    pub(crate) fn run_idle(&self) {
        let batch: Vec<_> = self.idles.borrow_mut().drain(..).collect();
        for (_, task) in batch {
            task(IdleDeadline {
                did_timeout: false,
                time_remaining: Duration::from_millis(10),
            });
        }
    }

    /// Microtasks, then frames, then microtasks again.
    pub(crate) fn flush_frame(&self) {
        self.run_microtasks();
        self.run_frames();
        self.run_microtasks();
    }

    pub(crate) fn emit(&self, event: ViewportEvent) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(_, _, h)| Rc::clone(h))
            .collect();
        for h in handlers {
            h();
        }
    }

    pub(crate) fn now(&self) -> HostTime {
        crate::shim::now(self)
    }
}

impl Host for ManualHost {
    fn globals(&self) -> Globals {
        self.globals.get()
    }

    fn high_res_now(&self) -> Option<f64> {
        self.caps.high_res.then(|| self.clock_ms.get())
    }

    fn wall_clock_ms(&self) -> f64 {
        self.wall_ms.get()
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> CallbackId {
        let id = self.next();
        self.last_delay.set(Some(delay));
        self.timers.borrow_mut().push((id, task));
        id
    }

    fn clear_timeout(&self, id: CallbackId) {
        self.timers.borrow_mut().retain(|(i, _)| *i != id);
    }

    fn request_animation_frame(&self, task: FrameTask) -> Result<CallbackId, FrameTask> {
        if !self.caps.frame {
            return Err(task);
        }
        let id = self.next();
        self.frames.borrow_mut().push((id, task));
        Ok(id)
    }

    fn cancel_animation_frame(&self, id: CallbackId) {
        self.frames.borrow_mut().retain(|(i, _)| *i != id);
    }

    fn request_idle_callback(&self, task: IdleTask, _timeout: Duration) -> Result<CallbackId, IdleTask> {
        if !self.caps.idle {
            return Err(task);
        }
        let id = self.next();
        self.idles.borrow_mut().push((id, task));
        Ok(id)
    }

    fn cancel_idle_callback(&self, id: CallbackId) {
        self.idles.borrow_mut().retain(|(i, _)| *i != id);
    }

    fn queue_microtask(&self, task: Task) -> Result<(), Task> {
        if !self.caps.microtask {
            return Err(task);
        }
        self.microtasks.borrow_mut().push_back(task);
        Ok(())
    }

    fn resolved_promise_then(&self, task: Task) {
        self.promise_jobs.set(self.promise_jobs.get() + 1);
        self.microtasks.borrow_mut().push_back(task);
    }

    fn layout_viewport(&self) -> Result<Size, HostSignalError> {
        Ok(self.layout.get())
    }

    fn visual_viewport(&self) -> Result<Option<VisualViewportReading>, HostSignalError> {
        if let Some(msg) = self.visual_error.borrow().as_ref() {
            return Err(HostSignalError::new(Signal::VisualViewport, msg.clone()));
        }
        Ok(self.visual.get())
    }

    fn add_event_listener(&self, event: ViewportEvent, handler: EventHandler) -> Option<ListenerId> {
        if event.is_visual() && self.visual.get().is_none() {
            return None;
        }
        let id = ListenerId(self.next().0);
        self.listeners.borrow_mut().push((id, event, handler));
        Some(id)
    }

    fn remove_event_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(i, _, _)| *i != id);
    }
}

#[test]
fn manual_host_runs_queued_work() {
    let host = ManualHost::new(Caps::ALL);
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    _ = host.set_timeout(Duration::ZERO, Box::new(move || h.set(h.get() + 1)));
    assert_eq!(host.pending_timers(), 1);
    host.run_timers();
    assert_eq!(hits.get(), 1);
    assert_eq!(host.pending_timers(), 0);
}
