// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The simulated event loop.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Size;
use tracing::{trace, warn};
use viewport_truth_core::error::{HostSignalError, Signal};
use viewport_truth_core::host::{
    CallbackId, EventHandler, FrameTask, Globals, Host, IdleDeadline, IdleTask, ListenerId, Task,
    ViewportEvent, VisualViewportReading,
};
use viewport_truth_core::time::{Duration, HostTime};

/// Upper bound on callbacks run at one instant before [`SimHost`] assumes a
/// livelock and moves on.
const MAX_TURNS_PER_INSTANT: usize = 10_000;

/// Upper bound on clock jumps in [`SimHost::run_until_idle`].
const MAX_STEPS: usize = 100_000;

/// Idle budget reported when no frame is pending.
const IDLE_BUDGET: Duration = Duration::from_millis(50);

/// Which optional host primitives the simulation offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// `requestAnimationFrame` is available.
    pub animation_frame: bool,
    /// `requestIdleCallback` is available.
    pub idle_callback: bool,
    /// `queueMicrotask` is available.
    pub microtask: bool,
    /// `performance.now` is available.
    pub high_res_clock: bool,
}

impl Capabilities {
    /// Every optional primitive present.
    pub const FULL: Self = Self {
        animation_frame: true,
        idle_callback: true,
        microtask: true,
        high_res_clock: true,
    };

    /// Only the mandatory primitives; every shim fallback is exercised.
    pub const MINIMAL: Self = Self {
        animation_frame: false,
        idle_callback: false,
        microtask: false,
        high_res_clock: false,
    };
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::FULL
    }
}

/// Counters of callbacks the simulation has run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Frame callbacks.
    pub frames: u64,
    /// Timer callbacks.
    pub timers: u64,
    /// Idle callbacks.
    pub idle_callbacks: u64,
    /// Microtasks, including promise continuations.
    pub microtasks: u64,
    /// Promise continuations queued through the microtask fallback.
    pub promise_jobs: u64,
}

/// A deterministic, single-threaded browser-like host.
///
/// Time only moves through [`advance`](Self::advance) and
/// [`run_until_idle`](Self::run_until_idle). At each instant the loop runs,
/// in order: microtasks, due timers (one at a time, each followed by its
/// microtasks), the frame batch if a frame boundary has been reached, then
/// idle callbacks. Frames fire on multiples of the frame interval.
pub struct SimHost {
    caps: Cell<Capabilities>,
    globals: Cell<Globals>,
    now: Cell<HostTime>,
    frame_interval: Duration,
    frame_due: Cell<Option<HostTime>>,
    layout: Cell<Size>,
    visual: Cell<Option<VisualViewportReading>>,
    failure: RefCell<Option<HostSignalError>>,
    next_id: Cell<u32>,
    next_seq: Cell<u64>,
    timers: RefCell<BTreeMap<(HostTime, u64), (CallbackId, Task)>>,
    frames: RefCell<Vec<(CallbackId, FrameTask)>>,
    idles: RefCell<VecDeque<(CallbackId, IdleTask)>>,
    microtasks: RefCell<VecDeque<Task>>,
    listeners: RefCell<Vec<(ListenerId, ViewportEvent, EventHandler)>>,
    stats: Cell<SimStats>,
}

impl fmt::Debug for SimHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimHost")
            .field("caps", &self.caps.get())
            .field("now", &self.now.get())
            .field("layout", &self.layout.get())
            .field("visual", &self.visual.get())
            .field("timers", &self.timers.borrow().len())
            .field("frames", &self.frames.borrow().len())
            .field("idles", &self.idles.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .field("stats", &self.stats.get())
            .finish_non_exhaustive()
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    /// Default frame interval (~60 Hz).
    pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

    /// A host at time zero with every capability, a 400×800 layout viewport
    /// and no visual viewport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            caps: Cell::new(Capabilities::FULL),
            globals: Cell::new(Globals::ALL),
            now: Cell::new(HostTime(0)),
            frame_interval: Self::DEFAULT_FRAME_INTERVAL,
            frame_due: Cell::new(None),
            layout: Cell::new(Size::new(400.0, 800.0)),
            visual: Cell::new(None),
            failure: RefCell::new(None),
            next_id: Cell::new(1),
            next_seq: Cell::new(0),
            timers: RefCell::new(BTreeMap::new()),
            frames: RefCell::new(Vec::new()),
            idles: RefCell::new(VecDeque::new()),
            microtasks: RefCell::new(VecDeque::new()),
            listeners: RefCell::new(Vec::new()),
            stats: Cell::new(SimStats::default()),
        }
    }

    /// Sets the available capabilities.
    #[must_use]
    pub fn with_capabilities(self, caps: Capabilities) -> Self {
        self.caps.set(caps);
        self
    }

    /// Sets which globals the host exposes.
    #[must_use]
    pub fn with_globals(self, globals: Globals) -> Self {
        self.globals.set(globals);
        self
    }

    /// Sets the frame interval. Zero is treated as one tick.
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Sets the initial layout viewport.
    #[must_use]
    pub fn with_layout(self, width: f64, height: f64) -> Self {
        self.set_layout(width, height);
        self
    }

    /// Sets the initial visual viewport.
    #[must_use]
    pub fn with_visual(self, reading: VisualViewportReading) -> Self {
        self.set_visual(Some(reading));
        self
    }

    /// Changes the available capabilities.
    pub fn set_capabilities(&self, caps: Capabilities) {
        self.caps.set(caps);
    }

    /// Changes the layout viewport. No event is dispatched.
    pub fn set_layout(&self, width: f64, height: f64) {
        self.layout.set(Size::new(width, height));
    }

    /// Changes (or removes) the visual viewport. No event is dispatched.
    pub fn set_visual(&self, reading: Option<VisualViewportReading>) {
        self.visual.set(reading);
    }

    /// Makes every read of `signal` fail with `message` until
    /// [`heal`](Self::heal).
    pub fn fail(&self, signal: Signal, message: impl Into<String>) {
        *self.failure.borrow_mut() = Some(HostSignalError::new(signal, message));
    }

    /// Clears an injected failure.
    pub fn heal(&self) {
        *self.failure.borrow_mut() = None;
    }

    /// Dispatches `event` to its listeners, synchronously and in
    /// registration order. Microtasks run when time next moves.
    pub fn emit(&self, event: ViewportEvent) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(_, _, h)| Rc::clone(h))
            .collect();
        trace!(event = event.dom_type(), handlers = handlers.len(), "dispatch");
        for h in handlers {
            h();
        }
    }

    /// The simulated time.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.now.get()
    }

    /// Callback counters.
    #[must_use]
    pub fn stats(&self) -> SimStats {
        self.stats.get()
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Number of registered event listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Number of registered listeners for `event`.
    #[must_use]
    pub fn listeners_for(&self, event: ViewportEvent) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(_, e, _)| *e == event)
            .count()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.microtasks.borrow().is_empty()
            && self.timers.borrow().is_empty()
            && self.frames.borrow().is_empty()
            && self.idles.borrow().is_empty()
    }

    /// Moves time forward by `d`, running everything that falls due.
    pub fn advance(&self, d: Duration) {
        let target = self.now.get() + d;
        loop {
            self.run_instant();
            match self.next_due() {
                Some(t) if t <= target => self.now.set(t.max(self.now.get())),
                _ => break,
            }
        }
        self.now.set(target);
        self.run_instant();
    }

    /// [`advance`](Self::advance) by whole milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Runs until nothing is queued, jumping the clock from one due time to
    /// the next. Returns the time at which the host went quiet.
    pub fn run_until_idle(&self) -> HostTime {
        for _ in 0..MAX_STEPS {
            self.run_instant();
            match self.next_due() {
                Some(t) => self.now.set(t.max(self.now.get())),
                None => return self.now.get(),
            }
        }
        warn!(now = ?self.now.get(), "simulation did not go idle");
        self.now.get()
    }

    fn id(&self) -> CallbackId {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        CallbackId(id)
    }

    fn bump(&self, f: impl FnOnce(&mut SimStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn next_due(&self) -> Option<HostTime> {
        let timer = self.timers.borrow().keys().next().map(|&(due, _)| due);
        match (timer, self.frame_due.get()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn run_instant(&self) {
        for _ in 0..MAX_TURNS_PER_INSTANT {
            self.drain_microtasks();
            if self.run_due_timer() {
                continue;
            }
            if self.frame_due.get().is_some_and(|t| t <= self.now.get()) {
                self.run_frames();
                continue;
            }
            if self.run_idle_callback() {
                continue;
            }
            return;
        }
        warn!(now = ?self.now.get(), "livelock at one instant; moving on");
    }

    fn drain_microtasks(&self) {
        loop {
            let Some(task) = self.microtasks.borrow_mut().pop_front() else {
                return;
            };
            self.bump(|s| s.microtasks += 1);
            task();
        }
    }

    fn run_due_timer(&self) -> bool {
        let task = {
            let mut timers = self.timers.borrow_mut();
            match timers.first_key_value() {
                Some((&(due, _), _)) if due <= self.now.get() => {
                    timers.pop_first().map(|(_, (_, task))| task)
                }
                _ => None,
            }
        };
        let Some(task) = task else {
            return false;
        };
        self.bump(|s| s.timers += 1);
        task();
        self.drain_microtasks();
        true
    }

    fn run_frames(&self) {
        self.frame_due.set(None);
        let batch: Vec<_> = self.frames.borrow_mut().drain(..).collect();
        let ts = self.now.get();
        trace!(at = ?ts, callbacks = batch.len(), "frame");
        for (_, task) in batch {
            self.bump(|s| s.frames += 1);
            task(ts);
            self.drain_microtasks();
        }
    }

    fn run_idle_callback(&self) -> bool {
        let Some((_, task)) = self.idles.borrow_mut().pop_front() else {
            return false;
        };
        let time_remaining = self
            .frame_due
            .get()
            .map_or(IDLE_BUDGET, |due| due.saturating_duration_since(self.now.get()));
        self.bump(|s| s.idle_callbacks += 1);
        task(IdleDeadline {
            did_timeout: false,
            time_remaining,
        });
        self.drain_microtasks();
        true
    }

    fn next_frame_boundary(&self) -> HostTime {
        let interval = self.frame_interval.ticks().max(1);
        let now = self.now.get().ticks();
        HostTime((now / interval + 1) * interval)
    }
}

impl Host for SimHost {
    fn globals(&self) -> Globals {
        self.globals.get()
    }

    fn high_res_now(&self) -> Option<f64> {
        self.caps
            .get()
            .high_res_clock
            .then(|| self.now.get().as_millis_f64())
    }

    fn wall_clock_ms(&self) -> f64 {
        // Whole milliseconds, like `Date.now()`.
        Duration::from_millis(self.now.get().ticks() / 1_000).as_millis_f64()
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> CallbackId {
        let id = self.id();
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let due = self.now.get() + delay;
        self.timers.borrow_mut().insert((due, seq), (id, task));
        id
    }

    fn clear_timeout(&self, id: CallbackId) {
        self.timers.borrow_mut().retain(|_, (i, _)| *i != id);
    }

    fn request_animation_frame(&self, task: FrameTask) -> Result<CallbackId, FrameTask> {
        if !self.caps.get().animation_frame {
            return Err(task);
        }
        let id = self.id();
        self.frames.borrow_mut().push((id, task));
        if self.frame_due.get().is_none() {
            self.frame_due.set(Some(self.next_frame_boundary()));
        }
        Ok(id)
    }

    fn cancel_animation_frame(&self, id: CallbackId) {
        let mut frames = self.frames.borrow_mut();
        frames.retain(|(i, _)| *i != id);
        if frames.is_empty() {
            self.frame_due.set(None);
        }
    }

    fn request_idle_callback(
        &self,
        task: IdleTask,
        _timeout: Duration,
    ) -> Result<CallbackId, IdleTask> {
        if !self.caps.get().idle_callback {
            return Err(task);
        }
        let id = self.id();
        self.idles.borrow_mut().push_back((id, task));
        Ok(id)
    }

    fn cancel_idle_callback(&self, id: CallbackId) {
        self.idles.borrow_mut().retain(|(i, _)| *i != id);
    }

    fn queue_microtask(&self, task: Task) -> Result<(), Task> {
        if !self.caps.get().microtask {
            return Err(task);
        }
        self.microtasks.borrow_mut().push_back(task);
        Ok(())
    }

    fn resolved_promise_then(&self, task: Task) {
        self.bump(|s| s.promise_jobs += 1);
        self.microtasks.borrow_mut().push_back(task);
    }

    fn layout_viewport(&self) -> Result<Size, HostSignalError> {
        match &*self.failure.borrow() {
            Some(err) if err.signal == Signal::LayoutViewport => Err(err.clone()),
            _ => Ok(self.layout.get()),
        }
    }

    fn visual_viewport(&self) -> Result<Option<VisualViewportReading>, HostSignalError> {
        match &*self.failure.borrow() {
            Some(err) if err.signal == Signal::VisualViewport => Err(err.clone()),
            _ => Ok(self.visual.get()),
        }
    }

    fn add_event_listener(
        &self,
        event: ViewportEvent,
        handler: EventHandler,
    ) -> Option<ListenerId> {
        if event.is_visual() && self.visual.get().is_none() {
            return None;
        }
        let id = ListenerId(self.id().0);
        self.listeners.borrow_mut().push((id, event, handler));
        Some(id)
    }

    fn remove_event_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(i, _, _)| *i != id);
    }
}
