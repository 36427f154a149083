// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The viewport store.
//!
//! A [`ViewportStore`] owns the current [`Snapshot`], the subscriber set, the
//! platform listeners and the stability timer of one viewport.
//!
//! # Lifecycle
//!
//! - Creation measures the viewport once; the first snapshot is stable.
//! - The first subscriber attaches platform listeners; the last one to
//!   leave detaches them. The store can be resubscribed afterwards.
//! - [`destroy`](ViewportStore::destroy) releases everything and is final.
//!
//! # Stability
//!
//! Every recomputation that changes the snapshot marks it unstable, records
//! the change time and notifies subscribers. Each recomputation (re)arms a
//! timer through the scheduler's idle lane. When the timer fires and at
//! least `stability_delay` has passed since the last change, the snapshot is
//! marked stable and subscribers are notified again. Earlier firings are
//! ignored.
//!
//! # Off-host
//!
//! When the host has no viewport-capable environment the store is inert:
//! [`get_snapshot`](ViewportStore::get_snapshot) returns
//! [`UsageError::OffHost`], subscribing does nothing and construction never
//! fails.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::error::{HostSignalError, UsageError};
use crate::host::{CallbackId, EventHandler, Host, ListenerId, ViewportEvent};
use crate::scheduler::Scheduler;
use crate::shim;
use crate::snapshot::{self, Snapshot};
use crate::time::HostTime;
use crate::trace::{
    LifecycleEvent, LifecyclePhase, NotifyEvent, NotifyReason, RecomputeEvent, SignalErrorEvent,
    StabilityEvent, Tracer,
};

type Listener = Rc<dyn Fn()>;

/// Handle returned by [`ViewportStore::subscribe`].
///
/// Dropping a subscription does **not** unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe).
pub struct Subscription {
    cancel: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// A subscription that was never active.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            cancel: RefCell::new(None),
        }
    }

    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: RefCell::new(Some(Box::new(cancel))),
        }
    }

    /// Removes the listener. Idempotent.
    pub fn unsubscribe(&self) {
        let cancel = self.cancel.borrow_mut().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Returns `true` until [`unsubscribe`](Self::unsubscribe) is called.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.borrow().is_some()
    }
}

/// Creates a store for `host`. Shorthand for [`ViewportStore::new`].
///
/// # Errors
///
/// Returns the host's error if reading the initial geometry fails.
pub fn create_store<H: Host + ?Sized + 'static>(
    host: Rc<H>,
    config: StoreConfig,
) -> Result<ViewportStore<H>, HostSignalError> {
    ViewportStore::new(host, config)
}

/// Single source of truth for one viewport.
pub struct ViewportStore<H: Host + ?Sized + 'static> {
    engine: Option<Rc<Engine<H>>>,
}

impl<H: Host + ?Sized + 'static> fmt::Debug for ViewportStore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.engine {
            None => f
                .debug_struct("ViewportStore")
                .field("off_host", &true)
                .finish_non_exhaustive(),
            Some(e) => f
                .debug_struct("ViewportStore")
                .field("snapshot", &e.snapshot.get())
                .field("subscribers", &e.listeners.borrow().len())
                .field("attached", &e.attached.get())
                .field("destroyed", &e.destroyed.get())
                .finish_non_exhaustive(),
        }
    }
}

impl<H: Host + ?Sized + 'static> ViewportStore<H> {
    /// Creates a store, measuring the viewport once.
    ///
    /// The configuration is [resolved](StoreConfig::resolved) here and never
    /// read again.
    ///
    /// # Errors
    ///
    /// Returns the host's error if reading the initial geometry fails. An
    /// off-host store never fails.
    pub fn new(host: Rc<H>, config: StoreConfig) -> Result<Self, HostSignalError> {
        Self::with_tracer(host, config, Tracer::none())
    }

    /// Like [`new`](Self::new), reporting diagnostics to `tracer`.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_tracer(
        host: Rc<H>,
        config: StoreConfig,
        tracer: Tracer,
    ) -> Result<Self, HostSignalError> {
        if !shim::can_use_dom(&*host) {
            debug!("no viewport-capable host; store is off-host");
            return Ok(Self { engine: None });
        }

        let config = config.resolved();
        let ts = shim::now(&*host);
        let initial = snapshot::measure(&*host, &config, ts)?.with_stability(true, ts);
        let engine = Engine::new(host, config, initial, tracer);

        debug!(
            width = initial.width,
            height = initial.height,
            has_visual_viewport = initial.has_visual_viewport,
            "created viewport store"
        );
        engine.lifecycle(LifecyclePhase::Created);
        Ok(Self {
            engine: Some(engine),
        })
    }

    /// Returns the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::OffHost`] on an off-host store; use
    /// [`get_server_snapshot`](Self::get_server_snapshot) there.
    pub fn get_snapshot(&self) -> Result<Snapshot, UsageError> {
        match &self.engine {
            Some(e) => Ok(e.snapshot.get()),
            None => Err(UsageError::OffHost),
        }
    }

    /// The snapshot to use when rendering without a host. Always `None`.
    #[must_use]
    pub fn get_server_snapshot(&self) -> Option<Snapshot> {
        None
    }

    /// Registers `listener`.
    ///
    /// The first subscriber attaches platform listeners. Every new subscriber
    /// is called at least once, on the next coalesced frame. Off-host or
    /// after [`destroy`](Self::destroy) this does nothing and returns an
    /// inactive subscription.
    ///
    /// A platform event that arrives while the snapshot is stable notifies
    /// even when the geometry is unchanged: once with `is_stable == false`,
    /// then again when the quiet period ends and the snapshot is stable.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        let Some(engine) = &self.engine else {
            return Subscription::noop();
        };
        let Some(id) = engine.subscribe(Rc::new(listener)) else {
            return Subscription::noop();
        };
        let weak = Rc::downgrade(engine);
        Subscription::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.unsubscribe(id);
            }
        })
    }

    /// Detaches platform listeners, cancels scheduled work and the stability
    /// timer, and drops all subscribers. Idempotent.
    pub fn destroy(&self) {
        if let Some(engine) = &self.engine {
            engine.destroy();
        }
    }

    /// Returns `true` after [`destroy`](Self::destroy).
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.engine.as_ref().is_some_and(|e| e.destroyed.get())
    }

    /// Returns `true` if the store was created without a viewport-capable
    /// host.
    #[must_use]
    pub fn is_off_host(&self) -> bool {
        self.engine.is_none()
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.listeners.borrow().len())
    }
}

struct Engine<H: Host + ?Sized + 'static> {
    this: Weak<Self>,
    host: Rc<H>,
    config: StoreConfig,
    scheduler: Scheduler<H>,
    snapshot: Cell<Snapshot>,
    last_change_at: Cell<HostTime>,
    stable_timer: Cell<Option<CallbackId>>,
    destroyed: Cell<bool>,
    attached: Cell<bool>,
    platform: RefCell<Vec<ListenerId>>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener: Cell<u64>,
    /// Subscribers still owed their first call.
    pending_initial: RefCell<Vec<u64>>,
    recompute_requested: Cell<bool>,
    /// Whether a visual viewport existed at creation.
    visual_at_creation: bool,
    on_event: EventHandler,
    tracer: RefCell<Tracer>,
}

impl<H: Host + ?Sized + 'static> Engine<H> {
    fn new(host: Rc<H>, config: StoreConfig, initial: Snapshot, tracer: Tracer) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Self>| {
            let weak = this.clone();
            let on_event: EventHandler = Rc::new(move || {
                if let Some(engine) = weak.upgrade() {
                    engine.request_recompute();
                }
            });
            Self {
                this: this.clone(),
                scheduler: Scheduler::new(Rc::clone(&host)),
                host,
                config,
                snapshot: Cell::new(initial),
                last_change_at: Cell::new(initial.ts),
                stable_timer: Cell::new(None),
                destroyed: Cell::new(false),
                attached: Cell::new(false),
                platform: RefCell::new(Vec::new()),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
                pending_initial: RefCell::new(Vec::new()),
                recompute_requested: Cell::new(false),
                visual_at_creation: initial.has_visual_viewport,
                on_event,
                tracer: RefCell::new(tracer),
            }
        })
    }

    fn now(&self) -> HostTime {
        shim::now(&*self.host)
    }

    fn lifecycle(&self, phase: LifecyclePhase) {
        let e = LifecycleEvent {
            ts: self.now(),
            phase,
            subscribers: self.listeners.borrow().len(),
        };
        self.tracer.borrow_mut().lifecycle(&e);
    }

    fn schedule_frame(&self) {
        let weak = self.this.clone();
        self.scheduler.schedule_frame(move || {
            if let Some(engine) = weak.upgrade() {
                engine.on_frame();
            }
        });
    }

    fn request_recompute(&self) {
        if self.destroyed.get() {
            return;
        }
        self.recompute_requested.set(true);
        self.schedule_frame();
    }

    /// The coalesced frame: recompute if asked to, then deliver owed initial
    /// calls unless the recomputation already called everyone.
    fn on_frame(&self) {
        if self.destroyed.get() {
            return;
        }
        let initial = core::mem::take(&mut *self.pending_initial.borrow_mut());
        let notified_all = self.recompute_requested.replace(false) && self.recompute();
        if notified_all || initial.is_empty() || self.destroyed.get() {
            return;
        }
        let targets: Vec<(u64, Listener)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(id, _)| initial.contains(id))
            .map(|(id, l)| (*id, Rc::clone(l)))
            .collect();
        self.call(targets, NotifyReason::Initial);
    }

    /// Returns `true` if subscribers were notified.
    fn recompute(&self) -> bool {
        let ts = self.now();
        let next = match snapshot::measure(&*self.host, &self.config, ts) {
            Ok(next) => next,
            Err(err) => {
                warn!(
                    signal = ?err.signal,
                    message = %err.message,
                    "viewport recomputation aborted"
                );
                self.tracer.borrow_mut().signal_error(&SignalErrorEvent {
                    ts,
                    signal: err.signal,
                });
                return false;
            }
        };

        let changed = !next.same_as(&self.snapshot.get());
        trace!(
            changed,
            width = next.width,
            height = next.height,
            is_keyboard_open = next.is_keyboard_open,
            "recomputed viewport snapshot"
        );
        self.tracer.borrow_mut().recompute(&RecomputeEvent {
            snapshot: next,
            changed,
        });

        if changed {
            self.snapshot.set(next);
            self.last_change_at.set(ts);
            self.notify_all(NotifyReason::Changed);
        }
        self.arm_stability_timer();
        changed
    }

    fn arm_stability_timer(&self) {
        if self.destroyed.get() {
            return;
        }
        if let Some(id) = self.stable_timer.take() {
            self.host.clear_timeout(id);
        }
        let weak = self.this.clone();
        self.scheduler.schedule_idle(move || {
            let Some(engine) = weak.upgrade() else {
                return;
            };
            if engine.destroyed.get() {
                return;
            }
            let weak = Rc::downgrade(&engine);
            let id = engine.host.set_timeout(
                engine.config.stability_delay,
                Box::new(move || {
                    if let Some(engine) = weak.upgrade() {
                        engine.on_stability_timer();
                    }
                }),
            );
            if let Some(old) = engine.stable_timer.replace(Some(id)) {
                engine.host.clear_timeout(old);
            }
        });
    }

    fn on_stability_timer(&self) {
        self.stable_timer.set(None);
        if self.destroyed.get() {
            return;
        }
        let ts = self.now();
        let quiet_for = ts.saturating_duration_since(self.last_change_at.get());
        let current = self.snapshot.get();
        let settled = !current.is_stable && quiet_for >= self.config.stability_delay;
        trace!(quiet_ms = quiet_for.as_millis_f64(), settled, "stability timer fired");
        self.tracer.borrow_mut().stability(&StabilityEvent {
            ts,
            quiet_for,
            settled,
        });
        if settled {
            self.snapshot.set(current.with_stability(true, ts));
            self.notify_all(NotifyReason::Stable);
        }
    }

    fn notify_all(&self, reason: NotifyReason) {
        let targets: Vec<(u64, Listener)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, l)| (*id, Rc::clone(l)))
            .collect();
        self.call(targets, reason);
    }

    /// Calls each target that is still subscribed. No borrow is held while a
    /// listener runs.
    fn call(&self, targets: Vec<(u64, Listener)>, reason: NotifyReason) {
        if targets.is_empty() {
            return;
        }
        self.tracer.borrow_mut().notify(&NotifyEvent {
            ts: self.now(),
            reason,
            listeners: targets.len(),
        });
        for (id, listener) in targets {
            if self.destroyed.get() {
                return;
            }
            if self.is_subscribed(id) {
                listener();
            }
        }
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.listeners.borrow().iter().any(|(i, _)| *i == id)
    }

    fn subscribe(&self, listener: Listener) -> Option<u64> {
        if self.destroyed.get() {
            return None;
        }
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        let first = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.push((id, listener));
            listeners.len() == 1
        };
        self.pending_initial.borrow_mut().push(id);
        if first {
            self.attach();
        }
        self.schedule_frame();
        Some(id)
    }

    fn unsubscribe(&self, id: u64) {
        let empty = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|(i, _)| *i != id);
            listeners.is_empty()
        };
        self.pending_initial.borrow_mut().retain(|i| *i != id);
        if empty {
            self.detach();
        }
    }

    fn attach(&self) {
        if self.attached.get() || self.destroyed.get() {
            return;
        }
        self.attached.set(true);
        self.request_recompute();

        let visual: &[ViewportEvent] = if self.visual_at_creation {
            &ViewportEvent::VISUAL
        } else {
            &[]
        };
        let ids: Vec<ListenerId> = visual
            .iter()
            .chain(ViewportEvent::WINDOW.iter())
            .filter_map(|&event| {
                self.host
                    .add_event_listener(event, Rc::clone(&self.on_event))
            })
            .collect();
        debug!(listeners = ids.len(), "attached viewport listeners");
        *self.platform.borrow_mut() = ids;
        self.lifecycle(LifecyclePhase::Attached);
    }

    fn detach(&self) {
        if !self.attached.replace(false) {
            return;
        }
        let ids = core::mem::take(&mut *self.platform.borrow_mut());
        for id in &ids {
            self.host.remove_event_listener(*id);
        }
        debug!(listeners = ids.len(), "detached viewport listeners");
        self.lifecycle(LifecyclePhase::Detached);
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        self.detach();
        self.scheduler.cancel_all();
        if let Some(id) = self.stable_timer.take() {
            self.host.clear_timeout(id);
        }
        self.recompute_requested.set(false);
        self.pending_initial.borrow_mut().clear();
        let dropped = core::mem::take(&mut *self.listeners.borrow_mut());
        debug!(subscribers = dropped.len(), "destroyed viewport store");
        self.lifecycle(LifecyclePhase::Destroyed);
    }
}

impl<H: Host + ?Sized + 'static> Drop for Engine<H> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use core::cell::Cell;

    use kurbo::Size;

    use super::*;
    use crate::host::{Globals, VisualViewportReading};
    use crate::testing::{Caps, ManualHost};
    use crate::time::Duration;

    fn host_with_vv() -> Rc<ManualHost> {
        let host = Rc::new(ManualHost::new(Caps::ALL));
        host.visual.set(Some(VisualViewportReading::new(400.0, 700.0, 1.0)));
        host
    }

    fn counting(store: &ViewportStore<ManualHost>) -> (Rc<Cell<u32>>, Subscription) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = store.subscribe(move || h.set(h.get() + 1));
        (hits, sub)
    }

    #[test]
    fn off_host_store_is_inert() {
        let host = Rc::new(ManualHost::new(Caps::ALL));
        host.globals.set(Globals::NONE);
        let store = create_store(Rc::clone(&host), StoreConfig::default()).unwrap();

        assert!(store.is_off_host());
        assert_eq!(store.get_snapshot(), Err(UsageError::OffHost));
        assert_eq!(store.get_server_snapshot(), None);

        let (hits, sub) = counting(&store);
        assert!(!sub.is_active());
        sub.unsubscribe();
        host.flush_frame();
        assert_eq!(hits.get(), 0);
        assert_eq!(host.listener_count(), 0);

        store.destroy();
        assert!(!store.is_destroyed());
    }

    #[test]
    fn initial_snapshot_is_stable_and_reads_are_repeatable() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let a = store.get_snapshot().unwrap();
        let b = store.get_snapshot().unwrap();
        assert!(a.is_stable);
        assert_eq!(a, b);
        assert_eq!(a.height, 700.0);
        assert_eq!(a.layout_height, 800.0);
        assert_eq!(a.ts, host.now());
        assert_eq!(store.get_server_snapshot(), None);
    }

    #[test]
    fn construction_fails_on_broken_visual_viewport() {
        let host = host_with_vv();
        *host.visual_error.borrow_mut() = Some("getter threw".to_string());
        let err = ViewportStore::new(host, StoreConfig::default()).unwrap_err();
        assert_eq!(err.signal, crate::error::Signal::VisualViewport);
    }

    #[test]
    fn listeners_attach_lazily_and_detach_with_last_subscriber() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        assert_eq!(host.listener_count(), 0);

        let (_, a) = counting(&store);
        assert_eq!(host.listener_count(), 5);
        let (_, b) = counting(&store);
        assert_eq!(host.listener_count(), 5);
        assert_eq!(store.subscriber_count(), 2);

        a.unsubscribe();
        assert_eq!(host.listener_count(), 5);
        b.unsubscribe();
        b.unsubscribe();
        assert_eq!(host.listener_count(), 0);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn visual_listeners_need_visual_viewport_at_creation() {
        let host = Rc::new(ManualHost::new(Caps::ALL));
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let _sub = store.subscribe(|| {});
        assert_eq!(host.listener_count(), ViewportEvent::WINDOW.len());
    }

    #[test]
    fn first_frame_notifies_each_subscriber_once() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (hits, _sub) = counting(&store);
        assert_eq!(hits.get(), 0, "never notified synchronously");

        host.flush_frame();
        assert_eq!(hits.get(), 1);
        assert!(!store.get_snapshot().unwrap().is_stable);
    }

    #[test]
    fn later_subscriber_gets_initial_call_without_disturbing_others() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (first, _a) = counting(&store);
        host.flush_frame();
        assert_eq!(first.get(), 1);

        let (second, _b) = counting(&store);
        host.flush_frame();
        assert_eq!(second.get(), 1);
        assert_eq!(first.get(), 1);
    }

    #[test]
    fn burst_of_events_recomputes_once() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (hits, _sub) = counting(&store);
        host.flush_frame();

        host.layout.set(Size::new(400.0, 600.0));
        for _ in 0..5 {
            host.emit(ViewportEvent::Resize);
            host.emit(ViewportEvent::VisualScroll);
        }
        assert_eq!(host.pending_frames(), 0, "frame requested after the microtask");
        host.flush_frame();
        assert_eq!(hits.get(), 2);
        assert_eq!(store.get_snapshot().unwrap().layout_height, 600.0);
    }

    #[test]
    fn unchanged_recompute_does_not_notify() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (hits, _sub) = counting(&store);
        host.flush_frame();

        host.emit(ViewportEvent::Resize);
        host.flush_frame();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn unchanged_event_while_stable_notifies_twice() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (hits, _sub) = counting(&store);
        host.flush_frame();
        host.run_idle();
        host.set_time_ms(150.0);
        host.run_timers();
        let settled = store.get_snapshot().unwrap();
        assert!(settled.is_stable);
        assert_eq!(hits.get(), 2);

        host.set_time_ms(400.0);
        host.emit(ViewportEvent::Resize);
        host.flush_frame();
        host.run_idle();
        let moved = store.get_snapshot().unwrap();
        assert!(!moved.is_stable, "any platform event reopens the quiet period");
        assert_eq!(moved.size(), settled.size());
        assert_eq!(hits.get(), 3);

        host.set_time_ms(550.0);
        host.run_timers();
        let resettled = store.get_snapshot().unwrap();
        assert!(resettled.is_stable);
        assert!(resettled.same_as(&settled));
        assert_eq!(hits.get(), 4);
    }

    #[test]
    fn stability_follows_quiet_period() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (hits, _sub) = counting(&store);
        host.flush_frame();
        host.run_idle();
        assert_eq!(host.last_timer_delay(), Some(Duration::from_millis(150)));

        host.set_time_ms(149.0);
        host.run_timers();
        assert!(!store.get_snapshot().unwrap().is_stable, "early firing is ignored");
        assert_eq!(hits.get(), 1);

        host.set_time_ms(200.0);
        host.layout.set(Size::new(400.0, 600.0));
        host.emit(ViewportEvent::Resize);
        host.flush_frame();
        host.run_idle();
        assert_eq!(hits.get(), 2);

        host.set_time_ms(350.0);
        host.run_timers();
        let snap = store.get_snapshot().unwrap();
        assert!(snap.is_stable);
        assert_eq!(snap.layout_height, 600.0);
        assert_eq!(snap.ts, host.now());
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn failed_recompute_changes_nothing() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (hits, _sub) = counting(&store);
        let before = store.get_snapshot().unwrap();

        *host.visual_error.borrow_mut() = Some("getter threw".to_string());
        host.flush_frame();
        host.run_idle();

        assert_eq!(hits.get(), 1, "initial call is still delivered");
        assert_eq!(store.get_snapshot().unwrap(), before);
        assert_eq!(host.pending_timers(), 0, "no stability timer armed");

        *host.visual_error.borrow_mut() = None;
        host.emit(ViewportEvent::Resize);
        host.flush_frame();
        assert_eq!(hits.get(), 2, "store recovers on the next event");
        assert!(!store.get_snapshot().unwrap().is_stable);
    }

    #[test]
    fn no_notifications_after_last_unsubscribe() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (hits, sub) = counting(&store);
        host.flush_frame();
        sub.unsubscribe();

        host.layout.set(Size::new(400.0, 500.0));
        host.emit(ViewportEvent::Resize);
        host.flush_frame();
        assert_eq!(hits.get(), 1);

        let (again, _sub) = counting(&store);
        host.flush_frame();
        assert_eq!(again.get(), 1);
        assert_eq!(store.get_snapshot().unwrap().layout_height, 500.0);
    }

    #[test]
    fn unsubscribe_before_frame_skips_initial_call() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (_keep, _a) = counting(&store);
        host.flush_frame();

        let (hits, b) = counting(&store);
        b.unsubscribe();
        host.flush_frame();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn destroy_releases_everything_and_is_idempotent() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let (hits, _sub) = counting(&store);
        host.flush_frame();
        host.run_idle();
        assert_eq!(host.pending_timers(), 1);

        store.destroy();
        store.destroy();
        assert!(store.is_destroyed());
        assert_eq!(host.listener_count(), 0);
        assert_eq!(host.pending_timers(), 0);
        assert_eq!(store.subscriber_count(), 0);

        let (late, sub) = counting(&store);
        assert!(!sub.is_active());
        host.flush_frame();
        host.run_timers();
        assert_eq!(late.get(), 0);
        assert_eq!(hits.get(), 1);
        assert!(store.get_snapshot().is_ok());
    }

    #[test]
    fn destroy_from_inside_listener_stops_delivery() {
        let host = host_with_vv();
        let store = Rc::new(ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap());
        let s = Rc::downgrade(&store);
        let _a = store.subscribe(move || {
            if let Some(s) = s.upgrade() {
                s.destroy();
            }
        });
        let (hits, _b) = counting(&store);
        host.flush_frame();
        assert!(store.is_destroyed());
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn dropping_store_removes_platform_listeners() {
        let host = host_with_vv();
        let store = ViewportStore::new(Rc::clone(&host), StoreConfig::default()).unwrap();
        let sub = store.subscribe(|| {});
        assert_eq!(host.listener_count(), 5);
        drop(store);
        assert_eq!(host.listener_count(), 0);
        sub.unsubscribe();
    }
}
