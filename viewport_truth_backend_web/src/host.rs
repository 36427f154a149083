// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Host`] implementation over browser globals.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Size;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{AddEventListenerOptions, EventTarget};

use viewport_truth_core::error::{HostSignalError, Signal};
use viewport_truth_core::host::{
    CallbackId, EventHandler, FrameTask, Globals, Host, IdleTask, ListenerId, Task, ViewportEvent,
    VisualViewportReading,
};
use viewport_truth_core::time::{Duration, HostTime};

use crate::callbacks::{Callbacks, JsCallback};
use crate::js;

/// Which optional browser primitives were found at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WebCapabilities {
    /// `performance.now`.
    pub performance: bool,
    /// `requestAnimationFrame` and `cancelAnimationFrame`.
    pub animation_frame: bool,
    /// `requestIdleCallback` and `cancelIdleCallback`.
    pub idle_callback: bool,
    /// `queueMicrotask`.
    pub microtask: bool,
}

struct Listener {
    target: EventTarget,
    event: ViewportEvent,
    closure: JsCallback,
}

/// The browser as a [`Host`].
///
/// Capabilities and globals are probed once, in [`new`](Self::new). Works in
/// any JS realm: in a worker or another windowless realm [`Host::globals`]
/// reports the missing globals and stores built on it are off-host.
pub struct WebHost {
    global: JsValue,
    globals: Globals,
    caps: WebCapabilities,
    callbacks: Rc<Callbacks>,
    listeners: RefCell<BTreeMap<u32, Listener>>,
    next_listener: Cell<u32>,
    /// `catch` handler for the promise microtask fallback.
    swallow: JsCallback,
}

impl fmt::Debug for WebHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebHost")
            .field("globals", &self.globals)
            .field("caps", &self.caps)
            .field("callbacks", &self.callbacks)
            .field("listeners", &self.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for WebHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WebHost {
    /// Probes the current JS realm.
    #[must_use]
    pub fn new() -> Self {
        let global: JsValue = js_sys::global().into();
        let globals = Globals {
            window: js::has(&global, "window"),
            document: js::has(&global, "document"),
            navigator: js::has(&global, "navigator"),
        };
        let caps = WebCapabilities {
            performance: js::has(&global, "performance"),
            animation_frame: js::has_function(&global, "requestAnimationFrame")
                && js::has_function(&global, "cancelAnimationFrame"),
            idle_callback: js::has_function(&global, "requestIdleCallback")
                && js::has_function(&global, "cancelIdleCallback"),
            microtask: js::has_function(&global, "queueMicrotask"),
        };
        debug!(?globals, ?caps, "probed web host");
        Self {
            global,
            globals,
            caps,
            callbacks: Rc::new(Callbacks::default()),
            listeners: RefCell::new(BTreeMap::new()),
            next_listener: Cell::new(0),
            swallow: Closure::wrap(Box::new(|_: JsValue| {}) as Box<dyn FnMut(JsValue)>),
        }
    }

    /// The capabilities found at construction.
    #[must_use]
    pub fn capabilities(&self) -> WebCapabilities {
        self.caps
    }

    /// Number of browser callbacks still pending.
    #[must_use]
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.pending()
    }

    /// Number of attached event listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn target(&self, event: ViewportEvent) -> Option<EventTarget> {
        let window = web_sys::window()?;
        if event.is_visual() {
            window.visual_viewport().map(Into::into)
        } else {
            Some(window.into())
        }
    }
}

impl Host for WebHost {
    fn globals(&self) -> Globals {
        self.globals
    }

    fn high_res_now(&self) -> Option<f64> {
        self.caps.performance.then(js::performance_now)
    }

    fn wall_clock_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> CallbackId {
        let ms = delay.as_millis_f64();
        CallbackId(Callbacks::register(
            &self.callbacks,
            |cb| js::set_timeout(cb, ms),
            move |_| task(),
        ))
    }

    fn clear_timeout(&self, id: CallbackId) {
        self.callbacks.cancel(id.0, js::clear_timeout);
    }

    fn request_animation_frame(&self, task: FrameTask) -> Result<CallbackId, FrameTask> {
        if !self.caps.animation_frame {
            return Err(task);
        }
        Ok(CallbackId(Callbacks::register(
            &self.callbacks,
            js::request_animation_frame,
            move |ts| task(HostTime::from_millis_f64(ts.as_f64().unwrap_or(0.0))),
        )))
    }

    fn cancel_animation_frame(&self, id: CallbackId) {
        self.callbacks.cancel(id.0, js::cancel_animation_frame);
    }

    fn request_idle_callback(
        &self,
        task: IdleTask,
        timeout: Duration,
    ) -> Result<CallbackId, IdleTask> {
        if !self.caps.idle_callback {
            return Err(task);
        }
        let options = js::idle_options(timeout);
        Ok(CallbackId(Callbacks::register(
            &self.callbacks,
            |cb| js::request_idle_callback(cb, &options),
            move |deadline| task(js::idle_deadline(&deadline)),
        )))
    }

    fn cancel_idle_callback(&self, id: CallbackId) {
        self.callbacks.cancel(id.0, js::cancel_idle_callback);
    }

    fn queue_microtask(&self, task: Task) -> Result<(), Task> {
        if !self.caps.microtask {
            return Err(task);
        }
        Callbacks::register(
            &self.callbacks,
            |cb| {
                js::queue_microtask(cb);
                0
            },
            move |_| task(),
        );
        Ok(())
    }

    fn resolved_promise_then(&self, task: Task) {
        let on_error: &JsValue = self.swallow.as_ref();
        Callbacks::register(
            &self.callbacks,
            |cb| {
                if let Err(e) = js::promise_then(cb, on_error) {
                    warn!(error = ?e, "promise microtask fallback failed");
                }
                0
            },
            move |_| task(),
        );
    }

    fn layout_viewport(&self) -> Result<Size, HostSignalError> {
        let read = |key: &str| {
            js::number(&self.global, key).map_err(|e| js::signal_error(Signal::LayoutViewport, &e))
        };
        let width = read("innerWidth")?.unwrap_or(f64::NAN);
        let height = read("innerHeight")?.unwrap_or(f64::NAN);
        Ok(Size::new(width, height))
    }

    fn visual_viewport(&self) -> Result<Option<VisualViewportReading>, HostSignalError> {
        let err = |e: JsValue| js::signal_error(Signal::VisualViewport, &e);
        let vv = js_sys::Reflect::get(&self.global, &JsValue::from_str("visualViewport"))
            .map_err(err)?;
        if vv.is_undefined() || vv.is_null() {
            return Ok(None);
        }
        Ok(Some(VisualViewportReading {
            width: js::number(&vv, "width").map_err(err)?,
            height: js::number(&vv, "height").map_err(err)?,
            scale: js::number(&vv, "scale").map_err(err)?,
            offset_left: js::number(&vv, "offsetLeft").map_err(err)?,
            offset_top: js::number(&vv, "offsetTop").map_err(err)?,
        }))
    }

    fn add_event_listener(
        &self,
        event: ViewportEvent,
        handler: EventHandler,
    ) -> Option<ListenerId> {
        let target = self.target(event)?;
        let closure: JsCallback =
            Closure::wrap(Box::new(move |_: JsValue| handler()) as Box<dyn FnMut(JsValue)>);
        let options = AddEventListenerOptions::new();
        options.set_passive(true);
        if let Err(e) = target.add_event_listener_with_callback_and_add_event_listener_options(
            event.dom_type(),
            closure.as_ref().unchecked_ref(),
            &options,
        ) {
            warn!(event = event.dom_type(), error = ?e, "addEventListener failed");
            return None;
        }
        let id = self.next_listener.get();
        self.next_listener.set(id.wrapping_add(1));
        self.listeners.borrow_mut().insert(
            id,
            Listener {
                target,
                event,
                closure,
            },
        );
        Some(ListenerId(id))
    }

    fn remove_event_listener(&self, id: ListenerId) {
        let listener = self.listeners.borrow_mut().remove(&id.0);
        if let Some(l) = listener {
            _ = l.target.remove_event_listener_with_callback(
                l.event.dom_type(),
                l.closure.as_ref().unchecked_ref(),
            );
        }
    }
}
