// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for platform integrations.
//!
//! The engine never touches platform globals directly. Everything it needs
//! from the environment goes through the [`Host`] trait:
//!
//! - **Probe**: which DOM-like globals exist ([`Host::globals`]).
//! - **Clocks**: an optional high-resolution clock and a mandatory wall clock.
//! - **Scheduling**: mandatory timers plus optional frame, idle and
//!   microtask primitives. Optional primitives have default bodies that hand
//!   the callback back (`Err(task)`), which tells the [`shim`](crate::shim)
//!   to substitute its fallback.
//! - **Geometry**: layout and visual viewport reads, which may fail with a
//!   [`HostSignalError`].
//! - **Events**: registration of the viewport-related platform events.
//!
//! Backend crates implement this trait for real hosts (for example
//! `viewport_truth_backend_web::WebHost`); `viewport_truth_sim::SimHost` is
//! a deterministic implementation for tests.

use alloc::boxed::Box;
use alloc::rc::Rc;

use kurbo::Size;

use crate::error::HostSignalError;
use crate::time::{Duration, HostTime};

/// A one-shot callback run by a timer, microtask or promise continuation.
pub type Task = Box<dyn FnOnce()>;

/// A one-shot callback run on an animation frame with the frame timestamp.
pub type FrameTask = Box<dyn FnOnce(HostTime)>;

/// A one-shot callback run when the host is idle.
pub type IdleTask = Box<dyn FnOnce(IdleDeadline)>;

/// A repeatable handler for platform events.
pub type EventHandler = Rc<dyn Fn()>;

/// Opaque identifier returned by a host scheduling primitive.
///
/// Identifiers are only meaningful for the primitive that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(pub u32);

/// Opaque identifier for a registered event listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u32);

/// Information passed to an idle callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdleDeadline {
    /// Whether the callback ran because its timeout budget elapsed rather
    /// than because the host was idle.
    pub did_timeout: bool,
    /// Estimated idle time left in the current idle period.
    pub time_remaining: Duration,
}

impl IdleDeadline {
    /// The deadline reported when no real idle period is available.
    pub const EXCEEDED: Self = Self {
        did_timeout: true,
        time_remaining: Duration::ZERO,
    };
}

/// Which DOM-like globals the host exposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Globals {
    /// A `window`-equivalent is present.
    pub window: bool,
    /// A `document`-equivalent is present.
    pub document: bool,
    /// A `navigator`-equivalent is present.
    pub navigator: bool,
}

impl Globals {
    /// All globals present.
    pub const ALL: Self = Self {
        window: true,
        document: true,
        navigator: true,
    };

    /// No globals present (server, worker, native test runner).
    pub const NONE: Self = Self {
        window: false,
        document: false,
        navigator: false,
    };
}

/// Platform events that can change viewport geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewportEvent {
    /// `resize` on the window.
    Resize,
    /// `orientationchange` on the window.
    OrientationChange,
    /// `pageshow` on the window (restores from the back/forward cache).
    PageShow,
    /// `resize` on the visual viewport.
    VisualResize,
    /// `scroll` on the visual viewport.
    VisualScroll,
}

impl ViewportEvent {
    /// Window-level events, always subscribed while attached.
    pub const WINDOW: [Self; 3] = [Self::OrientationChange, Self::Resize, Self::PageShow];

    /// Visual-viewport events, subscribed only when a visual viewport exists.
    pub const VISUAL: [Self; 2] = [Self::VisualResize, Self::VisualScroll];

    /// Returns `true` if this event targets the visual viewport.
    #[must_use]
    pub const fn is_visual(self) -> bool {
        matches!(self, Self::VisualResize | Self::VisualScroll)
    }

    /// The DOM event type name.
    #[must_use]
    pub const fn dom_type(self) -> &'static str {
        match self {
            Self::Resize | Self::VisualResize => "resize",
            Self::OrientationChange => "orientationchange",
            Self::PageShow => "pageshow",
            Self::VisualScroll => "scroll",
        }
    }
}

/// A raw visual-viewport reading.
///
/// Each field is `None` when the host reported a non-numeric value for it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VisualViewportReading {
    /// `visualViewport.width`.
    pub width: Option<f64>,
    /// `visualViewport.height`.
    pub height: Option<f64>,
    /// `visualViewport.scale`.
    pub scale: Option<f64>,
    /// `visualViewport.offsetLeft`.
    pub offset_left: Option<f64>,
    /// `visualViewport.offsetTop`.
    pub offset_top: Option<f64>,
}

impl VisualViewportReading {
    /// A reading with every field numeric and zero offsets.
    #[must_use]
    pub const fn new(width: f64, height: f64, scale: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            scale: Some(scale),
            offset_left: Some(0.0),
            offset_top: Some(0.0),
        }
    }

    /// Returns the reading with the given pan offsets.
    #[must_use]
    pub const fn with_offset(mut self, left: f64, top: f64) -> Self {
        self.offset_left = Some(left);
        self.offset_top = Some(top);
        self
    }
}

/// The environment the store measures and schedules against.
///
/// All methods take `&self`; implementations use interior mutability. The
/// model is single-threaded and cooperative: callbacks handed to the host run
/// later on its event loop, never synchronously inside the call that
/// registered them.
pub trait Host {
    /// Reports which DOM-like globals exist.
    fn globals(&self) -> Globals;

    /// High-resolution monotonic time in milliseconds (`performance.now()`),
    /// if available.
    fn high_res_now(&self) -> Option<f64> {
        None
    }

    /// Wall-clock time in milliseconds (`Date.now()`).
    fn wall_clock_ms(&self) -> f64;

    /// Runs `task` once after `delay`.
    fn set_timeout(&self, delay: Duration, task: Task) -> CallbackId;

    /// Cancels a timer. Unknown or already-fired ids are ignored.
    fn clear_timeout(&self, id: CallbackId);

    /// Requests an animation frame, or returns the task if unsupported.
    fn request_animation_frame(&self, task: FrameTask) -> Result<CallbackId, FrameTask> {
        Err(task)
    }

    /// Cancels an animation frame request.
    fn cancel_animation_frame(&self, id: CallbackId) {
        _ = id;
    }

    /// Requests an idle callback that runs no later than `timeout`, or
    /// returns the task if unsupported.
    fn request_idle_callback(&self, task: IdleTask, timeout: Duration) -> Result<CallbackId, IdleTask> {
        _ = timeout;
        Err(task)
    }

    /// Cancels an idle callback request.
    fn cancel_idle_callback(&self, id: CallbackId) {
        _ = id;
    }

    /// Queues a microtask, or returns the task if unsupported.
    fn queue_microtask(&self, task: Task) -> Result<(), Task> {
        Err(task)
    }

    /// Runs `task` as a continuation of an already-resolved promise.
    ///
    /// Failures inside the continuation must be swallowed by the host.
    fn resolved_promise_then(&self, task: Task);

    /// Reads the layout viewport size (`innerWidth` / `innerHeight`).
    fn layout_viewport(&self) -> Result<Size, HostSignalError>;

    /// Reads the visual viewport, or `Ok(None)` if the host has none.
    fn visual_viewport(&self) -> Result<Option<VisualViewportReading>, HostSignalError>;

    /// Registers `handler` for `event`.
    ///
    /// Returns `None` if the event target does not exist (for example a
    /// visual-viewport event on a host without a visual viewport).
    fn add_event_listener(&self, event: ViewportEvent, handler: EventHandler) -> Option<ListenerId>;

    /// Unregisters a listener. Unknown ids are ignored.
    fn remove_event_listener(&self, id: ListenerId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_targets_partition() {
        assert!(ViewportEvent::VISUAL.iter().all(|e| e.is_visual()));
        assert!(ViewportEvent::WINDOW.iter().all(|e| !e.is_visual()));
        assert_eq!(ViewportEvent::VisualScroll.dom_type(), "scroll");
        assert_eq!(ViewportEvent::OrientationChange.dom_type(), "orientationchange");
    }

    #[test]
    fn reading_builder_sets_offsets() {
        let r = VisualViewportReading::new(400.0, 700.0, 1.0).with_offset(3.0, 4.0);
        assert_eq!(r.offset_left, Some(3.0));
        assert_eq!(r.offset_top, Some(4.0));
        assert_eq!(VisualViewportReading::default().width, None);
    }
}
