// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport snapshots and how they are computed from raw host geometry.
//!
//! [`compute`] is a pure function of the configuration, the raw readings and
//! a timestamp. [`measure`] reads the readings from a [`Host`] first.
//!
//! # Algorithm
//!
//! 1. Clamp the layout viewport to the configured floor (non-finite values
//!    become the floor).
//! 2. If a visual viewport exists, read its size, scale and offsets.
//!    Non-numeric sizes fall back to the layout size, a non-numeric scale to
//!    `1`, non-numeric offsets to `0`. Sizes are clamped to the floor again
//!    and the scale to [`MIN_SCALE`].
//! 3. Safe-area compensation: if the layout/visual height gap falls strictly
//!    between 0.8× and 2.5× the bottom inset, the gap is attributed to the
//!    inset and the inset is added back. Same for the width against
//!    left + right.
//! 4. Use the visual size as the effective size when a visual viewport exists
//!    and either the configuration trusts it under zoom or the scale is
//!    exactly 1. Otherwise use the layout size.
//! 5. Report an open keyboard only with a visual viewport, when the effective
//!    height is below `layout_height * keyboard_ratio` *and* the height loss
//!    exceeds `keyboard_min_delta_px`.
//! 6. Round every number to two decimals.

use kurbo::{Size, Vec2};

use crate::config::StoreConfig;
use crate::error::HostSignalError;
use crate::host::{Host, VisualViewportReading};
use crate::time::HostTime;

/// Lower bound for the reported zoom factor.
pub const MIN_SCALE: f64 = 0.01;

/// Lower bound of the gap/inset ratio attributed to safe-area chrome.
const SAFE_AREA_LOW: f64 = 0.8;
/// Upper bound of the gap/inset ratio attributed to safe-area chrome.
const SAFE_AREA_HIGH: f64 = 2.5;

/// One measurement of the visible viewport.
///
/// Snapshots are immutable values; the store replaces its snapshot wholesale
/// on every change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    /// Effective visible width in CSS px.
    pub width: f64,
    /// Effective visible height in CSS px.
    pub height: f64,
    /// Layout viewport width (`innerWidth`) in CSS px.
    pub layout_width: f64,
    /// Layout viewport height (`innerHeight`) in CSS px.
    pub layout_height: f64,
    /// Horizontal pan of the visual viewport within the layout viewport.
    pub offset_left: f64,
    /// Vertical pan of the visual viewport within the layout viewport.
    pub offset_top: f64,
    /// Zoom factor; `1` when unknown.
    pub scale: f64,
    /// Heuristic on-screen keyboard flag.
    pub is_keyboard_open: bool,
    /// No geometry change for at least the stability delay.
    pub is_stable: bool,
    /// Whether the host exposed a visual viewport for this measurement.
    pub has_visual_viewport: bool,
    /// When the snapshot was computed.
    pub ts: HostTime,
}

impl Snapshot {
    /// Equality for notification purposes: every field except [`ts`](Self::ts).
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.layout_width == other.layout_width
            && self.layout_height == other.layout_height
            && self.offset_left == other.offset_left
            && self.offset_top == other.offset_top
            && self.scale == other.scale
            && self.is_keyboard_open == other.is_keyboard_open
            && self.is_stable == other.is_stable
            && self.has_visual_viewport == other.has_visual_viewport
    }

    /// Effective visible size.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Layout viewport size.
    #[must_use]
    pub fn layout_size(&self) -> Size {
        Size::new(self.layout_width, self.layout_height)
    }

    /// Visual viewport pan offset.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.offset_left, self.offset_top)
    }

    /// Returns a copy with the given stability flag and timestamp.
    #[must_use]
    pub const fn with_stability(mut self, is_stable: bool, ts: HostTime) -> Self {
        self.is_stable = is_stable;
        self.ts = ts;
        self
    }
}

/// Clamps `n` to at least `min`; non-finite values become `min`.
#[must_use]
pub fn clamp_min(n: f64, min: f64) -> f64 {
    if n.is_finite() { n.max(min) } else { min }
}

/// Rounds to two decimals, halves towards positive infinity.
#[must_use]
pub fn round2(n: f64) -> f64 {
    if !n.is_finite() {
        return n;
    }
    libm::floor(n * 100.0 + 0.5) / 100.0
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite())
}

/// Adds `inset` back to `visual` when the observed gap looks like safe-area
/// chrome rather than a keyboard.
fn compensate(layout: f64, visual: f64, inset: f64) -> f64 {
    if inset <= 0.0 {
        return visual;
    }
    let gap = layout - visual;
    if gap > inset * SAFE_AREA_LOW && gap < inset * SAFE_AREA_HIGH {
        visual + inset
    } else {
        visual
    }
}

/// Computes a snapshot from raw readings.
///
/// The result is never stable; the store decides stability.
#[must_use]
pub fn compute(
    config: &StoreConfig,
    layout: Size,
    visual: Option<VisualViewportReading>,
    ts: HostTime,
) -> Snapshot {
    let floor = config.min_viewport_px;
    let layout_width = clamp_min(layout.width, floor);
    let layout_height = clamp_min(layout.height, floor);

    let has_visual_viewport = visual.is_some();
    let vv = visual.unwrap_or_default();

    let scale = if has_visual_viewport {
        vv.scale.map_or(1.0, |s| clamp_min(s, MIN_SCALE))
    } else {
        1.0
    };
    let visual_width = clamp_min(vv.width.unwrap_or(layout_width), floor);
    let visual_height = clamp_min(vv.height.unwrap_or(layout_height), floor);
    let offset_left = finite(vv.offset_left).unwrap_or(0.0);
    let offset_top = finite(vv.offset_top).unwrap_or(0.0);

    let height = compensate(layout_height, visual_height, config.safe_bottom());
    let width = compensate(layout_width, visual_width, config.safe_horizontal());

    let use_visual =
        has_visual_viewport && (config.trust_visual_viewport_under_zoom || scale == 1.0);
    let (effective_width, effective_height) = if use_visual {
        (width, height)
    } else {
        (layout_width, layout_height)
    };

    let is_keyboard_open = has_visual_viewport
        && effective_height < layout_height * config.keyboard_ratio
        && layout_height - effective_height > config.keyboard_min_delta_px;

    Snapshot {
        width: round2(effective_width),
        height: round2(effective_height),
        layout_width: round2(layout_width),
        layout_height: round2(layout_height),
        offset_left: round2(offset_left),
        offset_top: round2(offset_top),
        scale: round2(scale),
        is_keyboard_open,
        is_stable: false,
        has_visual_viewport,
        ts,
    }
}

/// Reads raw geometry from `host` and computes a snapshot.
///
/// The layout viewport is read before the visual viewport. Read failures are
/// returned unchanged.
pub fn measure<H: Host + ?Sized>(
    host: &H,
    config: &StoreConfig,
    ts: HostTime,
) -> Result<Snapshot, HostSignalError> {
    let layout = host.layout_viewport()?;
    let visual = host.visual_viewport()?;
    Ok(compute(config, layout, visual, ts))
}
