// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Store configuration.

use kurbo::Insets;

use crate::time::Duration;

/// Configuration for a [`ViewportStore`](crate::store::ViewportStore).
///
/// Resolved once at store creation; a store never re-reads it. To change
/// configuration, create a new store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StoreConfig {
    /// Quiet period after the last geometry change before the snapshot is
    /// reported stable.
    pub stability_delay: Duration,
    /// The keyboard is considered open when the effective height drops below
    /// `layout_height * keyboard_ratio`.
    pub keyboard_ratio: f64,
    /// Minimum absolute height loss in CSS px required, together with the
    /// ratio, to report an open keyboard.
    pub keyboard_min_delta_px: f64,
    /// Measurement floor in CSS px; clamps transient zeros and non-finite
    /// host values.
    pub min_viewport_px: f64,
    /// Prefer visual-viewport geometry even when the page is zoomed.
    pub trust_visual_viewport_under_zoom: bool,
    /// Safe-area insets supplied by the application (for example from
    /// `env(safe-area-inset-*)`), in CSS px. `x0` is left, `y0` top, `x1`
    /// right and `y1` bottom.
    pub safe_area_insets: Insets,
}

impl StoreConfig {
    /// Default stability debounce window.
    pub const DEFAULT_STABILITY_DELAY: Duration = Duration::from_millis(150);
    /// Default keyboard ratio.
    pub const DEFAULT_KEYBOARD_RATIO: f64 = 0.75;
    /// Default keyboard minimum delta.
    pub const DEFAULT_KEYBOARD_MIN_DELTA_PX: f64 = 120.0;
    /// Default measurement floor.
    pub const DEFAULT_MIN_VIEWPORT_PX: f64 = 1.0;

    /// The documented defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stability_delay: Self::DEFAULT_STABILITY_DELAY,
            keyboard_ratio: Self::DEFAULT_KEYBOARD_RATIO,
            keyboard_min_delta_px: Self::DEFAULT_KEYBOARD_MIN_DELTA_PX,
            min_viewport_px: Self::DEFAULT_MIN_VIEWPORT_PX,
            trust_visual_viewport_under_zoom: true,
            safe_area_insets: Insets::ZERO,
        }
    }

    /// Sets [`stability_delay`](Self::stability_delay).
    #[must_use]
    pub const fn with_stability_delay(mut self, delay: Duration) -> Self {
        self.stability_delay = delay;
        self
    }

    /// Sets [`keyboard_ratio`](Self::keyboard_ratio).
    #[must_use]
    pub const fn with_keyboard_ratio(mut self, ratio: f64) -> Self {
        self.keyboard_ratio = ratio;
        self
    }

    /// Sets [`keyboard_min_delta_px`](Self::keyboard_min_delta_px).
    #[must_use]
    pub const fn with_keyboard_min_delta_px(mut self, px: f64) -> Self {
        self.keyboard_min_delta_px = px;
        self
    }

    /// Sets [`min_viewport_px`](Self::min_viewport_px).
    #[must_use]
    pub const fn with_min_viewport_px(mut self, px: f64) -> Self {
        self.min_viewport_px = px;
        self
    }

    /// Sets [`trust_visual_viewport_under_zoom`](Self::trust_visual_viewport_under_zoom).
    #[must_use]
    pub const fn with_trust_visual_viewport_under_zoom(mut self, trust: bool) -> Self {
        self.trust_visual_viewport_under_zoom = trust;
        self
    }

    /// Sets [`safe_area_insets`](Self::safe_area_insets).
    #[must_use]
    pub const fn with_safe_area_insets(mut self, insets: Insets) -> Self {
        self.safe_area_insets = insets;
        self
    }

    /// Returns a copy with unusable values replaced.
    ///
    /// Non-finite or negative numbers fall back to their defaults. Zero is a
    /// valid value everywhere: a floor of 0 disables clamping to a positive
    /// minimum and a ratio of 0 disables keyboard detection. Insets that are
    /// negative or non-finite become 0.
    #[must_use]
    pub fn resolved(self) -> Self {
        fn non_negative_or(v: f64, default: f64) -> f64 {
            if v.is_finite() && v >= 0.0 { v } else { default }
        }
        fn inset(v: f64) -> f64 {
            if v.is_finite() && v > 0.0 { v } else { 0.0 }
        }

        let i = self.safe_area_insets;
        Self {
            stability_delay: self.stability_delay,
            keyboard_ratio: non_negative_or(self.keyboard_ratio, Self::DEFAULT_KEYBOARD_RATIO),
            keyboard_min_delta_px: non_negative_or(
                self.keyboard_min_delta_px,
                Self::DEFAULT_KEYBOARD_MIN_DELTA_PX,
            ),
            min_viewport_px: non_negative_or(self.min_viewport_px, Self::DEFAULT_MIN_VIEWPORT_PX),
            trust_visual_viewport_under_zoom: self.trust_visual_viewport_under_zoom,
            safe_area_insets: Insets::new(inset(i.x0), inset(i.y0), inset(i.x1), inset(i.y1)),
        }
    }

    /// Bottom safe-area inset.
    #[must_use]
    pub const fn safe_bottom(&self) -> f64 {
        self.safe_area_insets.y1
    }

    /// Combined left and right safe-area insets.
    #[must_use]
    pub fn safe_horizontal(&self) -> f64 {
        self.safe_area_insets.x0 + self.safe_area_insets.x1
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documentation() {
        let c = StoreConfig::default();
        assert_eq!(c.stability_delay, Duration::from_millis(150));
        assert_eq!(c.keyboard_ratio, 0.75);
        assert_eq!(c.keyboard_min_delta_px, 120.0);
        assert_eq!(c.min_viewport_px, 1.0);
        assert!(c.trust_visual_viewport_under_zoom);
        assert_eq!(c.safe_area_insets, Insets::ZERO);
    }

    #[test]
    fn resolved_replaces_unusable_values() {
        let c = StoreConfig::new()
            .with_keyboard_ratio(f64::NAN)
            .with_keyboard_min_delta_px(-5.0)
            .with_min_viewport_px(f64::NEG_INFINITY)
            .with_safe_area_insets(Insets::new(-1.0, f64::INFINITY, 10.0, 34.0))
            .resolved();

        assert_eq!(c.keyboard_ratio, StoreConfig::DEFAULT_KEYBOARD_RATIO);
        assert_eq!(c.keyboard_min_delta_px, StoreConfig::DEFAULT_KEYBOARD_MIN_DELTA_PX);
        assert_eq!(c.min_viewport_px, StoreConfig::DEFAULT_MIN_VIEWPORT_PX);
        assert_eq!(c.safe_area_insets, Insets::new(0.0, 0.0, 10.0, 34.0));
        assert_eq!(c.safe_bottom(), 34.0);
        assert_eq!(c.safe_horizontal(), 10.0);
    }

    #[test]
    fn resolved_keeps_valid_values() {
        let c = StoreConfig::new()
            .with_stability_delay(Duration::from_millis(50))
            .with_keyboard_ratio(0.6)
            .with_trust_visual_viewport_under_zoom(false);
        assert_eq!(c.resolved(), c);
    }

    #[test]
    fn resolved_keeps_zero() {
        let c = StoreConfig::new()
            .with_stability_delay(Duration::ZERO)
            .with_keyboard_ratio(0.0)
            .with_keyboard_min_delta_px(0.0)
            .with_min_viewport_px(0.0);
        let r = c.resolved();
        assert_eq!(r.keyboard_ratio, 0.0);
        assert_eq!(r.keyboard_min_delta_px, 0.0);
        assert_eq!(r.min_viewport_px, 0.0);
        assert_eq!(r, c);
    }
}
