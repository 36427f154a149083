// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw browser bindings and property readers.

use alloc::string::String;

use js_sys::{Function, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use viewport_truth_core::error::{HostSignalError, Signal};
use viewport_truth_core::host::IdleDeadline;
use viewport_truth_core::time::Duration;

// Direct global bindings instead of `web_sys::Window` methods. Optional
// primitives are probed with `Reflect` before any of these is called.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    pub(crate) fn request_animation_frame(callback: &JsValue) -> u32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    pub(crate) fn cancel_animation_frame(id: u32);

    #[wasm_bindgen(js_name = "requestIdleCallback")]
    pub(crate) fn request_idle_callback(callback: &JsValue, options: &JsValue) -> u32;

    #[wasm_bindgen(js_name = "cancelIdleCallback")]
    pub(crate) fn cancel_idle_callback(id: u32);

    #[wasm_bindgen(js_name = "setTimeout")]
    pub(crate) fn set_timeout(callback: &JsValue, ms: f64) -> u32;

    #[wasm_bindgen(js_name = "clearTimeout")]
    pub(crate) fn clear_timeout(id: u32);

    #[wasm_bindgen(js_name = "queueMicrotask")]
    pub(crate) fn queue_microtask(callback: &JsValue);
}

/// Returns `true` if `obj[key]` is neither `undefined` nor `null`.
pub(crate) fn has(obj: &JsValue, key: &str) -> bool {
    Reflect::get(obj, &JsValue::from_str(key)).is_ok_and(|v| !v.is_undefined() && !v.is_null())
}

/// Returns `true` if `obj[key]` is callable.
pub(crate) fn has_function(obj: &JsValue, key: &str) -> bool {
    Reflect::get(obj, &JsValue::from_str(key)).is_ok_and(|v| v.is_function())
}

/// Reads `obj[key]` as a number. A non-numeric value is `None`; a throwing
/// getter is an error.
pub(crate) fn number(obj: &JsValue, key: &str) -> Result<Option<f64>, JsValue> {
    let v = Reflect::get(obj, &JsValue::from_str(key))?;
    Ok(v.as_f64())
}

/// Converts a thrown JS value into a [`HostSignalError`].
pub(crate) fn signal_error(signal: Signal, thrown: &JsValue) -> HostSignalError {
    let message = thrown
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| thrown.as_string())
        .unwrap_or_else(|| String::from("host accessor threw"));
    HostSignalError::new(signal, message)
}

fn call_method(obj: &JsValue, key: &str, arg: &JsValue) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(obj, &JsValue::from_str(key))?.dyn_into()?;
    method.call1(obj, arg)
}

/// `Promise.resolve().then(callback).catch(on_error)`.
pub(crate) fn promise_then(callback: &JsValue, on_error: &JsValue) -> Result<(), JsValue> {
    let resolved: JsValue = js_sys::Promise::resolve(&JsValue::UNDEFINED).into();
    let chained = call_method(&resolved, "then", callback)?;
    call_method(&chained, "catch", on_error)?;
    Ok(())
}

/// Builds the `{ timeout }` options bag for `requestIdleCallback`.
pub(crate) fn idle_options(timeout: Duration) -> JsValue {
    let opts = js_sys::Object::new();
    _ = Reflect::set(
        &opts,
        &JsValue::from_str("timeout"),
        &JsValue::from_f64(timeout.as_millis_f64()),
    );
    opts.into()
}

/// Reads an `IdleDeadline` object.
pub(crate) fn idle_deadline(arg: &JsValue) -> IdleDeadline {
    let did_timeout = Reflect::get(arg, &JsValue::from_str("didTimeout"))
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let remaining = Reflect::get(arg, &JsValue::from_str("timeRemaining"))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
        .and_then(|f| f.call0(arg).ok())
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    IdleDeadline {
        did_timeout,
        time_remaining: Duration::from_millis_f64(remaining),
    }
}
