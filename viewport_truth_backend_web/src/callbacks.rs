// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ownership of JS closures handed to the browser.
//!
//! A closure must outlive every JS reference to it, and must not be dropped
//! while it runs. Pending closures live in `pending`. When one fires or is
//! cancelled it moves to the graveyard. The graveyard is swept whenever no
//! registered closure is running: on registration from outside a callback,
//! and when the outermost callback returns (sparing the closure that is
//! returning).

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;

pub(crate) type JsCallback = Closure<dyn FnMut(JsValue)>;

struct Entry {
    /// The id the browser returned, for cancellation.
    js_id: u32,
    closure: JsCallback,
}

#[derive(Default)]
pub(crate) struct Callbacks {
    next_key: Cell<u32>,
    /// How many registered closures are on the stack.
    depth: Cell<u32>,
    pending: RefCell<BTreeMap<u32, Entry>>,
    graveyard: RefCell<Vec<(u32, JsCallback)>>,
}

impl core::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Callbacks")
            .field("pending", &self.pending.borrow().len())
            .field("graveyard", &self.graveyard.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Callbacks {
    /// Wraps `task` in a one-shot closure and hands it to `arm`, which
    /// returns the browser's id for it. Returns the local key.
    pub(crate) fn register(
        this: &Rc<Self>,
        arm: impl FnOnce(&JsValue) -> u32,
        task: impl FnOnce(JsValue) + 'static,
    ) -> u32 {
        if this.depth.get() == 0 {
            this.graveyard.borrow_mut().clear();
        }

        let key = this.next_key.get();
        this.next_key.set(key.wrapping_add(1));

        let registry: Weak<Self> = Rc::downgrade(this);
        let mut task = Some(task);
        let closure = Closure::wrap(Box::new(move |arg: JsValue| {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            registry.depth.set(registry.depth.get() + 1);
            registry.retire(key);
            if let Some(task) = task.take() {
                task(arg);
            }
            registry.depth.set(registry.depth.get() - 1);
            if registry.depth.get() == 0 {
                registry.graveyard.borrow_mut().retain(|(k, _)| *k == key);
            }
        }) as Box<dyn FnMut(JsValue)>);

        let js_id = arm(closure.as_ref());
        this.pending
            .borrow_mut()
            .insert(key, Entry { js_id, closure });
        key
    }

    /// Removes a pending closure and passes its browser id to `cancel`.
    pub(crate) fn cancel(&self, key: u32, cancel: impl FnOnce(u32)) {
        let entry = self.pending.borrow_mut().remove(&key);
        if let Some(entry) = entry {
            cancel(entry.js_id);
            self.graveyard.borrow_mut().push((key, entry.closure));
        }
    }

    fn retire(&self, key: u32) {
        let entry = self.pending.borrow_mut().remove(&key);
        if let Some(entry) = entry {
            self.graveyard.borrow_mut().push((key, entry.closure));
        }
    }

    /// Number of closures the browser may still call.
    pub(crate) fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}
