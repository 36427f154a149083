// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic simulated host for viewport-truth stores.
//!
//! [`SimHost`] implements [`Host`](viewport_truth_core::host::Host) over a
//! virtual clock with ordered timers, frame boundaries, idle callbacks and a
//! microtask queue. Capabilities can be toggled to exercise every shim
//! fallback, viewport geometry is set directly, and read failures can be
//! injected per signal.
//!
//! [`SnapshotLog`] subscribes to a store and records every snapshot it is
//! notified with, together with the simulated time.

#![no_std]

extern crate alloc;

mod host;

pub use host::{Capabilities, SimHost, SimStats};

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use viewport_truth_core::host::Host;
use viewport_truth_core::store::{Subscription, ViewportStore};
use viewport_truth_core::{Snapshot, shim};
use viewport_truth_core::time::HostTime;

/// One recorded notification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Notification {
    /// Host time at which the subscriber was called.
    pub at: HostTime,
    /// The store's snapshot at that moment.
    pub snapshot: Snapshot,
}

/// Records every notification a store delivers.
#[derive(Debug)]
pub struct SnapshotLog {
    entries: Rc<RefCell<Vec<Notification>>>,
    subscription: Subscription,
}

impl SnapshotLog {
    /// Subscribes to `store`.
    ///
    /// The log holds the store weakly; notifications after the store is
    /// dropped are not recorded.
    pub fn attach<H: Host + ?Sized + 'static>(
        host: &Rc<H>,
        store: &Rc<ViewportStore<H>>,
    ) -> Self {
        let entries = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&entries);
        let weak_store = Rc::downgrade(store);
        let weak_host = Rc::downgrade(host);
        let subscription = store.subscribe(move || {
            let (Some(store), Some(host)) = (weak_store.upgrade(), weak_host.upgrade()) else {
                return;
            };
            if let Ok(snapshot) = store.get_snapshot() {
                sink.borrow_mut().push(Notification {
                    at: shim::now(&*host),
                    snapshot,
                });
            }
        });
        Self {
            entries,
            subscription,
        }
    }

    /// Number of notifications so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// The latest notification.
    #[must_use]
    pub fn last(&self) -> Option<Notification> {
        self.entries.borrow().last().copied()
    }

    /// All notifications, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.borrow().clone()
    }

    /// Forgets recorded notifications.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// The underlying subscription.
    #[must_use]
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}
