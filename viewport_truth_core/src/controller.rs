// Copyright 2026 the Viewport Truth Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small imperative wrapper around [`ViewportStore`].

use alloc::rc::Rc;
use core::fmt;

use crate::config::StoreConfig;
use crate::error::{HostSignalError, UsageError};
use crate::host::Host;
use crate::snapshot::Snapshot;
use crate::store::{Subscription, ViewportStore};

/// Reads and subscribes to snapshots without a UI framework.
///
/// Unlike a raw store subscription, listeners here receive the current
/// snapshot.
pub struct ViewportController<H: Host + ?Sized + 'static> {
    store: Rc<ViewportStore<H>>,
}

impl<H: Host + ?Sized + 'static> fmt::Debug for ViewportController<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportController")
            .field("store", &self.store)
            .finish()
    }
}

impl<H: Host + ?Sized + 'static> ViewportController<H> {
    /// Creates a controller over a new store.
    ///
    /// # Errors
    ///
    /// See [`ViewportStore::new`].
    pub fn new(host: Rc<H>, config: StoreConfig) -> Result<Self, HostSignalError> {
        Ok(Self::from_store(ViewportStore::new(host, config)?))
    }

    /// Wraps an existing store.
    #[must_use]
    pub fn from_store(store: ViewportStore<H>) -> Self {
        Self {
            store: Rc::new(store),
        }
    }

    /// The current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::OffHost`] off-host.
    pub fn get(&self) -> Result<Snapshot, UsageError> {
        self.store.get_snapshot()
    }

    /// Calls `f` with the latest snapshot whenever the store notifies.
    pub fn subscribe(&self, f: impl Fn(&Snapshot) + 'static) -> Subscription {
        let store = Rc::downgrade(&self.store);
        self.store.subscribe(move || {
            let Some(store) = store.upgrade() else {
                return;
            };
            if let Ok(snapshot) = store.get_snapshot() {
                f(&snapshot);
            }
        })
    }

    /// Destroys the underlying store.
    pub fn destroy(&self) {
        self.store.destroy();
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &ViewportStore<H> {
        &self.store
    }
}
