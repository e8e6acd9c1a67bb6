//! Broadcast callback registration with explicit cancellation.
//!
//! The host transport calls [`CallbackRegistry::dispatch`] for every received
//! advertisement. Consumers register a callback together with a matcher and
//! keep the returned [`CallbackHandle`] until they no longer want events.

use crate::event::BroadcastEvent;
use crate::mac_address::MacAddress;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::debug;

/// Type alias for a registered broadcast callback
pub type BroadcastCallback = Arc<dyn Fn(&BroadcastEvent) + Send + Sync>;

/// Filter deciding which events reach a callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastMatcher {
    /// Only events from this device; `None` matches every device
    pub address: Option<MacAddress>,
}

impl BroadcastMatcher {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn address(address: MacAddress) -> Self {
        Self {
            address: Some(address),
        }
    }

    pub fn matches(&self, event: &BroadcastEvent) -> bool {
        self.address.is_none_or(|address| address == event.address)
    }
}

struct Registration {
    id: u64,
    matcher: BroadcastMatcher,
    callback: BroadcastCallback,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    registrations: RwLock<Vec<Registration>>,
}

impl RegistryInner {
    fn remove(&self, id: u64) -> bool {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }
}

/// Shared table of broadcast callbacks.
///
/// Cloning yields another handle to the same table. Callbacks run outside the
/// lock, so a callback may itself register or cancel.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    inner: Arc<RegistryInner>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events accepted by `matcher`.
    ///
    /// The callback stays registered until [`CallbackHandle::cancel`] is
    /// called; dropping the handle does not unregister it.
    pub fn register<F>(&self, matcher: BroadcastMatcher, callback: F) -> CallbackHandle
    where
        F: Fn(&BroadcastEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration {
                id,
                matcher,
                callback: Arc::new(callback),
            });

        debug!(
            callback_id = id,
            address = ?matcher.address.map(|a| a.to_string()),
            "Registered broadcast callback"
        );

        CallbackHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every matching callback, returning how many ran.
    pub fn dispatch(&self, event: &BroadcastEvent) -> usize {
        let targets: Vec<BroadcastCallback> = self
            .inner
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.matcher.matches(event))
            .map(|r| r.callback.clone())
            .collect();

        for callback in &targets {
            callback(event);
        }

        targets.len()
    }

    pub fn len(&self) -> usize {
        self.inner
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Token for one registration; call [`cancel`](Self::cancel) to unregister.
#[must_use = "dropping the handle leaves the callback registered with no way to cancel it"]
#[derive(Debug)]
pub struct CallbackHandle {
    id: u64,
    registry: Weak<RegistryInner>,
}

impl CallbackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|inner| {
            inner
                .registrations
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .any(|r| r.id == self.id)
        })
    }

    /// Unregister the callback. Returns `false` if it was already gone.
    pub fn cancel(self) -> bool {
        let removed = self
            .registry
            .upgrade()
            .is_some_and(|inner| inner.remove(self.id));
        debug!(callback_id = self.id, removed, "Cancelled broadcast callback");
        removed
    }
}
