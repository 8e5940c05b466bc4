//! Registry of in-flight key loads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use keycache_core::error::Result;
use keycache_core::types::KeyEntry;

/// Value carried by a load's result channel. `None` while loading.
pub(crate) type LoadOutcome = Option<Result<Arc<KeyEntry>>>;

/// One outstanding load for one key name.
pub(crate) struct InFlight {
    outcome: watch::Sender<LoadOutcome>,
    stale: AtomicBool,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            outcome,
            stale: AtomicBool::new(false),
        }
    }

    /// Receiver that resolves once the loader publishes.
    ///
    /// If the loader is dropped before publishing, the sender closes and the
    /// receiver errors instead.
    pub(crate) fn subscribe(&self) -> watch::Receiver<LoadOutcome> {
        self.outcome.subscribe()
    }

    pub(crate) fn publish(&self, outcome: Result<Arc<KeyEntry>>) {
        self.outcome.send_replace(Some(outcome));
    }

    /// The key changed while this load was running; its result must not be cached.
    pub(crate) fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }
}

/// A won loader registration.
///
/// Removed from the registry by [`Registration::release`] or, at the latest,
/// on drop, so success, failure, panics and cancelled futures all free the
/// name for the next caller.
pub(crate) struct Registration<'a> {
    registry: &'a DashMap<String, Arc<InFlight>>,
    name: &'a str,
    flight: Arc<InFlight>,
}

impl<'a> Registration<'a> {
    pub(crate) fn new(
        registry: &'a DashMap<String, Arc<InFlight>>,
        name: &'a str,
        flight: Arc<InFlight>,
    ) -> Self {
        Self {
            registry,
            name,
            flight,
        }
    }

    pub(crate) fn flight(&self) -> &InFlight {
        &self.flight
    }

    /// Removes this registration. Idempotent, and never removes a newer
    /// registration for the same name.
    pub(crate) fn release(&self) {
        self.registry
            .remove_if(self.name, |_, current| Arc::ptr_eq(current, &self.flight));
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_releases_registration() {
        let registry = DashMap::new();
        let flight = Arc::new(InFlight::new());
        registry.insert("payments".to_string(), Arc::clone(&flight));

        {
            let _registration = Registration::new(&registry, "payments", flight);
        }

        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_keeps_newer_registration() {
        let registry = DashMap::new();
        let old = Arc::new(InFlight::new());
        let registration = Registration::new(&registry, "payments", Arc::clone(&old));

        let newer = Arc::new(InFlight::new());
        registry.insert("payments".to_string(), Arc::clone(&newer));

        registration.release();
        drop(registration);

        assert!(Arc::ptr_eq(registry.get("payments").unwrap().value(), &newer));
    }

    #[tokio::test]
    async fn test_subscriber_sees_published_outcome() {
        let flight = InFlight::new();
        let mut rx = flight.subscribe();

        flight.publish(Err(keycache_core::KeyCacheError::KeyNotFound("x".into())));

        let outcome = rx.wait_for(Option::is_some).await.unwrap().clone();
        assert!(matches!(outcome, Some(Err(_))));
    }

    #[tokio::test]
    async fn test_subscriber_errors_when_loader_vanishes() {
        let flight = InFlight::new();
        let mut rx = flight.subscribe();
        drop(flight);

        assert!(rx.wait_for(Option::is_some).await.is_err());
    }
}
