//! Synchronous publish/subscribe hub for [`DashboardEvent`]s.
//!
//! Handlers are registered per [`EventKind`] under a name and receive a
//! mutable context together with the event. Delivery happens inside
//! [`Dispatcher::publish`], in subscription order; a failing or panicking
//! handler is logged and skipped without stopping the others.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use outage_map_dashboard_models::{DashboardEvent, EventKind, HandlerKey};
use outage_map_dashboard_models::events::InvalidHandlerKeyError;

use crate::HandlerError;

/// A subscribed callback.
pub type Handler<C> = Box<dyn FnMut(&mut C, &DashboardEvent) -> Result<(), HandlerError>>;

struct Subscription<C> {
    name: String,
    handler: Handler<C>,
}

/// A handler that failed during one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub key: HandlerKey,
    pub error: String,
}

/// Outcome of one [`Dispatcher::publish`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event: EventKind,
    /// Number of handlers invoked, including failed ones.
    pub delivered: usize,
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    /// Returns `true` if every handler succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Event hub over a context of type `C`.
pub struct Dispatcher<C> {
    subscriptions: BTreeMap<EventKind, Vec<Subscription<C>>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self {
            subscriptions: BTreeMap::new(),
        }
    }
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (kind, subs) in &self.subscriptions {
            map.entry(kind, &subs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>());
        }
        map.finish()
    }
}

impl<C> Dispatcher<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `key`.
    ///
    /// If a handler with the same key exists it is replaced and keeps its
    /// place in the delivery order. Returns `true` on replacement.
    pub fn subscribe<F>(&mut self, key: HandlerKey, handler: F) -> bool
    where
        F: FnMut(&mut C, &DashboardEvent) -> Result<(), HandlerError> + 'static,
    {
        let subs = self.subscriptions.entry(key.event).or_default();
        if let Some(existing) = subs.iter_mut().find(|s| s.name == key.handler) {
            log::debug!("Replacing handler {key}");
            existing.handler = Box::new(handler);
            true
        } else {
            log::debug!("Subscribing handler {key}");
            subs.push(Subscription {
                name: key.handler,
                handler: Box::new(handler),
            });
            false
        }
    }

    /// [`Dispatcher::subscribe`] with a `"<event>.<handler>"` key.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHandlerKeyError`] if the key does not name a known
    /// event and a handler.
    pub fn subscribe_named<F>(
        &mut self,
        key: &str,
        handler: F,
    ) -> Result<bool, InvalidHandlerKeyError>
    where
        F: FnMut(&mut C, &DashboardEvent) -> Result<(), HandlerError> + 'static,
    {
        Ok(self.subscribe(key.parse()?, handler))
    }

    /// Removes the handler under `key`. Returns `true` if one was removed.
    pub fn unsubscribe(&mut self, key: &HandlerKey) -> bool {
        let Some(subs) = self.subscriptions.get_mut(&key.event) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.name != key.handler);
        let removed = subs.len() != before;
        if removed {
            log::debug!("Unsubscribed handler {key}");
        }
        removed
    }

    /// Handler names for `kind`, in delivery order.
    #[must_use]
    pub fn handlers(&self, kind: EventKind) -> Vec<&str> {
        self.subscriptions
            .get(&kind)
            .map(|subs| subs.iter().map(|s| s.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Delivers `event` to every handler of its kind, in order.
    pub fn publish(&mut self, context: &mut C, event: &DashboardEvent) -> DispatchReport {
        let kind = event.kind();
        let mut report = DispatchReport {
            event: kind,
            delivered: 0,
            failures: Vec::new(),
        };

        let Some(subs) = self.subscriptions.get_mut(&kind) else {
            log::trace!("No handlers for {kind}");
            return report;
        };

        log::debug!("Publishing {event} to {} handlers", subs.len());

        for sub in subs.iter_mut() {
            report.delivered += 1;
            let outcome = catch_unwind(AssertUnwindSafe(|| (sub.handler)(context, event)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(payload) => HandlerError::Panicked(panic_message(payload.as_ref())),
            };
            let key = HandlerKey::new(kind, sub.name.clone());
            log::error!("Handler {key} failed: {error}");
            report.failures.push(HandlerFailure {
                key,
                error: error.to_string(),
            });
        }

        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<String>;

    fn recorder(
        name: &'static str,
    ) -> impl FnMut(&mut Log, &DashboardEvent) -> Result<(), HandlerError> {
        move |log: &mut Log, _event: &DashboardEvent| {
            log.push(name.to_string());
            Ok(())
        }
    }

    #[test]
    fn delivers_in_subscription_order() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.subscribe_named("resetCounty.timeline", recorder("timeline")).unwrap();
        dispatcher.subscribe_named("resetCounty.choropleth", recorder("choropleth")).unwrap();
        dispatcher.subscribe_named("timeRangeChanged.cartogram", recorder("cartogram")).unwrap();

        let mut log = Log::new();
        let report = dispatcher.publish(&mut log, &DashboardEvent::ResetCounty);

        assert_eq!(log, ["timeline", "choropleth"]);
        assert_eq!(report.delivered, 2);
        assert!(report.is_ok());
    }

    #[test]
    fn resubscribing_replaces_in_place() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.subscribe_named("resetCounty.a", recorder("a1")).unwrap();
        dispatcher.subscribe_named("resetCounty.b", recorder("b")).unwrap();
        let replaced = dispatcher.subscribe_named("resetCounty.a", recorder("a2")).unwrap();

        let mut log = Log::new();
        dispatcher.publish(&mut log, &DashboardEvent::ResetCounty);

        assert!(replaced);
        assert_eq!(log, ["a2", "b"]);
        assert_eq!(dispatcher.handlers(EventKind::ResetCounty), ["a", "b"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.subscribe_named("resetCounty.a", recorder("a")).unwrap();
        dispatcher.subscribe_named("selectCounty.a", recorder("a")).unwrap();

        assert!(dispatcher.unsubscribe(&"resetCounty.a".parse().unwrap()));
        assert!(!dispatcher.unsubscribe(&"resetCounty.a".parse().unwrap()));
        assert!(dispatcher.handlers(EventKind::ResetCounty).is_empty());
        assert_eq!(dispatcher.handlers(EventKind::SelectCounty), ["a"]);
    }

    #[test]
    fn failures_are_isolated() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.subscribe_named("resetCounty.first", recorder("first")).unwrap();
        dispatcher
            .subscribe_named("resetCounty.errors", |_: &mut Log, _: &DashboardEvent| {
                Err(HandlerError::Failed("boom".to_string()))
            })
            .unwrap();
        dispatcher
            .subscribe_named("resetCounty.panics", |_: &mut Log, _: &DashboardEvent| {
                panic!("handler bug")
            })
            .unwrap();
        dispatcher.subscribe_named("resetCounty.last", recorder("last")).unwrap();

        let mut log = Log::new();
        let report = dispatcher.publish(&mut log, &DashboardEvent::ResetCounty);

        assert_eq!(log, ["first", "last"]);
        assert_eq!(report.delivered, 4);
        let failed: Vec<String> = report.failures.iter().map(|f| f.key.to_string()).collect();
        assert_eq!(failed, ["resetCounty.errors", "resetCounty.panics"]);
        assert!(report.failures[1].error.contains("handler bug"));
    }

    #[test]
    fn rejects_malformed_keys() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        assert!(dispatcher.subscribe_named("choropleth", recorder("x")).is_err());
    }
}
