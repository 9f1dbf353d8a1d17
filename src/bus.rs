//! Synchronous named publish/subscribe channel
//!
//! `publish` runs every handler registered for the event's name, in
//! registration order, on the caller's stack. A handler may publish again;
//! the nested delivery completes before the outer handler resumes. The
//! handler list is snapshotted before delivery, so handlers may also
//! subscribe or unsubscribe while an event is in flight.

use crate::error::FlowError;
use crate::state_machine::event::{Event, EventName};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

pub type Handler = Rc<dyn Fn(&Event) -> Result<(), FlowError>>;

/// Handle for one registered handler, released by [`EventBus::unsubscribe`]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a subscription leaves the handler registered"]
pub struct Subscription {
    id: u64,
    name: EventName,
}

impl Subscription {
    #[must_use]
    pub fn name(&self) -> EventName {
        self.name
    }
}

#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<EventName, Vec<(u64, Handler)>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        name: EventName,
        handler: impl Fn(&Event) -> Result<(), FlowError> + 'static,
    ) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.handlers
            .borrow_mut()
            .entry(name)
            .or_default()
            .push((id, Rc::new(handler)));
        Subscription { id, name }
    }

    /// Remove a handler. Returns false if it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(registered) = handlers.get_mut(&subscription.name) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(id, _)| *id != subscription.id);
        before != registered.len()
    }

    /// Deliver `event` to every handler subscribed to its name.
    ///
    /// Delivery stops at the first handler error, which is returned to the
    /// caller. Errors raised by nested publishes propagate the same way.
    ///
    /// # Errors
    ///
    /// Returns the first error any handler reports.
    pub fn publish(&self, event: Event) -> Result<(), FlowError> {
        let name = event.name();
        let handlers: Vec<Handler> = self
            .handlers
            .borrow()
            .get(&name)
            .map(|registered| registered.iter().map(|(_, handler)| Rc::clone(handler)).collect())
            .unwrap_or_default();

        tracing::trace!(event = %name, handlers = handlers.len(), "Publishing event");

        for handler in handlers {
            handler(&event)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn subscriber_count(&self, name: EventName) -> usize {
        self.handlers.borrow().get(&name).map_or(0, Vec::len)
    }

    /// Total handlers across all names
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.handlers.borrow().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::event::AuthenticateInfo;

    fn log_into(log: &Rc<RefCell<Vec<String>>>, label: &'static str) -> impl Fn(&Event) -> Result<(), FlowError> {
        let log = Rc::clone(log);
        move |event| {
            log.borrow_mut().push(format!("{label}:{}", event.name()));
            Ok(())
        }
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = bus.subscribe(EventName::Offline, log_into(&log, "a"));
        let _b = bus.subscribe(EventName::Offline, log_into(&log, "b"));
        let _c = bus.subscribe(EventName::Cancel, log_into(&log, "c"));

        bus.publish(Event::Offline).unwrap();
        assert_eq!(*log.borrow(), vec!["a:offline", "b:offline"]);
    }

    #[test]
    fn test_nested_publish_completes_before_outer_handler_resumes() {
        let bus = Rc::new(EventBus::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = Rc::clone(&bus);
        let outer_log = Rc::clone(&log);
        let _outer = bus.subscribe(EventName::LoggedOut, move |_| {
            outer_log.borrow_mut().push("outer:before".to_string());
            inner_bus.publish(Event::Authenticate(AuthenticateInfo::default()))?;
            outer_log.borrow_mut().push("outer:after".to_string());
            Ok(())
        });
        let _inner = bus.subscribe(EventName::Authenticate, log_into(&log, "inner"));

        bus.publish(Event::LoggedOut).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["outer:before", "inner:authenticate", "outer:after"]
        );
    }

    #[test]
    fn test_unsubscribe_releases_once() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let subscription = bus.subscribe(EventName::Offline, log_into(&log, "a"));
        let name = subscription.name();

        assert!(bus.unsubscribe(subscription));
        assert_eq!(bus.subscriber_count(name), 0);

        bus.publish(Event::Offline).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_handler_error_stops_delivery() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _failing = bus.subscribe(EventName::Offline, |_| Err(FlowError::NotStarted));
        let _after = bus.subscribe(EventName::Offline, log_into(&log, "after"));

        assert!(matches!(bus.publish(Event::Offline), Err(FlowError::NotStarted)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_handler_may_unsubscribe_during_delivery() {
        let bus = Rc::new(EventBus::new());
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let handler_bus = Rc::clone(&bus);
        let handler_slot = Rc::clone(&slot);
        let subscription = bus.subscribe(EventName::Cancel, move |_| {
            if let Some(subscription) = handler_slot.borrow_mut().take() {
                handler_bus.unsubscribe(subscription);
            }
            Ok(())
        });
        *slot.borrow_mut() = Some(subscription);

        bus.publish(Event::Cancel).unwrap();
        assert_eq!(bus.subscriber_count(EventName::Cancel), 0);
        bus.publish(Event::Cancel).unwrap();
    }
}
