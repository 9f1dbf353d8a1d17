//! Dialog state machine runtime
//!
//! Wires the pure [`transition`] function to an [`EventBus`]: `start`
//! subscribes one handler per event name, each handler runs the transition
//! and then executes its effects against the controller and collaborators.
//!
//! No `RefCell` borrow is held while the controller, the bus or a
//! collaborator runs, so any of them may publish re-entrantly.

use crate::bus::{EventBus, Subscription};
use crate::collaborators::{AuthError, AuthLevel, Collaborators, Controller};
use crate::error::{FlowError, FlowResult};
use crate::state_machine::event::{EmailSelection, Event, EventName};
use crate::state_machine::transition::{secondary_auth_step, transition, Lookups};
use crate::state_machine::{Effect, FlowContext, NavigationStack, Step};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use uuid::Uuid;


/// Options for [`StateMachine::start`]
#[derive(Clone, Default)]
pub struct StartOptions {
    pub controller: Option<Rc<dyn Controller>>,
}

impl StartOptions {
    #[must_use]
    pub fn new(controller: Rc<dyn Controller>) -> Self {
        Self {
            controller: Some(controller),
        }
    }
}

/// State owned by one started session
struct Session {
    id: Uuid,
    epoch: u64,
    controller: Rc<dyn Controller>,
    context: FlowContext,
    navigation: NavigationStack,
}

struct Core {
    bus: Rc<EventBus>,
    services: Collaborators,
    session: RefCell<Option<Session>>,
    subscriptions: RefCell<Vec<Subscription>>,
    /// Bumped on every start and stop so late callbacks can tell they are stale
    epoch: Cell<u64>,
}

/// The dialog flow control plane.
///
/// Inert until [`start`](Self::start); [`stop`](Self::stop) makes it inert
/// again and it may be restarted afterwards.
pub struct StateMachine {
    core: Rc<Core>,
}

impl StateMachine {
    #[must_use]
    pub fn new(bus: Rc<EventBus>, services: Collaborators) -> Self {
        Self {
            core: Rc::new(Core {
                bus,
                services,
                session: RefCell::new(None),
                subscriptions: RefCell::new(Vec::new()),
                epoch: Cell::new(0),
            }),
        }
    }

    /// Register the transition table on the bus and reset all session state.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::MissingController`] when `options` carries no
    /// controller.
    pub fn start(&self, options: StartOptions) -> FlowResult<()> {
        let controller = options.controller.ok_or(FlowError::MissingController)?;

        if self.is_running() {
            self.stop();
        }

        let epoch = self.core.epoch.get() + 1;
        self.core.epoch.set(epoch);

        let id = Uuid::new_v4();
        *self.core.session.borrow_mut() = Some(Session {
            id,
            epoch,
            controller,
            context: FlowContext::default(),
            navigation: NavigationStack::new(),
        });

        let mut subscriptions = Vec::with_capacity(EventName::ALL.len());
        for name in EventName::ALL {
            let core = Rc::downgrade(&self.core);
            subscriptions.push(self.core.bus.subscribe(name, move |event| {
                match Weak::upgrade(&core) {
                    Some(core) => core.dispatch(event.clone()),
                    None => Ok(()),
                }
            }));
        }
        *self.core.subscriptions.borrow_mut() = subscriptions;

        tracing::info!(session = %id, "Dialog state machine started");
        Ok(())
    }

    /// Release every subscription and discard session state. Idempotent.
    pub fn stop(&self) {
        let subscriptions = std::mem::take(&mut *self.core.subscriptions.borrow_mut());
        for subscription in subscriptions {
            self.core.bus.unsubscribe(subscription);
        }

        let session = self.core.session.borrow_mut().take();
        if let Some(session) = session {
            self.core.epoch.set(self.core.epoch.get() + 1);
            tracing::info!(session = %session.id, "Dialog state machine stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.core.session.borrow().is_some()
    }

    /// Snapshot of the current flow context
    #[must_use]
    pub fn context(&self) -> Option<FlowContext> {
        self.core
            .session
            .borrow()
            .as_ref()
            .map(|session| session.context.clone())
    }

    /// Recorded navigation frames, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<Step> {
        self.core
            .session
            .borrow()
            .as_ref()
            .map(|session| session.navigation.frames().to_vec())
            .unwrap_or_default()
    }

    /// Show `step`, recording it for back-navigation when `record` is set.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NotStarted`] before [`start`](Self::start).
    pub fn advance(&self, record: bool, step: Step) -> FlowResult<()> {
        self.core.advance(record, step)
    }

    /// Abandon the current step and replay the previous one, if any.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NotStarted`] before [`start`](Self::start).
    pub fn retreat(&self) -> FlowResult<()> {
        self.core.retreat()
    }
}

impl Drop for StateMachine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Core {
    fn lookups(&self) -> Lookups<'_> {
        Lookups {
            store: self.services.store.as_ref(),
            validator: self.services.validator.as_ref(),
        }
    }

    fn dispatch(self: &Rc<Self>, event: Event) -> FlowResult<()> {
        let name = event.name();
        let (id, epoch, context) = {
            let guard = self.session.borrow();
            let Some(session) = guard.as_ref() else {
                return Ok(());
            };
            (session.id, session.epoch, session.context.clone())
        };
        tracing::debug!(session = %id, event = %name, "Dispatching event");

        // The store and validator run with no borrow held.
        let result = transition(&context, event, &self.lookups()).inspect_err(|e| {
            tracing::error!(session = %id, event = %name, error = %e, "Dialog flow error");
        })?;

        {
            let mut guard = self.session.borrow_mut();
            match guard.as_mut() {
                Some(session) if session.epoch == epoch => session.context = result.context,
                _ => {
                    tracing::warn!(session = %id, event = %name, "Session ended during transition");
                    return Ok(());
                }
            }
        }

        for effect in result.effects {
            self.execute(effect)?;
        }
        Ok(())
    }

    fn execute(self: &Rc<Self>, effect: Effect) -> FlowResult<()> {
        match effect {
            Effect::Show { step, record } => self.advance(record, step),
            Effect::Retreat => self.retreat(),
            Effect::Publish(event) => self.bus.publish(event),
            Effect::ClearStagedOnBehalfOf => {
                self.services.store.set_staged_on_behalf_of("");
                Ok(())
            }
            Effect::SuspendModules => {
                self.services.modules.stop_all();
                Ok(())
            }
            Effect::CheckSecondaryAuth(selection) => {
                self.check_secondary_auth(selection);
                Ok(())
            }
        }
    }

    fn advance(&self, record: bool, step: Step) -> FlowResult<()> {
        let (controller, step) = {
            let mut guard = self.session.borrow_mut();
            let session = guard.as_mut().ok_or(FlowError::NotStarted)?;
            let step = session.navigation.advance(record, step);
            tracing::debug!(
                session = %session.id,
                step = step.name(),
                recorded = record,
                depth = session.navigation.len(),
                "Advancing dialog"
            );
            (Rc::clone(&session.controller), step)
        };
        step.apply(controller.as_ref());
        Ok(())
    }

    fn retreat(&self) -> FlowResult<()> {
        let (controller, previous) = {
            let mut guard = self.session.borrow_mut();
            let session = guard.as_mut().ok_or(FlowError::NotStarted)?;
            let previous = session.navigation.retreat();
            tracing::debug!(
                session = %session.id,
                step = previous.as_ref().map(Step::name),
                depth = session.navigation.len(),
                "Retreating dialog"
            );
            (Rc::clone(&session.controller), previous)
        };
        if let Some(step) = previous {
            step.apply(controller.as_ref());
        }
        Ok(())
    }

    /// Ask the authenticator about a secondary identity. The selection is
    /// captured by value; nothing is re-read from the context when the
    /// answer arrives.
    fn check_secondary_auth(self: &Rc<Self>, selection: EmailSelection) {
        let epoch = self.epoch.get();
        let complete = selection.complete.clone();
        let complete_on_error = complete.clone();
        let core = Rc::downgrade(self);

        let on_result = Box::new(move |level: AuthLevel| {
            if let Some(core) = core.upgrade() {
                core.resume(epoch, secondary_auth_step(selection, level));
            }
            if let Some(complete) = complete {
                complete.invoke();
            }
        });

        let on_error = Box::new(move |error: AuthError| {
            tracing::warn!(error = %error, "Secondary authentication check failed");
            if let Some(complete) = complete_on_error {
                complete.invoke();
            }
        });

        self.services
            .authenticator
            .check_authentication(on_result, on_error);
    }

    /// Show a step decided by a callback, unless the session it belongs to
    /// has since been stopped or replaced
    fn resume(&self, epoch: u64, step: Step) {
        let current = self.session.borrow().as_ref().map(|session| session.epoch);
        if current != Some(epoch) {
            tracing::warn!(step = step.name(), "Ignoring late authentication result");
            return;
        }
        if let Err(e) = self.advance(true, step) {
            tracing::error!(error = %e, "Failed to resume dialog");
        }
    }
}
