//! Test doubles and a wired-up harness for machine tests

use crate::bus::EventBus;
use crate::collaborators::local::{MemoryIdentityStore, ModuleTracker, RecordingController};
use crate::collaborators::{
    AuthError, AuthErrorCallback, AuthLevel, AuthResultCallback, Authenticator, Collaborators,
    IdentityRecord,
};
use crate::machine::{StartOptions, StateMachine};
use crate::state_machine::Event;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Authenticator whose checks stay pending until the test resolves them
#[derive(Default)]
pub struct ManualAuthenticator {
    pending: RefCell<VecDeque<(AuthResultCallback, AuthErrorCallback)>>,
}

impl ManualAuthenticator {
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Answer the oldest pending check
    pub fn resolve(&self, level: AuthLevel) {
        let next = self.pending.borrow_mut().pop_front();
        let (on_result, _) = next.expect("no pending authentication check");
        on_result(level);
    }

    /// Fail the oldest pending check
    pub fn fail(&self, message: &str) {
        let next = self.pending.borrow_mut().pop_front();
        let (_, on_error) = next.expect("no pending authentication check");
        on_error(AuthError::new(message));
    }
}

impl Authenticator for ManualAuthenticator {
    fn check_authentication(&self, on_result: AuthResultCallback, on_error: AuthErrorCallback) {
        self.pending.borrow_mut().push_back((on_result, on_error));
    }
}

/// A started machine on a private bus with recording collaborators
pub struct Harness {
    pub bus: Rc<EventBus>,
    pub machine: StateMachine,
    pub controller: Rc<RecordingController>,
    pub store: Rc<MemoryIdentityStore>,
    pub auth: Rc<ManualAuthenticator>,
    pub modules: Rc<ModuleTracker>,
}

impl Harness {
    pub fn new() -> Self {
        let harness = Self::unstarted();
        harness
            .machine
            .start(StartOptions::new(harness.controller.clone()))
            .expect("start with controller");
        harness
    }

    pub fn unstarted() -> Self {
        let bus = Rc::new(EventBus::new());
        let store = Rc::new(MemoryIdentityStore::from_records([
            IdentityRecord::primary("fed@idp.com", Some("cert")),
            IdentityRecord::primary("expired@idp.com", None),
            IdentityRecord::secondary("pw@site.com"),
        ]));
        let auth = Rc::new(ManualAuthenticator::default());
        let modules = Rc::new(ModuleTracker::default());
        let machine = StateMachine::new(
            Rc::clone(&bus),
            Collaborators::new(store.clone(), auth.clone(), modules.clone()),
        );
        Self {
            bus,
            machine,
            controller: Rc::new(RecordingController::new()),
            store,
            auth,
            modules,
        }
    }

    pub fn publish(&self, event: Event) {
        self.bus.publish(event).expect("publish");
    }
}
