//! In-process collaborator implementations
//!
//! Used by the `dialog-flow` binary to replay scenarios and by tests.

use super::{
    AuthErrorCallback, AuthLevel, AuthResultCallback, Authenticator, Controller, IdentityRecord,
    IdentityStore, ModuleManager,
};
use crate::state_machine::event::{AuthenticateInfo, EmailInfo, EmailSelection, PrimaryUserInfo};
use crate::state_machine::step::{PickEmailArgs, RequiredEmailArgs, Step, VerifyPrimaryArgs};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Identity store
// ============================================================================

/// Identity store backed by a hash map
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    records: RefCell<HashMap<String, IdentityRecord>>,
    staged_on_behalf_of: RefCell<Option<String>>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = IdentityRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    pub fn insert(&self, record: IdentityRecord) {
        self.records
            .borrow_mut()
            .insert(record.email.clone(), record);
    }

    #[must_use]
    pub fn staged_on_behalf_of(&self) -> Option<String> {
        self.staged_on_behalf_of.borrow().clone()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get_email(&self, email: &str) -> Option<IdentityRecord> {
        self.records.borrow().get(email).cloned()
    }

    fn set_staged_on_behalf_of(&self, value: &str) {
        *self.staged_on_behalf_of.borrow_mut() = Some(value.to_string());
    }
}

// ============================================================================
// Authenticator
// ============================================================================

/// Authenticator that answers after a delay, on the current `LocalSet`.
///
/// Stands in for a network round trip. `check_authentication` must be
/// called from within a `tokio::task::LocalSet`.
pub struct DeferredAuthenticator {
    level: AuthLevel,
    delay: Duration,
    pending: Rc<Cell<usize>>,
    settled: Rc<Notify>,
}

impl DeferredAuthenticator {
    #[must_use]
    pub fn new(level: AuthLevel, delay: Duration) -> Self {
        Self {
            level,
            delay,
            pending: Rc::new(Cell::new(0)),
            settled: Rc::new(Notify::new()),
        }
    }

    /// Number of checks that have not answered yet
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.get()
    }

    /// Wait until every outstanding check has answered
    pub async fn idle(&self) {
        while self.pending.get() > 0 {
            self.settled.notified().await;
        }
    }
}

impl Authenticator for DeferredAuthenticator {
    fn check_authentication(&self, on_result: AuthResultCallback, _on_error: AuthErrorCallback) {
        let level = self.level;
        let delay = self.delay;
        let pending = Rc::clone(&self.pending);
        let settled = Rc::clone(&self.settled);

        pending.set(pending.get() + 1);
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            on_result(level);
            pending.set(pending.get() - 1);
            settled.notify_waiters();
        });
    }
}

// ============================================================================
// Modules
// ============================================================================

/// Module manager that only counts how often it was told to stop
#[derive(Debug, Default)]
pub struct ModuleTracker {
    stops: Cell<usize>,
}

impl ModuleTracker {
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.stops.get()
    }
}

impl ModuleManager for ModuleTracker {
    fn stop_all(&self) {
        self.stops.set(self.stops.get() + 1);
        tracing::debug!("Suspending dialog modules");
    }
}

// ============================================================================
// Controller
// ============================================================================

type Reaction = Rc<dyn Fn(&Step)>;

/// Controller that logs and records every step it is asked to show.
///
/// An optional reaction runs after each step is recorded, which lets a
/// caller simulate a UI that publishes follow-up events.
#[derive(Default)]
pub struct RecordingController {
    calls: RefCell<Vec<Step>>,
    reaction: RefCell<Option<Reaction>>,
}

impl RecordingController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn react(&self, reaction: impl Fn(&Step) + 'static) {
        *self.reaction.borrow_mut() = Some(Rc::new(reaction));
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Step> {
        self.calls.borrow().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<Step> {
        self.calls.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, step: Step) {
        tracing::info!(step = step.name(), "Showing dialog step");
        self.calls.borrow_mut().push(step.clone());
        let reaction = self.reaction.borrow().clone();
        if let Some(reaction) = reaction {
            reaction(&step);
        }
    }
}

impl Controller for RecordingController {
    fn do_offline(&self) {
        self.record(Step::Offline);
    }

    fn do_error(&self, code: &str, details: &Value) {
        self.record(Step::Error {
            code: code.to_string(),
            details: details.clone(),
        });
    }

    fn do_check_auth(&self) {
        self.record(Step::CheckAuth);
    }

    fn do_authenticate_with_required_email(&self, args: &RequiredEmailArgs) {
        self.record(Step::AuthenticateWithRequiredEmail(args.clone()));
    }

    fn do_authenticate(&self, args: &AuthenticateInfo) {
        self.record(Step::Authenticate(args.clone()));
    }

    fn do_confirm_user(&self, email: &str) {
        self.record(Step::ConfirmUser(email.to_string()));
    }

    fn do_email_confirmed(&self) {
        self.record(Step::EmailConfirmed);
    }

    fn do_provision_primary_user(&self, info: &PrimaryUserInfo) {
        self.record(Step::ProvisionPrimaryUser(info.clone()));
    }

    fn do_primary_user_provisioned(&self, info: &PrimaryUserInfo) {
        self.record(Step::PrimaryUserProvisioned(info.clone()));
    }

    fn do_verify_primary_user(&self, args: &VerifyPrimaryArgs) {
        self.record(Step::VerifyPrimaryUser(args.clone()));
    }

    fn do_email_chosen(&self, info: &EmailSelection) {
        self.record(Step::EmailChosen(info.clone()));
    }

    fn do_pick_email(&self, args: Option<&PickEmailArgs>) {
        self.record(Step::PickEmail(args.cloned()));
    }

    fn do_not_me(&self) {
        self.record(Step::NotMe);
    }

    fn do_forgot_password(&self, info: &EmailInfo) {
        self.record(Step::ForgotPassword(info.clone()));
    }

    fn do_assertion_generated(&self, assertion: &str) {
        self.record(Step::AssertionGenerated(assertion.to_string()));
    }

    fn do_add_email(&self) {
        self.record(Step::AddEmail);
    }

    fn do_confirm_email(&self, email: &str) {
        self.record(Step::ConfirmEmail(email.to_string()));
    }

    fn do_cancel(&self) {
        self.record(Step::Cancel);
    }
}
