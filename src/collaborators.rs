//! Trait seams for everything the dialog drives but does not implement
//!
//! The flow is single-threaded and cooperative, so none of these require
//! `Send` or `Sync`; shared handles are `Rc`.

pub mod local;

use crate::state_machine::event::{AuthenticateInfo, EmailInfo, EmailSelection, PrimaryUserInfo};
use crate::state_machine::step::{PickEmailArgs, RequiredEmailArgs, VerifyPrimaryArgs};
use crate::validation::RegexEmailValidator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;
use thiserror::Error;

// ============================================================================
// Controller
// ============================================================================

/// The rendering side of the dialog: one operation per step.
///
/// Operations return without the flow waiting on them, though they may
/// start asynchronous work or publish further events.
pub trait Controller {
    fn do_offline(&self);
    fn do_error(&self, code: &str, details: &Value);
    fn do_check_auth(&self);
    fn do_authenticate_with_required_email(&self, args: &RequiredEmailArgs);
    fn do_authenticate(&self, args: &AuthenticateInfo);
    fn do_confirm_user(&self, email: &str);
    fn do_email_confirmed(&self);
    fn do_provision_primary_user(&self, info: &PrimaryUserInfo);
    fn do_primary_user_provisioned(&self, info: &PrimaryUserInfo);
    fn do_verify_primary_user(&self, args: &VerifyPrimaryArgs);
    fn do_email_chosen(&self, info: &EmailSelection);
    fn do_pick_email(&self, args: Option<&PickEmailArgs>);
    fn do_not_me(&self);
    fn do_forgot_password(&self, info: &EmailInfo);
    fn do_assertion_generated(&self, assertion: &str);
    fn do_add_email(&self);
    fn do_confirm_email(&self, email: &str);
    fn do_cancel(&self);
}

// ============================================================================
// Identity storage
// ============================================================================

/// How an identity proves ownership of its email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    /// Verified by a third-party identity provider
    Primary,
    /// Verified and authenticated by password
    Secondary,
}

/// A locally known email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub email: String,
    #[serde(rename = "type")]
    pub kind: IdentityKind,
    #[serde(default)]
    pub cert: Option<String>,
}

impl IdentityRecord {
    #[must_use]
    pub fn primary(email: impl Into<String>, cert: Option<&str>) -> Self {
        Self {
            email: email.into(),
            kind: IdentityKind::Primary,
            cert: cert.map(str::to_string),
        }
    }

    #[must_use]
    pub fn secondary(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            kind: IdentityKind::Secondary,
            cert: None,
        }
    }
}

/// Local storage of known emails and staged signup state
pub trait IdentityStore {
    fn get_email(&self, email: &str) -> Option<IdentityRecord>;

    /// Record (or clear, with `""`) the site a staged signup was started for
    fn set_staged_on_behalf_of(&self, value: &str);
}

// ============================================================================
// Authentication
// ============================================================================

/// How strongly the current session is authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthLevel {
    /// Signed in only by a previously issued assertion
    Assertion,
    /// Signed in with a password
    Password,
    /// Not signed in
    #[default]
    None,
}

#[derive(Debug, Clone, Error)]
#[error("authentication check failed: {message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type AuthResultCallback = Box<dyn FnOnce(AuthLevel)>;
pub type AuthErrorCallback = Box<dyn FnOnce(AuthError)>;

/// Network-side authentication checks.
///
/// Implementations call exactly one of the two callbacks exactly once,
/// either before returning or later.
pub trait Authenticator {
    fn check_authentication(&self, on_result: AuthResultCallback, on_error: AuthErrorCallback);
}

// ============================================================================
// Modules and validation
// ============================================================================

/// The set of dialog modules currently running
pub trait ModuleManager {
    fn stop_all(&self);
}

/// Email syntax check
pub trait EmailValidator {
    fn is_valid(&self, email: &str) -> bool;
}

impl<F> EmailValidator for F
where
    F: Fn(&str) -> bool,
{
    fn is_valid(&self, email: &str) -> bool {
        self(email)
    }
}

/// Everything a [`StateMachine`](crate::machine::StateMachine) needs besides
/// its bus and controller
#[derive(Clone)]
pub struct Collaborators {
    pub store: Rc<dyn IdentityStore>,
    pub authenticator: Rc<dyn Authenticator>,
    pub modules: Rc<dyn ModuleManager>,
    pub validator: Rc<dyn EmailValidator>,
}

impl Collaborators {
    #[must_use]
    pub fn new(
        store: Rc<dyn IdentityStore>,
        authenticator: Rc<dyn Authenticator>,
        modules: Rc<dyn ModuleManager>,
    ) -> Self {
        Self {
            store,
            authenticator,
            modules,
            validator: Rc::new(RegexEmailValidator::new()),
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Rc<dyn EmailValidator>) -> Self {
        self.validator = validator;
        self
    }
}
