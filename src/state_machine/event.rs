//! Events that drive the dialog flow

use crate::error::FlowError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Names of every event the dialog reacts to, as published on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    Start,
    Offline,
    Cancel,
    WindowUnload,
    AuthenticationChecked,
    Authenticate,
    UserStaged,
    UserConfirmed,
    PrimaryUser,
    PrimaryUserProvisioned,
    PrimaryUserUnauthenticated,
    PrimaryUserAuthenticating,
    PrimaryUserReady,
    PickEmail,
    EmailChosen,
    #[serde(rename = "notme")]
    NotMe,
    LoggedOut,
    Authenticated,
    ForgotPassword,
    ResetPassword,
    AssertionGenerated,
    AddEmail,
    EmailStaged,
    EmailConfirmed,
    CancelState,
}

impl EventName {
    pub const ALL: [EventName; 25] = [
        EventName::Start,
        EventName::Offline,
        EventName::Cancel,
        EventName::WindowUnload,
        EventName::AuthenticationChecked,
        EventName::Authenticate,
        EventName::UserStaged,
        EventName::UserConfirmed,
        EventName::PrimaryUser,
        EventName::PrimaryUserProvisioned,
        EventName::PrimaryUserUnauthenticated,
        EventName::PrimaryUserAuthenticating,
        EventName::PrimaryUserReady,
        EventName::PickEmail,
        EventName::EmailChosen,
        EventName::NotMe,
        EventName::LoggedOut,
        EventName::Authenticated,
        EventName::ForgotPassword,
        EventName::ResetPassword,
        EventName::AssertionGenerated,
        EventName::AddEmail,
        EventName::EmailStaged,
        EventName::EmailConfirmed,
        EventName::CancelState,
    ];

    /// Wire name of the event (case-sensitive)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::Start => "start",
            EventName::Offline => "offline",
            EventName::Cancel => "cancel",
            EventName::WindowUnload => "window_unload",
            EventName::AuthenticationChecked => "authentication_checked",
            EventName::Authenticate => "authenticate",
            EventName::UserStaged => "user_staged",
            EventName::UserConfirmed => "user_confirmed",
            EventName::PrimaryUser => "primary_user",
            EventName::PrimaryUserProvisioned => "primary_user_provisioned",
            EventName::PrimaryUserUnauthenticated => "primary_user_unauthenticated",
            EventName::PrimaryUserAuthenticating => "primary_user_authenticating",
            EventName::PrimaryUserReady => "primary_user_ready",
            EventName::PickEmail => "pick_email",
            EventName::EmailChosen => "email_chosen",
            EventName::NotMe => "notme",
            EventName::LoggedOut => "logged_out",
            EventName::Authenticated => "authenticated",
            EventName::ForgotPassword => "forgot_password",
            EventName::ResetPassword => "reset_password",
            EventName::AssertionGenerated => "assertion_generated",
            EventName::AddEmail => "add_email",
            EventName::EmailStaged => "email_staged",
            EventName::EmailConfirmed => "email_confirmed",
            EventName::CancelState => "cancel_state",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| FlowError::UnknownEvent(s.to_string()))
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Payload of the `start` event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartInfo {
    pub hostname: Option<String>,
    pub allow_persistent: bool,
    pub required_email: Option<String>,
}

/// Payload of `authentication_checked`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationStatus {
    pub authenticated: bool,
}

/// Payload of `authenticate`; also the argument of the authenticate step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticateInfo {
    pub email: Option<String>,
}

/// Payload carrying a single email plus whatever else the publisher attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailInfo {
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmailInfo {
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            extra: Map::new(),
        }
    }
}

/// Primary (federated) identity data passed through the provisioning flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryUserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// True when the identity is being added to an existing account
    #[serde(default)]
    pub add: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PrimaryUserInfo {
    #[must_use]
    pub fn new(email: impl Into<String>, add: bool) -> Self {
        Self {
            email: Some(email.into()),
            add,
            extra: Map::new(),
        }
    }
}

/// Callback the email picker supplies to learn when the selection settled
#[derive(Clone)]
pub struct Completion(Rc<dyn Fn()>);

impl Completion {
    #[must_use]
    pub fn new(callback: impl Fn() + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn invoke(&self) {
        (self.0)();
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Completion")
    }
}

impl PartialEq for Completion {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Payload of `email_chosen` and `primary_user_ready`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSelection {
    pub email: String,
    #[serde(skip)]
    pub complete: Option<Completion>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmailSelection {
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            complete: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_completion(mut self, complete: Completion) -> Self {
        self.complete = Some(complete);
        self
    }

    /// Re-route a selection into the primary provisioning flow
    #[must_use]
    pub fn into_primary_info(self) -> PrimaryUserInfo {
        let mut extra = self.extra;
        let add = extra
            .remove("add")
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or(false);
        PrimaryUserInfo {
            email: Some(self.email),
            add,
            extra,
        }
    }
}

/// Payload of `assertion_generated`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssertionInfo {
    pub assertion: Option<String>,
}

// ============================================================================
// Event
// ============================================================================

/// Events that trigger dialog transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start(StartInfo),
    Offline,
    Cancel,
    WindowUnload,
    AuthenticationChecked(AuthenticationStatus),
    Authenticate(AuthenticateInfo),
    UserStaged(EmailInfo),
    UserConfirmed,
    PrimaryUser(PrimaryUserInfo),
    PrimaryUserProvisioned(PrimaryUserInfo),
    PrimaryUserUnauthenticated(PrimaryUserInfo),
    PrimaryUserAuthenticating,
    PrimaryUserReady(EmailSelection),
    PickEmail,
    EmailChosen(EmailSelection),
    NotMe,
    LoggedOut,
    Authenticated,
    ForgotPassword(EmailInfo),
    ResetPassword(EmailInfo),
    AssertionGenerated(AssertionInfo),
    AddEmail,
    EmailStaged(EmailInfo),
    EmailConfirmed,
    CancelState,
}

impl Event {
    #[must_use]
    pub fn name(&self) -> EventName {
        match self {
            Event::Start(_) => EventName::Start,
            Event::Offline => EventName::Offline,
            Event::Cancel => EventName::Cancel,
            Event::WindowUnload => EventName::WindowUnload,
            Event::AuthenticationChecked(_) => EventName::AuthenticationChecked,
            Event::Authenticate(_) => EventName::Authenticate,
            Event::UserStaged(_) => EventName::UserStaged,
            Event::UserConfirmed => EventName::UserConfirmed,
            Event::PrimaryUser(_) => EventName::PrimaryUser,
            Event::PrimaryUserProvisioned(_) => EventName::PrimaryUserProvisioned,
            Event::PrimaryUserUnauthenticated(_) => EventName::PrimaryUserUnauthenticated,
            Event::PrimaryUserAuthenticating => EventName::PrimaryUserAuthenticating,
            Event::PrimaryUserReady(_) => EventName::PrimaryUserReady,
            Event::PickEmail => EventName::PickEmail,
            Event::EmailChosen(_) => EventName::EmailChosen,
            Event::NotMe => EventName::NotMe,
            Event::LoggedOut => EventName::LoggedOut,
            Event::Authenticated => EventName::Authenticated,
            Event::ForgotPassword(_) => EventName::ForgotPassword,
            Event::ResetPassword(_) => EventName::ResetPassword,
            Event::AssertionGenerated(_) => EventName::AssertionGenerated,
            Event::AddEmail => EventName::AddEmail,
            Event::EmailStaged(_) => EventName::EmailStaged,
            Event::EmailConfirmed => EventName::EmailConfirmed,
            Event::CancelState => EventName::CancelState,
        }
    }

    /// Build an event from its name and a loosely typed JSON payload.
    ///
    /// A `null` payload is treated as an empty object, so payloads whose
    /// fields all have defaults may be omitted.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when `info` does not match the
    /// payload type of `name`.
    pub fn from_parts(name: EventName, info: Value) -> Result<Self, serde_json::Error> {
        let event = match name {
            EventName::Start => Event::Start(payload(info)?),
            EventName::Offline => Event::Offline,
            EventName::Cancel => Event::Cancel,
            EventName::WindowUnload => Event::WindowUnload,
            EventName::AuthenticationChecked => Event::AuthenticationChecked(payload(info)?),
            EventName::Authenticate => Event::Authenticate(payload(info)?),
            EventName::UserStaged => Event::UserStaged(payload(info)?),
            EventName::UserConfirmed => Event::UserConfirmed,
            EventName::PrimaryUser => Event::PrimaryUser(payload(info)?),
            EventName::PrimaryUserProvisioned => Event::PrimaryUserProvisioned(payload(info)?),
            EventName::PrimaryUserUnauthenticated => {
                Event::PrimaryUserUnauthenticated(payload(info)?)
            }
            EventName::PrimaryUserAuthenticating => Event::PrimaryUserAuthenticating,
            EventName::PrimaryUserReady => Event::PrimaryUserReady(payload(info)?),
            EventName::PickEmail => Event::PickEmail,
            EventName::EmailChosen => Event::EmailChosen(payload(info)?),
            EventName::NotMe => Event::NotMe,
            EventName::LoggedOut => Event::LoggedOut,
            EventName::Authenticated => Event::Authenticated,
            EventName::ForgotPassword => Event::ForgotPassword(payload(info)?),
            EventName::ResetPassword => Event::ResetPassword(payload(info)?),
            EventName::AssertionGenerated => Event::AssertionGenerated(payload(info)?),
            EventName::AddEmail => Event::AddEmail,
            EventName::EmailStaged => Event::EmailStaged(payload(info)?),
            EventName::EmailConfirmed => Event::EmailConfirmed,
            EventName::CancelState => Event::CancelState,
        };
        Ok(event)
    }
}

fn payload<T: DeserializeOwned>(info: Value) -> Result<T, serde_json::Error> {
    let info = if info.is_null() {
        Value::Object(Map::new())
    } else {
        info
    };
    serde_json::from_value(info)
}
