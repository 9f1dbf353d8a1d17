//! Pure transition function encoding the identity dialog flow graph
//!
//! Every event maps to a new [`FlowContext`] plus an ordered list of
//! [`Effect`]s. Nothing here talks to the controller, the bus or the
//! authenticator; the machine executes the effects afterwards.

use super::effect::Effect;
use super::event::{AuthenticateInfo, EmailSelection, Event};
use super::state::FlowContext;
use super::step::{PickEmailArgs, RequiredEmailArgs, Step, VerifyPrimaryArgs, INVALID_REQUIRED_EMAIL};
use crate::collaborators::{AuthLevel, EmailValidator, IdentityKind, IdentityStore};
use crate::error::FlowError;
use serde_json::json;

/// Read-only views a transition may consult
#[derive(Clone, Copy)]
pub struct Lookups<'a> {
    pub store: &'a dyn IdentityStore,
    pub validator: &'a dyn EmailValidator,
}

/// Result of a transition
#[derive(Debug)]
pub struct TransitionResult {
    pub context: FlowContext,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(context: FlowContext) -> Self {
        Self {
            context,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Pure transition function.
///
/// Fails only on caller contract violations, currently an `email_chosen`
/// for an email the store knows nothing about.
///
/// # Errors
///
/// Returns [`FlowError::InvalidEmail`] when `email_chosen` names an email
/// missing from the store.
pub fn transition(
    context: &FlowContext,
    event: Event,
    lookups: &Lookups<'_>,
) -> Result<TransitionResult, FlowError> {
    let mut next = context.clone();

    let effect = match event {
        // ============================================================
        // Session start and environment signals
        // ============================================================
        Event::Start(info) => {
            next.hostname = info.hostname;
            next.allow_persistent = info.allow_persistent;
            next.required_email = info.required_email;

            match next.required_email.as_deref() {
                Some(email) if !lookups.validator.is_valid(email) => Some(Effect::show(Step::Error {
                    code: INVALID_REQUIRED_EMAIL.to_string(),
                    details: json!({ "email": email }),
                })),
                _ => Some(Effect::show(Step::CheckAuth)),
            }
        }

        Event::Offline => Some(Effect::show(Step::Offline)),

        Event::Cancel => Some(Effect::show(Step::Cancel)),

        Event::WindowUnload if !next.success => {
            return Ok(TransitionResult::new(next)
                .with_effect(Effect::ClearStagedOnBehalfOf)
                .with_effect(Effect::show(Step::Cancel)));
        }
        Event::WindowUnload => None,

        // ============================================================
        // Authentication
        // ============================================================
        Event::AuthenticationChecked(status) => match next.required_email() {
            Some(email) => Some(Effect::show(Step::AuthenticateWithRequiredEmail(
                RequiredEmailArgs {
                    email: email.to_string(),
                    authenticated: status.authenticated,
                    secondary_auth: false,
                },
            ))),
            None if status.authenticated => Some(Effect::publish(Event::PickEmail)),
            None => Some(Effect::publish(Event::Authenticate(AuthenticateInfo::default()))),
        },

        Event::Authenticate(info) => Some(Effect::show(Step::Authenticate(info))),

        Event::LoggedOut => Some(Effect::publish(Event::Authenticate(AuthenticateInfo::default()))),

        Event::Authenticated => Some(Effect::publish(Event::PickEmail)),

        Event::NotMe => Some(Effect::show(Step::NotMe)),

        // ============================================================
        // Secondary (password) identities
        // ============================================================
        Event::UserStaged(info) => Some(Effect::show(Step::ConfirmUser(info.email))),

        Event::UserConfirmed | Event::EmailConfirmed => Some(Effect::show(Step::EmailConfirmed)),

        Event::ForgotPassword(info) => Some(Effect::show(Step::ForgotPassword(info))),

        Event::ResetPassword(info) => Some(Effect::show(Step::ConfirmUser(info.email))),

        Event::AddEmail => Some(Effect::show(Step::AddEmail)),

        Event::EmailStaged(info) => Some(Effect::show(Step::ConfirmEmail(info.email))),

        // ============================================================
        // Primary (federated) identities
        // ============================================================

        // Provisioning is a detour; cancelling it returns to whatever
        // preceded it, so it is never recorded.
        Event::PrimaryUser(info) => {
            next.adding_primary_identity = info.add;
            next.pending_primary_email.clone_from(&info.email);
            Some(Effect::show_unrecorded(Step::ProvisionPrimaryUser(info)))
        }

        Event::PrimaryUserProvisioned(mut info) => {
            info.add = next.adding_primary_identity;
            Some(Effect::show(Step::PrimaryUserProvisioned(info)))
        }

        Event::PrimaryUserUnauthenticated(mut info) => {
            info.add = next.adding_primary_identity;
            info.email.clone_from(&next.pending_primary_email);
            Some(Effect::show(Step::VerifyPrimaryUser(VerifyPrimaryArgs {
                info,
                required_email: next.required_email().is_some(),
            })))
        }

        // The user is off verifying with their IdP; the dialog must not
        // close itself meanwhile.
        Event::PrimaryUserAuthenticating => {
            next.success = true;
            Some(Effect::SuspendModules)
        }

        Event::PrimaryUserReady(selection) => Some(Effect::show(Step::EmailChosen(selection))),

        // ============================================================
        // Email selection and assertions
        // ============================================================
        Event::PickEmail => Some(Effect::show(Step::PickEmail(Some(PickEmailArgs {
            origin: next.hostname.clone(),
            allow_persistent: next.allow_persistent,
        })))),

        Event::EmailChosen(selection) => {
            let record = lookups
                .store
                .get_email(&selection.email)
                .ok_or_else(|| FlowError::InvalidEmail {
                    email: selection.email.clone(),
                })?;

            match (record.kind, record.cert.is_some()) {
                (IdentityKind::Primary, true) => Some(Effect::show(Step::EmailChosen(selection))),
                // Missing cert (possibly expired): send the user back
                // through provisioning, which produces its own assertion.
                (IdentityKind::Primary, false) => {
                    Some(Effect::publish(Event::PrimaryUser(selection.into_primary_info())))
                }
                (IdentityKind::Secondary, _) => Some(Effect::CheckSecondaryAuth(selection)),
            }
        }

        Event::AssertionGenerated(info) => {
            next.success = true;
            match info.assertion {
                Some(assertion) => Some(Effect::show(Step::AssertionGenerated(assertion))),
                None => Some(Effect::show(Step::PickEmail(None))),
            }
        }

        Event::CancelState => Some(Effect::Retreat),
    };

    let result = TransitionResult::new(next);
    Ok(match effect {
        Some(effect) => result.with_effect(effect),
        None => result,
    })
}

/// Step to show once a secondary identity's authentication level is known.
///
/// An assertion-level session still needs the password re-entered before a
/// password-backed email may be used.
#[must_use]
pub fn secondary_auth_step(selection: EmailSelection, level: AuthLevel) -> Step {
    match level {
        AuthLevel::Assertion => Step::AuthenticateWithRequiredEmail(RequiredEmailArgs {
            email: selection.email,
            authenticated: false,
            secondary_auth: true,
        }),
        AuthLevel::Password | AuthLevel::None => Step::EmailChosen(selection),
    }
}
