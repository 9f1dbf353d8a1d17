//! Dialog steps: the controller operations the flow can invoke

use super::event::{AuthenticateInfo, EmailInfo, EmailSelection, PrimaryUserInfo};
use crate::collaborators::Controller;
use serde::Serialize;
use serde_json::Value;

/// Error code shown when the relying site asked for a malformed email
pub const INVALID_REQUIRED_EMAIL: &str = "invalid_required_email";

/// Arguments of the authenticate-with-required-email step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredEmailArgs {
    pub email: String,
    pub authenticated: bool,
    /// Set when a password re-check is needed for a secondary identity
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub secondary_auth: bool,
}

/// Arguments of the verify-primary-user step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyPrimaryArgs {
    #[serde(flatten)]
    pub info: PrimaryUserInfo,
    #[serde(rename = "requiredEmail")]
    pub required_email: bool,
}

/// Arguments of the pick-email step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickEmailArgs {
    pub origin: Option<String>,
    pub allow_persistent: bool,
}

/// One dialog step together with the arguments it was shown with.
///
/// A recorded `Step` is a navigation frame: replaying it re-invokes the
/// same controller operation with the same arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", content = "args", rename_all = "snake_case")]
pub enum Step {
    Offline,
    Error { code: String, details: Value },
    CheckAuth,
    AuthenticateWithRequiredEmail(RequiredEmailArgs),
    Authenticate(AuthenticateInfo),
    ConfirmUser(String),
    EmailConfirmed,
    ProvisionPrimaryUser(PrimaryUserInfo),
    PrimaryUserProvisioned(PrimaryUserInfo),
    VerifyPrimaryUser(VerifyPrimaryArgs),
    EmailChosen(EmailSelection),
    PickEmail(Option<PickEmailArgs>),
    NotMe,
    ForgotPassword(EmailInfo),
    AssertionGenerated(String),
    AddEmail,
    ConfirmEmail(String),
    Cancel,
}

impl Step {
    /// Controller operation name, used for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Step::Offline => "doOffline",
            Step::Error { .. } => "doError",
            Step::CheckAuth => "doCheckAuth",
            Step::AuthenticateWithRequiredEmail(_) => "doAuthenticateWithRequiredEmail",
            Step::Authenticate(_) => "doAuthenticate",
            Step::ConfirmUser(_) => "doConfirmUser",
            Step::EmailConfirmed => "doEmailConfirmed",
            Step::ProvisionPrimaryUser(_) => "doProvisionPrimaryUser",
            Step::PrimaryUserProvisioned(_) => "doPrimaryUserProvisioned",
            Step::VerifyPrimaryUser(_) => "doVerifyPrimaryUser",
            Step::EmailChosen(_) => "doEmailChosen",
            Step::PickEmail(_) => "doPickEmail",
            Step::NotMe => "doNotMe",
            Step::ForgotPassword(_) => "doForgotPassword",
            Step::AssertionGenerated(_) => "doAssertionGenerated",
            Step::AddEmail => "doAddEmail",
            Step::ConfirmEmail(_) => "doConfirmEmail",
            Step::Cancel => "doCancel",
        }
    }

    /// Invoke the matching controller operation
    pub fn apply(&self, controller: &dyn Controller) {
        match self {
            Step::Offline => controller.do_offline(),
            Step::Error { code, details } => controller.do_error(code, details),
            Step::CheckAuth => controller.do_check_auth(),
            Step::AuthenticateWithRequiredEmail(args) => {
                controller.do_authenticate_with_required_email(args);
            }
            Step::Authenticate(args) => controller.do_authenticate(args),
            Step::ConfirmUser(email) => controller.do_confirm_user(email),
            Step::EmailConfirmed => controller.do_email_confirmed(),
            Step::ProvisionPrimaryUser(info) => controller.do_provision_primary_user(info),
            Step::PrimaryUserProvisioned(info) => controller.do_primary_user_provisioned(info),
            Step::VerifyPrimaryUser(args) => controller.do_verify_primary_user(args),
            Step::EmailChosen(info) => controller.do_email_chosen(info),
            Step::PickEmail(args) => controller.do_pick_email(args.as_ref()),
            Step::NotMe => controller.do_not_me(),
            Step::ForgotPassword(info) => controller.do_forgot_password(info),
            Step::AssertionGenerated(assertion) => controller.do_assertion_generated(assertion),
            Step::AddEmail => controller.do_add_email(),
            Step::ConfirmEmail(email) => controller.do_confirm_email(email),
            Step::Cancel => controller.do_cancel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::local::RecordingController;
    use serde_json::json;

    #[test]
    fn test_apply_reaches_matching_operation() {
        let controller = RecordingController::new();
        let steps = vec![
            Step::CheckAuth,
            Step::ConfirmUser("a@b.com".to_string()),
            Step::PickEmail(None),
            Step::Error {
                code: INVALID_REQUIRED_EMAIL.to_string(),
                details: json!({"email": "x"}),
            },
        ];
        for step in &steps {
            step.apply(&controller);
        }
        assert_eq!(controller.calls(), steps);
    }

    #[test]
    fn test_serialized_form_names_step_and_args() {
        let step = Step::AuthenticateWithRequiredEmail(RequiredEmailArgs {
            email: "a@b.com".to_string(),
            authenticated: false,
            secondary_auth: false,
        });
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            json!({
                "step": "authenticate_with_required_email",
                "args": {"email": "a@b.com", "authenticated": false}
            })
        );
    }

    #[test]
    fn test_verify_primary_args_flatten_info() {
        let args = VerifyPrimaryArgs {
            info: PrimaryUserInfo::new("a@b.com", true),
            required_email: false,
        };
        assert_eq!(
            serde_json::to_value(&args).unwrap(),
            json!({"email": "a@b.com", "add": true, "requiredEmail": false})
        );
    }
}
