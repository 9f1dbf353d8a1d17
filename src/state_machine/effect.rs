//! Effects produced by dialog transitions

use super::event::{EmailSelection, Event};
use super::step::Step;

/// Effects to be executed, in order, after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Show a step on the controller, recording it for back-navigation
    /// unless `record` is false
    Show { step: Step, record: bool },

    /// Abandon the current step and replay the previous one
    Retreat,

    /// Publish a follow-up event; delivered before the current dispatch returns
    Publish(Event),

    /// Forget any staged on-behalf-of signup
    ClearStagedOnBehalfOf,

    /// Suspend every active dialog module
    SuspendModules,

    /// Ask the authenticator how the user is signed in, then choose the
    /// secondary identity's next step
    CheckSecondaryAuth(EmailSelection),
}

impl Effect {
    #[must_use]
    pub fn show(step: Step) -> Self {
        Effect::Show { step, record: true }
    }

    /// Show a detour step that must never become a back-navigation target
    #[must_use]
    pub fn show_unrecorded(step: Step) -> Self {
        Effect::Show {
            step,
            record: false,
        }
    }

    #[must_use]
    pub fn publish(event: Event) -> Self {
        Effect::Publish(event)
    }
}
