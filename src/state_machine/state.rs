//! Per-session dialog state: flow context and navigation history

use super::step::Step;
use serde::Serialize;

/// Context for one dialog session.
///
/// Only transitions write to it; the controller and the bus never see it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowContext {
    /// Hostname of the relying site
    pub hostname: Option<String>,
    pub allow_persistent: bool,
    /// Email the relying site insists on, if any
    pub required_email: Option<String>,
    /// Email of the primary identity currently being provisioned
    pub pending_primary_email: Option<String>,
    /// Whether the pending primary identity is added to an existing account
    pub adding_primary_identity: bool,
    /// Set once the dialog's job is done; suppresses cancel-on-unload
    pub success: bool,
}

impl FlowContext {
    /// The required email, ignoring an empty string
    #[must_use]
    pub fn required_email(&self) -> Option<&str> {
        self.required_email.as_deref().filter(|email| !email.is_empty())
    }
}

/// History of recorded steps, newest last.
///
/// The top frame is the step the user is looking at, unless an unrecorded
/// detour is on screen; the detour then sits logically above the top frame
/// without occupying it. Frames are only pushed or popped, never edited.
#[derive(Debug, Clone, Default)]
pub struct NavigationStack {
    frames: Vec<Step>,
    in_detour: bool,
}

impl NavigationStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `step` when `record` is set, then hand it back for display
    pub fn advance(&mut self, record: bool, step: Step) -> Step {
        if record {
            self.frames.push(step.clone());
        }
        self.in_detour = !record;
        step
    }

    /// Abandon whatever is on screen and return the step to replay, if any.
    ///
    /// Leaving a recorded step pops it and replays the frame below. Leaving
    /// a detour pops nothing and replays the frame that preceded it.
    pub fn retreat(&mut self) -> Option<Step> {
        if std::mem::take(&mut self.in_detour) {
            return self.frames.last().cloned();
        }
        self.frames.pop();
        self.frames.last().cloned()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Step> {
        self.frames.last()
    }

    /// Whether an unrecorded step is on screen
    #[must_use]
    pub fn in_detour(&self) -> bool {
        self.in_detour
    }

    #[must_use]
    pub fn frames(&self) -> &[Step] {
        &self.frames
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
