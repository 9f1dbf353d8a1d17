//! Scripted dialog scenarios
//!
//! A scenario seeds the identity store, fixes what the authenticator
//! answers, and lists the events to publish in order:
//!
//! ```json
//! {
//!   "identities": [{ "email": "pw@site.com", "type": "secondary" }],
//!   "authentication": "password",
//!   "events": [
//!     { "event": "start", "info": { "hostname": "shop.example" } },
//!     { "event": "email_chosen", "info": { "email": "pw@site.com" } }
//!   ]
//! }
//! ```

use crate::bus::EventBus;
use crate::collaborators::local::{
    DeferredAuthenticator, MemoryIdentityStore, ModuleTracker, RecordingController,
};
use crate::collaborators::{AuthLevel, Collaborators, IdentityRecord};
use crate::error::FlowError;
use crate::machine::{StartOptions, StateMachine};
use crate::state_machine::event::StartInfo;
use crate::state_machine::{Event, EventName, Step};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

const DEMO: &str = r#"{
  "identities": [
    { "email": "fed@idp.com", "type": "primary", "cert": "demo-cert" },
    { "email": "pw@site.com", "type": "secondary" }
  ],
  "authentication": "password",
  "events": [
    { "event": "start", "info": { "hostname": "shop.example", "allowPersistent": true } },
    { "event": "authentication_checked", "info": { "authenticated": true } },
    { "event": "email_chosen", "info": { "email": "pw@site.com" } },
    { "event": "notme" },
    { "event": "add_email" },
    { "event": "cancel_state" },
    { "event": "email_chosen", "info": { "email": "fed@idp.com" } },
    { "event": "assertion_generated", "info": { "assertion": "demo-assertion" } }
  ]
}"#;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scenario aborted: {0}")]
    Flow(#[from] FlowError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub identities: Vec<IdentityRecord>,
    /// Level every authentication check reports
    #[serde(default)]
    pub authentication: AuthLevel,
    pub events: Vec<ScriptedEvent>,
}

/// One event to publish, with its raw payload
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedEvent {
    pub event: EventName,
    #[serde(default)]
    pub info: Value,
}

impl ScriptedEvent {
    /// Decode the payload against the event's schema
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Json`] when the payload does not match.
    pub fn to_event(&self) -> Result<Event, ScenarioError> {
        Ok(Event::from_parts(self.event, self.info.clone())?)
    }
}

impl Scenario {
    /// Read and parse a scenario file
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Io`] when the file cannot be read and
    /// [`ScenarioError::Json`] when it is not a valid scenario.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse a scenario from JSON text
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Json`] for malformed input or unknown event
    /// names.
    pub fn parse(raw: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Built-in walkthrough used when no scenario file is configured
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares the error type of [`parse`](Self::parse).
    pub fn demo() -> Result<Self, ScenarioError> {
        Self::parse(DEMO)
    }

    /// Whether the script publishes its own `start`
    #[must_use]
    pub fn has_start(&self) -> bool {
        self.events
            .iter()
            .any(|scripted| scripted.event == EventName::Start)
    }

    /// Publish every scripted event against a fresh machine wired to
    /// in-memory collaborators, returning the recorded step history.
    ///
    /// `start` is published first when the script lacks one. Each event
    /// waits for outstanding authentication checks before the next is
    /// published. Must run inside a `tokio::task::LocalSet`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Json`] for an undecodable payload and
    /// [`ScenarioError::Flow`] when the machine rejects an event.
    pub async fn replay(
        &self,
        start: StartInfo,
        auth_delay: Duration,
    ) -> Result<Vec<Step>, ScenarioError> {
        let bus = Rc::new(EventBus::new());
        let store = Rc::new(MemoryIdentityStore::from_records(self.identities.clone()));
        let auth = Rc::new(DeferredAuthenticator::new(self.authentication, auth_delay));
        let controller = Rc::new(RecordingController::new());

        let machine = StateMachine::new(
            Rc::clone(&bus),
            Collaborators::new(store, auth.clone(), Rc::new(ModuleTracker::default())),
        );
        machine.start(StartOptions::new(controller.clone()))?;

        if !self.has_start() {
            bus.publish(Event::Start(start))?;
        }

        for scripted in &self.events {
            let event = scripted.to_event()?;
            tracing::info!(event = %scripted.event, "Publishing scripted event");
            bus.publish(event)?;
            auth.idle().await;
        }

        let history = machine.history();
        tracing::info!(
            steps = controller.calls().len(),
            recorded = history.len(),
            "Scenario finished"
        );
        machine.stop();
        Ok(history)
    }
}
