//! Dialog Flow - control plane for a browser identity sign-in dialog
//!
//! Translates named events published on an [`EventBus`] into a sequence of
//! presentation steps carried out by a [`Controller`], with back-navigation
//! through recorded steps.

pub mod bus;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod machine;
pub mod scenario;
pub mod state_machine;
pub mod validation;

#[cfg(test)]
mod testing;

pub use bus::{EventBus, Subscription};
pub use collaborators::{
    AuthLevel, Authenticator, Collaborators, Controller, IdentityStore, ModuleManager,
};
pub use config::DialogConfig;
pub use error::{FlowError, FlowResult};
pub use machine::{StartOptions, StateMachine};
pub use state_machine::{Event, EventName, Step};
