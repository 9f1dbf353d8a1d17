//! Identity dialog state machine
//!
//! Elm-style split: [`transition`] is pure and returns [`Effect`]s, the
//! [`machine`](crate::machine) module executes them.

mod effect;
pub mod event;
mod state;
pub mod step;
pub mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, EventName};
pub use state::{FlowContext, NavigationStack};
pub use step::Step;
pub use transition::transition;
