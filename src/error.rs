//! Dialog flow errors
//!
//! Only caller contract violations are errors. User-facing problems, such as
//! a malformed required email, are shown as an error step instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("start: controller must be specified")]
    MissingController,
    #[error("invalid email: no stored identity for {email}")]
    InvalidEmail { email: String },
    #[error("state machine has not been started")]
    NotStarted,
    #[error("unknown event name: {0}")]
    UnknownEvent(String),
}

pub type FlowResult<T> = Result<T, FlowError>;
