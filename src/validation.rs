//! Email syntax validation

use crate::collaborators::EmailValidator;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\w.!#$%&'*+\-/=?^`{|}~]+@[a-z\d-]+(\.[a-z\d-]+)+$")
        .expect("email pattern is a valid regex")
});

/// Maximum length of an address, per RFC 5321
const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

/// Loose structural check: one `@`, a dotted domain, sane lengths
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexEmailValidator;

impl RegexEmailValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EmailValidator for RegexEmailValidator {
    fn is_valid(&self, email: &str) -> bool {
        verify_email(email)
    }
}

#[must_use]
pub fn verify_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || !EMAIL_PATTERN.is_match(email) {
        return false;
    }
    email
        .split_once('@')
        .is_some_and(|(local, _)| local.len() <= MAX_LOCAL_LEN)
}
