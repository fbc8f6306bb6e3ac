use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Message shown to the operator when a form fails local checks.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordPolicy {
    /// Anything non-blank; the server decides.
    Login,
    /// 6+ chars with lower, upper, digit and a special character.
    Registration,
}

pub const PASSWORD_RULES: &str = "Password must be at least 6 characters long and contain at least one uppercase letter, one lowercase letter, one number, and one special character (@#$%^&*!?.-_+).";

const SPECIAL_CHARS: &str = "@#$%^&*!?.-_+";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email regex"))
}

fn password_charset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9@#$%^&*!?.\-_+]{6,}$").expect("static password regex")
    })
}

pub fn is_empty(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn is_email_valid(email: &str) -> bool {
    email_regex().is_match(email)
}

pub fn is_password_valid(password: &str, policy: PasswordPolicy) -> bool {
    if is_empty(password) {
        return false;
    }
    match policy {
        PasswordPolicy::Login => true,
        PasswordPolicy::Registration => {
            // no lookahead in `regex`; character classes are checked separately
            password_charset_regex().is_match(password)
                && password.chars().any(|c| c.is_ascii_lowercase())
                && password.chars().any(|c| c.is_ascii_uppercase())
                && password.chars().any(|c| c.is_ascii_digit())
                && password.chars().any(|c| SPECIAL_CHARS.contains(c))
        }
    }
}

pub fn is_name_valid(name: &str) -> bool {
    name.trim().chars().count() >= 2
}

pub fn is_role_valid(role_id: i64) -> bool {
    role_id > 0
}
