//! Client-side form validation for login and registration.
//!
//! # Design
//! - Validation runs before any network call; failures never reach the server.
//! - Report every failing field at once, in form order, so a front end can
//!   render them next to their inputs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A single failed field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name (`email`, `password`, ...).
    pub field: &'static str,
    /// Human-readable message for the field.
    pub message: String,
}

impl FieldError {
    /// Build a field error.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Login form input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl LoginForm {
    /// Validate the form, returning every failing field.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(error) = check_email(&self.email) {
            errors.push(error);
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        errors
    }
}

/// Registration form input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    /// Optional display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Password confirmation; must equal `password`.
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Validate the form, returning every failing field.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(error) = check_email(&self.email) {
            errors.push(error);
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        if self.confirm_password.is_empty() {
            errors.push(FieldError::new(
                "confirm_password",
                "Please confirm your password",
            ));
        } else if self.confirm_password != self.password {
            errors.push(FieldError::new("confirm_password", "Passwords do not match"));
        }
        errors
    }

    /// Display name to send, `None` when left blank.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let trimmed = self.name.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

static EMAIL_SHAPE: Lazy<Option<Regex>> = Lazy::new(|| match Regex::new(r"^\S+@\S+$") {
    Ok(pattern) => Some(pattern),
    Err(err) => {
        tracing::error!(error = %err, "email pattern failed to compile");
        None
    }
});

fn is_plausible_email(value: &str) -> bool {
    EMAIL_SHAPE
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}

fn check_email(email: &str) -> Option<FieldError> {
    if email.is_empty() {
        Some(FieldError::new("email", "Email is required"))
    } else if !is_plausible_email(email) {
        Some(FieldError::new("email", "Invalid email address"))
    } else {
        None
    }
}
