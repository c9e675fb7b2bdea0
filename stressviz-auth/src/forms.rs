//! Registration and login forms
//!
//! The store itself accepts any strings. These are the checks a consumer
//! runs first, in the order the sign-up page applied them: required fields,
//! email shape, matching passwords, then password length.

use crate::{AuthResult, AuthService};
use regex::Regex;
use std::sync::OnceLock;
use stressviz_core::PublicUser;
use tracing::debug;

/// A form input the store never sees
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        // Same shape browsers accept for `<input type="email">`
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("email pattern is valid")
    })
}

/// Email as an email input submits it: surrounding whitespace stripped
fn normalize_email(email: &str) -> &str {
    email.trim()
}

fn require(value: &str, field: &'static str) -> Result<(), FormError> {
    if value.is_empty() {
        return Err(FormError::MissingField { field });
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), FormError> {
    let email = normalize_email(email);
    require(email, "email")?;
    if !email_regex().is_match(email) {
        return Err(FormError::InvalidEmail);
    }
    Ok(())
}

/// Password length the way a browser measures a string (UTF-16 code units)
fn password_length(password: &str) -> usize {
    password.encode_utf16().count()
}

/// Sign-up form contents
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn new(name: &str, email: &str, password: &str, confirm_password: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        }
    }

    pub fn validate(&self, min_password_length: usize) -> Result<(), FormError> {
        require(&self.name, "name")?;
        check_email(&self.email)?;
        require(&self.password, "password")?;
        require(&self.confirm_password, "confirm password")?;

        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }

        if password_length(&self.password) < min_password_length {
            return Err(FormError::PasswordTooShort {
                min: min_password_length,
            });
        }

        Ok(())
    }

    /// Validate, then register and sign in
    pub async fn submit(
        &self,
        service: &AuthService,
        min_password_length: usize,
    ) -> AuthResult<PublicUser> {
        if let Err(e) = self.validate(min_password_length) {
            debug!("Registration form rejected: {}", e);
            return Err(e.into());
        }

        service
            .register(&self.name, normalize_email(&self.email), &self.password)
            .await
    }
}

/// Sign-in form contents
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        check_email(&self.email)?;
        require(&self.password, "password")
    }

    /// Validate, then sign in
    pub async fn submit(&self, service: &AuthService) -> AuthResult<PublicUser> {
        if let Err(e) = self.validate() {
            debug!("Login form rejected: {}", e);
            return Err(e.into());
        }

        service
            .login(normalize_email(&self.email), &self.password)
            .await
    }
}
