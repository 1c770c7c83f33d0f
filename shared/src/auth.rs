//! Sign-in and sign-up dialogs.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capabilities::{Acknowledged, ApiOperation};
use crate::event::Redacted;
use crate::FormError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum SignInField {
    Email(String),
    Password(Redacted),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum SignUpField {
    Email(String),
    Password(Redacted),
    ConfirmPassword(Redacted),
    Name(String),
    Age(String),
    Phone(String),
    Faculty(String),
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn required<'a>(label: &str, value: &'a str) -> Result<&'a str, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FormError::Missing(label.to_string()));
    }
    Ok(value)
}

fn secret_str(secret: &Option<SecretString>) -> &str {
    secret.as_ref().map(|s| s.expose_secret().as_str()).unwrap_or("")
}

#[derive(Serialize)]
pub struct SignInBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub struct SignUpBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
    pub age: u32,
    pub phone: &'a str,
    pub faculty: &'a str,
}

#[derive(Debug, Default)]
pub struct SignInDialog {
    pub open: bool,
    pub email: String,
    password: Option<SecretString>,
    pub submitting: bool,
    pub error: Option<String>,
}

impl SignInDialog {
    pub fn apply(&mut self, field: SignInField) {
        match field {
            SignInField::Email(email) => self.email = email,
            SignInField::Password(password) => self.password = Some(password.into_secret()),
        }
        self.error = None;
    }

    pub fn has_password(&self) -> bool {
        !secret_str(&self.password).is_empty()
    }

    pub fn body(&self) -> Result<SignInBody<'_>, FormError> {
        let email = required("Email", &self.email)?;
        if !is_plausible_email(email) {
            return Err(FormError::InvalidEmail);
        }
        let password = secret_str(&self.password);
        if password.is_empty() {
            return Err(FormError::Missing("Password".into()));
        }
        Ok(SignInBody { email, password })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
pub struct SignUpDialog {
    pub open: bool,
    pub email: String,
    password: Option<SecretString>,
    confirm_password: Option<SecretString>,
    pub name: String,
    pub age: String,
    pub phone: String,
    pub faculty: String,
    pub submitting: bool,
    pub error: Option<String>,
}

impl SignUpDialog {
    pub fn apply(&mut self, field: SignUpField) {
        match field {
            SignUpField::Email(v) => self.email = v,
            SignUpField::Password(v) => self.password = Some(v.into_secret()),
            SignUpField::ConfirmPassword(v) => self.confirm_password = Some(v.into_secret()),
            SignUpField::Name(v) => self.name = v,
            SignUpField::Age(v) => self.age = v,
            SignUpField::Phone(v) => self.phone = v,
            SignUpField::Faculty(v) => self.faculty = v,
        }
        self.error = None;
    }

    /// Validated request body. A password mismatch never leaves the client.
    pub fn body(&self) -> Result<SignUpBody<'_>, FormError> {
        let name = required("Name", &self.name)?;
        let email = required("Email", &self.email)?;
        if !is_plausible_email(email) {
            return Err(FormError::InvalidEmail);
        }

        let password = secret_str(&self.password);
        if password.is_empty() {
            return Err(FormError::Missing("Password".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(FormError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }
        if password != secret_str(&self.confirm_password) {
            return Err(FormError::PasswordMismatch);
        }

        let age: u32 = required("Age", &self.age)?
            .parse()
            .map_err(|_| FormError::InvalidAge)?;
        if !(1..=120).contains(&age) {
            return Err(FormError::InvalidAge);
        }

        Ok(SignUpBody {
            email,
            password,
            name,
            age,
            phone: required("Phone", &self.phone)?,
            faculty: required("Faculty", &self.faculty)?,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn access_token(value: &Value) -> Option<String> {
    value
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Login nests the token under `data`, registration returns it at the top
/// level. Each falls back to the other spot.
pub fn extract_token(operation: ApiOperation, ack: &Acknowledged) -> Option<String> {
    match operation {
        ApiOperation::SignUp => access_token(&ack.root).or_else(|| access_token(&ack.data)),
        _ => access_token(&ack.data).or_else(|| access_token(&ack.root)),
    }
}
