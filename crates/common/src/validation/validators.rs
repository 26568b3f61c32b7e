// Field Validators - Reusable validation components

use super::{ValidationError, ValidationResult};

/// Minimum password length accepted at sign-up unless configured otherwise
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// Message shown when either credential is blank
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Please enter both email and password";

/// Trait for field validators
pub trait FieldValidator<T: ?Sized> {
    /// Validate a field value
    fn validate(&self, value: &T) -> Result<(), String>;
}

/// String validator for presence and length checks
#[derive(Debug, Clone)]
pub struct StringValidator {
    min_length: Option<usize>,
    max_length: Option<usize>,
    not_empty: bool,
    trim: bool,
}

impl Default for StringValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StringValidator {
    /// Create a new string validator
    pub fn new() -> Self {
        Self { min_length: None, max_length: None, not_empty: false, trim: true }
    }

    /// Require non-empty string
    pub fn not_empty(mut self) -> Self {
        self.not_empty = true;
        self
    }

    /// Set minimum length (in characters)
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Set maximum length (in characters)
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Set whether to trim before validation
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }
}

impl FieldValidator<str> for StringValidator {
    fn validate(&self, value: &str) -> Result<(), String> {
        let val = if self.trim { value.trim() } else { value };
        let len = val.chars().count();

        if self.not_empty && val.is_empty() {
            return Err("Value cannot be empty".to_string());
        }

        if let Some(min) = self.min_length {
            if len < min {
                return Err(format!("Length must be at least {} characters", min));
            }
        }

        if let Some(max) = self.max_length {
            if len > max {
                return Err(format!("Length must not exceed {} characters", max));
            }
        }

        Ok(())
    }
}

/// Checks applied to email/password pairs before they reach the provider.
#[derive(Debug, Clone)]
pub struct CredentialRules {
    min_password_length: usize,
}

impl Default for CredentialRules {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PASSWORD_LENGTH)
    }
}

impl CredentialRules {
    pub fn new(min_password_length: usize) -> Self {
        Self { min_password_length }
    }

    /// Both fields present. Used for sign-in.
    pub fn check_presence(&self, email: &str, password: &str) -> ValidationResult<()> {
        let required = StringValidator::new().not_empty();
        let mut err = ValidationError::new();

        // Passwords are never trimmed; whitespace is significant.
        if required.validate(email).is_err() || password.is_empty() {
            err.add_field_error("credentials", MISSING_CREDENTIALS_MESSAGE);
        }

        if err.is_empty() {
            Ok(())
        } else {
            Err(err)
        }
    }

    /// Presence plus minimum password length. Used for sign-up.
    pub fn check_sign_up(&self, email: &str, password: &str) -> ValidationResult<()> {
        self.check_presence(email, password)?;

        let password_rule = StringValidator::new().trim(false).min_length(self.min_password_length);
        password_rule.validate(password).map_err(|_| {
            ValidationError::field(
                "password",
                format!("Password must be at least {} characters long", self.min_password_length),
            )
        })
    }
}
