//! Contact form fields and validation shared by the client and the backend.

use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::{Validate, ValidateEmail, ValidationErrors};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const MESSAGE_MIN_CHARS: usize = 10;
pub const MESSAGE_MAX_CHARS: usize = 5000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(length(min = 2, max = 100, message = "Name must be 2 to 100 characters"))]
    pub name: String,
    #[validate(
        email(message = "Email address is invalid"),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: String,
    #[validate(length(min = 10, max = 5000, message = "Message must be 10 to 5000 characters"))]
    pub message: String,
    /// Hidden field that people never fill in. Never sent over the wire.
    #[serde(skip)]
    pub honeypot: String,
}

impl ContactForm {
    pub fn new(name: &str, email: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
            honeypot: String::new(),
        }
    }

    pub fn is_bot(&self) -> bool {
        !self.honeypot.trim().is_empty()
    }

    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            message: self.message.trim().to_string(),
            honeypot: self.honeypot.clone(),
        }
    }

    /// Validate the trimmed fields. At most one error is reported per field.
    pub fn validate(&self) -> ValidationReport {
        let trimmed = self.trimmed();
        match Validate::validate(&trimmed) {
            Ok(()) => ValidationReport::default(),
            Err(errors) => {
                debug!("Contact form rejected: {}", errors);
                ValidationReport::from_errors(&trimmed, &errors)
            }
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    NameMissing,
    NameTooShort,
    NameTooLong,
    EmailMissing,
    EmailInvalid,
    EmailTooLong,
    MessageMissing,
    MessageTooShort,
    MessageTooLong,
}

impl FieldError {
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::NameMissing | FieldError::NameTooShort | FieldError::NameTooLong => "name",
            FieldError::EmailMissing | FieldError::EmailInvalid | FieldError::EmailTooLong => {
                "email"
            }
            FieldError::MessageMissing
            | FieldError::MessageTooShort
            | FieldError::MessageTooLong => "message",
        }
    }

    /// Dictionary key for the user-facing notification.
    pub fn translation_key(&self) -> &'static str {
        match self.field() {
            "name" => "contact.validation.name",
            "email" => "contact.validation.email",
            _ => "contact.validation.message",
        }
    }

    /// English description used in API error responses.
    pub fn description(&self) -> &'static str {
        match self {
            FieldError::NameMissing => "Name is required",
            FieldError::NameTooShort => "Name must be at least 2 characters",
            FieldError::NameTooLong => "Name must be at most 100 characters",
            FieldError::EmailMissing => "Email is required",
            FieldError::EmailInvalid => "Email address is invalid",
            FieldError::EmailTooLong => "Email must be at most 254 characters",
            FieldError::MessageMissing => "Message is required",
            FieldError::MessageTooShort => "Message must be at least 10 characters",
            FieldError::MessageTooLong => "Message must be at most 5000 characters",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    /// Map validator errors of an already trimmed form onto field errors.
    fn from_errors(form: &ContactForm, errors: &ValidationErrors) -> Self {
        let fields = errors.field_errors();
        let failed = |field: &str, code: &str| {
            fields
                .get(field)
                .is_some_and(|errors| errors.iter().any(|error| error.code == code))
        };

        let mut report = Self::default();

        if fields.contains_key("name") {
            report.errors.push(if form.name.is_empty() {
                FieldError::NameMissing
            } else if form.name.chars().count() < NAME_MIN_CHARS {
                FieldError::NameTooShort
            } else {
                FieldError::NameTooLong
            });
        }

        if fields.contains_key("email") {
            report.errors.push(if form.email.is_empty() {
                FieldError::EmailMissing
            } else if failed("email", "length") {
                FieldError::EmailTooLong
            } else {
                FieldError::EmailInvalid
            });
        }

        if fields.contains_key("message") {
            report.errors.push(if form.message.is_empty() {
                FieldError::MessageMissing
            } else if form.message.chars().count() < MESSAGE_MIN_CHARS {
                FieldError::MessageTooShort
            } else {
                FieldError::MessageTooLong
            });
        }

        report
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first_error(&self) -> Option<FieldError> {
        self.errors.first().copied()
    }

    /// All error descriptions joined for an API response.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(FieldError::description)
            .collect::<Vec<_>>()
            .join("; ")
    }
}
